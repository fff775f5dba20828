// lurker_nav: navigation core for the creature that stalks the player.
//
// The creature moves over a hand-authored waypoint graph. Sounds heat up the
// nodes near where they happen, the heat decays back to neutral over time,
// and the creature picks where to go next by a weighted roll over that heat
// or, when the map gets loud enough, heads straight for the noise. Near its
// quarry (a dropped beacon or the player) it leaves the graph and closes in
// directly. This crate is engine-agnostic: the game feeds it a clock, the
// player's pose and stimuli, and reads back a position and events.
//
// Module overview:
// - `navigator.rs`:   Navigator, the per-creature state machine and tick loop.
// - `agent.rs`:       AgentState, edge traversal bookkeeping and derived AgentMode.
// - `weights.rs`:     WeightField, per-node sound weights with cubic-ease decay.
// - `pathfinding.rs`: BFS shortest paths and hop rings over the graph.
// - `kdtree.rs`:      Arena k-d tree for nearest-node queries, serial and batched.
// - `menace.rs`:      Menace score and frustum sampling for weight coercion.
// - `graph.rs`:       NavGraph, node positions plus adjacency.
// - `graph_io.rs`:    Comma-separated graph text loader and writer.
// - `config.rs`:      NavConfig, every tunable parameter, loaded from JSON.
// - `event.rs`:       NavEvent / StepResult, notifications for collaborators.
// - `error.rs`:       NavError, the crate's error enum.
// - `types.rs`:       Vec3 and NodeId.
// - `prng`:           Re-exported from `lurker_prng`, xoshiro256++ with SplitMix64 seeding.
//
// **Critical constraint: determinism.** Two navigators built from the same
// graph, config and seed, fed the same calls, make the same decisions. No
// system time, no OS entropy, no iteration over hash-ordered collections.

pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod graph_io;
pub mod kdtree;
pub mod menace;
pub mod navigator;
pub mod pathfinding;
pub use lurker_prng as prng;
pub mod types;
pub mod weights;

pub use agent::{AgentMode, PlayerPose, Quarry, Vocalization};
pub use config::NavConfig;
pub use error::{NavError, NavResult};
pub use event::{NavEvent, NavEventKind, StepResult};
pub use graph::NavGraph;
pub use navigator::{NavSnapshot, NavStats, Navigator};
pub use types::{NodeId, Vec3};
