// Creature movement state.
//
// `AgentState` is the plain data the navigator's state machine drives: where
// the creature stands, which edge it is walking, what is queued after that,
// and the flags for off-graph pursuit, beacon attacks, and game over. The
// edge bookkeeping (`begin_edge`, `advance`, `reverse`) lives here; every
// decision about *where* to go lives in `navigator.rs`.
//
// The observable `AgentMode` is derived from the flags rather than stored, so
// it cannot drift out of sync with them. At most one of {edge traversal,
// off-graph travel} is active: off-graph movement ignores `target`, and an
// edge is only advanced while `on_graph`.
//
// Invariants the navigator maintains: `path` never contains `current`, and a
// node is removed from the front of `path` when it becomes `target`.

use crate::graph::NavGraph;
use crate::types::{NodeId, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Observable behavior of the creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentMode {
    /// Standing on `current` with nowhere to go yet.
    OnGraphIdle,
    /// Walking the edge from `current` to `target`.
    OnGraphTraveling,
    /// Beelining toward the beacon, the player, or back to its node.
    OffGraphDirect,
    /// Locked in place after destroying a beacon.
    Attacking,
    /// Caught the player. No further movement.
    Halted,
}

/// Which sound the creature is making, for the audio collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vocalization {
    Growling,
    Roaring,
}

/// What an off-graph chase is closing in on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quarry {
    Beacon,
    Player,
}

/// A dropped beacon the creature is hunting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub position: Vec3,
    /// Graph node nearest the beacon.
    pub node: NodeId,
}

/// The player as the navigator sees it each tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPose {
    pub position: Vec3,
    /// Facing direction. Only the menace gauge reads it.
    pub forward: Vec3,
}

impl PlayerPose {
    /// A player at `position` facing +Z.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::FORWARD,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub current: NodeId,
    /// The adjacent node being walked toward.
    pub target: Option<NodeId>,
    /// Nodes queued after `target`, front first.
    pub path: VecDeque<NodeId>,
    /// Distance covered along the current edge.
    pub travel_distance: f32,
    /// Length of the current edge.
    pub target_distance: f32,
    /// Unit direction of the current edge.
    pub direction: Vec3,
    pub position: Vec3,
    pub on_graph: bool,
    /// Off-graph and heading back to `current`.
    pub return_to_graph: bool,
    pub beacon: Option<Beacon>,
    /// End of the post-beacon-attack lock.
    pub attack_until: Option<f32>,
    /// Set once the player has been caught.
    pub halted: bool,
    pub vocalization: Vocalization,
}

impl AgentState {
    /// Standing idle on `start`.
    pub fn new(start: NodeId, position: Vec3) -> Self {
        Self {
            current: start,
            target: None,
            path: VecDeque::new(),
            travel_distance: 0.0,
            target_distance: 0.0,
            direction: Vec3::ZERO,
            position,
            on_graph: true,
            return_to_graph: false,
            beacon: None,
            attack_until: None,
            halted: false,
            vocalization: Vocalization::Growling,
        }
    }

    pub fn mode(&self) -> AgentMode {
        if self.halted {
            AgentMode::Halted
        } else if self.attack_until.is_some() {
            AgentMode::Attacking
        } else if !self.on_graph {
            AgentMode::OffGraphDirect
        } else if self.target.is_some() {
            AgentMode::OnGraphTraveling
        } else {
            AgentMode::OnGraphIdle
        }
    }

    /// Start walking from `current` to `next`.
    pub fn begin_edge(&mut self, graph: &NavGraph, next: NodeId) {
        let edge = graph.position(next) - graph.position(self.current);
        self.target = Some(next);
        self.direction = edge.normalized();
        self.target_distance = edge.length();
        self.travel_distance = 0.0;
    }

    /// Move `distance` along the current edge. Returns true once the end of
    /// the edge has been reached or passed.
    pub fn advance(&mut self, distance: f32) -> bool {
        self.travel_distance += distance;
        self.position += self.direction * distance;
        self.travel_distance >= self.target_distance
    }

    /// Turn around mid-edge: the node being approached becomes the one being
    /// left, and the distance still to go becomes the distance covered.
    pub fn reverse(&mut self) {
        if let Some(target) = self.target {
            self.target = Some(self.current);
            self.current = target;
            self.travel_distance = self.target_distance - self.travel_distance;
            self.direction = -self.direction;
        }
    }

    /// Finish the current edge on `node`, snapping onto its exact position.
    pub fn arrive(&mut self, node: NodeId, position: Vec3) {
        self.current = node;
        self.target = None;
        self.position = position;
        self.travel_distance = 0.0;
    }

    /// Every node the creature is committed to, starting with the target.
    pub fn route(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.target.into_iter().chain(self.path.iter().copied())
    }
}
