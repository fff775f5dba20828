// The creature's navigation state machine.
//
// `Navigator` is the single owner of everything the creature's movement
// depends on: the waypoint graph, the k-d tree over it, the per-node sound
// weights, the agent state, the config, the PRNG and the event outbox. The
// embedding game constructs one per creature and drives it with
// `tick(now, dt, player)` once per frame; collaborators feed it stimuli
// through `add_sound`, `add_sustained_sound` and `beacon_dropped`, and read
// back `position()`, the gauges, and the `StepResult` events.
//
// ## Tick order
//
//   0. A halted navigator (player caught) only flushes its outbox.
//   1. Every node's weight decays toward neutral; sustained sounds inject
//      their share for the elapsed interval.
//   2. The volume factor and growl delay range are refreshed.
//   3. If the menace deadline has passed, the menace gauge is re-scored and
//      may coerce node weights (see `menace.rs`).
//   4. While the post-beacon-attack lock is running, nothing else happens.
//   5. Attack checks: an active beacon within reach is destroyed, otherwise a
//      player within reach is caught. Either skips movement for the tick.
//   6. On the graph: walk the current edge. Reaching its end promotes the
//      target to `current`; if that node is the beacon's or the player's
//      nearest node, the creature leaves the graph. Otherwise the next queued
//      node becomes the target. A tick that starts idle with nothing queued
//      rolls a weighted wander. An arrival that empties the queue leaves the
//      creature idle until the next tick.
//   7. Off the graph: beeline toward the node it left (when returning), else
//      the beacon, else the player. Once back within
//      `return_snap_distance_sq` of its node it snaps on and rolls a wander.
//
// ## Route requests
//
// `request_path` reconciles a new destination with the current travel state
// instead of overwriting it: turn around mid-edge when the destination is the
// node being walked away from, stop when already standing on it, drop the
// queue when already heading to it, truncate the queue when the destination
// is already queued, and only otherwise run a BFS from the target (or the
// current node when idle). Every BFS is counted in `NavStats`.
//
// ## Wander roll
//
// Cumulative-weight roulette over the nodes in index order against a point
// drawn from `[0, total_weight)`; the first node whose running sum reaches
// the point wins. `total_weight` is the running total from `WeightField`.
// Rounding can leave the point above the final sum, in which case the last
// node wins.
//
// Timed behaviors are plain deadlines (`attack_until`, `next_menace_check`,
// sustained sounds' `until`) compared against the `now` passed to `tick`.
//
// See also: `agent.rs` for the state being driven, `weights.rs` for the
// decay model, `pathfinding.rs` for BFS, `event.rs` for the outbox types.
//
// **Critical constraint: determinism.** Given the same graph, config, seed
// and sequence of calls, a navigator makes the same decisions. The only
// randomness is the seeded `NavRng`, and the parallel frustum queries return
// results in input order.

use crate::agent::{AgentMode, AgentState, Beacon, PlayerPose, Quarry, Vocalization};
use crate::config::NavConfig;
use crate::error::{NavError, NavResult};
use crate::event::{NavEvent, NavEventKind, StepResult};
use crate::graph::NavGraph;
use crate::kdtree::KdTree;
use crate::menace::{Coercion, frustum_nodes};
use crate::pathfinding::{hop_distance, rings, shortest_path};
use crate::types::{NodeId, Vec3};
use crate::weights::{NEUTRAL_WEIGHT, SNAP_EPSILON, WeightField};
use lurker_prng::NavRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Counters for tests and diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavStats {
    /// BFS runs, from route requests and menace scoring.
    pub path_searches: u64,
    pub wanders: u64,
    pub sounds: u64,
    pub menace_checks: u64,
}

/// A sound spread evenly over an interval.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
struct SustainedSound {
    node: NodeId,
    /// Intensity per second.
    rate: f32,
    start: f32,
    until: f32,
}

/// Read-only view of the navigator for debug overlays and logs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavSnapshot {
    pub time: f32,
    pub mode: AgentMode,
    pub position: Vec3,
    pub current: NodeId,
    pub target: Option<NodeId>,
    pub path: Vec<NodeId>,
    pub weights: Vec<f32>,
    pub total_weight: f32,
    pub volume_factor: f32,
    pub menace: Option<f32>,
    pub vocalization: Vocalization,
}

pub struct Navigator {
    graph: NavGraph,
    index: KdTree,
    weights: WeightField,
    agent: AgentState,
    config: NavConfig,
    rng: NavRng,
    /// Simulation time of the latest tick.
    now: f32,
    /// Player pose from the latest tick.
    player: PlayerPose,
    volume_factor: f32,
    menace: f32,
    next_menace_check: Option<f32>,
    sustained: Vec<SustainedSound>,
    stats: NavStats,
    outbox: Vec<NavEvent>,
}

impl Navigator {
    /// Build a navigator standing idle on `config.starting_node`.
    pub fn new(graph: NavGraph, config: NavConfig) -> NavResult<Self> {
        config.validate()?;
        if graph.is_empty() {
            return Err(NavError::EmptyIndex);
        }
        let start = NodeId(config.starting_node);
        let start_position = graph.try_node(start)?.position;

        let index = KdTree::from_graph(&graph);
        let weights = WeightField::new(graph.node_count(), config.decay_rate);
        info!(
            nodes = graph.node_count(),
            tree_height = index.height(),
            start = %start,
            menace = config.menace.is_some(),
            "navigator ready"
        );

        Ok(Self {
            volume_factor: weights.volume_factor(),
            next_menace_check: config.menace.as_ref().map(|m| m.interval),
            rng: NavRng::new(config.seed),
            agent: AgentState::new(start, start_position),
            player: PlayerPose::at(Vec3::ZERO),
            menace: 0.0,
            now: 0.0,
            sustained: Vec::new(),
            stats: NavStats::default(),
            outbox: Vec::new(),
            graph,
            index,
            weights,
            config,
        })
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the simulation to `now`, `dt` seconds after the previous tick.
    pub fn tick(&mut self, now: f32, dt: f32, player: PlayerPose) -> StepResult {
        if self.agent.halted {
            return self.drain();
        }
        self.now = now;
        self.player = player;

        self.weights.tick_all(now, dt);
        self.inject_sustained(now, dt);
        self.refresh_volume();

        if self.next_menace_check.is_some_and(|due| now >= due) {
            self.update_menace();
        }

        if let Some(until) = self.agent.attack_until {
            if now < until {
                return self.drain();
            }
            self.agent.attack_until = None;
            debug!(now, "attack lock over");
        }

        if !self.check_for_attacks() {
            if self.agent.on_graph {
                self.step_on_graph(dt);
            } else {
                self.step_off_graph(dt);
            }
        }
        self.drain()
    }

    fn drain(&mut self) -> StepResult {
        StepResult {
            events: std::mem::take(&mut self.outbox),
        }
    }

    fn emit(&mut self, kind: NavEventKind) {
        self.outbox.push(NavEvent {
            time: self.now,
            kind,
        });
    }

    fn refresh_volume(&mut self) {
        self.volume_factor = self.weights.volume_factor();
    }

    fn step_on_graph(&mut self, dt: f32) {
        let mut arrived = false;
        if let Some(target) = self.agent.target {
            if !self.agent.advance(self.config.travel_speed * dt) {
                return;
            }
            arrived = true;
            if self.arrive(target) {
                return;
            }
        }
        if let Some(next) = self.agent.path.pop_front() {
            self.agent.begin_edge(&self.graph, next);
        } else if !arrived {
            self.start_new_wander();
        }
    }

    /// Finish the edge onto `node`. Returns true if the creature left the
    /// graph there.
    fn arrive(&mut self, node: NodeId) -> bool {
        if (self.weights.weight(node) - NEUTRAL_WEIGHT).abs() < SNAP_EPSILON {
            self.weights
                .change_weight(node, -self.config.arrival_weight_drop, self.now);
        }
        self.agent.arrive(node, self.graph.position(node));
        debug!(node = %node, queued = self.agent.path.len(), "reached node");

        let at_beacon = self.agent.beacon.is_some_and(|b| b.node == node);
        if at_beacon || self.nearest(self.player.position) == node {
            let quarry = if self.agent.beacon.is_some() {
                Quarry::Beacon
            } else {
                Quarry::Player
            };
            self.leave_graph(quarry);
            return true;
        }
        false
    }

    fn leave_graph(&mut self, quarry: Quarry) {
        self.agent.on_graph = false;
        info!(node = %self.agent.current, ?quarry, "leaving the graph");
        self.emit(NavEventKind::LeftGraph {
            node: self.agent.current,
            quarry,
        });
        self.set_vocalization(Vocalization::Roaring);
    }

    fn step_off_graph(&mut self, dt: f32) {
        let destination = if self.agent.return_to_graph {
            self.graph.position(self.agent.current)
        } else if let Some(beacon) = self.agent.beacon {
            beacon.position
        } else {
            self.player.position
        };
        let to_go = destination - self.agent.position;

        if self.agent.return_to_graph
            && to_go.length_squared() < self.config.return_snap_distance_sq
        {
            self.agent.return_to_graph = false;
            self.agent.on_graph = true;
            self.agent.position = destination;
            info!(node = %self.agent.current, "back on the graph");
            self.emit(NavEventKind::ReturnedToGraph {
                node: self.agent.current,
            });
            self.start_new_wander();
        } else {
            let step = (self.config.travel_speed * dt).min(to_go.length());
            self.agent.position += to_go.normalized() * step;
        }
    }

    // -----------------------------------------------------------------------
    // Attacks
    // -----------------------------------------------------------------------

    fn check_for_attacks(&mut self) -> bool {
        let reach_sq = self.config.attack_distance * self.config.attack_distance;
        let position = self.agent.position;

        let beacon_in_reach = self
            .agent
            .beacon
            .filter(|b| b.position.distance_squared(position) <= reach_sq);
        if let Some(beacon) = beacon_in_reach {
            self.attack_beacon(beacon);
            return true;
        }
        if self.player.position.distance_squared(position) <= reach_sq {
            self.agent.halted = true;
            info!(position = %position, "caught the player");
            self.emit(NavEventKind::AttackedPlayer { position });
            return true;
        }
        false
    }

    fn attack_beacon(&mut self, beacon: Beacon) {
        self.agent.beacon = None;
        if !self.agent.on_graph {
            self.agent.return_to_graph = true;
        }
        // The beacon drew a lot of sound to its node.
        self.weights
            .set_weight(beacon.node, NEUTRAL_WEIGHT, self.now);
        let until = self.now + self.config.beacon_attack_duration;
        self.agent.attack_until = Some(until);
        info!(node = %beacon.node, until, "destroyed the beacon");
        self.emit(NavEventKind::BeaconAttacked {
            node: beacon.node,
            position: beacon.position,
        });
        self.set_vocalization(Vocalization::Growling);

        if let Some(change) = self
            .config
            .menace
            .as_ref()
            .map(|m| m.beacon_destroy_menace_change)
        {
            self.menace += change;
            self.coerce_menace();
        }
    }

    fn set_vocalization(&mut self, vocalization: Vocalization) {
        if self.agent.vocalization != vocalization {
            self.agent.vocalization = vocalization;
            self.emit(NavEventKind::VocalizationChanged { vocalization });
        }
    }

    // -----------------------------------------------------------------------
    // Menace gauge
    // -----------------------------------------------------------------------

    fn update_menace(&mut self) {
        let Some(params) = self.config.menace.as_ref() else {
            return;
        };
        self.next_menace_check = Some(self.now + params.interval);
        self.stats.menace_checks += 1;

        let distance = (self.agent.position - self.player.position).length();
        let player_node = self.nearest(self.player.position);
        let hops = hop_distance(&self.graph, self.agent.current, player_node);
        self.stats.path_searches += 1;
        self.menace = params.score(distance, hops);
        debug!(menace = self.menace, distance, hops, "menace re-scored");
        self.coerce_menace();
    }

    fn coerce_menace(&mut self) {
        let Some(params) = self.config.menace.as_ref() else {
            return;
        };
        let Some(coercion) = params.coercion(self.menace) else {
            return;
        };
        let (origin, direction, frustum) = match coercion {
            Coercion::PlayerView => (
                self.player.position,
                self.player.forward,
                &params.near_frustum,
            ),
            Coercion::OppositeSide => (Vec3::ZERO, -self.player.position, &params.far_frustum),
        };
        let inside = match frustum_nodes(&self.index, origin, direction, frustum) {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(%err, ?coercion, "frustum query failed, leaving weights alone");
                return;
            }
        };

        let mut in_frustum = vec![false; self.graph.node_count()];
        for id in &inside {
            in_frustum[id.index()] = true;
        }
        for id in self.graph.ids() {
            let weight = if in_frustum[id.index()] {
                params.coerced_weight
            } else {
                NEUTRAL_WEIGHT
            };
            self.weights.set_weight(id, weight, self.now);
        }
        self.refresh_volume();
        debug!(?coercion, coerced = inside.len(), menace = self.menace, "menace coerced weights");
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    /// Send the creature toward `destination`, reusing as much of its current
    /// route as possible.
    pub fn request_path(&mut self, destination: NodeId) -> NavResult<()> {
        self.graph.try_node(destination)?;
        self.plan_route(destination);
        Ok(())
    }

    fn plan_route(&mut self, destination: NodeId) {
        if destination == self.agent.current {
            if self.agent.target.is_some() && self.agent.travel_distance > 0.0 {
                self.agent.reverse();
                debug!(node = %destination, "turning back mid-edge");
            } else {
                self.agent.target = None;
                // A beacon landing by the node the creature just reached.
                let at_beacon = self.agent.beacon.is_some_and(|b| b.node == destination);
                if at_beacon && self.agent.on_graph {
                    self.agent.path.clear();
                    self.leave_graph(Quarry::Beacon);
                    return;
                }
            }
            self.agent.path.clear();
        } else if self.agent.target == Some(destination) {
            self.agent.path.clear();
        } else if let Some(pos) = self.agent.path.iter().position(|&n| n == destination) {
            self.agent.path.truncate(pos + 1);
            debug!(node = %destination, queued = pos + 1, "destination already queued");
        } else {
            let from = self.agent.target.unwrap_or(self.agent.current);
            let route = shortest_path(&self.graph, from, destination);
            self.stats.path_searches += 1;
            debug!(from = %from, to = %destination, hops = route.len(), "planned route");
            self.agent.path = VecDeque::from(route);
            if self.agent.target.is_none() {
                match self.agent.path.pop_front() {
                    Some(next) => self.agent.begin_edge(&self.graph, next),
                    None => debug!(from = %from, to = %destination, "no route"),
                }
            }
        }
    }

    /// Pick a destination by weighted roulette and route to it.
    pub fn start_new_wander(&mut self) {
        let total = self.weights.total_weight();
        let Some(point) = self.rng.point_below(total) else {
            warn!(total, "no positive total weight to wander by");
            return;
        };

        let mut choice = NodeId(self.graph.node_count() as u32 - 1);
        let mut cumulative = 0.0;
        for (i, weight) in self.weights.weights().enumerate() {
            cumulative += weight;
            if cumulative >= point {
                choice = NodeId(i as u32);
                break;
            }
        }
        self.stats.wanders += 1;
        debug!(node = %choice, point, total, "wandering");
        self.plan_route(choice);
    }

    // -----------------------------------------------------------------------
    // Stimuli
    // -----------------------------------------------------------------------

    /// A sound of `intensity` at `location`: heat up the nearest node and its
    /// neighborhood, then maybe react.
    pub fn add_sound(&mut self, location: Vec3, intensity: f32) {
        let node = self.nearest(location);
        self.stats.sounds += 1;
        self.diffuse(node, intensity);
        self.refresh_volume();
        debug!(
            node = %node,
            intensity,
            total = self.weights.total_weight(),
            "sound"
        );
        self.react_to_sound(node);
    }

    /// A sound whose `intensity` is released evenly over `duration` seconds,
    /// starting now. A non-positive duration is an instant sound.
    pub fn add_sustained_sound(&mut self, location: Vec3, intensity: f32, duration: f32) {
        if !duration.is_finite() || duration <= 0.0 {
            self.add_sound(location, intensity);
            return;
        }
        let node = self.nearest(location);
        self.stats.sounds += 1;
        self.sustained.push(SustainedSound {
            node,
            rate: intensity / duration,
            start: self.now,
            until: self.now + duration,
        });
        debug!(node = %node, intensity, duration, "sustained sound");
    }

    /// Release this tick's share of every sustained sound. The creature
    /// reacts at most once per tick, and only when the injection pushes the
    /// total across a reaction threshold, toward the loudest contributor.
    fn inject_sustained(&mut self, now: f32, dt: f32) {
        if self.sustained.is_empty() {
            return;
        }
        let band_before = self.reaction_band();
        let window_start = now - dt;
        let mut loudest: Option<(NodeId, f32)> = None;
        let mut sounds = std::mem::take(&mut self.sustained);
        for sound in &sounds {
            let overlap = now.min(sound.until) - window_start.max(sound.start);
            if overlap > 0.0 {
                let amount = sound.rate * overlap;
                self.diffuse(sound.node, amount);
                if loudest.is_none_or(|(_, max)| amount > max) {
                    loudest = Some((sound.node, amount));
                }
            }
        }
        sounds.retain(|s| s.until > now);
        self.sustained = sounds;

        let crossed = self.reaction_band() > band_before;
        if let Some((node, _)) = loudest.filter(|_| crossed) {
            self.react_to_sound(node);
        }
    }

    /// 0 below the new-wander threshold, 1 above it, 2 above detection.
    fn reaction_band(&self) -> u8 {
        let total = self.weights.total_weight();
        if total > self.config.detection_threshold {
            2
        } else if total > self.config.new_wander_threshold {
            1
        } else {
            0
        }
    }

    fn diffuse(&mut self, node: NodeId, intensity: f32) {
        let now = self.now;
        self.weights.change_weight(node, intensity, now);
        let falloffs = [
            self.config.neighbor_falloff,
            self.config.second_neighbor_falloff,
        ];
        for (ring, falloff) in rings(&self.graph, node, falloffs.len())
            .into_iter()
            .zip(falloffs)
        {
            for neighbor in ring {
                self.weights.change_weight(neighbor, intensity * falloff, now);
            }
        }
    }

    fn react_to_sound(&mut self, node: NodeId) {
        if self.agent.beacon.is_some() {
            return;
        }
        let total = self.weights.total_weight();
        if total > self.config.detection_threshold {
            debug!(node = %node, total, "investigating sound");
            self.plan_route(node);
        } else if total > self.config.new_wander_threshold {
            self.start_new_wander();
        }
    }

    /// A beacon landed at `location`: roar and head for it.
    pub fn beacon_dropped(&mut self, location: Vec3) {
        let node = self.nearest(location);
        self.agent.beacon = Some(Beacon {
            position: location,
            node,
        });
        info!(node = %node, position = %location, "beacon dropped");
        self.set_vocalization(Vocalization::Roaring);
        self.plan_route(node);
    }

    fn nearest(&self, point: Vec3) -> NodeId {
        // `new` rejects empty graphs, so the index always has a root.
        self.index.nearest(point).unwrap_or(self.agent.current)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn position(&self) -> Vec3 {
        self.agent.position
    }

    pub fn mode(&self) -> AgentMode {
        self.agent.mode()
    }

    pub fn current(&self) -> NodeId {
        self.agent.current
    }

    pub fn target(&self) -> Option<NodeId> {
        self.agent.target
    }

    /// Nodes queued after the target.
    pub fn path(&self) -> &VecDeque<NodeId> {
        &self.agent.path
    }

    pub fn volume_factor(&self) -> f32 {
        self.volume_factor
    }

    /// `(min, max)` seconds between ambient growls.
    pub fn growl_delay_range(&self) -> (f32, f32) {
        self.config.growl.delay_range(self.volume_factor)
    }

    /// Current menace score, `None` when the gauge is disabled.
    pub fn menace(&self) -> Option<f32> {
        self.config.menace.as_ref().map(|_| self.menace)
    }

    pub fn vocalization(&self) -> Vocalization {
        self.agent.vocalization
    }

    pub fn stats(&self) -> NavStats {
        self.stats
    }

    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn graph(&self) -> &NavGraph {
        &self.graph
    }

    pub fn weights(&self) -> &WeightField {
        &self.weights
    }

    pub fn agent(&self) -> &AgentState {
        &self.agent
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            time: self.now,
            mode: self.mode(),
            position: self.agent.position,
            current: self.agent.current,
            target: self.agent.target,
            path: self.agent.path.iter().copied().collect(),
            weights: self.weights.weights().collect(),
            total_weight: self.weights.total_weight(),
            volume_factor: self.volume_factor,
            menace: self.menace(),
            vocalization: self.agent.vocalization,
        }
    }
}
