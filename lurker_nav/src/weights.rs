// Sound heat per waypoint.
//
// Every node carries a weight: 1.0 is neutral, above 1.0 means recent noise
// nearby, below 1.0 means the creature has little reason to go there. After
// each change the weight eases back to neutral along a cubic ease-out curve,
// parameterized by the offset from neutral at the moment of the change and
// the time elapsed since it.
//
// `WeightField` holds one `WeightedNode` per graph node and a running
// `total_weight`, which the wander roll divides into. The total is maintained
// incrementally by every mutation and by `tick_all`, never by re-summing, so
// a tick costs one pass over the nodes and the wander roll reads the total in
// O(1).
//
// Every mutation, absolute or additive, re-anchors the decay curve at the
// current time. Anchoring only on absolute sets leaves additive bumps decaying
// along a stale curve.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Neutral weight every node decays toward.
pub const NEUTRAL_WEIGHT: f32 = 1.0;

/// Offsets smaller than this snap straight to neutral instead of creeping.
pub const SNAP_EPSILON: f32 = 0.01;

/// Mutable decay state of one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedNode {
    weight: f32,
    /// Simulation time of the last mutation.
    last_change: f32,
    /// `weight - 1` at `last_change`.
    starting_offset: f32,
}

impl Default for WeightedNode {
    fn default() -> Self {
        Self {
            weight: NEUTRAL_WEIGHT,
            last_change: 0.0,
            starting_offset: 0.0,
        }
    }
}

impl WeightedNode {
    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn last_change(&self) -> f32 {
        self.last_change
    }

    pub fn starting_offset(&self) -> f32 {
        self.starting_offset
    }

    fn assign(&mut self, weight: f32, now: f32) {
        self.weight = weight;
        self.last_change = now;
        self.starting_offset = weight - NEUTRAL_WEIGHT;
    }

    /// Ease one step toward neutral. Returns the change applied to `weight`.
    ///
    /// `decay_rate * (now - last_change)^3 * dt` scales the starting offset;
    /// the step is clamped to the remaining offset so it never overshoots.
    pub fn decay(&mut self, now: f32, dt: f32, decay_rate: f32) -> f32 {
        let before = self.weight;
        let offset = before - NEUTRAL_WEIGHT;
        if offset == 0.0 {
            return 0.0;
        }
        if offset.abs() < SNAP_EPSILON {
            self.weight = NEUTRAL_WEIGHT;
            return NEUTRAL_WEIGHT - before;
        }

        let elapsed = now - self.last_change;
        let raw = self.starting_offset * decay_rate * elapsed.powi(3) * dt;
        let step = raw.clamp(-offset.abs(), offset.abs());
        let mut after = before - step;
        // Rounding near a full step can land a hair past neutral.
        if step.abs() >= offset.abs() || (after - NEUTRAL_WEIGHT) * offset <= 0.0 {
            after = NEUTRAL_WEIGHT;
        }
        self.weight = after;
        after - before
    }
}

/// Per-node weights plus their running sum.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightField {
    nodes: Vec<WeightedNode>,
    total_weight: f32,
    decay_rate: f32,
}

impl WeightField {
    /// All nodes neutral.
    pub fn new(node_count: usize, decay_rate: f32) -> Self {
        Self {
            nodes: vec![WeightedNode::default(); node_count],
            total_weight: node_count as f32 * NEUTRAL_WEIGHT,
            decay_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn weight(&self, node: NodeId) -> f32 {
        self.nodes[node.index()].weight
    }

    pub fn node(&self, node: NodeId) -> &WeightedNode {
        &self.nodes[node.index()]
    }

    /// Weights in node order.
    pub fn weights(&self) -> impl Iterator<Item = f32> + '_ {
        self.nodes.iter().map(|n| n.weight)
    }

    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    /// Full re-sum, for diagnostics and tests. The hot path never calls it.
    pub fn recomputed_total(&self) -> f32 {
        self.nodes.iter().map(|n| n.weight).sum()
    }

    /// `node_count / total_weight`: 1.0 when the map is quiet, smaller as
    /// sound heat builds up. Drives the ambient growl mix.
    pub fn volume_factor(&self) -> f32 {
        if self.total_weight > 0.0 {
            self.nodes.len() as f32 / self.total_weight
        } else {
            1.0
        }
    }

    /// Overwrite a node's weight. Setting the current value is a no-op and
    /// leaves the decay anchor alone.
    pub fn set_weight(&mut self, node: NodeId, weight: f32, now: f32) {
        let entry = &mut self.nodes[node.index()];
        if entry.weight == weight {
            return;
        }
        let old = entry.weight;
        entry.assign(weight, now);
        self.total_weight += weight - old;
    }

    /// Add `delta` to a node's weight, re-anchoring its decay at `now`.
    pub fn change_weight(&mut self, node: NodeId, delta: f32, now: f32) {
        let weight = self.nodes[node.index()].weight + delta;
        self.set_weight(node, weight, now);
    }

    /// Decay one node. Returns the applied delta, already folded into the
    /// running total.
    pub fn tick_node(&mut self, node: NodeId, now: f32, dt: f32) -> f32 {
        let delta = self.nodes[node.index()].decay(now, dt, self.decay_rate);
        self.total_weight += delta;
        delta
    }

    /// Decay every node. Returns the net change to `total_weight`.
    pub fn tick_all(&mut self, now: f32, dt: f32) -> f32 {
        let rate = self.decay_rate;
        let net: f32 = self
            .nodes
            .iter_mut()
            .map(|n| n.decay(now, dt, rate))
            .sum();
        self.total_weight += net;
        net
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lurker_prng::NavRng;

    fn assert_total_consistent(field: &WeightField) {
        let exact = field.recomputed_total();
        let tracked = field.total_weight();
        assert!(
            (exact - tracked).abs() <= 1e-3 * exact.abs().max(1.0),
            "tracked total {tracked} drifted from {exact}"
        );
    }

    #[test]
    fn starts_neutral() {
        let field = WeightField::new(5, 1.0);
        assert_eq!(field.total_weight(), 5.0);
        assert_eq!(field.volume_factor(), 1.0);
        assert!(field.weights().all(|w| w == NEUTRAL_WEIGHT));
    }

    #[test]
    fn set_weight_anchors_decay_and_updates_total() {
        let mut field = WeightField::new(3, 1.0);
        field.set_weight(NodeId(1), 4.0, 2.5);
        let node = field.node(NodeId(1));
        assert_eq!(node.weight(), 4.0);
        assert_eq!(node.last_change(), 2.5);
        assert_eq!(node.starting_offset(), 3.0);
        assert_eq!(field.total_weight(), 6.0);
    }

    #[test]
    fn set_to_same_value_keeps_anchor() {
        let mut field = WeightField::new(2, 1.0);
        field.set_weight(NodeId(0), 3.0, 1.0);
        field.set_weight(NodeId(0), 3.0, 9.0);
        assert_eq!(field.node(NodeId(0)).last_change(), 1.0);
    }

    #[test]
    fn change_weight_reanchors_decay() {
        let mut field = WeightField::new(2, 1.0);
        field.set_weight(NodeId(0), 3.0, 1.0);
        field.change_weight(NodeId(0), 0.5, 4.0);
        let node = field.node(NodeId(0));
        assert_eq!(node.weight(), 3.5);
        assert_eq!(node.last_change(), 4.0);
        assert_eq!(node.starting_offset(), 2.5);
        assert_eq!(field.total_weight(), 4.5);
    }

    #[test]
    fn near_neutral_snaps_then_stays() {
        let mut field = WeightField::new(1, 1.0);
        field.set_weight(NodeId(0), 1.005, 0.0);
        let delta = field.tick_node(NodeId(0), 0.1, 0.1);
        assert!((delta + 0.005).abs() < 1e-6, "snap delta {delta}");
        assert_eq!(field.weight(NodeId(0)), NEUTRAL_WEIGHT);
        for step in 0..10 {
            let t = 0.2 + step as f32 * 0.1;
            assert_eq!(field.tick_node(NodeId(0), t, 0.1), 0.0);
        }
        assert_eq!(field.weight(NodeId(0)), NEUTRAL_WEIGHT);
    }

    #[test]
    fn no_decay_at_the_instant_of_change() {
        let mut field = WeightField::new(1, 2.0);
        field.set_weight(NodeId(0), 5.0, 3.0);
        assert_eq!(field.tick_node(NodeId(0), 3.0, 0.016), 0.0);
        assert_eq!(field.weight(NodeId(0)), 5.0);
    }

    #[test]
    fn decay_converges_monotonically_without_overshoot() {
        let dt = 1.0 / 60.0;
        for &start in &[6.0_f32, 1.5, 0.0, 0.4, 25.0] {
            let mut field = WeightField::new(1, 0.8);
            field.set_weight(NodeId(0), start, 0.0);
            let above = start > NEUTRAL_WEIGHT;
            let mut prev_gap = (start - NEUTRAL_WEIGHT).abs();
            let mut now = 0.0;
            let mut snapped = false;
            for _ in 0..100_000 {
                now += dt;
                let before = field.weight(NodeId(0));
                let delta = field.tick_node(NodeId(0), now, dt);
                let w = field.weight(NodeId(0));
                assert!(delta.abs() <= (before - NEUTRAL_WEIGHT).abs() + 1e-6);
                if above {
                    assert!(w >= NEUTRAL_WEIGHT, "overshot below neutral from {start}: {w}");
                } else {
                    assert!(w <= NEUTRAL_WEIGHT, "overshot above neutral from {start}: {w}");
                }
                let gap = (w - NEUTRAL_WEIGHT).abs();
                if w == NEUTRAL_WEIGHT {
                    snapped = true;
                    break;
                }
                assert!(gap <= prev_gap, "gap grew from {start}: {prev_gap} -> {gap}");
                prev_gap = gap;
            }
            assert!(snapped, "weight starting at {start} never reached neutral");
        }
    }

    #[test]
    fn total_weight_tracks_random_mutations() {
        let mut rng = NavRng::new(4242);
        let mut field = WeightField::new(40, 0.5);
        let mut now = 0.0;
        for _ in 0..5_000 {
            now += 0.02;
            let node = NodeId(rng.range_usize(0, 40) as u32);
            match rng.range_usize(0, 3) {
                0 => field.set_weight(node, rng.range_f32(0.0, 8.0), now),
                1 => field.change_weight(node, rng.range_f32(-0.5, 3.0), now),
                _ => {
                    field.tick_all(now, 0.02);
                }
            }
            assert_total_consistent(&field);
        }
    }

    #[test]
    fn tick_all_returns_net_change() {
        let mut field = WeightField::new(3, 1.0);
        field.set_weight(NodeId(0), 3.0, 0.0);
        field.set_weight(NodeId(2), 0.5, 0.0);
        let before = field.total_weight();
        let net = field.tick_all(1.0, 0.1);
        assert!((field.total_weight() - (before + net)).abs() < 1e-6);
        assert_total_consistent(&field);
    }
}
