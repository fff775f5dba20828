// Nearest-waypoint index: a 3-dimensional k-d tree.
//
// Every sound, the beacon, and the player's position must be mapped to the
// closest graph node, many times per second. The tree is built once from the
// graph's node positions by plain sequential insertion (split axis cycles
// x, y, z with depth; points equal on the split axis go right). There is no
// balancing, so tree shape follows input order. Authored graphs are spatially
// scattered enough that this has not mattered.
//
// Storage is an arena: `KdTree.nodes` is a flat `Vec<KdNode>` and children are
// `Option<u32>` slots into it. Nothing is inserted or removed after `build`.
//
// Search is the classic descend-then-backtrack nearest-neighbor: follow the
// split comparison down, keep the best squared distance, and on the way back
// up visit the far child only when the squared distance to the splitting
// plane is below the current best. Candidates replace the best only when
// strictly closer, so the first node found wins an exact tie.
//
// The tree is immutable and `Sync`; `nearest_batch` fans queries out across
// rayon's pool.
//
// See also: `graph.rs` (`nearest_node_linear` is the oracle the tests compare
// against), `menace.rs` which issues batch queries.

use crate::error::{NavError, NavResult};
use crate::graph::NavGraph;
use crate::types::{NodeId, Vec3};
use rayon::prelude::*;

const K: usize = 3;

#[derive(Clone, Debug)]
struct KdNode {
    id: NodeId,
    point: Vec3,
    left: Option<u32>,
    right: Option<u32>,
}

/// Arena-backed k-d tree over node positions.
#[derive(Clone, Debug, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    root: Option<u32>,
}

impl KdTree {
    /// Insert points in the given order.
    pub fn build(points: impl IntoIterator<Item = (NodeId, Vec3)>) -> Self {
        let mut tree = Self::default();
        for (id, point) in points {
            tree.insert(id, point);
        }
        tree
    }

    /// Index every node of a graph, in node order.
    pub fn from_graph(graph: &NavGraph) -> Self {
        Self::build(graph.nodes().iter().map(|n| (n.index, n.position)))
    }

    fn insert(&mut self, id: NodeId, point: Vec3) {
        let slot = self.nodes.len() as u32;
        self.nodes.push(KdNode {
            id,
            point,
            left: None,
            right: None,
        });

        let Some(mut cursor) = self.root else {
            self.root = Some(slot);
            return;
        };
        let mut depth = 0;
        loop {
            let axis = depth % K;
            let parent = &mut self.nodes[cursor as usize];
            let child = if point[axis] < parent.point[axis] {
                &mut parent.left
            } else {
                &mut parent.right
            };
            match *child {
                Some(next) => {
                    cursor = next;
                    depth += 1;
                }
                None => {
                    *child = Some(slot);
                    return;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Longest root-to-leaf chain (0 for an empty tree).
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(u32, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((slot, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[slot as usize];
            stack.extend(node.left.map(|c| (c, depth + 1)));
            stack.extend(node.right.map(|c| (c, depth + 1)));
        }
        height
    }

    /// The node closest to `point` (squared Euclidean distance).
    pub fn nearest(&self, point: Vec3) -> NavResult<NodeId> {
        let root = self.root.ok_or(NavError::EmptyIndex)?;
        let mut best = Best {
            slot: root,
            dist_sq: f32::INFINITY,
        };
        self.search(root, point, &mut best);
        Ok(self.nodes[best.slot as usize].id)
    }

    /// `nearest` for many points at once, evaluated in parallel. Results are
    /// in input order.
    pub fn nearest_batch(&self, points: &[Vec3]) -> NavResult<Vec<NodeId>> {
        if self.root.is_none() {
            return Err(NavError::EmptyIndex);
        }
        points.par_iter().map(|&p| self.nearest(p)).collect()
    }

    /// Depth-first descent with an explicit stack, so an unbalanced chain
    /// costs heap rather than call frames. Each entry carries the squared
    /// distance to the split plane it sits behind; a far child is only
    /// expanded if that gap is still below the best once its near sibling's
    /// subtree is done. Near children carry `-inf` and are always expanded.
    fn search(&self, root: u32, point: Vec3, best: &mut Best) {
        let mut stack: Vec<(u32, usize, f32)> = vec![(root, 0, f32::NEG_INFINITY)];
        while let Some((slot, depth, plane_sq)) = stack.pop() {
            if plane_sq >= best.dist_sq {
                continue;
            }
            let node = &self.nodes[slot as usize];

            let dist_sq = node.point.distance_squared(point);
            if dist_sq < best.dist_sq {
                *best = Best { slot, dist_sq };
            }

            let axis = depth % K;
            let (near, far) = if point[axis] < node.point[axis] {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };
            let plane = point[axis] - node.point[axis];
            // Pushed first so it pops after the whole near subtree.
            if let Some(far) = far {
                stack.push((far, depth + 1, plane * plane));
            }
            if let Some(near) = near {
                stack.push((near, depth + 1, f32::NEG_INFINITY));
            }
        }
    }
}

struct Best {
    slot: u32,
    dist_sq: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lurker_prng::NavRng;

    #[derive(Clone, Copy, Debug)]
    enum Layout {
        Scattered,
        AxisLine,
        SkewLine,
        FlatPlane,
        SkewPlane,
        IntegerGrid,
    }

    const LAYOUTS: [Layout; 6] = [
        Layout::Scattered,
        Layout::AxisLine,
        Layout::SkewLine,
        Layout::FlatPlane,
        Layout::SkewPlane,
        Layout::IntegerGrid,
    ];

    fn random_point(rng: &mut NavRng) -> Vec3 {
        Vec3::new(
            rng.range_f32(-50.0, 50.0),
            rng.range_f32(-50.0, 50.0),
            rng.range_f32(-50.0, 50.0),
        )
    }

    fn layout_points(rng: &mut NavRng, layout: Layout, count: usize) -> Vec<Vec3> {
        let origin = random_point(rng);
        let u = random_point(rng).normalized();
        let v = random_point(rng).normalized();
        (0..count)
            .map(|_| match layout {
                Layout::Scattered => random_point(rng),
                Layout::AxisLine => Vec3::new(rng.range_f32(-50.0, 50.0), 0.0, 0.0),
                Layout::SkewLine => origin + u * rng.range_f32(-40.0, 40.0),
                Layout::FlatPlane => {
                    Vec3::new(rng.range_f32(-50.0, 50.0), rng.range_f32(-50.0, 50.0), 3.0)
                }
                Layout::SkewPlane => {
                    origin + u * rng.range_f32(-40.0, 40.0) + v * rng.range_f32(-40.0, 40.0)
                }
                Layout::IntegerGrid => Vec3::new(
                    rng.range_usize(0, 4) as f32,
                    rng.range_usize(0, 4) as f32,
                    rng.range_usize(0, 2) as f32,
                ),
            })
            .collect()
    }

    fn graph_from_points(points: &[Vec3]) -> NavGraph {
        let mut graph = NavGraph::new();
        for &p in points {
            graph.add_node(p);
        }
        graph
    }

    #[test]
    fn empty_index_is_an_error() {
        let tree = KdTree::build(std::iter::empty());
        assert!(tree.is_empty());
        assert!(matches!(tree.nearest(Vec3::ZERO), Err(NavError::EmptyIndex)));
        assert!(matches!(
            tree.nearest_batch(&[Vec3::ZERO]),
            Err(NavError::EmptyIndex)
        ));
    }

    #[test]
    fn single_node_is_always_nearest() {
        let tree = KdTree::build([(NodeId(0), Vec3::new(1.0, 2.0, 3.0))]);
        assert_eq!(tree.nearest(Vec3::new(-100.0, 0.0, 9.0)).unwrap(), NodeId(0));
    }

    #[test]
    fn split_axis_cycles_with_depth() {
        // Root splits on x, its right child on y, that child's left on z.
        let tree = KdTree::build([
            (NodeId(0), Vec3::new(0.0, 0.0, 0.0)),
            (NodeId(1), Vec3::new(1.0, 0.0, 0.0)),
            (NodeId(2), Vec3::new(2.0, -1.0, 0.0)),
            (NodeId(3), Vec3::new(3.0, -2.0, -1.0)),
        ]);
        assert_eq!(tree.height(), 4);
        assert_eq!(tree.nodes[0].right, Some(1));
        assert_eq!(tree.nodes[1].left, Some(2));
        assert_eq!(tree.nodes[2].left, Some(3));
    }

    #[test]
    fn exact_tie_keeps_first_found() {
        let tree = KdTree::build([
            (NodeId(0), Vec3::new(5.0, 5.0, 5.0)),
            (NodeId(1), Vec3::new(5.0, 5.0, 5.0)),
        ]);
        assert_eq!(tree.nearest(Vec3::new(5.0, 5.0, 5.0)).unwrap(), NodeId(0));
    }

    #[test]
    fn backtracks_across_split_plane() {
        // The query descends right of the root, but the closest node is on
        // the left.
        let tree = KdTree::build([
            (NodeId(0), Vec3::new(10.0, 0.0, 0.0)),
            (NodeId(1), Vec3::new(9.5, 0.0, 0.0)),
            (NodeId(2), Vec3::new(30.0, 40.0, 0.0)),
        ]);
        assert_eq!(tree.nearest(Vec3::new(10.1, 0.0, 0.0)).unwrap(), NodeId(0));
        assert_eq!(tree.nearest(Vec3::new(10.0, 0.0, 0.0)).unwrap(), NodeId(0));
        assert_eq!(tree.nearest(Vec3::new(9.6, 0.0, 0.0)).unwrap(), NodeId(1));
    }

    #[test]
    fn matches_linear_scan_on_random_layouts() {
        let mut rng = NavRng::new(0x5eed_0f_50a7);
        let mut configs = 0;
        for round in 0..1_200 {
            let layout = LAYOUTS[round % LAYOUTS.len()];
            let count = rng.range_usize(1, 64);
            let points = layout_points(&mut rng, layout, count);
            let graph = graph_from_points(&points);
            let tree = KdTree::from_graph(&graph);
            assert_eq!(tree.len(), count);

            let mut queries: Vec<Vec3> = (0..12).map(|_| random_point(&mut rng)).collect();
            queries.extend(points.iter().take(4).copied());

            for q in queries {
                let found = tree.nearest(q).unwrap();
                let oracle = graph.nearest_node_linear(q).unwrap();
                let found_d = graph.position(found).distance_squared(q);
                let oracle_d = graph.position(oracle).distance_squared(q);
                assert_eq!(
                    found_d, oracle_d,
                    "round {round} ({layout:?}, {count} nodes): query {q} -> {found} at {found_d}, \
                     linear scan -> {oracle} at {oracle_d}"
                );
            }
            configs += 1;
        }
        assert!(configs >= 1_000);
    }

    /// The tree `build` produces from points sorted along +X: every point
    /// ties or exceeds its parent on every axis, so each goes right. Laid
    /// out directly because inserting a long chain is quadratic.
    fn sorted_chain(count: u32) -> KdTree {
        let nodes = (0..count)
            .map(|i| KdNode {
                id: NodeId(i),
                point: Vec3::new(i as f32, 0.0, 0.0),
                left: None,
                right: (i + 1 < count).then_some(i + 1),
            })
            .collect();
        KdTree {
            nodes,
            root: (count > 0).then_some(0),
        }
    }

    #[test]
    fn sorted_chain_matches_build() {
        let built = KdTree::build((0..40).map(|i| (NodeId(i), Vec3::new(i as f32, 0.0, 0.0))));
        let laid = sorted_chain(40);
        assert_eq!(built.height(), 40);
        for (a, b) in built.nodes.iter().zip(&laid.nodes) {
            assert_eq!((a.id, a.left, a.right), (b.id, b.left, b.right));
        }
    }

    #[test]
    fn degenerate_chain_does_not_exhaust_the_stack() {
        let count = 150_000;
        let tree = sorted_chain(count);
        assert_eq!(tree.height(), count as usize);
        let far_end = Vec3::new(count as f32 + 5.0, 0.0, 0.0);
        assert_eq!(tree.nearest(far_end).unwrap(), NodeId(count - 1));
        assert_eq!(tree.nearest(Vec3::new(-3.0, 1.0, 0.0)).unwrap(), NodeId(0));
        assert_eq!(
            tree.nearest(Vec3::new(73_000.2, 0.0, -1.0)).unwrap(),
            NodeId(73_000)
        );
    }

    #[test]
    fn batch_agrees_with_single_queries() {
        let mut rng = NavRng::new(77);
        let points = layout_points(&mut rng, Layout::Scattered, 200);
        let tree = KdTree::build(
            points
                .iter()
                .enumerate()
                .map(|(i, &p)| (NodeId(i as u32), p)),
        );
        let queries: Vec<Vec3> = (0..300).map(|_| random_point(&mut rng)).collect();
        let batch = tree.nearest_batch(&queries).unwrap();
        let single: Vec<NodeId> = queries.iter().map(|&q| tree.nearest(q).unwrap()).collect();
        assert_eq!(batch, single);
    }
}
