// Waypoint graph the creature moves across.
//
// The graph is a flat `Vec<GraphNode>` indexed by `NodeId`. Each node stores
// its world position and an ordered adjacency list of node ids. Topology is
// fixed once built: the loader (`graph_io.rs`) or the `add_node`/`connect`
// builders produce it, `NavGraph::from_nodes` validates it, and from then on
// only per-node weights (`weights.rs`) change.
//
// Adjacency is authored in both directions by the waypoint tool, but search
// (`pathfinding.rs`) and sound diffusion only ever follow a node's own list,
// so a one-way link behaves as one-way.
//
// See also: `kdtree.rs` for nearest-node lookup over these positions,
// `navigator.rs` which owns the graph.

use crate::error::{NavError, NavResult};
use crate::types::{NodeId, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Adjacency list. Authored graphs rarely exceed four links per waypoint.
pub type Connections = SmallVec<[NodeId; 4]>;

/// A waypoint: position plus outgoing connections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub index: NodeId,
    pub position: Vec3,
    pub connections: Connections,
}

/// The navigation graph container.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NavGraph {
    nodes: Vec<GraphNode>,
}

impl NavGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from loaded nodes, checking that every node sits at the
    /// array position its index claims and that every connection resolves.
    pub fn from_nodes(nodes: Vec<GraphNode>) -> NavResult<Self> {
        let count = nodes.len();
        for (pos, node) in nodes.iter().enumerate() {
            if node.index.index() != pos {
                return Err(NavError::Consistency(format!(
                    "node {} found at array position {pos}",
                    node.index
                )));
            }
            if let Some(bad) = node.connections.iter().find(|c| c.index() >= count) {
                return Err(NavError::Consistency(format!(
                    "node {} connects to {bad}, but the graph has {count} nodes",
                    node.index
                )));
            }
        }
        Ok(Self { nodes })
    }

    /// Append a node with no connections. Returns its id.
    pub fn add_node(&mut self, position: Vec3) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode {
            index: id,
            position,
            connections: Connections::new(),
        });
        id
    }

    /// Link two nodes in both directions, the way the authoring tool does.
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        self.connect_one_way(a, b);
        self.connect_one_way(b, a);
    }

    /// Add `to` to `from`'s adjacency list (no duplicates).
    pub fn connect_one_way(&mut self, from: NodeId, to: NodeId) {
        let conns = &mut self.nodes[from.index()].connections;
        if !conns.contains(&to) {
            conns.push(to);
        }
    }

    /// Get a node by id. Panics on an id from another graph.
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.index()]
    }

    /// Checked lookup for ids that arrive from outside the core.
    pub fn try_node(&self, id: NodeId) -> NavResult<&GraphNode> {
        self.nodes.get(id.index()).ok_or(NavError::InvalidEndpoint {
            node: id,
            node_count: self.nodes.len(),
        })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn position(&self, id: NodeId) -> Vec3 {
        self.node(id).position
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).connections
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.index)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of directed connections.
    pub fn connection_count(&self) -> usize {
        self.nodes.iter().map(|n| n.connections.len()).sum()
    }

    /// Nearest node by brute-force scan over squared distances. First node
    /// wins exact ties. This is the reference the k-d tree is checked
    /// against; the navigator itself always goes through the tree.
    pub fn nearest_node_linear(&self, point: Vec3) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        for node in &self.nodes {
            let d = node.position.distance_squared(point);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((node.index, d));
            }
        }
        best.map(|(id, _)| id)
    }
}
