// Breadth-first search over the waypoint graph.
//
// The path metric is hop count, not distance or weight: the creature's sense
// of urgency comes from node weights, and the route it takes to get there is
// just the fewest waypoints. BFS over each node's own adjacency list (treated
// as directed) gives that directly.
//
// Predecessors live in a `Vec<Option<NodeId>>` indexed by node, the same
// came-from layout an A* over a dense node array would use. The search stops
// as soon as the destination is discovered. Among equally short routes the
// one found first through adjacency order wins; callers must not depend on
// which.
//
// `rings` is the bounded variant used by sound diffusion: it groups the nodes
// reachable within a few hops by their exact hop distance, each node listed
// once at its nearest ring.
//
// See also: `graph.rs` for the adjacency being searched, `navigator.rs` which
// plans routes, `menace.rs` which uses `hop_distance`.

use crate::graph::NavGraph;
use crate::types::NodeId;
use std::collections::VecDeque;

/// Minimum-hop route from `source` to `destination`, excluding the source and
/// including the destination.
///
/// Empty when the endpoints are equal, when either is outside the graph, or
/// when the destination is unreachable. None of these is an error.
pub fn shortest_path(graph: &NavGraph, source: NodeId, destination: NodeId) -> Vec<NodeId> {
    if source == destination || !graph.contains(source) || !graph.contains(destination) {
        return Vec::new();
    }

    let mut came_from: Vec<Option<NodeId>> = vec![None; graph.node_count()];
    let mut visited = vec![false; graph.node_count()];
    let mut frontier = VecDeque::new();
    visited[source.index()] = true;
    frontier.push_back(source);

    while let Some(current) = frontier.pop_front() {
        for &next in graph.neighbors(current) {
            if visited[next.index()] {
                continue;
            }
            visited[next.index()] = true;
            came_from[next.index()] = Some(current);
            if next == destination {
                return reconstruct_path(&came_from, source, destination);
            }
            frontier.push_back(next);
        }
    }
    Vec::new()
}

/// Number of hops on the shortest route, 0 when there is none.
pub fn hop_distance(graph: &NavGraph, source: NodeId, destination: NodeId) -> usize {
    shortest_path(graph, source, destination).len()
}

/// Nodes grouped by hop distance from `source`, for distances `1..=max_hops`.
/// `rings[0]` holds the direct neighbors. A node appears once, in the ring of
/// its shortest distance, and never when it is the source itself.
pub fn rings(graph: &NavGraph, source: NodeId, max_hops: usize) -> Vec<Vec<NodeId>> {
    let mut rings = Vec::with_capacity(max_hops);
    if !graph.contains(source) {
        return rings;
    }

    let mut visited = vec![false; graph.node_count()];
    visited[source.index()] = true;
    let mut layer = vec![source];
    for _ in 0..max_hops {
        let mut next_layer = Vec::new();
        for &node in &layer {
            for &next in graph.neighbors(node) {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    next_layer.push(next);
                }
            }
        }
        if next_layer.is_empty() {
            break;
        }
        rings.push(next_layer.clone());
        layer = next_layer;
    }
    rings
}

fn reconstruct_path(
    came_from: &[Option<NodeId>],
    source: NodeId,
    destination: NodeId,
) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut current = destination;
    while current != source {
        path.push(current);
        match came_from[current.index()] {
            Some(prev) => current = prev,
            None => break,
        }
    }
    path.reverse();
    path
}
