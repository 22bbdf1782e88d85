//! Risk-aware A* search
//!
//! Best-first search over the road graph with haversine great-circle
//! distance to the goal as the heuristic. Edge cost is
//! `length + penalty * risk`, never below the plain length, so the
//! heuristic stays admissible for every mode.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geo::{Distance, Haversine};
use hashbrown::HashMap;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::CancelToken;
use crate::Error;
use crate::model::{RiskOverlay, RoadGraph};

#[derive(Copy, Clone)]
struct State {
    estimate: f64,
    cost: f64,
    node: NodeIndex,
}

// Min-heap by estimated total cost, ties broken on node index so runs
// over identical inputs expand nodes in the same order.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.node.index().cmp(&self.node.index()))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

pub(super) struct SearchPath {
    pub nodes: Vec<NodeIndex>,
    pub edges: Vec<EdgeIndex>,
}

/// One A* query against a fixed overlay snapshot.
///
/// `extra_penalties` carries the per-edge surcharges the alternatives
/// search uses to push later iterations off already-used segments.
pub(super) fn astar_search(
    graph: &RoadGraph,
    overlay: &RiskOverlay,
    start: NodeIndex,
    goal: NodeIndex,
    risk_penalty_m: f64,
    impassable_threshold: f64,
    extra_penalties: &HashMap<EdgeIndex, f64>,
    cancel: &CancelToken,
) -> Result<Option<SearchPath>, Error> {
    let goal_point = graph.node_point(goal);
    let heuristic = |node: NodeIndex| Haversine.distance(graph.node_point(node), goal_point);

    let estimated_nodes = graph.node_count().min(1000);
    let mut best_cost: HashMap<NodeIndex, f64> = HashMap::with_capacity(estimated_nodes);
    let mut came_from: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> =
        HashMap::with_capacity(estimated_nodes);
    let mut heap = BinaryHeap::with_capacity(estimated_nodes / 4);

    best_cost.insert(start, 0.0);
    heap.push(State {
        estimate: heuristic(start),
        cost: 0.0,
        node: start,
    });

    while let Some(State { cost, node, .. }) = heap.pop() {
        // Polled per expansion: an abandoned query stops within a few
        // iterations and leaves no shared state behind
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if node == goal {
            return Ok(Some(reconstruct(start, goal, &came_from)));
        }

        // Skip if a better path to this node was already expanded
        if best_cost.get(&node).is_some_and(|&best| cost > best) {
            continue;
        }

        for edge in graph.graph.edges(node) {
            let risk = overlay.edge_risk(edge.id());
            if risk >= impassable_threshold {
                continue;
            }

            let surcharge = extra_penalties.get(&edge.id()).copied().unwrap_or(0.0);
            let edge_cost = edge.weight().length_m + risk_penalty_m * risk + surcharge;
            let next = edge.target();
            let next_cost = cost + edge_cost;

            match best_cost.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    came_from.insert(next, (node, edge.id()));
                    heap.push(State {
                        estimate: next_cost + heuristic(next),
                        cost: next_cost,
                        node: next,
                    });
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        came_from.insert(next, (node, edge.id()));
                        heap.push(State {
                            estimate: next_cost + heuristic(next),
                            cost: next_cost,
                            node: next,
                        });
                    }
                }
            }
        }
    }

    Ok(None)
}

fn reconstruct(
    start: NodeIndex,
    goal: NodeIndex,
    came_from: &HashMap<NodeIndex, (NodeIndex, EdgeIndex)>,
) -> SearchPath {
    let mut nodes = vec![goal];
    let mut edges = Vec::new();
    let mut current = goal;
    while current != start {
        let (previous, edge) = came_from[&current];
        nodes.push(previous);
        edges.push(edge);
        current = previous;
    }
    nodes.reverse();
    edges.reverse();
    SearchPath { nodes, edges }
}
