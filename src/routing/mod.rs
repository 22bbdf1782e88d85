//! Risk-aware route queries
//!
//! Stateless per query: every call resolves one overlay snapshot and
//! searches against it, so concurrent queries and a concurrent risk
//! update never interfere.

mod alternatives;
mod astar;
mod route;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Deserialize;

pub use alternatives::{find_alternatives, find_alternatives_with_cancel};
pub use route::{RiskWarning, Route, RouteMetrics};

use crate::Error;
use crate::config::RouterConfig;
use crate::model::{NodeId, RiskOverlay, RoadGraph};

/// Named risk/distance trade-off preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// Near-infinite risk penalty: large detours around any hazard
    Safest,
    #[default]
    Balanced,
    /// Pure shortest path; impassable edges are still excluded
    Fastest,
}

impl RouteMode {
    pub(crate) fn penalty_m(self, config: &RouterConfig) -> f64 {
        match self {
            Self::Safest => config.safest_penalty_m,
            Self::Balanced => config.balanced_penalty_m,
            Self::Fastest => config.fastest_penalty_m,
        }
    }
}

/// Cooperative cancellation flag for an abandoned query. Cloning is
/// cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Finds the best route between two nodes under the given mode.
///
/// `Ok(None)` means no route exists: the nodes are disconnected or
/// every remaining path crosses an impassable edge. That is a normal
/// outcome, not a fault.
///
/// # Errors
///
/// Returns [`Error::UnknownNode`] when either id is absent from the
/// graph.
pub fn find_route(
    graph: &RoadGraph,
    config: &RouterConfig,
    start: NodeId,
    end: NodeId,
    mode: RouteMode,
) -> Result<Option<Route>, Error> {
    find_route_with_cancel(graph, config, start, end, mode, &CancelToken::new())
}

/// [`find_route`] with cooperative cancellation, polled every few
/// search expansions. A cancelled query leaves no state behind.
pub fn find_route_with_cancel(
    graph: &RoadGraph,
    config: &RouterConfig,
    start: NodeId,
    end: NodeId,
    mode: RouteMode,
    cancel: &CancelToken,
) -> Result<Option<Route>, Error> {
    let snapshot = graph.risk_snapshot();
    find_route_on_snapshot(graph, &snapshot, config, start, end, mode, cancel)
}

/// Bulk convenience for the serving layer: queries run in parallel,
/// all against the same overlay snapshot.
pub fn find_routes_bulk(
    graph: &RoadGraph,
    config: &RouterConfig,
    pairs: &[(NodeId, NodeId)],
    mode: RouteMode,
) -> Vec<Result<Option<Route>, Error>> {
    let snapshot = graph.risk_snapshot();
    let cancel = CancelToken::new();
    pairs
        .par_iter()
        .map(|&(start, end)| {
            find_route_on_snapshot(graph, &snapshot, config, start, end, mode, &cancel)
        })
        .collect()
}

pub(crate) fn find_route_on_snapshot(
    graph: &RoadGraph,
    snapshot: &RiskOverlay,
    config: &RouterConfig,
    start: NodeId,
    end: NodeId,
    mode: RouteMode,
    cancel: &CancelToken,
) -> Result<Option<Route>, Error> {
    let start_idx = graph.node_index(start).ok_or(Error::UnknownNode(start))?;
    let end_idx = graph.node_index(end).ok_or(Error::UnknownNode(end))?;

    let path = astar::astar_search(
        graph,
        snapshot,
        start_idx,
        end_idx,
        mode.penalty_m(config),
        config.impassable_threshold,
        &hashbrown::HashMap::new(),
        cancel,
    )?;

    Ok(path.map(|path| build_route(graph, snapshot, config, &path)))
}

fn build_route(
    graph: &RoadGraph,
    snapshot: &RiskOverlay,
    config: &RouterConfig,
    path: &astar::SearchPath,
) -> Route {
    let metrics = route::compute_metrics(graph, snapshot, &path.edges, config.caution_threshold);
    Route {
        nodes: path.nodes.iter().map(|&idx| graph.node_id(idx)).collect(),
        edges: path.edges.iter().map(|&idx| graph.edge_key(idx)).collect(),
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{EdgeRecord, NodeRecord};

    /// Line A(1)-B(2)-C(3)-D(4)-E(5) of ~111 m segments along the
    /// equator, plus a longer detour B-F(6)-D around segment B-C-D.
    fn network() -> RoadGraph {
        let nodes = vec![
            NodeRecord::new(1, 0.0, 0.000),
            NodeRecord::new(2, 0.0, 0.001),
            NodeRecord::new(3, 0.0, 0.002),
            NodeRecord::new(4, 0.0, 0.003),
            NodeRecord::new(5, 0.0, 0.004),
            NodeRecord::new(6, 0.0012, 0.002),
        ];
        let edges = vec![
            EdgeRecord::new(1, 2, 111.4), // e0
            EdgeRecord::new(2, 3, 111.4), // e1: the hazard target
            EdgeRecord::new(3, 4, 111.4), // e2
            EdgeRecord::new(4, 5, 111.4), // e3
            EdgeRecord::new(2, 6, 180.0), // e4
            EdgeRecord::new(6, 4, 180.0), // e5
        ];
        RoadGraph::from_records(nodes, edges).unwrap()
    }

    /// Publishes risk on edge index 1 (segment B-C), zero elsewhere.
    fn set_bc_risk(graph: &RoadGraph, risk: f64) {
        let mut overlay = vec![0.0; graph.edge_count()];
        overlay[1] = risk;
        graph.publish_risk(overlay);
    }

    fn config() -> RouterConfig {
        RouterConfig::default()
    }

    #[test]
    fn zero_risk_routes_match_plain_shortest_path() {
        let graph = network();
        for mode in [RouteMode::Fastest, RouteMode::Balanced, RouteMode::Safest] {
            let route = find_route(&graph, &config(), 1, 5, mode).unwrap().unwrap();
            assert_eq!(route.nodes, vec![1, 2, 3, 4, 5]);
            assert!((route.metrics.distance_m - 445.6).abs() < 1e-9);
            assert_eq!(route.metrics.risk_weighted_cost, 0.0);
            assert_eq!(route.metrics.max_edge_risk, 0.0);
            assert!(route.metrics.warnings.is_empty());
        }
    }

    #[test]
    fn identical_queries_return_identical_routes() {
        let graph = network();
        set_bc_risk(&graph, 0.4);
        let first = find_route(&graph, &config(), 1, 5, RouteMode::Balanced)
            .unwrap()
            .unwrap();
        let second = find_route(&graph, &config(), 1, 5, RouteMode::Balanced)
            .unwrap()
            .unwrap();
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.edges, second.edges);
    }

    #[test]
    fn impassable_edge_is_avoided_in_every_mode() {
        let graph = network();
        set_bc_risk(&graph, 0.95);
        for mode in [RouteMode::Fastest, RouteMode::Balanced, RouteMode::Safest] {
            let route = find_route(&graph, &config(), 1, 5, mode).unwrap().unwrap();
            assert_eq!(route.nodes, vec![1, 2, 6, 4, 5]);
            assert!(route.metrics.max_edge_risk < config().impassable_threshold);
        }
    }

    #[test]
    fn fully_blocked_pair_returns_none() {
        let graph = network();
        // Block both the direct segment and the detour
        let mut overlay = vec![0.0; graph.edge_count()];
        overlay[1] = 0.95;
        overlay[4] = 0.95;
        graph.publish_risk(overlay);

        for mode in [RouteMode::Fastest, RouteMode::Safest] {
            assert!(find_route(&graph, &config(), 1, 5, mode).unwrap().is_none());
        }
    }

    #[test]
    fn disconnected_nodes_return_none() {
        let graph = network();
        // All edges are one-way eastbound
        assert!(
            find_route(&graph, &config(), 5, 1, RouteMode::Fastest)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn unknown_node_is_a_query_error() {
        let graph = network();
        let result = find_route(&graph, &config(), 1, 99, RouteMode::Fastest);
        assert!(matches!(result, Err(Error::UnknownNode(99))));
    }

    #[test]
    fn safest_mode_trades_distance_for_risk() {
        let graph = network();
        set_bc_risk(&graph, 0.4);

        let fastest = find_route(&graph, &config(), 1, 5, RouteMode::Fastest)
            .unwrap()
            .unwrap();
        let safest = find_route(&graph, &config(), 1, 5, RouteMode::Safest)
            .unwrap()
            .unwrap();

        // Below the impassability threshold the fastest mode stays on
        // the short risky line; the safest mode detours around it
        assert_eq!(fastest.nodes, vec![1, 2, 3, 4, 5]);
        assert_eq!(safest.nodes, vec![1, 2, 6, 4, 5]);
        assert!(safest.metrics.distance_m >= fastest.metrics.distance_m);
        assert!(safest.metrics.risk_weighted_cost <= fastest.metrics.risk_weighted_cost);
    }

    #[test]
    fn caution_threshold_emits_warnings() {
        let graph = network();
        set_bc_risk(&graph, 0.7);

        let route = find_route(&graph, &config(), 1, 5, RouteMode::Fastest)
            .unwrap()
            .unwrap();
        assert_eq!(route.metrics.warnings.len(), 1);
        let warning = route.metrics.warnings[0];
        assert_eq!((warning.edge.from, warning.edge.to), (2, 3));
        assert!((warning.risk - 0.7).abs() < 1e-12);
        assert!((route.metrics.max_edge_risk - 0.7).abs() < 1e-12);
    }

    #[test]
    fn cancelled_query_stops_with_typed_error() {
        let graph = network();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = find_route_with_cancel(&graph, &config(), 1, 5, RouteMode::Fastest, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn alternatives_are_distinct_and_bounded() {
        let graph = network();
        let routes = find_alternatives(&graph, &config(), 1, 5, RouteMode::Fastest, 3).unwrap();

        // Only two genuinely different paths exist in this network
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].nodes, vec![1, 2, 3, 4, 5]);
        assert_eq!(routes[1].nodes, vec![1, 2, 6, 4, 5]);
        assert_ne!(routes[0].edges, routes[1].edges);
    }

    #[test]
    fn alternatives_respect_k_and_zero() {
        let graph = network();
        assert!(
            find_alternatives(&graph, &config(), 1, 5, RouteMode::Fastest, 0)
                .unwrap()
                .is_empty()
        );
        let one = find_alternatives(&graph, &config(), 1, 5, RouteMode::Fastest, 1).unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn bulk_queries_share_one_snapshot() {
        let graph = network();
        set_bc_risk(&graph, 0.95);
        let results = find_routes_bulk(&graph, &config(), &[(1, 5), (1, 99)], RouteMode::Fastest);

        assert_eq!(results.len(), 2);
        let route = results[0].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(route.nodes, vec![1, 2, 6, 4, 5]);
        assert!(matches!(results[1], Err(Error::UnknownNode(99))));
    }
}
