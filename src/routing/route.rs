//! Route result types and post-hoc metrics

use petgraph::graph::EdgeIndex;
use serde::Serialize;

use crate::model::{EdgeKey, NodeId, RiskOverlay, RoadGraph};

/// A segment whose risk exceeds the caution threshold; carried on the
/// route so callers can render hazard notices without re-walking the
/// graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskWarning {
    pub edge: EdgeKey,
    pub risk: f64,
}

/// Summary of a computed route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteMetrics {
    /// Total length in meters
    pub distance_m: f64,
    /// Cumulative risk exposure: sum of edge length x edge risk,
    /// in meters-equivalent. Mode-independent, so routes computed
    /// under different modes compare directly.
    pub risk_weighted_cost: f64,
    /// Highest single-edge risk encountered
    pub max_edge_risk: f64,
    pub warnings: Vec<RiskWarning>,
}

/// An evacuation route. Immutable once constructed; owned entirely by
/// the caller that requested it.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    /// Visited intersections from start to end
    pub nodes: Vec<NodeId>,
    /// Traversed segments, parallel-edge aware
    pub edges: Vec<EdgeKey>,
    pub metrics: RouteMetrics,
}

/// Computes metrics for a traversed edge sequence against one overlay
/// snapshot.
pub(crate) fn compute_metrics(
    graph: &RoadGraph,
    overlay: &RiskOverlay,
    edges: &[EdgeIndex],
    caution_threshold: f64,
) -> RouteMetrics {
    let mut distance_m = 0.0;
    let mut risk_weighted_cost = 0.0;
    let mut max_edge_risk: f64 = 0.0;
    let mut warnings = Vec::new();

    for &edge in edges {
        let length = graph.graph[edge].length_m;
        let risk = overlay.edge_risk(edge);
        distance_m += length;
        risk_weighted_cost += length * risk;
        max_edge_risk = max_edge_risk.max(risk);
        if risk > caution_threshold {
            warnings.push(RiskWarning {
                edge: graph.edge_key(edge),
                risk,
            });
        }
    }

    RouteMetrics {
        distance_m,
        risk_weighted_cost,
        max_edge_risk,
        warnings,
    }
}
