//! Bridges fused hazard risk onto road graph edges
//!
//! A pass is a full recomputation: the overlay is rebuilt from scratch
//! out of the currently live fused locations, so stale risk decays to
//! zero the moment no observation justifies it, and repeated passes
//! cannot drift the way incremental deltas would.

use log::debug;
use rayon::prelude::*;

use crate::config::DecayConfig;
use crate::model::RoadGraph;
use crate::risk::{FusedRisk, combine, decay};

/// Recomputes per-edge risk from `fused` locations and publishes the
/// result as a new overlay version. Returns the published version.
///
/// Each location contributes to edges whose midpoint lies within the
/// decay radius; overlapping contributions combine by maximum. Edges
/// with no nearby hazard are reset to 0.0.
pub fn apply_fused_risks(graph: &RoadGraph, fused: &[FusedRisk], config: &DecayConfig) -> u64 {
    let contributions: Vec<Vec<(usize, f64)>> = fused
        .par_iter()
        .map(|location| {
            graph
                .edges_within(location.location, config.radius_m)
                .into_iter()
                .filter_map(|(edge, distance)| {
                    let risk = decay(location.risk, distance, config);
                    (risk > 0.0).then_some((edge.index(), risk))
                })
                .collect()
        })
        .collect();

    let mut risk = vec![0.0; graph.edge_count()];
    let mut touched = 0_usize;
    for (edge, contribution) in contributions.into_iter().flatten() {
        if risk[edge] == 0.0 {
            touched += 1;
        }
        risk[edge] = combine([risk[edge], contribution]);
    }

    let version = graph.publish_risk(risk);
    debug!(
        "Risk overlay v{version}: {} fused locations touched {touched} of {} edges",
        fused.len(),
        graph.edge_count()
    );
    version
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use geo::Point;
    use petgraph::graph::EdgeIndex;

    use super::*;
    use crate::config::DecayCurve;
    use crate::loading::{EdgeRecord, NodeRecord};
    use crate::risk::FusedRisk;

    fn graph() -> RoadGraph {
        // Two edges ~111 m long on the equator, midpoints ~111 m apart
        let nodes = vec![
            NodeRecord::new(1, 0.0, 0.0),
            NodeRecord::new(2, 0.0, 0.001),
            NodeRecord::new(3, 0.0, 0.002),
        ];
        let edges = vec![EdgeRecord::new(1, 2, 111.0), EdgeRecord::new(2, 3, 111.0)];
        RoadGraph::from_records(nodes, edges).unwrap()
    }

    fn fused(lon: f64, risk: f64) -> FusedRisk {
        FusedRisk {
            location: Point::new(lon, 0.0),
            risk,
            fused_at: Utc::now(),
        }
    }

    #[test]
    fn nearby_edges_receive_decayed_risk() {
        let graph = graph();
        let config = DecayConfig {
            radius_m: 150.0,
            curve: DecayCurve::Linear,
            residual_floor: 0.05,
        };

        // Hazard sits on the midpoint of the first edge
        apply_fused_risks(&graph, &[fused(0.0005, 0.8)], &config);
        let snapshot = graph.risk_snapshot();
        let first = snapshot.edge_risk(EdgeIndex::new(0));
        let second = snapshot.edge_risk(EdgeIndex::new(1));
        assert!((first - 0.8).abs() < 1e-6, "source edge keeps base risk");
        assert!(second > 0.0 && second < first, "neighbor gets decayed risk");
    }

    #[test]
    fn overlapping_hazards_combine_by_maximum() {
        let graph = graph();
        let config = DecayConfig {
            radius_m: 150.0,
            curve: DecayCurve::Linear,
            residual_floor: 0.05,
        };

        apply_fused_risks(
            &graph,
            &[fused(0.0005, 0.3), fused(0.0005, 0.7)],
            &config,
        );
        let snapshot = graph.risk_snapshot();
        assert!((snapshot.edge_risk(EdgeIndex::new(0)) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn stale_risk_resets_when_hazard_disappears() {
        let graph = graph();
        let config = DecayConfig::default();

        apply_fused_risks(&graph, &[fused(0.0005, 0.9)], &config);
        assert!(graph.risk_snapshot().edge_risk(EdgeIndex::new(0)) > 0.0);

        // Next pass has no live hazards: everything must read safe again
        let version = apply_fused_risks(&graph, &[], &config);
        assert_eq!(version, 2);
        let snapshot = graph.risk_snapshot();
        assert_eq!(snapshot.edge_risk(EdgeIndex::new(0)), 0.0);
        assert_eq!(snapshot.edge_risk(EdgeIndex::new(1)), 0.0);
    }
}
