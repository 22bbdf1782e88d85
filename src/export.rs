//! Read-only risk snapshot export
//!
//! The telemetry/visualization contract: per-edge risk as flat records
//! or as a GeoJSON feature collection for map rendering. Both exports
//! read one overlay snapshot, never the live graph.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::model::{NodeId, RoadGraph};

/// Current risk of one edge, keyed by its external identity.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EdgeRiskRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub key: u32,
    pub risk: f64,
    /// Overlay version this record was read from
    pub version: u64,
}

/// Flat edge-id to risk dump of the current overlay.
pub fn risk_records(graph: &RoadGraph) -> Vec<EdgeRiskRecord> {
    let snapshot = graph.risk_snapshot();
    graph
        .graph
        .edge_references()
        .map(|edge| {
            let key = graph.edge_key(edge.id());
            EdgeRiskRecord {
                from: key.from,
                to: key.to,
                key: key.key,
                risk: snapshot.edge_risk(edge.id()),
                version: snapshot.version(),
            }
        })
        .collect()
}

/// GeoJSON rendering of the current overlay: one LineString feature
/// per edge with `risk` and `version` properties.
pub fn risk_geojson(graph: &RoadGraph) -> FeatureCollection {
    let snapshot = graph.risk_snapshot();
    let features = graph
        .graph
        .edge_references()
        .map(|edge| {
            let from = graph.node_point(edge.source());
            let to = graph.node_point(edge.target());
            let line = Value::LineString(vec![vec![from.x(), from.y()], vec![to.x(), to.y()]]);

            let mut properties = JsonObject::new();
            properties.insert("risk".into(), snapshot.edge_risk(edge.id()).into());
            properties.insert("version".into(), snapshot.version().into());
            let key = graph.edge_key(edge.id());
            properties.insert("from".into(), key.from.into());
            properties.insert("to".into(), key.to.into());
            properties.insert("key".into(), key.key.into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(line)),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{EdgeRecord, NodeRecord};

    fn graph() -> RoadGraph {
        let nodes = vec![NodeRecord::new(1, 0.0, 0.0), NodeRecord::new(2, 0.0, 0.001)];
        let edges = vec![EdgeRecord::new(1, 2, 111.0)];
        RoadGraph::from_records(nodes, edges).unwrap()
    }

    #[test]
    fn records_reflect_published_overlay() {
        let graph = graph();
        graph.publish_risk(vec![0.42]);

        let records = risk_records(&graph);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, 1);
        assert_eq!(records[0].to, 2);
        assert!((records[0].risk - 0.42).abs() < 1e-12);
        assert_eq!(records[0].version, 1);
    }

    #[test]
    fn geojson_export_serializes() {
        let graph = graph();
        graph.publish_risk(vec![0.9]);

        let collection = risk_geojson(&graph);
        assert_eq!(collection.features.len(), 1);
        let json = serde_json::to_string(&collection).unwrap();
        assert!(json.contains("\"risk\":0.9"));
        assert!(json.contains("LineString"));
    }
}
