//! Road network graph with a copy-on-write risk overlay
//!
//! Topology is immutable after construction. Per-edge risk lives in a
//! separate [`RiskOverlay`] published behind an `RwLock<Arc<..>>`:
//! readers clone the `Arc` once and see one consistent overlay for the
//! whole query, writers build a fresh overlay and swap the pointer.

use std::sync::{Arc, RwLock};

use geo::{Distance, Haversine, Point};
use hashbrown::HashMap;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

use super::components::{EdgeKey, NodeId, RoadEdge, RoadNode};

pub type RoadNetwork = DiGraph<RoadNode, RoadEdge>;

type IndexedMidpoint = GeomWithData<[f64; 2], EdgeIndex>;

/// Meters per degree of latitude; used only to size R-tree envelopes,
/// candidates are verified with haversine distance afterwards.
const METERS_PER_DEG_LAT: f64 = 110_574.0;
const METERS_PER_DEG_LON_EQUATOR: f64 = 111_320.0;

/// One published version of per-edge risk, indexed by `EdgeIndex`.
///
/// Values are always within [0.0, 1.0]; clamping happens at publish.
#[derive(Debug, Clone)]
pub struct RiskOverlay {
    version: u64,
    risk: Vec<f64>,
}

impl RiskOverlay {
    fn zeroed(edge_count: usize) -> Self {
        Self {
            version: 0,
            risk: vec![0.0; edge_count],
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Risk of an edge under this overlay. Unknown indices read as safe.
    pub fn edge_risk(&self, edge: EdgeIndex) -> f64 {
        self.risk.get(edge.index()).copied().unwrap_or(0.0)
    }

    /// All per-edge risks, indexed by edge arena position.
    pub fn risks(&self) -> &[f64] {
        &self.risk
    }
}

/// Static road network plus the current risk overlay.
pub struct RoadGraph {
    pub(crate) graph: RoadNetwork,
    node_ids: HashMap<NodeId, NodeIndex>,
    midpoint_index: RTree<IndexedMidpoint>,
    risk: RwLock<Arc<RiskOverlay>>,
}

impl RoadGraph {
    /// Builds the graph wrapper from an already-populated topology.
    /// The midpoint R-tree is derived here once.
    pub(crate) fn from_parts(graph: RoadNetwork, node_ids: HashMap<NodeId, NodeIndex>) -> Self {
        let midpoints: Vec<IndexedMidpoint> = graph
            .edge_indices()
            .map(|idx| {
                let midpoint = graph[idx].midpoint;
                GeomWithData::new([midpoint.x(), midpoint.y()], idx)
            })
            .collect();

        let edge_count = graph.edge_count();
        Self {
            graph,
            node_ids,
            midpoint_index: RTree::bulk_load(midpoints),
            risk: RwLock::new(Arc::new(RiskOverlay::zeroed(edge_count))),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_ids.get(&id).copied()
    }

    pub fn node_id(&self, index: NodeIndex) -> NodeId {
        self.graph[index].id
    }

    pub fn node_point(&self, index: NodeIndex) -> Point<f64> {
        self.graph[index].geometry
    }

    /// External identity of an edge: source id, target id, parallel key.
    pub fn edge_key(&self, edge: EdgeIndex) -> EdgeKey {
        let (from, to) = self
            .graph
            .edge_endpoints(edge)
            .expect("edge index out of bounds");
        EdgeKey {
            from: self.graph[from].id,
            to: self.graph[to].id,
            key: self.graph[edge].key,
        }
    }

    /// Edges whose midpoint lies within `radius_m` meters of `center`,
    /// with their haversine distance. R-tree envelope prefilter in
    /// degrees, exact verification in meters.
    pub fn edges_within(&self, center: Point<f64>, radius_m: f64) -> Vec<(EdgeIndex, f64)> {
        if radius_m <= 0.0 {
            return Vec::new();
        }
        let dlat = radius_m / METERS_PER_DEG_LAT;
        let cos_lat = center.y().to_radians().cos().abs().max(1e-6);
        let dlon = radius_m / (METERS_PER_DEG_LON_EQUATOR * cos_lat);
        let envelope = AABB::from_corners(
            [center.x() - dlon, center.y() - dlat],
            [center.x() + dlon, center.y() + dlat],
        );

        let mut hits: Vec<(EdgeIndex, f64)> = self
            .midpoint_index
            .locate_in_envelope(&envelope)
            .filter_map(|entry| {
                let geom = entry.geom();
                let distance = Haversine.distance(center, Point::new(geom[0], geom[1]));
                (distance <= radius_m).then_some((entry.data, distance))
            })
            .collect();
        // Deterministic order for downstream merging
        hits.sort_unstable_by_key(|(idx, _)| idx.index());
        hits
    }

    /// Current risk overlay. The returned `Arc` stays consistent for as
    /// long as the caller holds it, independent of later updates.
    pub fn risk_snapshot(&self) -> Arc<RiskOverlay> {
        Arc::clone(&self.risk.read().expect("risk lock poisoned"))
    }

    /// Publishes a new overlay, replacing the previous one atomically.
    /// Out-of-range values are clamped to [0, 1]. Returns the version.
    pub(crate) fn publish_risk(&self, mut risk: Vec<f64>) -> u64 {
        risk.resize(self.graph.edge_count(), 0.0);
        for value in &mut risk {
            *value = if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }

        let mut slot = self.risk.write().expect("risk lock poisoned");
        let version = slot.version() + 1;
        *slot = Arc::new(RiskOverlay { version, risk });
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{EdgeRecord, NodeRecord};

    fn line_graph() -> RoadGraph {
        // Three nodes spaced ~111 m apart along the equator
        let nodes = vec![
            NodeRecord::new(1, 0.0, 0.0),
            NodeRecord::new(2, 0.0, 0.001),
            NodeRecord::new(3, 0.0, 0.002),
        ];
        let edges = vec![EdgeRecord::new(1, 2, 111.0), EdgeRecord::new(2, 3, 111.0)];
        RoadGraph::from_records(nodes, edges).unwrap()
    }

    #[test]
    fn edges_within_respects_radius() {
        let graph = line_graph();
        // Centered on the first edge midpoint
        let center = Point::new(0.0005, 0.0);
        let near = graph.edges_within(center, 80.0);
        assert_eq!(near.len(), 1);
        let far = graph.edges_within(center, 500.0);
        assert_eq!(far.len(), 2);
        assert!(graph.edges_within(center, 0.0).is_empty());
    }

    #[test]
    fn publish_clamps_and_bumps_version() {
        let graph = line_graph();
        assert_eq!(graph.risk_snapshot().version(), 0);

        let version = graph.publish_risk(vec![1.7, -0.3]);
        assert_eq!(version, 1);
        let snapshot = graph.risk_snapshot();
        assert_eq!(snapshot.edge_risk(EdgeIndex::new(0)), 1.0);
        assert_eq!(snapshot.edge_risk(EdgeIndex::new(1)), 0.0);
    }

    #[test]
    fn snapshot_is_isolated_from_later_publishes() {
        let graph = line_graph();
        graph.publish_risk(vec![0.5, 0.5]);
        let before = graph.risk_snapshot();
        graph.publish_risk(vec![0.9, 0.9]);

        assert_eq!(before.edge_risk(EdgeIndex::new(0)), 0.5);
        assert_eq!(graph.risk_snapshot().edge_risk(EdgeIndex::new(0)), 0.9);
    }
}
