//! Road network components - intersections and road segments

use geo::Point;
use serde::Serialize;

/// External identifier of an intersection, stable across graph rebuilds.
pub type NodeId = i64;

/// Road graph node (intersection)
#[derive(Debug, Clone)]
pub struct RoadNode {
    /// External ID of the intersection
    pub id: NodeId,
    /// Node coordinates (lon/lat)
    pub geometry: Point<f64>,
}

/// Road graph edge (directed road segment)
#[derive(Debug, Clone)]
pub struct RoadEdge {
    /// Segment length in meters, always positive
    pub length_m: f64,
    /// Discriminator between parallel edges of the same node pair
    pub key: u32,
    /// Segment midpoint, target of hazard radius queries
    pub midpoint: Point<f64>,
}

/// Stable external identity of a directed edge.
///
/// A graph may hold several edges between the same node pair;
/// `key` makes each of them independently addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
    pub key: u32,
}
