//! Road network loading
//!
//! One-time bulk load of nodes and edges into a [`RoadGraph`], either
//! from CSV extracts or from in-memory records. Topology is validated
//! here once and immutable afterwards.

use std::fs::File;
use std::path::{Path, PathBuf};

use geo::{Distance, Haversine, Point};
use hashbrown::HashMap;
use itertools::Itertools;
use log::info;
use petgraph::graph::NodeIndex;
use serde::Deserialize;

use crate::Error;
use crate::model::{NodeId, RoadEdge, RoadGraph, RoadNetwork, RoadNode};

/// Paths to the network extract.
#[derive(Debug, Clone, Deserialize)]
pub struct RoadGraphConfig {
    /// CSV with `node_id,lat,lon` rows
    pub nodes_path: PathBuf,
    /// CSV with `from,to,length_m[,key]` rows
    pub edges_path: PathBuf,
}

/// One intersection row of the network extract.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

impl NodeRecord {
    pub fn new(node_id: NodeId, lat: f64, lon: f64) -> Self {
        Self { node_id, lat, lon }
    }
}

/// One directed road segment row of the network extract.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EdgeRecord {
    pub from: NodeId,
    pub to: NodeId,
    /// Missing lengths are recomputed as great-circle distance
    #[serde(default)]
    pub length_m: Option<f64>,
    /// Explicit parallel-edge key; assigned sequentially when absent
    #[serde(default)]
    pub key: Option<u32>,
}

impl EdgeRecord {
    pub fn new(from: NodeId, to: NodeId, length_m: f64) -> Self {
        Self {
            from,
            to,
            length_m: Some(length_m),
            key: None,
        }
    }
}

/// Loads the road network from CSV files.
///
/// # Errors
///
/// Returns an error when a file is missing, a row fails to parse, or
/// the records violate the topology invariants (unknown endpoints,
/// non-positive lengths, duplicate node ids).
pub fn load_road_graph(config: &RoadGraphConfig) -> Result<RoadGraph, Error> {
    info!(
        "Loading road network: nodes from {}, edges from {}",
        config.nodes_path.display(),
        config.edges_path.display()
    );
    let nodes: Vec<NodeRecord> = read_csv(&config.nodes_path)?;
    let edges: Vec<EdgeRecord> = read_csv(&config.edges_path)?;
    RoadGraph::from_records(nodes, edges)
}

fn read_csv<T>(path: &Path) -> Result<Vec<T>, Error>
where
    T: for<'de> Deserialize<'de>,
{
    let file = File::open(path).map_err(|e| {
        Error::InvalidData(format!("cannot open {}: {e}", path.display()))
    })?;
    csv::Reader::from_reader(file)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(Error::from)
}

impl RoadGraph {
    /// Builds a graph from in-memory records; the CSV loader and tests
    /// share this construction path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] on duplicate node ids, edges with
    /// unknown endpoints, or non-positive segment lengths.
    pub fn from_records(
        nodes: Vec<NodeRecord>,
        edges: Vec<EdgeRecord>,
    ) -> Result<Self, Error> {
        if let Some(duplicate) = nodes.iter().map(|n| n.node_id).duplicates().next() {
            return Err(Error::InvalidData(format!(
                "duplicate node id {duplicate} in network extract"
            )));
        }

        let mut graph = RoadNetwork::with_capacity(nodes.len(), edges.len());
        let mut node_ids: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(nodes.len());

        for record in &nodes {
            if !record.lat.is_finite() || !record.lon.is_finite() {
                return Err(Error::InvalidData(format!(
                    "node {} has non-finite coordinates",
                    record.node_id
                )));
            }
            let index = graph.add_node(RoadNode {
                id: record.node_id,
                geometry: Point::new(record.lon, record.lat),
            });
            node_ids.insert(record.node_id, index);
        }

        let mut parallel_keys: HashMap<(NodeId, NodeId), u32> = HashMap::new();
        for record in &edges {
            let from = *node_ids
                .get(&record.from)
                .ok_or_else(|| unknown_endpoint(record.from))?;
            let to = *node_ids
                .get(&record.to)
                .ok_or_else(|| unknown_endpoint(record.to))?;

            let from_point = graph[from].geometry;
            let to_point = graph[to].geometry;
            let length_m = match record.length_m {
                Some(length) => length,
                None => Haversine.distance(from_point, to_point),
            };
            if !length_m.is_finite() || length_m <= 0.0 {
                return Err(Error::InvalidData(format!(
                    "edge {} -> {} has non-positive length {length_m}",
                    record.from, record.to
                )));
            }

            let key = match record.key {
                Some(key) => key,
                None => {
                    let counter = parallel_keys.entry((record.from, record.to)).or_insert(0);
                    let key = *counter;
                    *counter += 1;
                    key
                }
            };

            let midpoint = Point::new(
                (from_point.x() + to_point.x()) / 2.0,
                (from_point.y() + to_point.y()) / 2.0,
            );
            graph.add_edge(
                from,
                to,
                RoadEdge {
                    length_m,
                    key,
                    midpoint,
                },
            );
        }

        info!(
            "Road graph built: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self::from_parts(graph, node_ids))
    }
}

fn unknown_endpoint(id: NodeId) -> Error {
    Error::InvalidData(format!("edge references unknown node {id}"))
}
