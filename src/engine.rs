//! Pipeline facade: ingest -> fuse -> update -> route
//!
//! Wires the observation cache, the graph updater, and the router into
//! one linear pipeline with a single owner per stage. The engine is
//! `Sync`; route queries take `&self` and run concurrently with
//! ingestion and risk refreshes.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use geo::Point;
use log::info;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::export::{self, EdgeRiskRecord};
use crate::model::{NodeId, RiskOverlay, RoadGraph};
use crate::risk::{FusedRisk, HazardFusion, HazardObservation};
use crate::routing::{self, CancelToken, Route, RouteMode};
use crate::update::apply_fused_risks;

/// Risk-aware evacuation routing engine.
pub struct RoutingEngine {
    config: EngineConfig,
    fusion: HazardFusion,
    graph: OnceLock<RoadGraph>,
}

impl RoutingEngine {
    pub fn new(config: EngineConfig) -> Self {
        let fusion = HazardFusion::new(config.fusion.clone(), config.risk.clone());
        Self {
            config,
            fusion,
            graph: OnceLock::new(),
        }
    }

    /// Installs the road network. The graph is loaded exactly once;
    /// a second call reports the deployment error instead of swapping
    /// topology under live queries.
    pub fn load_graph(&self, graph: RoadGraph) -> Result<(), Error> {
        let (nodes, edges) = (graph.node_count(), graph.edge_count());
        self.graph
            .set(graph)
            .map_err(|_| Error::InvalidData("road graph is already loaded".into()))?;
        info!("Engine graph loaded: {nodes} nodes, {edges} edges");
        Ok(())
    }

    /// The loaded road graph.
    ///
    /// # Errors
    ///
    /// [`Error::GraphNotLoaded`] before [`Self::load_graph`] ran - a
    /// startup-ordering bug in the embedding service.
    pub fn graph(&self) -> Result<&RoadGraph, Error> {
        self.graph.get().ok_or(Error::GraphNotLoaded)
    }

    /// Feeds one hazard observation into the fusion cache. Malformed
    /// records are logged and absorbed here; ingestion never fails the
    /// pipeline.
    pub fn ingest(&self, observation: HazardObservation) {
        self.fusion.ingest(observation);
    }

    /// Direct access to the fusion stage, mainly for diagnostics.
    pub fn fusion(&self) -> &HazardFusion {
        &self.fusion
    }

    /// Fused risk for a single location at `now`.
    pub fn fuse(&self, location: Point<f64>, now: DateTime<Utc>) -> FusedRisk {
        self.fusion.fuse(location, now)
    }

    /// Fuses all live observations and rewrites edge risk, publishing
    /// a new overlay version. Runs on a fixed cadence or on new-data
    /// arrival; queries in flight keep their own snapshot.
    pub fn refresh_risk(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let graph = self.graph()?;
        let fused = self.fusion.fuse_all(now);
        Ok(apply_fused_risks(graph, &fused, &self.config.decay))
    }

    /// Drops fully expired locations from the observation cache.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        self.fusion.evict_expired(now)
    }

    /// See [`routing::find_route`].
    pub fn find_route(
        &self,
        start: NodeId,
        end: NodeId,
        mode: RouteMode,
    ) -> Result<Option<Route>, Error> {
        routing::find_route(self.graph()?, &self.config.routing, start, end, mode)
    }

    /// See [`routing::find_route_with_cancel`].
    pub fn find_route_with_cancel(
        &self,
        start: NodeId,
        end: NodeId,
        mode: RouteMode,
        cancel: &CancelToken,
    ) -> Result<Option<Route>, Error> {
        routing::find_route_with_cancel(
            self.graph()?,
            &self.config.routing,
            start,
            end,
            mode,
            cancel,
        )
    }

    /// See [`routing::find_alternatives`].
    pub fn find_alternatives(
        &self,
        start: NodeId,
        end: NodeId,
        mode: RouteMode,
        k: usize,
    ) -> Result<Vec<Route>, Error> {
        routing::find_alternatives(self.graph()?, &self.config.routing, start, end, mode, k)
    }

    /// Current overlay snapshot, stable for as long as the caller
    /// holds it.
    pub fn risk_snapshot(&self) -> Result<Arc<RiskOverlay>, Error> {
        Ok(self.graph()?.risk_snapshot())
    }

    /// Per-edge risk dump for telemetry consumers.
    pub fn risk_records(&self) -> Result<Vec<EdgeRiskRecord>, Error> {
        Ok(export::risk_records(self.graph()?))
    }

    /// GeoJSON rendering of the current overlay for map consumers.
    pub fn risk_geojson(&self) -> Result<geojson::FeatureCollection, Error> {
        Ok(export::risk_geojson(self.graph()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn querying_before_load_is_a_typed_error() {
        let engine = RoutingEngine::new(EngineConfig::default());
        let result = engine.find_route(1, 2, RouteMode::Balanced);
        assert!(matches!(result, Err(Error::GraphNotLoaded)));
        assert!(matches!(engine.risk_records(), Err(Error::GraphNotLoaded)));
    }

    #[test]
    fn graph_cannot_be_loaded_twice() {
        use crate::loading::{EdgeRecord, NodeRecord};

        let engine = RoutingEngine::new(EngineConfig::default());
        let build = || {
            RoadGraph::from_records(
                vec![NodeRecord::new(1, 0.0, 0.0), NodeRecord::new(2, 0.0, 0.001)],
                vec![EdgeRecord::new(1, 2, 111.0)],
            )
            .unwrap()
        };
        engine.load_graph(build()).unwrap();
        assert!(engine.load_graph(build()).is_err());
    }
}
