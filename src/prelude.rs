// Re-export key components
pub use crate::config::{
    DecayConfig, DecayCurve, EngineConfig, FusionConfig, RiskParams, RouterConfig, SourceProfile,
};
pub use crate::engine::RoutingEngine;
pub use crate::error::Error;
pub use crate::export::{EdgeRiskRecord, risk_geojson, risk_records};
pub use crate::loading::{EdgeRecord, NodeRecord, RoadGraphConfig, load_road_graph};
pub use crate::model::{EdgeKey, NodeId, RiskOverlay, RoadGraph};
pub use crate::risk::{FusedRisk, HazardFusion, HazardMeasure, HazardObservation};
pub use crate::routing::{
    CancelToken, RiskWarning, Route, RouteMetrics, RouteMode, find_alternatives, find_route,
    find_route_with_cancel, find_routes_bulk,
};
pub use crate::update::apply_fused_risks;
