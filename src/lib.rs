//! Risk-aware evacuation routing over flood-affected road networks
//!
//! `aquaroute` merges heterogeneous, partially-trusted hazard
//! observations into a per-edge risk score, spreads that score over
//! nearby road segments with configurable spatial decay, and answers
//! route queries that trade distance against safety.
//!
//! The pipeline is linear, with strongly-typed records at each stage:
//!
//! ```text
//! HazardObservation --> HazardFusion --> FusedRisk
//!       --> apply_fused_risks --> RiskOverlay --> find_route
//! ```
//!
//! Topology is immutable after load. Risk lives in a copy-on-write
//! overlay swapped atomically per update pass, so any number of
//! concurrent route queries each see one consistent version while
//! updates proceed. No function here performs I/O besides the initial
//! network load; routing is pure CPU and safe to pool per request.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod risk;
pub mod routing;
pub mod update;

pub use config::EngineConfig;
pub use engine::RoutingEngine;
pub use error::Error;
pub use model::{EdgeKey, NodeId, RoadGraph};
pub use risk::{HazardMeasure, HazardObservation};
pub use routing::{CancelToken, Route, RouteMode};
