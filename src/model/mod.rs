//! Data model for the road network
//!
//! Contains the static network topology and the mutable risk overlay
//! the router reads from.

pub mod components;
pub mod network;

pub use components::{EdgeKey, NodeId, RoadEdge, RoadNode};
pub use network::{RiskOverlay, RoadGraph, RoadNetwork};
