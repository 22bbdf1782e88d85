//! Hazard risk scoring and fusion
//!
//! `score` holds the pure conversion and decay functions, `fusion`
//! maintains the time-bounded observation cache feeding the updater.

pub mod fusion;
pub mod observation;
pub mod score;

pub use fusion::HazardFusion;
pub use observation::{FusedRisk, HazardMeasure, HazardObservation};
pub use score::{combine, decay, depth_to_risk};
