//! Hazard observation records
//!
//! The wire shape pushed into the fusion cache by external feeds
//! (official gauges, scrapers, crowd-report pipelines).

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

/// Raw measurement carried by an observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardMeasure {
    /// Water depth in meters, converted through the logistic curve
    Depth(f64),
    /// Severity already normalized to [0, 1] by the producer
    Severity(f64),
}

impl HazardMeasure {
    pub fn value(self) -> f64 {
        match self {
            Self::Depth(v) | Self::Severity(v) => v,
        }
    }
}

/// A single piece of evidence about conditions at a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardObservation {
    pub lat: f64,
    pub lon: f64,
    pub measure: HazardMeasure,
    /// Feed identifier, resolved to trust weight and TTL via config
    pub source: String,
    /// Producer-reported confidence in [0, 1]
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

impl HazardObservation {
    pub fn location(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Boundary validation for untrusted input. Returns the reason a
    /// record must be rejected, if any.
    pub(crate) fn validation_error(&self) -> Option<&'static str> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Some("latitude out of range");
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Some("longitude out of range");
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Some("confidence outside [0, 1]");
        }
        if !self.measure.value().is_finite() {
            return Some("non-finite measurement");
        }
        if let HazardMeasure::Severity(s) = self.measure {
            if !(0.0..=1.0).contains(&s) {
                return Some("severity outside [0, 1]");
            }
        }
        if self.source.is_empty() {
            return Some("empty source id");
        }
        None
    }
}

/// Fused per-location output of the observation cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedRisk {
    pub location: Point<f64>,
    /// Trust-weighted risk in [0, 1]
    pub risk: f64,
    pub fused_at: DateTime<Utc>,
}
