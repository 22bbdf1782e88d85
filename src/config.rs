//! Engine configuration
//!
//! All tunables are grouped into one immutable [`EngineConfig`] passed at
//! construction time, so several independently configured engines can
//! coexist (e.g. in tests). Every struct deserializes from TOML/JSON with
//! missing fields falling back to the documented defaults.

use chrono::TimeDelta;
use hashbrown::HashMap;
use serde::Deserialize;

/// Parameters of the depth-to-risk logistic curve.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Steepness of the logistic curve
    pub sigmoid_k: f64,
    /// Water depth in meters that maps to risk 0.5
    pub sigmoid_x0: f64,
    /// Residual risk reported even for zero depth
    pub floor_risk: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            sigmoid_k: 3.0,
            sigmoid_x0: 0.5,
            floor_risk: 0.02,
        }
    }
}

/// Shape of the spatial decay applied to a hazard's risk
/// as distance from its source location grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayCurve {
    Linear,
    Exponential,
    #[default]
    Gaussian,
}

/// Spatial decay settings used when fused risk is written onto edges.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Influence radius of a hazard location in meters
    pub radius_m: f64,
    pub curve: DecayCurve,
    /// Edges inside the radius never read below this value
    pub residual_floor: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            radius_m: 500.0,
            curve: DecayCurve::Gaussian,
            residual_floor: 0.05,
        }
    }
}

/// Routing cost-function settings.
///
/// Penalties are expressed in meters-equivalent: an edge with risk `r`
/// costs `length + penalty * r`, so penalty and length share a unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub safest_penalty_m: f64,
    pub balanced_penalty_m: f64,
    pub fastest_penalty_m: f64,
    /// Edges at or above this risk are excluded in every mode
    pub impassable_threshold: f64,
    /// Edges above this risk produce a warning in route metrics
    pub caution_threshold: f64,
    /// Multiplier on edge length used to penalize already-used edges
    /// when searching for alternative routes
    pub alternative_penalty_factor: f64,
    /// Maximum tolerated share of edges an alternative may have in
    /// common with any previously accepted route
    pub alternative_overlap_limit: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            safest_penalty_m: 50_000.0,
            balanced_penalty_m: 2_000.0,
            fastest_penalty_m: 0.0,
            impassable_threshold: 0.9,
            caution_threshold: 0.6,
            alternative_penalty_factor: 0.4,
            alternative_overlap_limit: 0.8,
        }
    }
}

/// Trust settings for one observation source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceProfile {
    /// Relative trust in [0, 1]-ish range; official feeds are
    /// conventionally configured close to 1.0, crowd reports lower
    pub trust_weight: f64,
    /// Seconds after which this source's observations expire
    pub ttl_secs: i64,
}

/// Observation cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// TTL applied to sources without an explicit profile
    pub default_ttl_secs: i64,
    /// Trust weight applied to sources without an explicit profile
    pub default_trust_weight: f64,
    /// Per-source overrides, keyed by the source id of the feed
    pub sources: HashMap<String, SourceProfile>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 1800,
            default_trust_weight: 0.5,
            sources: HashMap::new(),
        }
    }
}

impl FusionConfig {
    pub fn trust_weight(&self, source: &str) -> f64 {
        self.sources
            .get(source)
            .map_or(self.default_trust_weight, |p| p.trust_weight)
    }

    pub fn ttl(&self, source: &str) -> TimeDelta {
        let secs = self
            .sources
            .get(source)
            .map_or(self.default_ttl_secs, |p| p.ttl_secs);
        TimeDelta::seconds(secs)
    }
}

/// Complete configuration of the routing engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub risk: RiskParams,
    pub decay: DecayConfig,
    pub routing: RouterConfig,
    pub fusion: FusionConfig,
}
