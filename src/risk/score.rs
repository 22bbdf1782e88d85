//! Pure risk scoring functions
//!
//! Stateless conversions between hazard magnitudes and the normalized
//! [0, 1] risk scale the rest of the engine operates on.

use crate::config::{DecayConfig, DecayCurve, RiskParams};

/// Converts a water depth in meters into a risk score via a saturating
/// logistic curve calibrated so `sigmoid_x0` meters yields risk 0.5.
///
/// Zero or negative depths still report `floor_risk` rather than exact
/// safety, reflecting residual uncertainty in any flood reading.
pub fn depth_to_risk(depth_m: f64, params: &RiskParams) -> f64 {
    let raw = 1.0 / (1.0 + (-params.sigmoid_k * (depth_m - params.sigmoid_x0)).exp());
    raw.clamp(params.floor_risk, 1.0)
}

/// Decays `base_risk` with distance from the hazard source.
///
/// Within the radius the result never drops below `residual_floor`
/// (a nearby edge never reads exactly safe); beyond the radius the
/// hazard contributes nothing at all.
pub fn decay(base_risk: f64, distance_m: f64, config: &DecayConfig) -> f64 {
    if base_risk <= 0.0 || distance_m > config.radius_m || config.radius_m <= 0.0 {
        return 0.0;
    }
    let ratio = (distance_m / config.radius_m).max(0.0);
    let shape = match config.curve {
        DecayCurve::Linear => 1.0 - ratio,
        DecayCurve::Exponential => (-ratio).exp(),
        DecayCurve::Gaussian => {
            let sigma = config.radius_m / 2.0;
            (-(distance_m * distance_m) / (2.0 * sigma * sigma)).exp()
        }
    };
    (base_risk * shape).max(config.residual_floor).min(1.0)
}

/// Combines independent risk contributions on one edge.
///
/// The combination is the maximum, not a mean: one dangerous condition
/// makes a segment dangerous no matter how many benign readings exist
/// alongside it. Empty input reads as safe.
pub fn combine<I>(risks: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    risks
        .into_iter()
        .filter(|r| r.is_finite())
        .fold(0.0, f64::max)
        .clamp(0.0, 1.0)
}
