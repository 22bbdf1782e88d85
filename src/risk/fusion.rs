//! Observation cache and trust-weighted fusion
//!
//! Keeps the freshest observation per (source, location) and exposes a
//! fused risk per location. Expiry is checked lazily on every `fuse`,
//! so correctness never depends on the periodic [`HazardFusion::evict_expired`]
//! sweep; the sweep only bounds memory under a moving window of reports.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use geo::Point;
use hashbrown::HashMap;
use log::{debug, warn};

use super::observation::{FusedRisk, HazardMeasure, HazardObservation};
use super::score::depth_to_risk;
use crate::config::{FusionConfig, RiskParams};

/// Observations closer than this are treated as the same location.
/// 1e-4 degrees is roughly 11 m, the practical resolution of the feeds.
const KEY_SCALE: f64 = 1e4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LocationKey(i64, i64);

impl LocationKey {
    fn of(lat: f64, lon: f64) -> Self {
        Self(
            (lat * KEY_SCALE).round() as i64,
            (lon * KEY_SCALE).round() as i64,
        )
    }
}

#[derive(Debug, Default)]
struct LocationEntry {
    /// Latest observation per source id; newer records supersede
    by_source: HashMap<String, HazardObservation>,
}

impl LocationEntry {
    fn live<'a>(
        &'a self,
        config: &'a FusionConfig,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a HazardObservation> {
        self.by_source
            .values()
            .filter(move |obs| now - obs.observed_at < config.ttl(&obs.source))
    }
}

/// Shared observation cache. `ingest` and `fuse` take `&self` and are
/// safe to call concurrently from multiple producers and readers.
pub struct HazardFusion {
    config: FusionConfig,
    risk_params: RiskParams,
    cache: RwLock<HashMap<LocationKey, LocationEntry>>,
}

impl HazardFusion {
    pub fn new(config: FusionConfig, risk_params: RiskParams) -> Self {
        Self {
            config,
            risk_params,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Stores an observation, superseding the previous record from the
    /// same source at the same location. Malformed records are logged
    /// and dropped; a bad crowd report must never fail the pipeline.
    pub fn ingest(&self, observation: HazardObservation) {
        if let Some(reason) = observation.validation_error() {
            warn!(
                "Rejected hazard observation from '{}': {reason}",
                observation.source
            );
            return;
        }

        let key = LocationKey::of(observation.lat, observation.lon);
        let mut cache = self.cache.write().expect("fusion cache lock poisoned");
        let entry = cache.entry(key).or_default();
        match entry.by_source.get(&observation.source) {
            Some(existing) if existing.observed_at > observation.observed_at => {
                debug!(
                    "Ignoring stale observation from '{}' (already have a newer one)",
                    observation.source
                );
            }
            _ => {
                entry
                    .by_source
                    .insert(observation.source.clone(), observation);
            }
        }
    }

    /// Fused risk for one location at time `now`.
    ///
    /// Each live observation contributes `confidence x trust x risk`;
    /// the result is the confidence-weighted average, so one vague
    /// crowd report cannot dilute a confident official reading. With no
    /// live observations the location reads 0.0.
    pub fn fuse(&self, location: Point<f64>, now: DateTime<Utc>) -> FusedRisk {
        let key = LocationKey::of(location.y(), location.x());
        let cache = self.cache.read().expect("fusion cache lock poisoned");
        let risk = cache
            .get(&key)
            .map_or(0.0, |entry| self.fuse_entry(entry, now));
        FusedRisk {
            location,
            risk,
            fused_at: now,
        }
    }

    /// Fused risk for every location with at least one live observation.
    /// This is the updater's input for a full recomputation pass.
    pub fn fuse_all(&self, now: DateTime<Utc>) -> Vec<FusedRisk> {
        let cache = self.cache.read().expect("fusion cache lock poisoned");
        let mut fused: Vec<(LocationKey, FusedRisk)> = cache
            .iter()
            .filter_map(|(key, entry)| {
                let first = entry.live(&self.config, now).next()?;
                let location = first.location();
                Some((
                    *key,
                    FusedRisk {
                        location,
                        risk: self.fuse_entry(entry, now),
                        fused_at: now,
                    },
                ))
            })
            .collect();
        // Stable output order regardless of hash iteration
        fused.sort_unstable_by_key(|(key, _)| (key.0, key.1));
        fused.into_iter().map(|(_, risk)| risk).collect()
    }

    /// Drops locations whose observations have all expired. Memory
    /// housekeeping only; `fuse` ignores expired records either way.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut cache = self.cache.write().expect("fusion cache lock poisoned");
        let before = cache.len();
        cache.retain(|_, entry| entry.live(&self.config, now).next().is_some());
        let evicted = before - cache.len();
        if evicted > 0 {
            debug!("Evicted {evicted} expired hazard locations from cache");
        }
        evicted
    }

    /// Number of cached locations (live or not, until eviction runs).
    pub fn len(&self) -> usize {
        self.cache.read().expect("fusion cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fuse_entry(&self, entry: &LocationEntry, now: DateTime<Utc>) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for obs in entry.live(&self.config, now) {
            let risk = match obs.measure {
                HazardMeasure::Depth(depth) => depth_to_risk(depth, &self.risk_params),
                HazardMeasure::Severity(severity) => severity.clamp(0.0, 1.0),
            };
            let weight = obs.confidence * self.config.trust_weight(&obs.source);
            weighted_sum += weight * risk;
            weight_total += weight;
        }
        if weight_total > 0.0 {
            (weighted_sum / weight_total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
