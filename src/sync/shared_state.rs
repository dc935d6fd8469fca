// ABOUTME: Shared-state patches exchanged between instances and their idempotent application
// ABOUTME: Strips heavy geometry fields from shared plans and only re-applies a plan when its signature differs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Shared State
//!
//! Any field present in a [`SharedStatePatch`] is applied; absent fields are
//! left alone. `null` is meaningful for the plan, the home athlete and the
//! finish prediction, where it clears the value, so those fields use a
//! nested `Option`.

use chrono::{DateTime, Utc};
use pacing_core::models::{normalize_id, Plan, SharedPrediction};
use pacing_engine::signature::compute_plan_signature;
use pacing_engine::PacingEngine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::messages::normalize_prediction;

/// Plan keys carrying route geometry or chart samples, never shared
pub const HEAVY_PLAN_KEYS: &[&str] = &[
    "points",
    "points_full",
    "pointsFull",
    "points3d",
    "samples",
    "sampled_points",
    "track",
    "polyline",
    "route_polyline",
    "routePoints",
    "route_points",
    "segment_points",
    "segmentPoints",
    "gpx",
    "gpx_xml",
    "chart",
    "chartData",
    "chart_data",
    "chartSamples",
    "chart_samples",
    "profile",
    "elevation_profile",
    "elevationProfile",
];

/// Deep copy of `value` without any [`HEAVY_PLAN_KEYS`] at any depth
#[must_use]
pub fn strip_heavy_fields(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(strip_heavy_fields).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !HEAVY_PLAN_KEYS.contains(&key.as_str()))
                .map(|(key, child)| (key.clone(), strip_heavy_fields(child)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

/// Distinguish an explicit `null` from an absent field
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of the state shared between instances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedStatePatch {
    /// Plan snapshot, `null` clears the plan
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub plan: Option<Option<Value>>,
    /// Power bias multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_bias: Option<f64>,
    /// Manual distance offset (metres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_offset: Option<f64>,
    /// Home athlete, `null` clears it
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub home_athlete_id: Option<Option<String>>,
    /// Time tracking was last cleared (unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_stats_timestamp: Option<i64>,
    /// Finish prediction, `null` clears it
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub finish_prediction: Option<Option<SharedPrediction>>,
}

/// What applying a patch changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Plan loaded or cleared
    pub plan_changed: bool,
    /// Manual offset changed
    pub offset_changed: bool,
    /// Power bias changed
    pub bias_changed: bool,
    /// Home athlete changed
    pub home_changed: bool,
    /// Tracking was reset
    pub stats_cleared: bool,
    /// Prediction replaced or cleared
    pub prediction_changed: bool,
}

impl PatchOutcome {
    /// Whether anything that is persisted changed
    #[must_use]
    pub const fn needs_persist(&self) -> bool {
        self.plan_changed || self.offset_changed || self.bias_changed || self.home_changed
    }
}

impl SharedStatePatch {
    /// Patch carrying a plan snapshot with heavy fields stripped
    ///
    /// # Errors
    ///
    /// Returns an error if the plan cannot be encoded as JSON
    pub fn with_plan(plan: Option<&Plan>) -> Result<Self, serde_json::Error> {
        let plan = plan
            .map(serde_json::to_value)
            .transpose()?
            .map(|value| strip_heavy_fields(&value));
        Ok(Self {
            plan: Some(plan),
            ..Self::default()
        })
    }

    /// Whether the patch carries nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply every present field to `engine`
    ///
    /// Re-applying the same patch is a no-op: the plan is only loaded when its
    /// signature differs and a clear-stats timestamp only resets tracking when
    /// it is newer than the last reset.
    pub fn apply_to(&self, engine: &mut PacingEngine, now: DateTime<Utc>) -> PatchOutcome {
        let mut outcome = PatchOutcome {
            plan_changed: self.apply_plan(engine, now),
            ..PatchOutcome::default()
        };

        if let Some(offset) = self.distance_offset.filter(|v| v.is_finite()) {
            outcome.offset_changed = engine.set_manual_offset(offset, false);
        }
        if let Some(bias) = self.power_bias {
            outcome.bias_changed = engine.set_power_bias(bias);
        }
        if let Some(home) = &self.home_athlete_id {
            let normalized = home.as_deref().and_then(normalize_id);
            outcome.home_changed = engine.set_home_athlete(normalized.as_deref());
        }
        if let Some(timestamp) = self.clear_stats_timestamp {
            if engine.stats_cleared_at().is_none_or(|cleared| timestamp > cleared) {
                debug!(timestamp, "Shared clear-stats request");
                engine.reset_tracking(now);
                outcome.stats_cleared = true;
            }
        }
        if let Some(prediction) = &self.finish_prediction {
            let incoming = prediction
                .as_ref()
                .and_then(|raw| normalize_prediction(raw, now.timestamp_millis()));
            outcome.prediction_changed = engine.apply_remote_prediction(incoming);
        }
        outcome
    }

    fn apply_plan(&self, engine: &mut PacingEngine, now: DateTime<Utc>) -> bool {
        let Some(plan) = &self.plan else {
            return false;
        };
        let Some(value) = plan else {
            if engine.plan().is_none() {
                return false;
            }
            engine.clear_plan(false, now);
            return true;
        };

        let mut plan: Plan = match serde_json::from_value(strip_heavy_fields(value)) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed shared plan");
                return false;
            }
        };
        // loaded plans are fingerprinted after the summary correction
        plan.correct_summary_distance();
        let incoming = compute_plan_signature(Some(&plan));
        if engine.plan().is_some() && incoming.as_deref() == engine.plan_signature() {
            return false;
        }
        info!(signature = ?incoming, "Applying shared plan");
        engine.set_plan(plan, false, now);
        true
    }
}
