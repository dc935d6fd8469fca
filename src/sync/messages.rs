// ABOUTME: Wire messages exchanged between pacer instances and the topic naming scheme
// ABOUTME: Finish predictions, interval averages and shared-state patches tagged by message type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::constants::topics;
use pacing_core::models::{normalize_id, FinishPrediction, SharedPrediction};
use pacing_engine::display::format_countdown;
use serde::{Deserialize, Serialize};

use super::shared_state::SharedStatePatch;

/// Message carried on a sync topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    /// Finish prediction, `payload: null` clears it
    #[serde(rename_all = "camelCase")]
    FinishPrediction {
        /// Publishing instance
        instance_id: String,
        /// Home athlete of the publisher
        athlete_id: Option<String>,
        /// Rounded fingerprint of the payload
        signature: String,
        /// Prediction, absent when cleared
        payload: Option<SharedPrediction>,
    },
    /// Live average power of the active segment
    #[serde(rename_all = "camelCase")]
    IntervalAvg {
        /// Publishing instance
        instance_id: String,
        /// Home athlete of the publisher
        athlete_id: Option<String>,
        /// Average power (watts)
        avg_power: Option<f64>,
        /// Publication time (unix ms)
        updated_at: i64,
    },
    /// Partial update of shared session state
    #[serde(rename_all = "camelCase")]
    SharedState {
        /// Publishing instance
        instance_id: String,
        /// Fields that changed
        patch: SharedStatePatch,
    },
}

impl SyncMessage {
    /// Instance that sent the message
    #[must_use]
    pub fn instance_id(&self) -> &str {
        match self {
            Self::FinishPrediction { instance_id, .. }
            | Self::IntervalAvg { instance_id, .. }
            | Self::SharedState { instance_id, .. } => instance_id,
        }
    }

    /// Athlete scope, normalised; shared-state patches carry none
    #[must_use]
    pub fn athlete_id(&self) -> Option<String> {
        match self {
            Self::FinishPrediction { athlete_id, .. } | Self::IntervalAvg { athlete_id, .. } => {
                athlete_id.as_deref().and_then(normalize_id)
            }
            Self::SharedState { .. } => None,
        }
    }
}

fn scoped(prefix: &str, athlete_id: Option<&str>) -> String {
    let scope = athlete_id
        .and_then(normalize_id)
        .unwrap_or_else(|| topics::GLOBAL_SCOPE.to_owned());
    format!("{prefix}:{scope}")
}

/// `tt:predictions:<athlete|global>`
#[must_use]
pub fn prediction_topic(athlete_id: Option<&str>) -> String {
    scoped(topics::PREDICTIONS, athlete_id)
}

/// `tt:interval-avg:<athlete|global>`
#[must_use]
pub fn interval_avg_topic(athlete_id: Option<&str>) -> String {
    scoped(topics::INTERVAL_AVG, athlete_id)
}

/// Turn a received payload into a prediction fit for display
///
/// Payloads without a finite predicted and remaining time are dropped. A
/// blank text is replaced by the formatted countdown. Values the wire does
/// not carry stay at their defaults, with a neutral pacing ratio.
#[must_use]
pub fn normalize_prediction(raw: &SharedPrediction, received_at: i64) -> Option<FinishPrediction> {
    let predicted_seconds = raw.predicted_seconds.filter(|v| v.is_finite())?;
    let remaining_seconds = raw.remaining_seconds.filter(|v| v.is_finite())?;
    let predicted_text = raw
        .predicted_text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map_or_else(|| format_countdown(Some(predicted_seconds)), str::to_owned);
    let delta_seconds = raw.delta_seconds.filter(|v| v.is_finite()).unwrap_or(0.0);

    Some(FinishPrediction {
        predicted_seconds,
        predicted_text,
        delta_seconds,
        remaining_delta_seconds: delta_seconds,
        elapsed_seconds: raw.elapsed_seconds.filter(|v| v.is_finite()).unwrap_or(0.0),
        remaining_seconds,
        remaining_plan_seconds: remaining_seconds - delta_seconds,
        pacing_ratio: 1.0,
        updated_at: raw.updated_at.unwrap_or(received_at),
        publisher_id: raw
            .publisher_id
            .as_deref()
            .and_then(normalize_id)
            .unwrap_or_default(),
    })
}
