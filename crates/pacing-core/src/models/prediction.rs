// ABOUTME: Finish-time prediction model and its cross-instance broadcast payload
// ABOUTME: FinishPrediction is derived state; SharedPrediction is the wire form other views consume
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

/// Projected finish time
///
/// Always derivable from the plan and the current segment runs; never a
/// source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishPrediction {
    /// Predicted total time (seconds)
    pub predicted_seconds: f64,
    /// `predicted_seconds` formatted as a countdown
    pub predicted_text: String,
    /// Predicted total minus planned total (negative is faster)
    pub delta_seconds: f64,
    /// Predicted remaining minus planned remaining
    pub remaining_delta_seconds: f64,
    /// Elapsed seconds used as the baseline
    pub elapsed_seconds: f64,
    /// Predicted remaining time (seconds)
    pub remaining_seconds: f64,
    /// Planned remaining time (seconds)
    pub remaining_plan_seconds: f64,
    /// Actual over planned time on fully tracked segments
    pub pacing_ratio: f64,
    /// Production time (unix ms)
    pub updated_at: i64,
    /// Instance that produced the prediction
    pub publisher_id: String,
}

impl FinishPrediction {
    /// Rounded fingerprint used to suppress duplicate broadcasts
    ///
    /// `"none"` stands for a cleared prediction.
    #[must_use]
    pub fn signature_of(prediction: Option<&Self>) -> String {
        prediction.map_or_else(
            || "none".to_owned(),
            |p| {
                format!(
                    "{}|{}|{}",
                    tenths(p.predicted_seconds),
                    tenths(p.remaining_seconds),
                    tenths(p.delta_seconds)
                )
            },
        )
    }

    /// Payload published to other instances
    #[must_use]
    pub fn to_shared(&self, updated_at: i64) -> SharedPrediction {
        SharedPrediction {
            predicted_seconds: Some(self.predicted_seconds),
            predicted_text: Some(self.predicted_text.clone()),
            delta_seconds: Some(self.delta_seconds),
            remaining_seconds: Some(self.remaining_seconds),
            elapsed_seconds: Some(self.elapsed_seconds),
            updated_at: Some(updated_at),
            publisher_id: Some(self.publisher_id.clone()),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn tenths(value: f64) -> i64 {
    // halves round towards +infinity
    (value * 10.0 + 0.5).floor() as i64
}

/// Finish prediction as carried between instances
///
/// Fields are optional on the wire; receivers normalise before display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPrediction {
    /// Predicted total time (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_seconds: Option<f64>,
    /// Formatted predicted time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_text: Option<String>,
    /// Delta against the plan total (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_seconds: Option<f64>,
    /// Predicted remaining (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<f64>,
    /// Baseline elapsed (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    /// Publication time (unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    /// Publishing instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FinishPrediction {
        FinishPrediction {
            predicted_seconds: 1140.04,
            predicted_text: "19:00".into(),
            delta_seconds: -60.0,
            remaining_delta_seconds: -60.0,
            elapsed_seconds: 600.0,
            remaining_seconds: 540.0,
            remaining_plan_seconds: 600.0,
            pacing_ratio: 0.9,
            updated_at: 0,
            publisher_id: "a".into(),
        }
    }

    #[test]
    fn test_signature_rounds_to_tenths() {
        let prediction = sample();
        assert_eq!(
            FinishPrediction::signature_of(Some(&prediction)),
            "11400|5400|-600"
        );
        assert_eq!(FinishPrediction::signature_of(None), "none");
    }

    #[test]
    fn test_shared_payload_uses_camel_case() {
        let json = serde_json::to_value(sample().to_shared(42)).unwrap();
        assert_eq!(json["predictedSeconds"], 1140.04);
        assert_eq!(json["updatedAt"], 42);
        assert_eq!(json["publisherId"], "a");
    }
}
