// ABOUTME: Live telemetry snapshot model for the rider being tracked
// ABOUTME: Numeric fields are optional and identifiers are normalised to trimmed strings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Deserializer, Serialize};

/// Keep a value only when it is present and finite
#[must_use]
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// One inbound telemetry sample
///
/// Every field may be absent. Non-finite numbers are treated as absent by the
/// accessor methods; consumers should never read the raw fields for maths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Instantaneous power (watts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    /// Cadence (rpm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    /// Heart rate (bpm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartrate: Option<f64>,
    /// Speed (km/h)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Road grade as a fraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_fraction: Option<f64>,
    /// Raw accumulated distance (metres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    /// Race clock (seconds); zero or absent before the start line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race_clock_seconds: Option<f64>,
    /// Rider identity
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub athlete_id: Option<String>,
    /// Event subgroup identity; present while in an event pen or racing
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_subgroup_id: Option<String>,
    /// Course/world identity
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub course_id: Option<String>,
    /// Rider FTP reported by telemetry (watts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftp: Option<f64>,
    /// Rider W' reported by telemetry (joules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w_prime: Option<f64>,
    /// Rider weight reported by telemetry (kg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Unit of `remaining_distance` (`"distance"` when metres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_metric: Option<String>,
    /// Remaining event distance (metres when metric is distance)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_distance: Option<f64>,
    /// Total event distance as reported by the remaining-distance source (metres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_end_distance: Option<f64>,
    /// Total event distance (metres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_distance: Option<f64>,
}

impl TelemetrySnapshot {
    /// Finite instantaneous power
    #[must_use]
    pub fn power_w(&self) -> Option<f64> {
        finite(self.power)
    }

    /// Raw accumulated distance in metres, zero when unknown
    #[must_use]
    pub fn raw_distance_m(&self) -> f64 {
        finite(self.distance_meters).unwrap_or(0.0)
    }

    /// Finite race clock in seconds
    #[must_use]
    pub fn race_clock(&self) -> Option<f64> {
        finite(self.race_clock_seconds)
    }

    /// Race clock only once it has started counting
    #[must_use]
    pub fn positive_race_clock(&self) -> Option<f64> {
        self.race_clock().filter(|clock| *clock > 0.0)
    }

    /// Total event distance in metres (remaining-end source preferred)
    #[must_use]
    pub fn event_total_m(&self) -> Option<f64> {
        finite(self.remaining_end_distance).or_else(|| finite(self.event_distance))
    }

    /// Remaining event distance in metres, only when reported as a distance
    #[must_use]
    pub fn event_remaining_m(&self) -> Option<f64> {
        if self.remaining_metric.as_deref() != Some("distance") {
            return None;
        }
        finite(self.remaining_distance).map(|remaining| remaining.max(0.0))
    }

    /// Authoritative event progress in metres, `total - remaining` clamped to `[0, total]`
    #[must_use]
    pub fn event_progress_m(&self) -> Option<f64> {
        let total = self.event_total_m()?;
        let remaining = self.event_remaining_m()?;
        Some((total - remaining).clamp(0.0, total.max(0.0)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(f64),
}

/// Normalise an identifier: trimmed non-empty strings, finite numbers rendered as strings
#[must_use]
pub fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawId> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawId::Text(text)) => normalize_id(&text),
        Some(RawId::Number(number)) if number.is_finite() => Some(format_number_id(number)),
        _ => None,
    })
}

fn format_number_id(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 9.0e15 {
        #[allow(clippy::cast_possible_truncation)]
        let integer = number as i64;
        integer.to_string()
    } else {
        number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids_normalise() {
        let snapshot: TelemetrySnapshot = serde_json::from_str(
            r#"{"athleteId": 12345, "eventSubgroupId": "  abc ", "courseId": ""}"#,
        )
        .unwrap();
        assert_eq!(snapshot.athlete_id.as_deref(), Some("12345"));
        assert_eq!(snapshot.event_subgroup_id.as_deref(), Some("abc"));
        assert_eq!(snapshot.course_id, None);
    }

    #[test]
    fn test_event_progress_requires_distance_metric() {
        let mut snapshot = TelemetrySnapshot {
            remaining_end_distance: Some(20_000.0),
            remaining_distance: Some(5_000.0),
            ..TelemetrySnapshot::default()
        };
        assert_eq!(snapshot.event_progress_m(), None);
        snapshot.remaining_metric = Some("distance".into());
        assert_eq!(snapshot.event_progress_m(), Some(15_000.0));
        snapshot.remaining_distance = Some(-10.0);
        assert_eq!(snapshot.event_remaining_m(), Some(0.0));
        assert_eq!(snapshot.event_progress_m(), Some(20_000.0));
    }
}
