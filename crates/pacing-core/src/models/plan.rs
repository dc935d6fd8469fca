// ABOUTME: Pacing plan document model with distance-bound power segments
// ABOUTME: Plan, Segment, RouteInfo, PlanSummary, RiderSettings and PlanSettings definitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accept a number or a numeric string; anything else reads as absent
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// One distance-bound portion of a pacing plan
///
/// Distances are plan-space kilometres. Either bound may be absent on the
/// very first or very last segment; all numeric fields are optional because
/// plans are authored by external tools.
///
/// # Examples
///
/// ```rust
/// use pacing_core::models::Segment;
///
/// let segment = Segment {
///     start_km: Some(0.0),
///     end_km: Some(5.0),
///     power_w: Some(250.0),
///     duration_s: Some(480.0),
///     ..Segment::default()
/// };
/// assert_eq!(segment.duration_text, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start distance in plan space (km)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_km: Option<f64>,
    /// End distance in plan space (km)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_km: Option<f64>,
    /// Target power (watts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_w: Option<f64>,
    /// Planned duration in seconds
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_s: Option<f64>,
    /// Planned duration in seconds, alternate key
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_seconds: Option<f64>,
    /// Planned duration in seconds, short alternate key
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_sec: Option<f64>,
    /// Free-text duration (`H:MM:SS`, `MM:SS`, `1h2m3s`, bare number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_text: Option<String>,
    /// Average gradient over the segment (percent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_gradient: Option<f64>,
    /// Precomputed W' balance at the end of the segment (kJ)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wbal_kj: Option<f64>,
}

impl Segment {
    /// First positive explicit seconds value, checked in key order
    ///
    /// `duration_s` wins over `duration_seconds`, which wins over `duration_sec`.
    #[must_use]
    pub fn explicit_duration_seconds(&self) -> Option<f64> {
        [self.duration_s, self.duration_seconds, self.duration_sec]
            .into_iter()
            .flatten()
            .find(|seconds| seconds.is_finite() && *seconds > 0.0)
    }
}

/// Route metadata attached to a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Route display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Authored route distance (km)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Summary values computed by the plan author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Total distance (km), corrected to the last segment end at load time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Total planned duration (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    /// Total planned duration as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_text: Option<String>,
    /// Planned average power (watts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_power_w: Option<f64>,
    /// Planned intensity factor, either a fraction or a percentage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_percent: Option<f64>,
}

/// Rider settings embedded in the plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiderSettings {
    /// Functional threshold power (watts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftp: Option<f64>,
    /// Body weight (kg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Model settings embedded in the plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSettings {
    /// Anaerobic work capacity (joules)
    #[serde(
        default,
        rename = "wPrime",
        alias = "w_prime",
        skip_serializing_if = "Option::is_none"
    )]
    pub w_prime: Option<f64>,
}

/// Pacing plan document
///
/// Immutable once loaded apart from [`Plan::correct_summary_distance`]. Unknown
/// JSON fields (route geometry, chart samples) are dropped on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Ordered, contiguous segments
    #[serde(default)]
    pub intervals: Vec<Segment>,
    /// Route metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteInfo>,
    /// Author summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<PlanSummary>,
    /// Rider settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider: Option<RiderSettings>,
    /// Model settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<PlanSettings>,
}

impl Plan {
    /// Number of segments
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// True when the plan has no segments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Segment at `index`
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.intervals.get(index)
    }

    /// Route name if present
    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        self.route.as_ref().and_then(|route| route.name.as_deref())
    }

    /// End distance of the last segment when finite and positive
    #[must_use]
    pub fn last_end_km(&self) -> Option<f64> {
        self.intervals
            .last()
            .and_then(|segment| segment.end_km)
            .filter(|end| end.is_finite() && *end > 0.0)
    }

    /// Start distance of the last segment when finite
    #[must_use]
    pub fn last_start_km(&self) -> Option<f64> {
        self.intervals
            .last()
            .and_then(|segment| segment.start_km)
            .filter(|start| start.is_finite())
    }

    /// Authored total distance: the summary value, else the last segment end
    #[must_use]
    pub fn total_distance_km(&self) -> Option<f64> {
        self.summary
            .as_ref()
            .and_then(|summary| summary.distance_km)
            .filter(|distance| distance.is_finite() && *distance > 0.0)
            .or_else(|| self.last_end_km())
    }

    /// Distance used for the plan fingerprint (summary, else route metadata)
    #[must_use]
    pub fn fingerprint_distance_km(&self) -> Option<f64> {
        self.summary
            .as_ref()
            .and_then(|summary| summary.distance_km)
            .or_else(|| self.route.as_ref().and_then(|route| route.distance_km))
    }

    /// Plan FTP (watts) when finite
    #[must_use]
    pub fn ftp(&self) -> Option<f64> {
        self.rider
            .as_ref()
            .and_then(|rider| rider.ftp)
            .filter(|value| value.is_finite())
    }

    /// Plan W' (joules) when finite
    #[must_use]
    pub fn w_prime(&self) -> Option<f64> {
        self.settings
            .as_ref()
            .and_then(|settings| settings.w_prime)
            .filter(|value| value.is_finite())
    }

    /// Plan rider weight (kg) when finite
    #[must_use]
    pub fn weight(&self) -> Option<f64> {
        self.rider
            .as_ref()
            .and_then(|rider| rider.weight)
            .filter(|value| value.is_finite())
    }

    /// Force `summary.distance_km` to the last segment's end distance
    ///
    /// The segment list is authoritative over any separately stored summary.
    /// Returns the previous summary value when it was changed.
    pub fn correct_summary_distance(&mut self) -> Option<Option<f64>> {
        let last_end = self.last_end_km()?;
        let summary = self.summary.get_or_insert_with(PlanSummary::default);
        let previous = summary.distance_km;
        summary.distance_km = Some(last_end);
        (previous != Some(last_end)).then_some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_distance_corrected_from_last_segment() {
        let mut plan: Plan = serde_json::from_str(
            r#"{"intervals":[{"start_km":0,"end_km":5},{"start_km":5,"end_km":10.2}],
                "summary":{"distance_km":10.0}}"#,
        )
        .unwrap();
        assert_eq!(plan.correct_summary_distance(), Some(Some(10.0)));
        assert_eq!(plan.total_distance_km(), Some(10.2));
        assert_eq!(plan.correct_summary_distance(), None);
    }

    #[test]
    fn test_duration_aliases_and_unknown_fields() {
        let plan: Plan = serde_json::from_str(
            r#"{"intervals":[{"start_km":0,"end_km":1,"duration_seconds":90,"points":[1,2]}],
                "route":{"name":"Loop","polyline":"abc"},"settings":{"wPrime":18000}}"#,
        )
        .unwrap();
        assert_eq!(plan.intervals[0].duration_seconds, Some(90.0));
        assert_eq!(plan.intervals[0].explicit_duration_seconds(), Some(90.0));
        assert_eq!(plan.route_name(), Some("Loop"));
        assert_eq!(plan.w_prime(), Some(18_000.0));
    }

    #[test]
    fn test_several_duration_keys_take_first_positive() {
        let segment: Segment =
            serde_json::from_str(r#"{"duration_s":0,"duration_seconds":480,"duration_sec":30}"#)
                .unwrap();
        assert_eq!(segment.duration_s, Some(0.0));
        assert_eq!(segment.explicit_duration_seconds(), Some(480.0));
    }

    #[test]
    fn test_numeric_string_durations_are_accepted() {
        let segment: Segment = serde_json::from_str(r#"{"duration_s":" 480 "}"#).unwrap();
        assert_eq!(segment.explicit_duration_seconds(), Some(480.0));

        let unreadable: Segment =
            serde_json::from_str(r#"{"duration_s":"soon","duration_sec":null}"#).unwrap();
        assert_eq!(unreadable.explicit_duration_seconds(), None);
    }
}
