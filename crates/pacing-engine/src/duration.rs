// ABOUTME: Segment duration parsing from explicit seconds or free-text durations
// ABOUTME: Accepts H:MM:SS, MM:SS, unit-suffixed text like 1h2m3s, and bare numbers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::LazyLock;

use pacing_core::constants::time::{SECONDS_PER_HOUR, SECONDS_PER_MINUTE};
use pacing_core::models::Segment;
use regex::Regex;

/// Optional hour, minute and second components, each with a unit suffix
static UNITS_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:(\d+(?:\.\d+)?)\s*h)?\s*(?:(\d+(?:\.\d+)?)\s*m)?\s*(?:(\d+(?:\.\d+)?)\s*s)?").ok()
});

/// Planned duration of a segment in seconds
///
/// The first positive explicit seconds field wins; otherwise `duration_text`
/// is parsed. Returns `None` when nothing yields a positive number, which
/// excludes the segment from pacing-ratio and duration-delta maths.
#[must_use]
pub fn parse_duration_seconds(segment: &Segment) -> Option<f64> {
    if let Some(seconds) = segment.explicit_duration_seconds() {
        return Some(seconds);
    }
    segment.duration_text.as_deref().and_then(parse_duration_text)
}

/// Parse a free-text duration into seconds
#[must_use]
pub fn parse_duration_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(seconds) = parse_colon_form(trimmed) {
        return Some(seconds);
    }

    if let Some(total) = parse_unit_form(&trimmed.to_lowercase()) {
        return Some(total);
    }

    let numeric: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

fn parse_colon_form(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    if !(2..=3).contains(&parts.len()) || !parts.iter().all(|part| is_all_digits(part)) {
        return None;
    }
    let values: Vec<f64> = parts
        .iter()
        .map(|part| part.parse::<f64>().ok())
        .collect::<Option<_>>()?;
    let total = match values.as_slice() {
        [h, m, s] => h * SECONDS_PER_HOUR + m * SECONDS_PER_MINUTE + s,
        [m, s] => m * SECONDS_PER_MINUTE + s,
        _ => return None,
    };
    (total > 0.0).then_some(total)
}

fn parse_unit_form(text: &str) -> Option<f64> {
    let pattern = UNITS_PATTERN.as_ref()?;
    let captures = pattern.captures(text)?;
    let component = |index: usize| {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let total = component(1) * SECONDS_PER_HOUR + component(2) * SECONDS_PER_MINUTE + component(3);
    (total > 0.0).then_some(total)
}

fn is_all_digits(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_text(text: &str) -> Segment {
        Segment {
            duration_text: Some(text.to_owned()),
            ..Segment::default()
        }
    }

    #[test]
    fn test_explicit_seconds_take_precedence() {
        let segment = Segment {
            duration_s: Some(75.0),
            duration_text: Some("10:00".into()),
            ..Segment::default()
        };
        assert_eq!(parse_duration_seconds(&segment), Some(75.0));
    }

    #[test]
    fn test_non_positive_explicit_seconds_fall_back_to_text() {
        let segment = Segment {
            duration_s: Some(0.0),
            duration_text: Some("2:30".into()),
            ..Segment::default()
        };
        assert_eq!(parse_duration_seconds(&segment), Some(150.0));
    }

    #[test]
    fn test_alternate_seconds_keys_from_plan_json() {
        let segment: Segment =
            serde_json::from_str(r#"{"duration_s":0,"duration_sec":"240","duration_text":"9:00"}"#)
                .unwrap();
        assert_eq!(parse_duration_seconds(&segment), Some(240.0));
    }

    #[test]
    fn test_text_formats() {
        assert_eq!(parse_duration_seconds(&with_text("1:02:03")), Some(3723.0));
        assert_eq!(parse_duration_seconds(&with_text(" 12:05 ")), Some(725.0));
        assert_eq!(parse_duration_seconds(&with_text("1h2m3s")), Some(3723.0));
        assert_eq!(parse_duration_seconds(&with_text("5m")), Some(300.0));
        assert_eq!(parse_duration_seconds(&with_text("1.5 H")), Some(5400.0));
        assert_eq!(parse_duration_seconds(&with_text("90")), Some(90.0));
        assert_eq!(parse_duration_seconds(&with_text("approx 45")), Some(45.0));
    }

    #[test]
    fn test_unparseable_text_is_none() {
        assert_eq!(parse_duration_seconds(&with_text("")), None);
        assert_eq!(parse_duration_seconds(&with_text("soon")), None);
        assert_eq!(parse_duration_seconds(&with_text("0:00")), None);
        assert_eq!(parse_duration_seconds(&Segment::default()), None);
    }
}
