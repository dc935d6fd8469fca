// ABOUTME: Active segment lookup by half-open interval containment in course space
// ABOUTME: Applies the distance scaler to every bound before comparing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::models::{Plan, Segment};

use crate::reconciliation::DistanceScaler;

/// Scaled `[start, end)` bounds of a segment
#[must_use]
pub fn scaled_bounds(segment: &Segment, scaler: &DistanceScaler) -> (Option<f64>, Option<f64>) {
    (
        scaler.scale_opt(segment.start_km),
        scaler.scale_opt(segment.end_km),
    )
}

fn contains(bounds: (Option<f64>, Option<f64>), distance_km: f64) -> bool {
    match bounds {
        (Some(start), Some(end)) => distance_km >= start && distance_km < end,
        (None, Some(end)) => distance_km < end,
        (Some(start), None) => distance_km >= start,
        (None, None) => false,
    }
}

/// First segment whose scaled span contains `distance_km`
///
/// `None` means before the first segment, past the last one, or an unknown
/// position; callers treat it as "not started" or "plan exhausted".
#[must_use]
pub fn find_current_segment(
    plan: &Plan,
    scaler: &DistanceScaler,
    distance_km: Option<f64>,
) -> Option<usize> {
    let distance_km = distance_km.filter(|d| d.is_finite())?;
    plan.intervals
        .iter()
        .position(|segment| contains(scaled_bounds(segment, scaler), distance_km))
}

/// Segment the rider is heading towards
#[must_use]
pub fn upcoming_segment(plan: &Plan, current: Option<usize>) -> Option<usize> {
    let next = current.map_or(0, |index| index + 1);
    (next < plan.len()).then_some(next)
}

/// Kilometres from the rider's base distance to the start of `upcoming`
///
/// Measured in course space: the upcoming start is scaled and the effective
/// offset removed. Never negative.
#[must_use]
pub fn distance_to_segment_km(
    plan: &Plan,
    scaler: &DistanceScaler,
    offset_km: f64,
    base_distance_km: Option<f64>,
    upcoming: usize,
) -> Option<f64> {
    let base = base_distance_km.filter(|d| d.is_finite())?;
    let start = scaler.scale_opt(plan.segment(upcoming)?.start_km)?;
    Some((start - offset_km - base).max(0.0))
}
