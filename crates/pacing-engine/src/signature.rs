// ABOUTME: Stable content fingerprint of a pacing plan for change detection and sync
// ABOUTME: Serializes route name, total distance and rounded segment tuples in order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::models::Plan;
use serde::Serialize;

use crate::duration::parse_duration_seconds;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignatureDocument<'a> {
    route_name: Option<&'a str>,
    distance_km: Option<f64>,
    interval_count: usize,
    intervals: Vec<[Option<f64>; 4]>,
}

/// Round to three decimals, dropping non-finite values
fn round3(value: Option<f64>) -> Option<f64> {
    value
        .filter(|v| v.is_finite())
        .map(|v| (v * 1000.0).round() / 1000.0)
}

/// Compute the plan fingerprint
///
/// Two plans with the same route name, total distance and ordered
/// `(start, end, power, duration)` tuples produce the same string. Metadata
/// outside those fields does not participate. Returns `None` without a plan.
#[must_use]
pub fn compute_plan_signature(plan: Option<&Plan>) -> Option<String> {
    let plan = plan?;
    let intervals: Vec<[Option<f64>; 4]> = plan
        .intervals
        .iter()
        .map(|segment| {
            [
                round3(segment.start_km),
                round3(segment.end_km),
                round3(segment.power_w),
                round3(parse_duration_seconds(segment)),
            ]
        })
        .collect();
    let document = SignatureDocument {
        route_name: plan.route_name(),
        distance_km: round3(plan.fingerprint_distance_km()),
        interval_count: intervals.len(),
        intervals,
    };
    serde_json::to_string(&document).ok()
}
