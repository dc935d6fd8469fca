// ABOUTME: Plan-over-telemetry resolution for rider metrics (FTP, W', weight)
// ABOUTME: Tags each resolved value with the source that won
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::models::{finite, Plan, TelemetrySnapshot};
use serde::{Deserialize, Serialize};

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSource {
    /// Authored plan
    Plan,
    /// Live telemetry
    Telemetry,
}

/// A value paired with its source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolved<T> {
    /// Winning value, if any source had one
    pub value: Option<T>,
    /// Source of `value`
    pub source: Option<MetricSource>,
}

impl<T> Default for Resolved<T> {
    fn default() -> Self {
        Self {
            value: None,
            source: None,
        }
    }
}

/// Prefer the plan's value, fall back to telemetry, else nothing
#[must_use]
pub fn resolve_preferring_plan<T>(plan_value: Option<T>, telemetry_value: Option<T>) -> Resolved<T> {
    match (plan_value, telemetry_value) {
        (Some(value), _) => Resolved {
            value: Some(value),
            source: Some(MetricSource::Plan),
        },
        (None, Some(value)) => Resolved {
            value: Some(value),
            source: Some(MetricSource::Telemetry),
        },
        (None, None) => Resolved::default(),
    }
}

/// Rider metrics resolved for the current tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMetrics {
    /// Functional threshold power (watts)
    pub ftp: Resolved<f64>,
    /// Anaerobic work capacity (joules)
    pub w_prime: Resolved<f64>,
    /// Body weight (kg)
    pub weight: Resolved<f64>,
}

impl ResolvedMetrics {
    /// Resolve every metric from the plan and the snapshot
    #[must_use]
    pub fn resolve(plan: Option<&Plan>, snapshot: &TelemetrySnapshot) -> Self {
        Self {
            ftp: resolve_preferring_plan(plan.and_then(Plan::ftp), finite(snapshot.ftp)),
            w_prime: resolve_preferring_plan(plan.and_then(Plan::w_prime), finite(snapshot.w_prime)),
            weight: resolve_preferring_plan(plan.and_then(Plan::weight), finite(snapshot.weight)),
        }
    }
}
