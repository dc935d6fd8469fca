// ABOUTME: Loaded plan context with parsed segment durations, fingerprint and summary statistics
// ABOUTME: Computed once per plan load so the tick path never re-parses duration text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::models::Plan;
use serde::Serialize;
use tracing::info;

use crate::duration::parse_duration_seconds;
use crate::signature::compute_plan_signature;

/// Aggregate numbers describing a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    /// Sum of parsed segment durations (seconds), when positive
    pub planned_duration_s: Option<f64>,
    /// Author total duration when positive, else `planned_duration_s`
    pub display_duration_s: Option<f64>,
    /// Author average power, else work divided by time
    pub avg_power_w: Option<f64>,
    /// Highest segment target
    pub peak_power_w: Option<f64>,
    /// Total distance (km)
    pub distance_km: Option<f64>,
}

impl PlanStats {
    /// Derive statistics from a plan and its parsed durations
    #[must_use]
    pub fn compute(plan: &Plan, durations: &[Option<f64>]) -> Self {
        let planned: f64 = durations.iter().flatten().sum();
        let planned_duration_s = (planned > 0.0).then_some(planned);

        let summary = plan.summary.as_ref();
        let display_duration_s = summary
            .and_then(|s| s.duration_s)
            .filter(|d| d.is_finite() && *d > 0.0)
            .or(planned_duration_s);

        let (work, time) = plan
            .intervals
            .iter()
            .zip(durations)
            .filter_map(|(segment, duration)| {
                let power = segment.power_w.filter(|p| p.is_finite())?;
                Some((power, (*duration)?))
            })
            .fold((0.0, 0.0), |(work, time), (power, duration)| {
                (work + power * duration, time + duration)
            });
        let avg_power_w = summary
            .and_then(|s| s.avg_power_w)
            .filter(|p| p.is_finite() && *p > 0.0)
            .or_else(|| (time > 0.0).then(|| work / time));

        let peak_power_w = plan
            .intervals
            .iter()
            .filter_map(|segment| segment.power_w.filter(|p| p.is_finite()))
            .reduce(f64::max);

        Self {
            planned_duration_s,
            display_duration_s,
            avg_power_w,
            peak_power_w,
            distance_km: plan.total_distance_km(),
        }
    }
}

/// A plan plus everything derived from it at load time
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPlan {
    plan: Plan,
    durations: Vec<Option<f64>>,
    signature: Option<String>,
    stats: PlanStats,
}

impl LoadedPlan {
    /// Correct the summary distance and derive durations, signature and stats
    #[must_use]
    pub fn new(mut plan: Plan) -> Self {
        if let Some(previous) = plan.correct_summary_distance() {
            info!(
                previous_km = ?previous,
                corrected_km = ?plan.total_distance_km(),
                "Corrected plan summary distance from last segment"
            );
        }
        let durations: Vec<Option<f64>> = plan.intervals.iter().map(parse_duration_seconds).collect();
        let signature = compute_plan_signature(Some(&plan));
        let stats = PlanStats::compute(&plan, &durations);
        Self {
            plan,
            durations,
            signature,
            stats,
        }
    }

    /// The corrected plan document
    #[must_use]
    pub const fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Parsed duration of a segment
    #[must_use]
    pub fn duration(&self, index: usize) -> Option<f64> {
        self.durations.get(index).copied().flatten()
    }

    /// Parsed durations in segment order
    #[must_use]
    pub fn durations(&self) -> &[Option<f64>] {
        &self.durations
    }

    /// Content fingerprint
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Aggregate statistics
    #[must_use]
    pub const fn stats(&self) -> &PlanStats {
        &self.stats
    }
}
