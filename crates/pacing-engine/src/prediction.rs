// ABOUTME: Finish-time projection from the last race-clock baseline and remaining plan work
// ABOUTME: Pacing ratio over fully tracked finished segments scales the remaining planned time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Finish Prediction
//!
//! The projection anchors on the race clock captured when the most recent
//! segment finished, then adds the planned time still ahead scaled by how
//! the rider has paced fully tracked segments so far:
//!
//! ```text
//! predicted_remaining = remaining_planned * ratio
//! predicted_total     = baseline_elapsed + predicted_remaining
//! delta               = predicted_total - plan_total
//! ```
//!
//! Before any baseline exists the plan itself is the prediction.

use pacing_core::config::PacingConfig;
use pacing_core::constants::time::MS_PER_SECOND;
use pacing_core::models::FinishPrediction;

use crate::display::format_countdown;
use crate::plan_stats::LoadedPlan;
use crate::tracking::SegmentTracker;

/// Inputs for one projection
#[derive(Debug, Clone, Copy)]
pub struct PredictionContext<'a> {
    /// Loaded plan with parsed durations
    pub plan: &'a LoadedPlan,
    /// Segment runs of the current attempt
    pub tracker: &'a SegmentTracker,
    /// Segment the rider currently occupies
    pub current_index: Option<usize>,
    /// Live race clock (seconds)
    pub race_clock: Option<f64>,
    /// Wall clock (unix ms)
    pub now_ms: i64,
    /// Identity stamped on the prediction
    pub publisher_id: &'a str,
    /// Policy thresholds
    pub config: &'a PacingConfig,
}

/// Actual over planned time across finished, fully tracked segments
///
/// Falls back to 1 until the sample covers `min_pacing_sample_seconds` of
/// plan; the result is clamped to the configured range.
#[must_use]
pub fn pacing_ratio(plan: &LoadedPlan, tracker: &SegmentTracker, config: &PacingConfig) -> f64 {
    let (planned, actual) = tracker
        .iter()
        .filter(|(_, run)| run.finished && !run.partial)
        .filter_map(|(index, run)| plan.duration(index).map(|d| (d, run.elapsed_seconds())))
        .fold((0.0, 0.0), |(planned, actual), (d, a)| (planned + d, actual + a));

    if planned < config.min_pacing_sample_seconds || actual <= 0.0 {
        return 1.0;
    }
    (actual / planned.max(1e-3)).clamp(config.min_pacing_ratio, config.max_pacing_ratio)
}

/// Planned seconds still ahead of the baseline segment
///
/// Segments after the baseline count in full; the active segment counts
/// only its unplayed remainder.
#[must_use]
pub fn remaining_plan_seconds(
    plan: &LoadedPlan,
    tracker: &SegmentTracker,
    current_index: Option<usize>,
    baseline_index: usize,
) -> f64 {
    plan.durations()
        .iter()
        .enumerate()
        .filter_map(|(index, duration)| {
            let duration = duration.filter(|d| *d > 0.0)?;
            if current_index == Some(index) && index >= baseline_index {
                let played = tracker.get(index).map_or(0.0, |run| run.elapsed_seconds());
                Some((duration - played).max(0.0))
            } else if index > baseline_index && current_index != Some(index) {
                Some(duration)
            } else {
                None
            }
        })
        .sum()
}

/// Project the finish time; `None` when the plan has no usable durations
#[must_use]
pub fn compute_finish_prediction(ctx: &PredictionContext<'_>) -> Option<FinishPrediction> {
    let plan_total = ctx.plan.stats().planned_duration_s?;

    let Some((baseline_index, baseline_elapsed)) = ctx.tracker.last_baseline() else {
        let elapsed = ctx
            .race_clock
            .filter(|c| c.is_finite() && *c > 0.0)
            .or_else(|| ctx.tracker.approx_elapsed_seconds())
            .unwrap_or(0.0);
        let remaining = (plan_total - elapsed).max(0.0);
        return Some(build(ctx, plan_total, 0.0, 0.0, elapsed, remaining, remaining, 1.0));
    };

    let remaining_planned =
        remaining_plan_seconds(ctx.plan, ctx.tracker, ctx.current_index, baseline_index);
    if remaining_planned <= 0.0 {
        return Some(build(ctx, baseline_elapsed, 0.0, 0.0, baseline_elapsed, 0.0, 0.0, 1.0));
    }

    let ratio = pacing_ratio(ctx.plan, ctx.tracker, ctx.config);
    let predicted_remaining = remaining_planned * ratio;
    let predicted = baseline_elapsed + predicted_remaining;
    Some(build(
        ctx,
        predicted,
        predicted - plan_total,
        predicted_remaining - remaining_planned,
        baseline_elapsed,
        predicted_remaining,
        remaining_planned,
        ratio,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build(
    ctx: &PredictionContext<'_>,
    predicted: f64,
    delta: f64,
    remaining_delta: f64,
    elapsed: f64,
    remaining: f64,
    remaining_plan: f64,
    ratio: f64,
) -> FinishPrediction {
    FinishPrediction {
        predicted_seconds: predicted,
        predicted_text: format_countdown(Some(predicted)),
        delta_seconds: delta,
        remaining_delta_seconds: remaining_delta,
        elapsed_seconds: elapsed,
        remaining_seconds: remaining,
        remaining_plan_seconds: remaining_plan,
        pacing_ratio: ratio,
        updated_at: ctx.now_ms,
        publisher_id: ctx.publisher_id.to_owned(),
    }
}

/// Whether a prediction should be recomputed
#[must_use]
pub fn is_stale(prediction: Option<&FinishPrediction>, now_ms: i64, config: &PacingConfig) -> bool {
    let Some(prediction) = prediction else {
        return true;
    };
    if !prediction.remaining_seconds.is_finite() || prediction.remaining_seconds <= 0.0 {
        return true;
    }
    let age_seconds = (now_ms - prediction.updated_at) as f64 / MS_PER_SECOND;
    age_seconds > config.prediction_stale_after_seconds
}
