// ABOUTME: Per-segment tracking rows and whole-effort progress summary for rendering collaborators
// ABOUTME: Projects plan, reconciliation, bias and segment runs into display-ready numbers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::config::PacingConfig;
use pacing_core::constants::time::MS_PER_SECOND;
use pacing_core::constants::wbal::JOULES_PER_KJ;
use serde::Serialize;

use crate::bias::PowerBias;
use crate::display::format_duration;
use crate::locator::scaled_bounds;
use crate::plan_stats::LoadedPlan;
use crate::reconciliation::DistanceScaler;
use crate::tracking::SegmentTracker;
use crate::wbal::reserve_percent;

/// One table row describing a segment and how it went
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRow {
    /// Zero-based segment index
    pub index: usize,
    /// Course-space start, offset removed unless finished (km)
    pub start_km: Option<f64>,
    /// Course-space end, offset removed unless finished (km)
    pub end_km: Option<f64>,
    /// Scaled plan-space start (km)
    pub plan_start_km: Option<f64>,
    /// Scaled plan-space end (km)
    pub plan_end_km: Option<f64>,
    /// Target power after bias (watts)
    pub target_power_w: Option<f64>,
    /// Authored target power (watts)
    pub plan_power_w: Option<f64>,
    /// Bias changed the target
    pub bias_applied: bool,
    /// Plan text, else formatted parsed duration
    pub duration_text: Option<String>,
    /// Parsed planned duration (seconds)
    pub duration_s: Option<f64>,
    /// Average gradient (percent)
    pub gradient: Option<f64>,
    /// Planned W' balance at segment end (joules)
    pub wbal_j: Option<f64>,
    /// Planned W' balance as percent of the resolved W'
    pub wbal_percent: Option<f64>,
    /// Realised average power (watts)
    pub actual_avg_power_w: Option<f64>,
    /// Realised duration (seconds)
    pub actual_duration_s: Option<f64>,
    /// Realised minus planned duration (seconds)
    pub duration_delta_s: Option<f64>,
    /// Realised average minus target power (watts)
    pub power_delta_w: Option<f64>,
    /// Segment run finished
    pub finished: bool,
    /// Segment run joined mid-segment
    pub partial: bool,
    /// Rider currently in this segment
    pub active: bool,
}

/// Inputs for row projection
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    /// Loaded plan
    pub plan: &'a LoadedPlan,
    /// Segment runs
    pub tracker: &'a SegmentTracker,
    /// Plan to course mapping
    pub scaler: &'a DistanceScaler,
    /// Effective distance offset (km)
    pub offset_km: f64,
    /// Current power bias
    pub bias: PowerBias,
    /// Resolved W' (joules)
    pub w_prime: Option<f64>,
    /// Active segment
    pub current_index: Option<usize>,
}

/// Build one row per plan segment
#[must_use]
pub fn build_rows(ctx: &RowContext<'_>) -> Vec<SegmentRow> {
    ctx.plan
        .plan()
        .intervals
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            let run = ctx.tracker.get(index);
            let finished = run.is_some_and(|run| run.finished);
            let offset_km = if finished { 0.0 } else { ctx.offset_km };
            let (plan_start_km, plan_end_km) = scaled_bounds(segment, ctx.scaler);
            let to_course = |km: Option<f64>| km.map(|km| (km - offset_km).max(0.0));

            let duration_s = ctx.plan.duration(index);
            let plan_power_w = segment.power_w.filter(|p| p.is_finite());
            let target_power_w = ctx.bias.target(plan_power_w, run);
            let wbal_j = segment
                .wbal_kj
                .filter(|kj| kj.is_finite())
                .map(|kj| kj * JOULES_PER_KJ);
            let wbal_percent = wbal_j.zip(ctx.w_prime).and_then(|(j, w)| reserve_percent(j, w));

            let actual_duration_s = run.and_then(|run| run.recorded_seconds());
            let actual_avg_power_w = run.and_then(|run| run.avg_power);

            SegmentRow {
                index,
                start_km: to_course(plan_start_km),
                end_km: to_course(plan_end_km),
                plan_start_km,
                plan_end_km,
                target_power_w,
                plan_power_w,
                bias_applied: plan_power_w.is_some() && ctx.bias.applies_to(run),
                duration_text: segment
                    .duration_text
                    .clone()
                    .or_else(|| format_duration(duration_s)),
                duration_s,
                gradient: segment.avg_gradient.filter(|g| g.is_finite()),
                wbal_j,
                wbal_percent,
                actual_avg_power_w,
                actual_duration_s,
                duration_delta_s: actual_duration_s.zip(duration_s).map(|(a, p)| a - p),
                power_delta_w: actual_avg_power_w.zip(target_power_w).map(|(a, t)| a - t),
                finished,
                partial: run.is_some_and(|run| run.partial),
                active: ctx.current_index == Some(index),
            }
        })
        .collect()
}

/// Whole-effort power and intensity summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    /// Realised average power over all tracked time (watts)
    pub actual_avg_power_w: Option<f64>,
    /// Tracked time behind `actual_avg_power_w` (seconds)
    pub actual_seconds: f64,
    /// Target power averaged over the same tracked time (watts)
    pub expected_avg_power_w: Option<f64>,
    /// Plan average power (watts)
    pub plan_avg_power_w: Option<f64>,
    /// Planned intensity factor
    pub target_if: Option<f64>,
    /// Realised intensity factor
    pub actual_if: Option<f64>,
}

/// Summarise progress from rows and runs
#[must_use]
pub fn progress_summary(
    rows: &[SegmentRow],
    plan: &LoadedPlan,
    tracker: &SegmentTracker,
    ftp: Option<f64>,
    config: &PacingConfig,
) -> ProgressSummary {
    let (work, time_ms) = tracker.power_totals();
    let (actual_avg_power_w, actual_seconds) =
        if time_ms >= config.min_average_time_ms && time_ms > 0.0 {
            (Some(work / time_ms), time_ms / MS_PER_SECOND)
        } else {
            (None, 0.0)
        };

    let (expected_work, expected_time) = rows
        .iter()
        .filter_map(|row| {
            let target = row.target_power_w?;
            let time_ms = tracker.get(row.index)?.time_integral;
            (time_ms > 0.0).then(|| (target, time_ms / MS_PER_SECOND))
        })
        .fold((0.0, 0.0), |(work, time), (target, seconds)| {
            (work + target * seconds, time + seconds)
        });
    let expected_avg_power_w = (expected_time > 0.0).then(|| expected_work / expected_time);

    let ftp = ftp.filter(|f| f.is_finite() && *f > 0.0);
    let plan_avg_power_w = plan.stats().avg_power_w;
    let target_if = plan
        .plan()
        .summary
        .as_ref()
        .and_then(|summary| summary.if_percent)
        .filter(|value| value.is_finite() && *value > 0.0)
        .map(|value| if value > 10.0 { value / 100.0 } else { value })
        .or_else(|| plan_avg_power_w.zip(ftp).map(|(avg, ftp)| avg / ftp));

    ProgressSummary {
        actual_avg_power_w,
        actual_seconds,
        expected_avg_power_w,
        plan_avg_power_w,
        target_if,
        actual_if: actual_avg_power_w.zip(ftp).map(|(avg, ftp)| avg / ftp),
    }
}
