// ABOUTME: Per-segment tracking records and their lifecycle (untracked, active, finished)
// ABOUTME: Integrates power over wall-clock time and snapshots the race clock on completion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Segment Tracking
//!
//! One [`SegmentRun`] exists per segment index, created lazily when the rider
//! first occupies the segment. Active runs integrate `power * dt` and `dt`
//! on every tick; a run is frozen once finished and is never restarted.

use std::collections::BTreeMap;

use pacing_core::constants::time::MS_PER_SECOND;
use serde::{Deserialize, Serialize};

/// Tracking record of one segment occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRun {
    /// Wall-clock start (unix ms)
    pub start_ms: i64,
    /// Wall-clock time of the last integration step (unix ms)
    pub last_update_ms: i64,
    /// Wall-clock time spent in the segment (ms)
    pub elapsed_ms: f64,
    /// Integral of power over time (W*ms)
    pub power_integral: f64,
    /// Time covered by power samples (ms)
    pub time_integral: f64,
    /// `power_integral / time_integral`
    pub avg_power: Option<f64>,
    /// Frozen after the rider left the segment or the event completed
    pub finished: bool,
    /// Tracking began away from the segment's nominal start
    pub partial: bool,
    /// Race clock (seconds) captured when the run finished
    pub race_clock_snapshot: Option<f64>,
}

impl SegmentRun {
    /// Start a run at `now_ms`
    #[must_use]
    pub const fn begin(now_ms: i64, partial: bool) -> Self {
        Self {
            start_ms: now_ms,
            last_update_ms: now_ms,
            elapsed_ms: 0.0,
            power_integral: 0.0,
            time_integral: 0.0,
            avg_power: None,
            finished: false,
            partial,
            race_clock_snapshot: None,
        }
    }

    /// Integrate up to `now_ms`
    ///
    /// Skipped when finished or when the clock did not move forward. Elapsed
    /// time always advances; the power integral only with a finite sample.
    pub fn advance(&mut self, now_ms: i64, power: Option<f64>) {
        if self.finished {
            return;
        }
        let dt = now_ms - self.last_update_ms;
        if dt <= 0 {
            return;
        }
        let dt = dt as f64;
        self.elapsed_ms += dt;
        self.last_update_ms = now_ms;
        if let Some(power) = power.filter(|p| p.is_finite()) {
            self.power_integral += power * dt;
            self.time_integral += dt;
            self.avg_power = (self.time_integral > 0.0).then(|| self.power_integral / self.time_integral);
        }
    }

    /// Elapsed wall-clock seconds
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_ms / MS_PER_SECOND
    }

    /// Elapsed seconds when any time has been recorded
    #[must_use]
    pub fn recorded_seconds(&self) -> Option<f64> {
        (self.elapsed_ms > 0.0).then(|| self.elapsed_seconds())
    }
}

/// Whether a run beginning at `plan_distance_km` joined its segment late
///
/// An unknown position is always partial; a segment without a known start
/// never is.
#[must_use]
pub fn is_partial_start(
    plan_distance_km: Option<f64>,
    scaled_start_km: Option<f64>,
    tolerance_km: f64,
) -> bool {
    let Some(distance) = plan_distance_km.filter(|d| d.is_finite()) else {
        return true;
    };
    scaled_start_km
        .filter(|s| s.is_finite())
        .is_some_and(|start| (distance - start).abs() > tolerance_km)
}

/// All segment runs of the current attempt, keyed by segment index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentTracker {
    runs: BTreeMap<usize, SegmentRun>,
}

impl SegmentTracker {
    /// Empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every run
    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// True when nothing has been tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Run for a segment
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SegmentRun> {
        self.runs.get(&index)
    }

    /// Runs in segment order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SegmentRun)> {
        self.runs.iter().map(|(index, run)| (*index, run))
    }

    /// Begin (or restart) the run for `index`
    ///
    /// A finished run is never replaced. Returns true when a run was created.
    pub fn begin(&mut self, index: usize, now_ms: i64, partial: bool) -> bool {
        if self.runs.get(&index).is_some_and(|run| run.finished) {
            return false;
        }
        self.runs.insert(index, SegmentRun::begin(now_ms, partial));
        true
    }

    /// Integrate the active run for `index`
    pub fn advance(&mut self, index: usize, now_ms: i64, power: Option<f64>) {
        if let Some(run) = self.runs.get_mut(&index) {
            run.advance(now_ms, power);
        }
    }

    /// Move the run's time reference to `now_ms` without integrating the gap
    pub fn hold(&mut self, index: usize, now_ms: i64) {
        if let Some(run) = self.runs.get_mut(&index).filter(|run| !run.finished) {
            run.last_update_ms = run.last_update_ms.max(now_ms);
        }
    }

    /// Flush and freeze the run for `index`
    ///
    /// Returns the finished run, or `None` when there was no open run.
    pub fn finalize(
        &mut self,
        index: usize,
        now_ms: i64,
        power: Option<f64>,
        race_clock: Option<f64>,
    ) -> Option<&SegmentRun> {
        let run = self.runs.get_mut(&index).filter(|run| !run.finished)?;
        run.advance(now_ms, power);
        run.finished = true;
        if let Some(clock) = race_clock.filter(|c| c.is_finite() && *c > 0.0) {
            run.race_clock_snapshot = Some(clock);
        }
        Some(run)
    }

    /// Finalize every open run; returns the indices that were closed
    pub fn finalize_all(&mut self, now_ms: i64, race_clock: Option<f64>) -> Vec<usize> {
        let open: Vec<usize> = self
            .runs
            .iter()
            .filter(|(_, run)| !run.finished)
            .map(|(index, _)| *index)
            .collect();
        for index in &open {
            self.finalize(*index, now_ms, None, race_clock);
        }
        open
    }

    /// Most recently finished segment carrying a race-clock snapshot
    #[must_use]
    pub fn last_baseline(&self) -> Option<(usize, f64)> {
        self.runs
            .iter()
            .rev()
            .filter(|(_, run)| run.finished)
            .find_map(|(index, run)| run.race_clock_snapshot.map(|clock| (*index, clock)))
    }

    /// Sum of elapsed seconds over all runs, when positive
    #[must_use]
    pub fn approx_elapsed_seconds(&self) -> Option<f64> {
        let total_ms: f64 = self.runs.values().map(|run| run.elapsed_ms).sum();
        (total_ms > 0.0).then(|| total_ms / MS_PER_SECOND)
    }

    /// Summed power and time integrals over all runs, `(W*ms, ms)`
    #[must_use]
    pub fn power_totals(&self) -> (f64, f64) {
        self.runs.values().fold((0.0, 0.0), |(work, time), run| {
            (work + run.power_integral, time + run.time_integral)
        })
    }

    /// Number of finished runs that were fully tracked
    #[must_use]
    pub fn completed_full_count(&self) -> usize {
        self.runs
            .values()
            .filter(|run| run.finished && !run.partial)
            .count()
    }
}
