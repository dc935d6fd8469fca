// ABOUTME: Distance reconciliation between plan space and the live course
// ABOUTME: Tail-only correction for small mismatches, proportional scaling for large ones
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Distance Reconciliation
//!
//! A plan is authored against a route whose length rarely matches the live
//! event exactly. Plan distances are mapped onto the course as follows:
//!
//! - `target = event_total + effective_offset`
//! - `|target - plan_total| < threshold`: only values at or beyond the last
//!   segment's start shift by the difference, keeping that segment at least
//!   `min_tail_segment_km` long; earlier boundaries are untouched
//! - otherwise every value scales by `target / plan_total`
//!
//! The rider's position is resolved into plan space from authoritative event
//! progress when available, else raw accumulated distance, plus the offset.

use pacing_core::config::PacingConfig;
use pacing_core::constants::distance::METRES_PER_KM;
use pacing_core::models::{Plan, TelemetrySnapshot};
use serde::{Deserialize, Serialize};

/// Offsets and the latest event-distance telemetry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationState {
    /// Rider-adjusted offset in metres (persisted)
    pub manual_offset_m: f64,
    /// Automatic offset in metres, forced to zero while event progress is known
    pub auto_offset_m: f64,
    /// True when the last snapshot carried authoritative event progress
    pub uses_event_progress: bool,
    /// Last known total event distance (metres)
    pub event_total_m: Option<f64>,
    /// Last known remaining event distance (metres)
    pub event_remaining_m: Option<f64>,
    /// Last known event progress (metres)
    pub event_progress_m: Option<f64>,
}

impl ReconciliationState {
    /// Offset in metres applied to the base distance
    #[must_use]
    pub fn effective_offset_m(&self) -> f64 {
        let auto = if self.uses_event_progress {
            0.0
        } else {
            self.auto_offset_m
        };
        self.manual_offset_m + auto
    }

    /// Offset in kilometres applied to the base distance
    #[must_use]
    pub fn effective_offset_km(&self) -> f64 {
        self.effective_offset_m() / METRES_PER_KM
    }

    /// Set the manual offset, optionally clamped to `±limit_m`
    ///
    /// Non-finite input counts as zero. Returns true when the value changed.
    pub fn set_manual_offset(&mut self, meters: f64, clamp: bool, limit_m: f64) -> bool {
        let mut next = if meters.is_finite() { meters } else { 0.0 };
        if clamp {
            next = next.clamp(-limit_m, limit_m);
        }
        if (next - self.manual_offset_m).abs() < f64::EPSILON {
            return false;
        }
        self.manual_offset_m = next;
        true
    }

    /// Zero the automatic offset; returns true when it was non-zero
    pub fn reset_auto_offset(&mut self) -> bool {
        if self.auto_offset_m == 0.0 {
            return false;
        }
        self.auto_offset_m = 0.0;
        true
    }

    /// Absorb the event-distance fields of a snapshot
    ///
    /// Known values replace the remembered ones; absent values keep them.
    /// Progress availability decides which base distance is used.
    pub fn observe(&mut self, snapshot: &TelemetrySnapshot) {
        let total = snapshot.event_total_m();
        let remaining = snapshot.event_remaining_m();
        let progress = snapshot.event_progress_m();
        if total.is_some() {
            self.event_total_m = total;
        }
        if remaining.is_some() {
            self.event_remaining_m = remaining;
        }
        if progress.is_some() {
            self.event_progress_m = progress;
        }
        self.uses_event_progress = progress.is_some();
        if self.uses_event_progress {
            self.reset_auto_offset();
        }
    }

    /// Forget remembered event-distance telemetry
    pub fn clear_event_telemetry(&mut self) {
        self.event_total_m = None;
        self.event_remaining_m = None;
        self.event_progress_m = None;
        self.uses_event_progress = false;
        self.auto_offset_m = 0.0;
    }

    /// Total event distance in kilometres
    #[must_use]
    pub fn event_total_km(&self) -> Option<f64> {
        self.event_total_m.map(|m| m / METRES_PER_KM)
    }

    /// Event progress in kilometres
    #[must_use]
    pub fn event_progress_km(&self) -> Option<f64> {
        self.event_progress_m.map(|m| m / METRES_PER_KM)
    }

    /// Base distance: event progress, else the raw distance
    #[must_use]
    pub fn base_distance_km(&self, actual_km: Option<f64>) -> Option<f64> {
        self.event_progress_km()
            .or_else(|| actual_km.filter(|km| km.is_finite()))
    }

    /// Rider position in plan space
    #[must_use]
    pub fn plan_distance_km(&self, actual_km: Option<f64>) -> Option<f64> {
        self.base_distance_km(actual_km)
            .map(|base| base + self.effective_offset_km())
    }

    /// Course minus plan distance in whole metres
    #[must_use]
    pub fn course_discrepancy_m(&self, plan: &Plan) -> Option<f64> {
        let event_km = self.event_total_km()?;
        let plan_km = plan.total_distance_km()?;
        Some(((event_km - plan_km) * METRES_PER_KM).round())
    }

    /// Whether the event is over
    ///
    /// Remaining distance decides when known; otherwise progress reaching a
    /// positive total does.
    #[must_use]
    pub fn is_event_complete(&self, complete_remaining_m: f64) -> bool {
        if let Some(remaining) = self.event_remaining_m {
            return remaining <= complete_remaining_m;
        }
        match (self.event_total_m, self.event_progress_m) {
            (Some(total), Some(progress)) if total > 0.0 => progress >= total,
            _ => false,
        }
    }
}

/// Mapping of plan distances onto the live course
///
/// Built per use from the plan, the reconciliation state and the policy
/// thresholds, so it always reflects the current offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceScaler {
    plan_total_km: Option<f64>,
    event_total_km: Option<f64>,
    offset_km: f64,
    last_start_km: Option<f64>,
    tail_threshold_km: f64,
    min_tail_km: f64,
}

impl DistanceScaler {
    /// Capture the scaling context
    #[must_use]
    pub fn new(plan: &Plan, state: &ReconciliationState, config: &PacingConfig) -> Self {
        Self {
            plan_total_km: plan.total_distance_km(),
            event_total_km: state.event_total_km(),
            offset_km: state.effective_offset_km(),
            last_start_km: plan.last_start_km(),
            tail_threshold_km: config.tail_correction_threshold_km,
            min_tail_km: config.min_tail_segment_km,
        }
    }

    /// Scaler that leaves every value unchanged
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            plan_total_km: None,
            event_total_km: None,
            offset_km: 0.0,
            last_start_km: None,
            tail_threshold_km: 0.0,
            min_tail_km: 0.0,
        }
    }

    /// Map a plan-space distance onto the course
    #[must_use]
    pub fn scale(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let (Some(plan_total), Some(event_total)) = (
            self.plan_total_km.filter(|t| *t > 0.0),
            self.event_total_km.filter(|t| t.is_finite() && *t > 0.0),
        ) else {
            return value;
        };

        let target_total = event_total + self.offset_km;
        let delta = target_total - plan_total;

        if delta.abs() < self.tail_threshold_km {
            if let Some(last_start) = self.last_start_km {
                if value < last_start {
                    return value;
                }
                // only a shrinking tail can invert the last segment
                if delta < 0.0 {
                    return (value + delta).max(last_start + self.min_tail_km);
                }
                return value + delta;
            }
        }

        value * (target_total / plan_total)
    }

    /// [`DistanceScaler::scale`] over an optional value
    #[must_use]
    pub fn scale_opt(&self, value: Option<f64>) -> Option<f64> {
        value.filter(|v| v.is_finite()).map(|v| self.scale(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(json: &str) -> Plan {
        serde_json::from_str(json).unwrap()
    }

    fn state_with_event(total_m: f64) -> ReconciliationState {
        ReconciliationState {
            event_total_m: Some(total_m),
            ..ReconciliationState::default()
        }
    }

    #[test]
    fn test_manual_offset_clamps_unless_asked() {
        let mut state = ReconciliationState::default();
        assert!(state.set_manual_offset(800.0, true, 500.0));
        assert!((state.manual_offset_m - 500.0).abs() < f64::EPSILON);
        assert!(state.set_manual_offset(800.0, false, 500.0));
        assert!((state.manual_offset_m - 800.0).abs() < f64::EPSILON);
        assert!(!state.set_manual_offset(800.0, false, 500.0));
        assert!(state.set_manual_offset(f64::NAN, true, 500.0));
        assert!(state.manual_offset_m.abs() < f64::EPSILON);
    }

    #[test]
    fn test_auto_offset_ignored_with_event_progress() {
        let mut state = ReconciliationState {
            manual_offset_m: 10.0,
            auto_offset_m: 40.0,
            ..ReconciliationState::default()
        };
        assert!((state.effective_offset_m() - 50.0).abs() < 1e-9);
        state.observe(&TelemetrySnapshot {
            remaining_metric: Some("distance".into()),
            remaining_distance: Some(1000.0),
            remaining_end_distance: Some(5000.0),
            ..TelemetrySnapshot::default()
        });
        assert!(state.uses_event_progress);
        assert!((state.effective_offset_m() - 10.0).abs() < 1e-9);
        assert_eq!(state.event_progress_km(), Some(4.0));
        assert!((state.plan_distance_km(Some(1.0)).unwrap() - 4.01).abs() < 1e-9);
    }

    #[test]
    fn test_event_completion_rules() {
        let mut state = ReconciliationState {
            event_remaining_m: Some(0.4),
            ..ReconciliationState::default()
        };
        assert!(state.is_event_complete(0.5));
        state.event_remaining_m = Some(3.0);
        assert!(!state.is_event_complete(0.5));
        state.event_remaining_m = None;
        state.event_total_m = Some(1000.0);
        state.event_progress_m = Some(1000.0);
        assert!(state.is_event_complete(0.5));
    }

    #[test]
    fn test_small_mismatch_shifts_only_tail() {
        let plan = plan(
            r#"{"intervals":[{"start_km":0,"end_km":5},{"start_km":5,"end_km":10}]}"#,
        );
        let scaler = DistanceScaler::new(
            &plan,
            &state_with_event(10_400.0),
            &PacingConfig::default(),
        );
        assert!((scaler.scale(4.999) - 4.999).abs() < 1e-12);
        assert!((scaler.scale(5.0) - 5.4).abs() < 1e-9);
        assert!((scaler.scale(10.0) - 10.4).abs() < 1e-9);
    }

    #[test]
    fn test_tail_keeps_minimum_length() {
        let plan = plan(
            r#"{"intervals":[{"start_km":0,"end_km":9.8},{"start_km":9.8,"end_km":10}]}"#,
        );
        let scaler = DistanceScaler::new(
            &plan,
            &state_with_event(9_500.0),
            &PacingConfig::default(),
        );
        assert!((scaler.scale(10.0) - 9.81).abs() < 1e-9);
    }

    #[test]
    fn test_large_mismatch_scales_proportionally() {
        let plan = plan(
            r#"{"intervals":[{"start_km":0,"end_km":5},{"start_km":5,"end_km":10}]}"#,
        );
        let scaler = DistanceScaler::new(
            &plan,
            &state_with_event(20_000.0),
            &PacingConfig::default(),
        );
        assert!((scaler.scale(5.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_totals_pass_through() {
        let plan = plan(r#"{"intervals":[{"start_km":0}]}"#);
        let scaler = DistanceScaler::new(
            &plan,
            &state_with_event(12_000.0),
            &PacingConfig::default(),
        );
        assert!((scaler.scale(3.3) - 3.3).abs() < f64::EPSILON);
        assert_eq!(scaler.scale_opt(None), None);
    }

    #[test]
    fn test_matching_totals_leave_distances_unchanged() {
        let plan = plan(
            r#"{"intervals":[{"start_km":0,"end_km":5},{"start_km":5,"end_km":10}]}"#,
        );
        let scaler = DistanceScaler::new(
            &plan,
            &state_with_event(10_000.0),
            &PacingConfig::default(),
        );
        for step in 0..=1200 {
            let value = f64::from(step) * 0.01;
            assert!(
                (scaler.scale(value) - value).abs() < 1e-12,
                "{value} moved to {}",
                scaler.scale(value)
            );
        }
        assert!((scaler.scale(5.004) - 5.004).abs() < 1e-12);
    }
}
