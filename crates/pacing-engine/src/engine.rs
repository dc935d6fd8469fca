// ABOUTME: Pacing engine owning all per-session state and the telemetry tick handler
// ABOUTME: Orchestrates reconciliation, lifecycle, tracking, W'bal and finish prediction per snapshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pacing Engine
//!
//! One [`PacingEngine`] exists per tracked session. Every inbound telemetry
//! snapshot goes through [`PacingEngine::handle_telemetry`], which mutates
//! state synchronously and reports what changed in a [`TickOutcome`]. The
//! engine never fails: unknown inputs leave the affected outputs empty.
//!
//! Tick order:
//!
//! 1. adopt a home athlete, or pause while spectating someone else
//! 2. absorb event-distance telemetry
//! 3. run the lifecycle detector and reset on any transition, then resolve
//!    rider metrics
//! 4. close every open segment once the event is complete
//! 5. integrate W' balance
//! 6. locate the segment, track it once started, refresh the prediction

use chrono::{DateTime, Utc};
use pacing_core::config::PacingConfig;
use pacing_core::constants::distance::METRES_PER_KM;
use pacing_core::models::{normalize_id, FinishPrediction, Plan, TelemetrySnapshot};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bias::{BiasDirection, PowerBias};
use crate::lifecycle::{LifecycleDetector, LifecycleObservation, LifecycleTransition};
use crate::locator::{distance_to_segment_km, find_current_segment, upcoming_segment};
use crate::plan_stats::LoadedPlan;
use crate::prediction::{compute_finish_prediction, is_stale, PredictionContext};
use crate::reconciliation::{DistanceScaler, ReconciliationState};
use crate::resolve::ResolvedMetrics;
use crate::summary::{build_rows, progress_summary, ProgressSummary, RowContext, SegmentRow};
use crate::tracking::{is_partial_start, SegmentTracker};
use crate::wbal::WBalanceModel;

/// Step used by the offset nudge controls (metres)
pub const OFFSET_STEP_M: f64 = 10.0;

/// What a telemetry tick changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickOutcome {
    /// Snapshot belonged to another athlete and was ignored
    pub spectating: bool,
    /// A home athlete was adopted from this snapshot
    pub home_adopted: bool,
    /// Lifecycle transition detected on this tick
    pub transition: Option<LifecycleTransition>,
    /// Segment before the tick
    pub previous_index: Option<usize>,
    /// Segment after the tick
    pub current_index: Option<usize>,
    /// Segment whose run began on this tick
    pub started_segment: Option<usize>,
    /// Segment whose run finished on this tick
    pub finished_segment: Option<usize>,
    /// The event became complete on this tick
    pub event_completed: bool,
    /// The prediction fingerprint changed
    pub prediction_changed: bool,
}

/// Per-session pacing state and its operations
#[derive(Debug, Clone)]
pub struct PacingEngine {
    config: PacingConfig,
    instance_id: String,
    plan: Option<LoadedPlan>,
    reconciliation: ReconciliationState,
    tracker: SegmentTracker,
    lifecycle: LifecycleDetector,
    wbal: WBalanceModel,
    metrics: ResolvedMetrics,
    prediction: Option<FinishPrediction>,
    current_index: Option<usize>,
    event_complete: bool,
    power_bias: PowerBias,
    home_athlete_id: Option<String>,
    spectating_athlete_id: Option<String>,
    last_snapshot: Option<TelemetrySnapshot>,
    stats_cleared_at: Option<i64>,
}

impl PacingEngine {
    /// Engine with a random instance id
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        Self::with_instance_id(config, Uuid::new_v4().to_string())
    }

    /// Engine with a caller-chosen instance id
    #[must_use]
    pub fn with_instance_id(config: PacingConfig, instance_id: impl Into<String>) -> Self {
        Self {
            config,
            instance_id: instance_id.into(),
            plan: None,
            reconciliation: ReconciliationState::default(),
            tracker: SegmentTracker::new(),
            lifecycle: LifecycleDetector::new(),
            wbal: WBalanceModel::new(),
            metrics: ResolvedMetrics::default(),
            prediction: None,
            current_index: None,
            event_complete: false,
            power_bias: PowerBias::default(),
            home_athlete_id: None,
            spectating_athlete_id: None,
            last_snapshot: None,
            stats_cleared_at: None,
        }
    }

    // ================================================================================================
    // Plan
    // ================================================================================================

    /// Load a plan and start from a clean slate
    ///
    /// Resets tracking, lifecycle start detection, bias, metrics, W' and the
    /// prediction. Returns the plan signature.
    pub fn set_plan(&mut self, plan: Plan, reset_home: bool, now: DateTime<Utc>) -> Option<&str> {
        let loaded = LoadedPlan::new(plan);
        info!(
            route = loaded.plan().route_name().unwrap_or("Custom plan"),
            segments = loaded.plan().len(),
            distance_km = ?loaded.stats().distance_km,
            planned_duration_s = ?loaded.stats().planned_duration_s,
            signature = ?loaded.signature(),
            "Pacing plan set"
        );
        self.plan = Some(loaded);
        self.reset_for_plan(reset_home, now.timestamp_millis());
        self.plan_signature()
    }

    /// Drop the plan and all tracking
    pub fn clear_plan(&mut self, reset_home: bool, now: DateTime<Utc>) {
        if self.plan.take().is_some() {
            info!("Pacing plan cleared");
        }
        self.reset_for_plan(reset_home, now.timestamp_millis());
    }

    fn reset_for_plan(&mut self, reset_home: bool, now_ms: i64) {
        self.reset_tracking_state(now_ms);
        self.lifecycle.reset_event();
        self.power_bias = PowerBias::default();
        if reset_home {
            self.clear_home_athlete();
        }
    }

    /// Loaded plan
    #[must_use]
    pub const fn plan(&self) -> Option<&LoadedPlan> {
        self.plan.as_ref()
    }

    /// Signature of the loaded plan
    #[must_use]
    pub fn plan_signature(&self) -> Option<&str> {
        self.plan.as_ref().and_then(LoadedPlan::signature)
    }

    // ================================================================================================
    // Reset
    // ================================================================================================

    /// Manual reset of all tracking; athlete, subgroup and course memory survive
    pub fn reset_tracking(&mut self, now: DateTime<Utc>) {
        info!("Tracking reset requested");
        self.reset_tracking_state(now.timestamp_millis());
        self.lifecycle.reset_event();
    }

    fn reset_tracking_state(&mut self, now_ms: i64) {
        self.tracker.clear();
        self.current_index = None;
        self.event_complete = false;
        self.prediction = None;
        self.metrics = ResolvedMetrics::default();
        self.wbal.reset();
        self.reconciliation.reset_auto_offset();
        self.stats_cleared_at = Some(now_ms);
    }

    // ================================================================================================
    // Telemetry tick
    // ================================================================================================

    /// Process one telemetry snapshot
    pub fn handle_telemetry(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        let now_ms = now.timestamp_millis();
        let athlete = snapshot.athlete_id.as_deref().and_then(normalize_id);
        let mut outcome = TickOutcome {
            previous_index: self.current_index,
            ..TickOutcome::default()
        };

        if self.home_athlete_id.is_none() {
            if let Some(athlete) = &athlete {
                info!(athlete_id = %athlete, "Adopted home athlete");
                self.home_athlete_id = Some(athlete.clone());
                outcome.home_adopted = true;
            }
        }
        if let (Some(home), Some(current)) = (&self.home_athlete_id, &athlete) {
            if home != current {
                if self.spectating_athlete_id.is_none() {
                    info!(home_athlete_id = %home, athlete_id = %current, "Spectating another rider, stats paused");
                }
                self.spectating_athlete_id = Some(current.clone());
                if let Some(index) = self.current_index {
                    self.tracker.hold(index, now_ms);
                }
                outcome.spectating = true;
                outcome.current_index = self.current_index;
                return outcome;
            }
        }
        if self.spectating_athlete_id.take().is_some() {
            info!("Home rider telemetry resumed");
        }
        self.last_snapshot = Some(snapshot.clone());

        let transition = self.inspect_lifecycle(snapshot, athlete.as_deref(), now_ms, &mut outcome);
        self.reconciliation.observe(snapshot);
        let started_at_line = if transition.as_ref().is_some_and(LifecycleTransition::is_start) {
            self.begin_at_start_line(snapshot, now_ms, &mut outcome)
        } else {
            None
        };
        outcome.transition = transition;
        self.metrics = ResolvedMetrics::resolve(self.plan.as_ref().map(LoadedPlan::plan), snapshot);

        if !self.event_complete
            && self
                .reconciliation
                .is_event_complete(self.config.event_complete_remaining_m)
        {
            let closed = self
                .tracker
                .finalize_all(now_ms, snapshot.positive_race_clock());
            self.event_complete = true;
            self.current_index = None;
            outcome.event_completed = true;
            info!(
                closed_segments = closed.len(),
                race_clock_s = ?snapshot.race_clock(),
                "Event complete, tracking stopped"
            );
        }

        self.update_wbal(now_ms, snapshot.power_w());

        if !self.event_complete {
            self.track_and_predict(snapshot, now_ms, started_at_line, &mut outcome);
        }

        outcome.current_index = self.current_index;
        outcome
    }

    fn inspect_lifecycle(
        &mut self,
        snapshot: &TelemetrySnapshot,
        athlete: Option<&str>,
        now_ms: i64,
        outcome: &mut TickOutcome,
    ) -> Option<LifecycleTransition> {
        let subgroup = snapshot.event_subgroup_id.as_deref().and_then(normalize_id);
        let course = snapshot.course_id.as_deref().and_then(normalize_id);
        let observation = LifecycleObservation {
            athlete_id: athlete,
            subgroup_id: subgroup.as_deref(),
            course_id: course.as_deref(),
            progress_m: snapshot.event_progress_m(),
            race_clock: snapshot.race_clock(),
        };
        let transition = self.lifecycle.inspect(&observation)?;

        info!(transition = %transition, "Event lifecycle transition");
        outcome.prediction_changed |= self.prediction.is_some();
        self.reset_tracking_state(now_ms);
        if !transition.is_start() {
            // distances from the previous event must not mark the next one complete
            self.reconciliation.clear_event_telemetry();
        }
        Some(transition)
    }

    /// Materialise a run for wherever the rider crossed the start line
    ///
    /// Returns the segment whose run was created on this tick.
    fn begin_at_start_line(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now_ms: i64,
        outcome: &mut TickOutcome,
    ) -> Option<usize> {
        let loaded = self.plan.as_ref()?;
        let scaler = DistanceScaler::new(loaded.plan(), &self.reconciliation, &self.config);
        let start_km = snapshot.event_progress_m().unwrap_or(0.0) / METRES_PER_KM;
        let plan_km = self.reconciliation.plan_distance_km(Some(start_km));
        let index = find_current_segment(loaded.plan(), &scaler, plan_km)?;
        let start = SegmentStart {
            index,
            now_ms,
            plan_km,
            bias: self.power_bias,
        };
        if !begin_segment(&mut self.tracker, loaded, &scaler, &self.config, start) {
            return None;
        }
        outcome.started_segment = Some(index);
        Some(index)
    }

    fn update_wbal(&mut self, now_ms: i64, power: Option<f64>) {
        if self.plan.is_none() {
            self.wbal.reset();
            return;
        }
        let w_prime = self
            .plan
            .as_ref()
            .and_then(|loaded| loaded.plan().w_prime())
            .filter(|w| *w > 0.0)
            .unwrap_or(self.config.default_w_prime_j);
        self.wbal.update(now_ms, power, self.metrics.ftp.value, w_prime);
    }

    fn track_and_predict(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now_ms: i64,
        started_at_line: Option<usize>,
        outcome: &mut TickOutcome,
    ) {
        let Some(loaded) = &self.plan else {
            return;
        };
        if loaded.plan().is_empty() {
            return;
        }
        let scaler = DistanceScaler::new(loaded.plan(), &self.reconciliation, &self.config);
        let actual_km = snapshot.raw_distance_m() / METRES_PER_KM;
        let plan_km = self.reconciliation.plan_distance_km(Some(actual_km));
        let previous = self.current_index;
        let next = find_current_segment(loaded.plan(), &scaler, plan_km);
        let power = snapshot.power_w();

        if self.lifecycle.event_has_started() && plan_km.is_some() {
            if previous == next {
                if let Some(index) = next.filter(|index| self.tracker.get(*index).is_none()) {
                    debug!(segment = index + 1, "Creating missing segment run");
                    let start = SegmentStart {
                        index,
                        now_ms,
                        plan_km,
                        bias: self.power_bias,
                    };
                    if begin_segment(&mut self.tracker, loaded, &scaler, &self.config, start) {
                        outcome.started_segment = Some(index);
                    }
                }
            } else {
                if let Some(index) = previous {
                    let race_clock = snapshot.positive_race_clock();
                    if finish_segment(&mut self.tracker, loaded, index, now_ms, power, race_clock, self.power_bias) {
                        outcome.finished_segment = Some(index);
                        if next.is_none() && index + 1 >= loaded.plan().len() {
                            info!(race_clock_s = ?race_clock, "All segments complete");
                        }
                    }
                }
                // a run begun at the start line this tick stays as is
                if let Some(index) = next.filter(|index| started_at_line != Some(*index)) {
                    let start = SegmentStart {
                        index,
                        now_ms,
                        plan_km,
                        bias: self.power_bias,
                    };
                    if begin_segment(&mut self.tracker, loaded, &scaler, &self.config, start) {
                        outcome.started_segment = Some(index);
                    }
                }
            }
            if let Some(index) = next {
                self.tracker.advance(index, now_ms, power);
            }
        }
        self.current_index = next;

        if previous != next || is_stale(self.prediction.as_ref(), now_ms, &self.config) {
            let before = FinishPrediction::signature_of(self.prediction.as_ref());
            self.prediction = compute_finish_prediction(&PredictionContext {
                plan: loaded,
                tracker: &self.tracker,
                current_index: next,
                race_clock: snapshot.race_clock(),
                now_ms,
                publisher_id: &self.instance_id,
                config: &self.config,
            });
            let after = FinishPrediction::signature_of(self.prediction.as_ref());
            if before != after {
                debug!(signature = %after, "Finish prediction updated");
                outcome.prediction_changed = true;
            }
        }
    }

    // ================================================================================================
    // Manual controls
    // ================================================================================================

    /// Set the manual distance offset; clamped to the configured limit when `clamp`
    pub fn set_manual_offset(&mut self, meters: f64, clamp: bool) -> bool {
        let changed = self
            .reconciliation
            .set_manual_offset(meters, clamp, self.config.manual_offset_limit_m);
        if changed {
            info!(offset_m = self.reconciliation.manual_offset_m, clamp, "Manual distance offset set");
        }
        changed
    }

    /// Nudge the manual offset by `steps` of [`OFFSET_STEP_M`]
    pub fn adjust_manual_offset(&mut self, steps: i32) -> bool {
        let target = f64::from(steps).mul_add(OFFSET_STEP_M, self.reconciliation.manual_offset_m);
        self.set_manual_offset(target, true)
    }

    /// Set the power bias (clamped)
    pub fn set_power_bias(&mut self, value: f64) -> bool {
        self.apply_bias(PowerBias::new(value, &self.config))
    }

    /// Step the power bias
    pub fn adjust_power_bias(&mut self, direction: BiasDirection) -> bool {
        self.apply_bias(self.power_bias.step(direction, &self.config))
    }

    fn apply_bias(&mut self, next: PowerBias) -> bool {
        if (next.value() - self.power_bias.value()).abs() < f64::EPSILON {
            return false;
        }
        self.power_bias = next;
        info!(bias = next.value(), "Power bias set");
        true
    }

    /// Set or clear the home athlete; returns true when it changed
    pub fn set_home_athlete(&mut self, athlete_id: Option<&str>) -> bool {
        let next = athlete_id.and_then(normalize_id);
        if next == self.home_athlete_id {
            return false;
        }
        info!(athlete_id = ?next, "Home athlete set");
        self.home_athlete_id = next;
        true
    }

    /// Lock the home athlete to the rider of the last accepted snapshot
    pub fn lock_home_to_current(&mut self) -> Option<String> {
        let athlete = self
            .last_snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.athlete_id.as_deref())
            .and_then(normalize_id)?;
        self.set_home_athlete(Some(&athlete));
        Some(athlete)
    }

    /// Forget the home athlete and the last accepted snapshot
    pub fn clear_home_athlete(&mut self) -> bool {
        self.last_snapshot = None;
        self.spectating_athlete_id = None;
        self.set_home_athlete(None)
    }

    // ================================================================================================
    // Outputs
    // ================================================================================================

    /// Per-segment rows for rendering
    #[must_use]
    pub fn rows(&self) -> Vec<SegmentRow> {
        let Some(loaded) = &self.plan else {
            return Vec::new();
        };
        let scaler = DistanceScaler::new(loaded.plan(), &self.reconciliation, &self.config);
        build_rows(&RowContext {
            plan: loaded,
            tracker: &self.tracker,
            scaler: &scaler,
            offset_km: self.reconciliation.effective_offset_km(),
            bias: self.power_bias,
            w_prime: self.metrics.w_prime.value,
            current_index: self.current_index,
        })
    }

    /// Whole-effort summary
    #[must_use]
    pub fn progress_summary(&self) -> Option<ProgressSummary> {
        let loaded = self.plan.as_ref()?;
        Some(progress_summary(
            &self.rows(),
            loaded,
            &self.tracker,
            self.metrics.ftp.value,
            &self.config,
        ))
    }

    /// Kilometres to the next segment start
    #[must_use]
    pub fn distance_to_next_km(&self) -> Option<f64> {
        let loaded = self.plan.as_ref()?;
        let upcoming = upcoming_segment(loaded.plan(), self.current_index)?;
        let actual_km = self
            .last_snapshot
            .as_ref()
            .map(|snapshot| snapshot.raw_distance_m() / METRES_PER_KM);
        let scaler = DistanceScaler::new(loaded.plan(), &self.reconciliation, &self.config);
        distance_to_segment_km(
            loaded.plan(),
            &scaler,
            self.reconciliation.effective_offset_km(),
            self.reconciliation.base_distance_km(actual_km),
            upcoming,
        )
    }

    /// Live average power of the active segment
    #[must_use]
    pub fn current_interval_avg_power(&self) -> Option<f64> {
        self.tracker.get(self.current_index?)?.avg_power
    }

    /// Replace the prediction with one received from another instance
    ///
    /// `None` clears it. Predictions stamped with this instance's id are
    /// ignored.
    pub fn apply_remote_prediction(&mut self, prediction: Option<FinishPrediction>) -> bool {
        if prediction
            .as_ref()
            .is_some_and(|p| p.publisher_id == self.instance_id)
        {
            return false;
        }
        let changed = FinishPrediction::signature_of(prediction.as_ref())
            != FinishPrediction::signature_of(self.prediction.as_ref());
        self.prediction = prediction;
        changed
    }

    /// Policy in use
    #[must_use]
    pub const fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Identity stamped on published values
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Current finish prediction
    #[must_use]
    pub const fn prediction(&self) -> Option<&FinishPrediction> {
        self.prediction.as_ref()
    }

    /// Active segment
    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Segment runs
    #[must_use]
    pub const fn tracker(&self) -> &SegmentTracker {
        &self.tracker
    }

    /// Offsets and event telemetry
    #[must_use]
    pub const fn reconciliation(&self) -> &ReconciliationState {
        &self.reconciliation
    }

    /// Live W' balance
    #[must_use]
    pub const fn wbal(&self) -> &WBalanceModel {
        &self.wbal
    }

    /// Rider metrics resolved on the last tick
    #[must_use]
    pub const fn metrics(&self) -> &ResolvedMetrics {
        &self.metrics
    }

    /// Power bias
    #[must_use]
    pub const fn power_bias(&self) -> PowerBias {
        self.power_bias
    }

    /// Home athlete
    #[must_use]
    pub fn home_athlete_id(&self) -> Option<&str> {
        self.home_athlete_id.as_deref()
    }

    /// Athlete being spectated, if any
    #[must_use]
    pub fn spectating_athlete_id(&self) -> Option<&str> {
        self.spectating_athlete_id.as_deref()
    }

    /// Last snapshot accepted from the home athlete
    #[must_use]
    pub const fn last_snapshot(&self) -> Option<&TelemetrySnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Start line crossed since the last reset
    #[must_use]
    pub const fn event_has_started(&self) -> bool {
        self.lifecycle.event_has_started()
    }

    /// Event finished
    #[must_use]
    pub const fn event_complete(&self) -> bool {
        self.event_complete
    }

    /// Time of the last tracking reset (unix ms)
    #[must_use]
    pub const fn stats_cleared_at(&self) -> Option<i64> {
        self.stats_cleared_at
    }
}

#[derive(Debug, Clone, Copy)]
struct SegmentStart {
    index: usize,
    now_ms: i64,
    plan_km: Option<f64>,
    bias: PowerBias,
}

fn begin_segment(
    tracker: &mut SegmentTracker,
    loaded: &LoadedPlan,
    scaler: &DistanceScaler,
    config: &PacingConfig,
    start: SegmentStart,
) -> bool {
    let Some(segment) = loaded.plan().segment(start.index) else {
        return false;
    };
    let partial = is_partial_start(
        start.plan_km,
        scaler.scale_opt(segment.start_km),
        config.partial_start_tolerance_km,
    );
    if !tracker.begin(start.index, start.now_ms, partial) {
        return false;
    }
    info!(
        segment = start.index + 1,
        target_w = ?start.bias.target(segment.power_w, None).map(f64::round),
        duration = segment.duration_text.as_deref().unwrap_or("?"),
        partial,
        "Segment started"
    );
    true
}

fn finish_segment(
    tracker: &mut SegmentTracker,
    loaded: &LoadedPlan,
    index: usize,
    now_ms: i64,
    power: Option<f64>,
    race_clock: Option<f64>,
    bias: PowerBias,
) -> bool {
    let Some(run) = tracker.finalize(index, now_ms, power, race_clock) else {
        return false;
    };
    let target_w = loaded
        .plan()
        .segment(index)
        .and_then(|segment| bias.target(segment.power_w, None));
    let actual_w = run.avg_power;
    let elapsed_s = run.elapsed_seconds().round();
    let partial = run.partial;
    info!(
        segment = index + 1,
        of = loaded.plan().len(),
        partial,
        avg_w = ?actual_w.map(f64::round),
        target_w = ?target_w.map(f64::round),
        delta_w = ?actual_w.zip(target_w).map(|(a, t)| (a - t).round()),
        elapsed_s,
        delta_s = ?loaded.duration(index).map(|planned| elapsed_s - planned),
        completed = tracker.completed_full_count(),
        race_clock_s = ?race_clock.map(f64::round),
        "Segment completed"
    );
    true
}
