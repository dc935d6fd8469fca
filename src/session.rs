// ABOUTME: Pacer session wiring the engine to sync publishing, remote updates and persisted state
// ABOUTME: Runs ticks and bridge commands, publishes deduplicated messages and saves state best effort
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pacer Session
//!
//! The engine stays synchronous; this layer does the I/O around it. Every
//! transport and storage failure is logged at `warn` and swallowed so engine
//! state never depends on delivery.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pacing_core::constants::topics;
use pacing_core::errors::AppResult;
use pacing_core::models::{FinishPrediction, TelemetrySnapshot};
use pacing_engine::display::PowerSmoother;
use pacing_engine::{LoadedPlan, PacingEngine, TickOutcome};
use tracing::{debug, info, warn};

use crate::bridge::{BridgeCommand, BridgeEffect};
use crate::storage::{PersistedState, StateStore};
use crate::sync::{
    interval_avg_topic, prediction_topic, PatchOutcome, RemoteUpdate, SharedStatePatch,
    SyncFilter, SyncHub, SyncMessage, SyncPublisher, SyncSubscription,
};

/// Latest interval average received from another instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteIntervalAvg {
    /// Average power (watts)
    pub avg_power: Option<f64>,
    /// Publication time (unix ms)
    pub updated_at: i64,
}

/// One engine plus its transport and storage collaborators
pub struct PacerSession {
    engine: PacingEngine,
    hub: SyncHub,
    store: Arc<dyn StateStore>,
    publisher: SyncPublisher,
    filter: SyncFilter,
    smoother: PowerSmoother,
    display_power: Option<f64>,
    remote_interval_avg: Option<RemoteIntervalAvg>,
}

impl PacerSession {
    /// Wrap `engine`; messages are stamped with the engine's instance id
    pub fn new(engine: PacingEngine, hub: SyncHub, store: Arc<dyn StateStore>) -> Self {
        let instance_id = engine.instance_id().to_owned();
        Self {
            engine,
            hub,
            store,
            publisher: SyncPublisher::new(instance_id.clone()),
            filter: SyncFilter::new(instance_id),
            smoother: PowerSmoother::default(),
            display_power: None,
            remote_interval_avg: None,
        }
    }

    /// Load persisted state into the engine
    ///
    /// Returns whether anything was restored.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state exists but cannot be decoded
    pub async fn restore(&mut self, now: DateTime<Utc>) -> AppResult<bool> {
        let Some(state) = self.store.load().await? else {
            return Ok(false);
        };
        if let Some(plan) = state.plan {
            self.engine.set_plan(plan, false, now);
        }
        // the plan resets bias, so bias goes after it
        self.engine.set_manual_offset(state.distance_offset, false);
        self.engine.set_power_bias(state.power_bias);
        self.engine.set_home_athlete(state.home_athlete_id.as_deref());
        self.smoother.set_window(state.power_smoothing_sec);
        info!(
            plan = self.engine.plan().is_some(),
            offset_m = state.distance_offset,
            bias = self.engine.power_bias().value(),
            home_athlete_id = ?self.engine.home_athlete_id(),
            "Restored persisted state"
        );
        Ok(true)
    }

    /// State as it would be persisted now
    #[must_use]
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            distance_offset: self.engine.reconciliation().manual_offset_m,
            power_bias: self.engine.power_bias().value(),
            power_smoothing_sec: self.smoother.window_seconds(),
            home_athlete_id: self.engine.home_athlete_id().map(str::to_owned),
            plan: self.engine.plan().map(LoadedPlan::plan).cloned(),
        }
    }

    /// Save state; failures are logged only
    pub async fn persist(&self) {
        if let Err(e) = self.store.save(&self.persisted_state()).await {
            warn!(error = %e, "Failed to persist pacing state");
        }
    }

    /// Process a telemetry snapshot and publish what changed
    pub async fn handle_telemetry(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        let outcome = self.engine.handle_telemetry(snapshot, now);
        if !outcome.spectating {
            self.display_power = self.smoother.sample(now.timestamp_millis(), snapshot.power_w());
        }
        if outcome.home_adopted {
            self.publisher.forget();
            self.persist().await;
        }
        if outcome.prediction_changed || outcome.transition.is_some() {
            self.publish_prediction(now).await;
        }
        if !outcome.spectating {
            self.publish_interval_avg(now).await;
        }
        outcome
    }

    /// Apply a bridge command, then persist and share as requested
    ///
    /// # Errors
    ///
    /// Returns an error if the command carries an undecodable plan or an
    /// invalid value
    pub async fn handle_command(
        &mut self,
        command: BridgeCommand,
        now: DateTime<Utc>,
    ) -> AppResult<BridgeEffect> {
        let home_before = self.engine.home_athlete_id().map(str::to_owned);
        let effect = command.apply(&mut self.engine, now)?;
        if home_before.as_deref() != self.engine.home_athlete_id() {
            // topics are scoped by athlete
            self.publisher.forget();
        }
        if effect.persist {
            self.persist().await;
        }
        self.publish_shared_state(effect.patch.clone()).await;
        self.publish_prediction(now).await;
        Ok(effect)
    }

    /// Act on a message received from another instance
    ///
    /// Returns whether local state changed.
    pub async fn handle_sync_message(&mut self, message: SyncMessage, now: DateTime<Utc>) -> bool {
        let home = self.engine.home_athlete_id().map(str::to_owned);
        let Some(update) = self
            .filter
            .accept(message, home.as_deref(), now.timestamp_millis())
        else {
            return false;
        };
        match update {
            RemoteUpdate::Prediction(prediction) => self.engine.apply_remote_prediction(prediction),
            RemoteUpdate::IntervalAvg {
                avg_power,
                updated_at,
            } => {
                self.remote_interval_avg = Some(RemoteIntervalAvg {
                    avg_power,
                    updated_at,
                });
                true
            }
            RemoteUpdate::SharedState(patch) => {
                let outcome = patch.apply_to(&mut self.engine, now);
                debug!(?outcome, "Applied shared state patch");
                if outcome.needs_persist() {
                    self.persist().await;
                }
                outcome != PatchOutcome::default()
            }
        }
    }

    /// Subscribe to predictions for the current home athlete
    pub async fn subscribe_predictions(&self) -> SyncSubscription {
        self.hub
            .subscribe(&prediction_topic(self.engine.home_athlete_id()))
            .await
    }

    /// Subscribe to interval averages for the current home athlete
    pub async fn subscribe_interval_avg(&self) -> SyncSubscription {
        self.hub
            .subscribe(&interval_avg_topic(self.engine.home_athlete_id()))
            .await
    }

    /// Subscribe to shared-state patches
    pub async fn subscribe_shared_state(&self) -> SyncSubscription {
        self.hub.subscribe(topics::SHARED_STATE).await
    }

    /// Change the display smoothing window and persist it
    pub async fn set_power_smoothing(&mut self, window_seconds: f64) {
        let before = self.smoother.window_seconds();
        self.smoother.set_window(window_seconds);
        if (self.smoother.window_seconds() - before).abs() > f64::EPSILON {
            info!(window_s = self.smoother.window_seconds(), "Power smoothing set");
            self.persist().await;
        }
    }

    async fn publish_prediction(&mut self, now: DateTime<Utc>) {
        let athlete = self.engine.home_athlete_id().map(str::to_owned);
        let Some(message) = self.publisher.prediction(
            athlete.as_deref(),
            self.engine.prediction(),
            now.timestamp_millis(),
        ) else {
            return;
        };
        let topic = prediction_topic(athlete.as_deref());
        if let Err(e) = self.hub.publish(&topic, &message).await {
            warn!(topic, error = %e, "Prediction broadcast failed");
        }
    }

    async fn publish_interval_avg(&mut self, now: DateTime<Utc>) {
        let athlete = self.engine.home_athlete_id().map(str::to_owned);
        let Some(message) = self.publisher.interval_avg(
            athlete.as_deref(),
            self.engine.current_interval_avg_power(),
            now.timestamp_millis(),
        ) else {
            return;
        };
        let topic = interval_avg_topic(athlete.as_deref());
        if let Err(e) = self.hub.publish(&topic, &message).await {
            warn!(topic, error = %e, "Interval average broadcast failed");
        }
    }

    async fn publish_shared_state(&self, patch: SharedStatePatch) {
        let Some(message) = self.publisher.shared_state(patch) else {
            return;
        };
        if let Err(e) = self.hub.publish(topics::SHARED_STATE, &message).await {
            warn!(error = %e, "Shared state broadcast failed");
        }
    }

    /// The engine
    #[must_use]
    pub const fn engine(&self) -> &PacingEngine {
        &self.engine
    }

    /// Current finish prediction
    #[must_use]
    pub const fn prediction(&self) -> Option<&FinishPrediction> {
        self.engine.prediction()
    }

    /// Smoothed power for display
    #[must_use]
    pub const fn display_power(&self) -> Option<f64> {
        self.display_power
    }

    /// Display smoothing window (seconds)
    #[must_use]
    pub const fn power_smoothing_seconds(&self) -> f64 {
        self.smoother.window_seconds()
    }

    /// Latest interval average from another instance
    #[must_use]
    pub const fn remote_interval_avg(&self) -> Option<RemoteIntervalAvg> {
        self.remote_interval_avg
    }
}
