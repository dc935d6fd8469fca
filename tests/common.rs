// ABOUTME: Shared test utilities for the tt-pacer integration tests
// ABOUTME: Quiet tracing setup, fixture plans, telemetry builders and fixed clocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `tt_pacer`
//!
//! Every scenario runs against a fixed wall clock so segment timings are
//! exact. Telemetry is built from a [`Ride`] describing the rider, event and
//! course, with progress reported as `total - remaining`.

use std::env;
use std::sync::{Arc, Once};

use chrono::{DateTime, Duration, TimeZone, Utc};
use pacing_core::config::PacingConfig;
use pacing_core::models::{Plan, TelemetrySnapshot};
use pacing_engine::PacingEngine;
use serde_json::{json, Value};
use tracing::Level;
use tt_pacer::session::PacerSession;
use tt_pacer::storage::MemoryStateStore;
use tt_pacer::sync::SyncHub;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests
///
/// `TEST_LOG=DEBUG` (or `TRACE`/`INFO`) turns on more output.
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fixed start of every scenario
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap()
}

/// `t0` plus whole seconds
pub fn at_secs(seconds: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(seconds)
}

/// Two 5 km segments of ten minutes each, 200 W then 250 W
pub fn two_segment_plan_json() -> Value {
    json!({
        "route": {"name": "Tempus Fugit", "distance_km": 10.0},
        "rider": {"ftp": 250, "weight": 72},
        "settings": {"wPrime": 20000},
        "summary": {"distance_km": 10.0, "duration_s": 1200},
        "intervals": [
            {"start_km": 0, "end_km": 5, "power_w": 200, "duration_s": 600, "avg_gradient": 0.1},
            {"start_km": 5, "end_km": 10, "power_w": 250, "duration_s": 600, "avg_gradient": 0.3}
        ]
    })
}

/// [`two_segment_plan_json`] as a typed plan
pub fn two_segment_plan() -> Plan {
    serde_json::from_value(two_segment_plan_json()).unwrap()
}

/// Engine with a fixed instance id and the fixture plan loaded
pub fn engine_with_plan(instance_id: &str) -> PacingEngine {
    let mut engine = PacingEngine::with_instance_id(PacingConfig::default(), instance_id);
    engine.set_plan(two_segment_plan(), true, t0());
    engine
}

/// Session over an in-memory store; the store is returned for inspection
pub fn memory_session(instance_id: &str, hub: &SyncHub) -> (PacerSession, MemoryStateStore) {
    let store = MemoryStateStore::new();
    let engine = PacingEngine::with_instance_id(PacingConfig::default(), instance_id);
    let session = PacerSession::new(engine, hub.clone(), Arc::new(store.clone()));
    (session, store)
}

/// Rider, event and course identity used to build snapshots
#[derive(Debug, Clone)]
pub struct Ride {
    pub athlete: &'static str,
    pub subgroup: Option<&'static str>,
    pub course: &'static str,
    pub total_m: f64,
}

impl Default for Ride {
    fn default() -> Self {
        Self {
            athlete: "1001",
            subgroup: Some("sg-42"),
            course: "6",
            total_m: 10_000.0,
        }
    }
}

impl Ride {
    /// Snapshot at `progress_m` into the event with the given race clock and power
    pub fn at(&self, progress_m: f64, race_clock: f64, power: f64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            power: Some(power),
            distance_meters: Some(progress_m),
            race_clock_seconds: Some(race_clock),
            athlete_id: Some(self.athlete.to_owned()),
            event_subgroup_id: self.subgroup.map(str::to_owned),
            course_id: Some(self.course.to_owned()),
            ftp: Some(250.0),
            remaining_metric: Some("distance".to_owned()),
            remaining_distance: Some((self.total_m - progress_m).max(0.0)),
            remaining_end_distance: Some(self.total_m),
            ..TelemetrySnapshot::default()
        }
    }

    /// Same ride as another athlete
    pub fn as_athlete(&self, athlete: &'static str) -> Self {
        Self {
            athlete,
            ..self.clone()
        }
    }
}

/// Approximate float equality
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
