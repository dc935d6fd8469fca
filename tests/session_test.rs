// ABOUTME: Pacer session tests with two instances sharing one sync hub
// ABOUTME: Covers state restore, persistence on change, prediction and interval-average fan-out and plan sharing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{
    assert_close, at_secs, init_test_logging, memory_session, two_segment_plan,
    two_segment_plan_json, Ride,
};
use pacing_core::config::PacingConfig;
use pacing_engine::PacingEngine;
use serde_json::json;
use tt_pacer::bridge::BridgeCommand;
use tt_pacer::session::PacerSession;
use tt_pacer::storage::{MemoryStateStore, PersistedState};
use tt_pacer::sync::{SyncHub, SyncMessage, SyncSubscription};

async fn drain(session: &mut PacerSession, subscription: &mut SyncSubscription, seconds: i64) -> usize {
    let mut applied = 0;
    while let Some(message) = subscription.try_recv() {
        if session.handle_sync_message(message, at_secs(seconds)).await {
            applied += 1;
        }
    }
    applied
}

#[tokio::test]
async fn test_restore_applies_persisted_state() -> Result<()> {
    init_test_logging();
    let store = MemoryStateStore::with_state(PersistedState {
        distance_offset: 40.0,
        power_bias: 0.97,
        power_smoothing_sec: 1.5,
        home_athlete_id: Some("1001".to_owned()),
        plan: Some(two_segment_plan()),
    });
    let engine = PacingEngine::with_instance_id(PacingConfig::default(), "pacer-a");
    let mut session = PacerSession::new(engine, SyncHub::new(8), Arc::new(store));

    assert!(session.restore(at_secs(0)).await?);
    let engine = session.engine();
    assert!(engine.plan_signature().is_some());
    assert_close(engine.reconciliation().manual_offset_m, 40.0);
    assert_close(engine.power_bias().value(), 0.97);
    assert_eq!(engine.home_athlete_id(), Some("1001"));
    assert_close(session.power_smoothing_seconds(), 1.5);

    let persisted = session.persisted_state();
    assert_close(persisted.power_bias, 0.97);
    assert_eq!(persisted.home_athlete_id.as_deref(), Some("1001"));
    Ok(())
}

#[tokio::test]
async fn test_restore_with_empty_store() -> Result<()> {
    let (mut session, _store) = memory_session("pacer-a", &SyncHub::new(8));
    assert!(!session.restore(at_secs(0)).await?);
    assert!(session.engine().plan().is_none());
    Ok(())
}

#[tokio::test]
async fn test_plan_command_is_shared_and_persisted() -> Result<()> {
    init_test_logging();
    let hub = SyncHub::new(16);
    let (mut overlay, overlay_store) = memory_session("pacer-a", &hub);
    let (mut dashboard, dashboard_store) = memory_session("pacer-b", &hub);
    let mut overlay_shared = overlay.subscribe_shared_state().await;
    let mut dashboard_shared = dashboard.subscribe_shared_state().await;

    overlay
        .handle_command(
            BridgeCommand::SetPlan {
                plan: two_segment_plan_json(),
            },
            at_secs(0),
        )
        .await?;
    let saved = overlay_store.snapshot().await.expect("persisted");
    assert!(saved.plan.is_some());

    // own echoes are ignored
    assert_eq!(drain(&mut overlay, &mut overlay_shared, 0).await, 0);

    assert_eq!(drain(&mut dashboard, &mut dashboard_shared, 1).await, 1);
    assert_eq!(
        dashboard.engine().plan_signature(),
        overlay.engine().plan_signature()
    );
    assert!(dashboard_store.snapshot().await.expect("persisted").plan.is_some());

    overlay
        .handle_command(BridgeCommand::SetPowerBias { bias: 1.05 }, at_secs(2))
        .await?;
    assert_eq!(drain(&mut dashboard, &mut dashboard_shared, 3).await, 1);
    assert_close(dashboard.engine().power_bias().value(), 1.05);
    Ok(())
}

#[tokio::test]
async fn test_predictions_reach_a_viewer_of_the_same_athlete() -> Result<()> {
    init_test_logging();
    let hub = SyncHub::new(16);
    let (mut rider, rider_store) = memory_session("pacer-a", &hub);
    let (mut viewer, _viewer_store) = memory_session("pacer-b", &hub);

    viewer
        .handle_command(
            BridgeCommand::SetHomeAthlete {
                athlete_id: json!("1001"),
            },
            at_secs(0),
        )
        .await?;
    let mut predictions = viewer.subscribe_predictions().await;
    let mut interval_avg = viewer.subscribe_interval_avg().await;
    assert_eq!(predictions.topic(), "tt:predictions:1001");

    rider
        .handle_command(
            BridgeCommand::SetPlan {
                plan: two_segment_plan_json(),
            },
            at_secs(0),
        )
        .await?;

    let ride = Ride::default();
    let first = rider.handle_telemetry(&ride.at(0.0, 0.0, 150.0), at_secs(0)).await;
    assert!(first.home_adopted);
    let saved = rider_store.snapshot().await.expect("persisted on adoption");
    assert_eq!(saved.home_athlete_id.as_deref(), Some("1001"));

    rider.handle_telemetry(&ride.at(10.0, 0.0, 200.0), at_secs(1)).await;
    rider.handle_telemetry(&ride.at(100.0, 10.0, 200.0), at_secs(11)).await;

    assert!(drain(&mut viewer, &mut predictions, 12).await >= 1);
    let shared = viewer.prediction().expect("remote prediction");
    let local = rider.prediction().expect("local prediction");
    assert_close(shared.predicted_seconds, local.predicted_seconds);
    assert_eq!(shared.publisher_id, "pacer-a");

    drain(&mut viewer, &mut interval_avg, 12).await;
    let remote = viewer.remote_interval_avg().expect("interval average");
    assert_close(remote.avg_power.expect("avg power"), 200.0);
    assert_eq!(remote.updated_at, at_secs(11).timestamp_millis());
    Ok(())
}

#[tokio::test]
async fn test_other_athletes_predictions_are_ignored() -> Result<()> {
    let hub = SyncHub::new(8);
    let (mut viewer, _store) = memory_session("pacer-b", &hub);
    viewer
        .handle_command(
            BridgeCommand::SetHomeAthlete {
                athlete_id: json!(1001),
            },
            at_secs(0),
        )
        .await?;

    let message: SyncMessage = serde_json::from_value(json!({
        "type": "finish-prediction",
        "instanceId": "pacer-c",
        "athleteId": "2002",
        "signature": "12000|6000|0",
        "payload": {"predictedSeconds": 1200, "remainingSeconds": 600}
    }))?;
    assert!(!viewer.handle_sync_message(message, at_secs(1)).await);
    assert!(viewer.prediction().is_none());
    Ok(())
}

#[tokio::test]
async fn test_power_smoothing_is_persisted_and_applied() -> Result<()> {
    let hub = SyncHub::new(8);
    let (mut session, store) = memory_session("pacer-a", &hub);

    session.set_power_smoothing(2.2).await;
    assert_close(session.power_smoothing_seconds(), 2.0);
    let saved = store.snapshot().await.expect("persisted");
    assert_close(saved.power_smoothing_sec, 2.0);

    let ride = Ride::default();
    session.handle_telemetry(&ride.at(0.0, 0.0, 200.0), at_secs(0)).await;
    assert_eq!(session.display_power(), Some(200.0));
    session.handle_telemetry(&ride.at(0.0, 0.0, 300.0), at_secs(2)).await;
    let smoothed = session.display_power().expect("display power");
    assert!(smoothed > 200.0 && smoothed < 300.0, "smoothed {smoothed}");
    Ok(())
}
