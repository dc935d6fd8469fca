// ABOUTME: Cross-instance sync tests over the in-process topic hub
// ABOUTME: Covers topic delivery, publish de-duplication, echo and athlete filtering, and shared-state patches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use common::{assert_close, at_secs, engine_with_plan, init_test_logging, two_segment_plan, Ride};
use pacing_core::config::PacingConfig;
use pacing_core::models::{FinishPrediction, SharedPrediction};
use pacing_engine::PacingEngine;
use serde_json::json;
use tt_pacer::sync::{
    prediction_topic, PatchOutcome, RemoteUpdate, SharedStatePatch, SyncFilter, SyncHub,
    SyncMessage, SyncPublisher,
};

fn prediction(predicted: f64, remaining: f64, delta: f64) -> FinishPrediction {
    FinishPrediction {
        predicted_seconds: predicted,
        predicted_text: String::new(),
        delta_seconds: delta,
        remaining_delta_seconds: delta,
        elapsed_seconds: predicted - remaining,
        remaining_seconds: remaining,
        remaining_plan_seconds: remaining - delta,
        pacing_ratio: 1.0,
        updated_at: 0,
        publisher_id: "pacer-b".to_owned(),
    }
}

// ================================================================================================
// Hub
// ================================================================================================

#[tokio::test]
async fn test_hub_delivers_to_every_subscriber_of_a_topic() -> Result<()> {
    init_test_logging();
    let hub = SyncHub::new(8);
    let topic = prediction_topic(Some("1001"));
    let mut first = hub.subscribe(&topic).await;
    let mut second = hub.subscribe(&topic).await;
    let mut other = hub.subscribe(&prediction_topic(Some("2002"))).await;
    assert_eq!(hub.subscriber_count(&topic).await, 2);

    let mut publisher = SyncPublisher::new("pacer-a");
    let message = publisher
        .prediction(Some("1001"), Some(&prediction(1200.0, 600.0, 0.0)), 1_000)
        .expect("first publish");
    assert_eq!(hub.publish(&topic, &message).await?, 2);

    assert_eq!(first.recv().await, Some(message.clone()));
    assert_eq!(second.try_recv(), Some(message));
    assert_eq!(other.try_recv(), None);
    assert_eq!(first.topic(), "tt:predictions:1001");
    Ok(())
}

#[tokio::test]
async fn test_publish_without_subscribers_is_not_an_error() -> Result<()> {
    let hub = SyncHub::new(4);
    let message = SyncPublisher::new("pacer-a")
        .shared_state(SharedStatePatch {
            power_bias: Some(1.02),
            ..SharedStatePatch::default()
        })
        .expect("non-empty patch");
    assert_eq!(hub.publish("tt:shared-state", &message).await?, 0);
    Ok(())
}

// ================================================================================================
// Publisher and filter
// ================================================================================================

#[test]
fn test_publisher_skips_unchanged_prediction() {
    let mut publisher = SyncPublisher::new("pacer-a");
    let first = prediction(1200.0, 600.0, 0.0);
    assert!(publisher.prediction(None, Some(&first), 0).is_some());

    // differences below a tenth of a second share a signature
    let jitter = prediction(1200.04, 600.0, 0.0);
    assert!(publisher.prediction(None, Some(&jitter), 10).is_none());

    let cleared = publisher.prediction(None, None, 20).expect("clear is a change");
    assert!(matches!(cleared, SyncMessage::FinishPrediction { payload: None, .. }));

    publisher.forget();
    assert!(publisher.prediction(None, None, 30).is_some());
}

#[test]
fn test_published_payload_is_stamped_with_publisher() {
    let mut publisher = SyncPublisher::new("pacer-a");
    let message = publisher
        .prediction(Some(" 1001 "), Some(&prediction(1140.0, 570.0, -60.0)), 5_000)
        .unwrap();
    let SyncMessage::FinishPrediction {
        instance_id,
        athlete_id,
        payload,
        ..
    } = message
    else {
        panic!("expected a prediction message");
    };
    assert_eq!(instance_id, "pacer-a");
    assert_eq!(athlete_id.as_deref(), Some("1001"));
    let payload = payload.expect("payload");
    assert_eq!(payload.publisher_id.as_deref(), Some("pacer-a"));
    assert_eq!(payload.updated_at, Some(5_000));
}

#[test]
fn test_filter_drops_foreign_athlete_and_repeats() {
    let mut publisher = SyncPublisher::new("pacer-b");
    let mut filter = SyncFilter::new("pacer-a");

    let foreign = SyncPublisher::new("pacer-c")
        .prediction(Some("2002"), Some(&prediction(1300.0, 700.0, 100.0)), 0)
        .unwrap();
    assert_eq!(filter.accept(foreign, Some("1001"), 0), None);

    let message = publisher
        .prediction(Some("1001"), Some(&prediction(1140.0, 570.0, -60.0)), 0)
        .unwrap();
    let Some(RemoteUpdate::Prediction(Some(accepted))) =
        filter.accept(message.clone(), Some("1001"), 0)
    else {
        panic!("expected an accepted prediction");
    };
    assert_close(accepted.predicted_seconds, 1140.0);
    assert_eq!(accepted.publisher_id, "pacer-b");

    assert_eq!(filter.accept(message, Some("1001"), 0), None);
}

#[test]
fn test_filter_rejects_payload_without_finite_times() {
    let mut filter = SyncFilter::new("pacer-a");
    let message = SyncMessage::FinishPrediction {
        instance_id: "pacer-b".to_owned(),
        athlete_id: None,
        signature: "x".to_owned(),
        payload: Some(SharedPrediction {
            predicted_seconds: Some(1200.0),
            ..SharedPrediction::default()
        }),
    };
    assert_eq!(filter.accept(message, None, 0), None);
}

#[test]
fn test_wire_format_decodes_loose_payload() {
    let message: SyncMessage = serde_json::from_value(json!({
        "type": "finish-prediction",
        "instanceId": "pacer-b",
        "athleteId": "1001",
        "signature": "11400|5700|-600",
        "payload": {"predictedSeconds": 1140, "remainingSeconds": 570, "predictedText": " "}
    }))
    .unwrap();

    let mut filter = SyncFilter::new("pacer-a");
    let Some(RemoteUpdate::Prediction(Some(accepted))) = filter.accept(message, None, 42) else {
        panic!("expected an accepted prediction");
    };
    assert_eq!(accepted.predicted_text, "19:00");
    assert_close(accepted.delta_seconds, 0.0);
    assert_close(accepted.pacing_ratio, 1.0);
    assert_eq!(accepted.updated_at, 42);
}

// ================================================================================================
// Shared state
// ================================================================================================

#[test]
fn test_shared_plan_applies_once() {
    init_test_logging();
    let mut engine = PacingEngine::with_instance_id(PacingConfig::default(), "pacer-a");
    let patch = SharedStatePatch::with_plan(Some(&two_segment_plan())).unwrap();

    let first = patch.apply_to(&mut engine, at_secs(0));
    assert!(first.plan_changed);
    assert!(first.needs_persist());
    let signature = engine.plan_signature().map(str::to_owned);
    assert!(signature.is_some());

    let second = patch.apply_to(&mut engine, at_secs(1));
    assert_eq!(second, PatchOutcome::default());
    assert_eq!(engine.plan_signature().map(str::to_owned), signature);
}

#[test]
fn test_shared_plan_keeps_home_and_null_clears() {
    init_test_logging();
    let mut engine = engine_with_plan("pacer-a");
    engine.set_home_athlete(Some("1001"));

    let patch: SharedStatePatch = serde_json::from_value(json!({"plan": null})).unwrap();
    let outcome = patch.apply_to(&mut engine, at_secs(5));
    assert!(outcome.plan_changed);
    assert!(engine.plan().is_none());
    assert_eq!(engine.home_athlete_id(), Some("1001"));
}

#[test]
fn test_clear_stats_only_when_newer() {
    let ride = Ride::default();
    let mut engine = engine_with_plan("pacer-a");
    engine.handle_telemetry(&ride.at(0.0, 0.0, 150.0), at_secs(0));
    engine.handle_telemetry(&ride.at(10.0, 0.0, 200.0), at_secs(1));
    engine.handle_telemetry(&ride.at(100.0, 10.0, 200.0), at_secs(11));
    assert!(!engine.tracker().is_empty());

    let stale = SharedStatePatch {
        clear_stats_timestamp: Some(at_secs(0).timestamp_millis()),
        ..SharedStatePatch::default()
    };
    assert!(!stale.apply_to(&mut engine, at_secs(12)).stats_cleared);
    assert!(!engine.tracker().is_empty());

    let fresh = SharedStatePatch {
        clear_stats_timestamp: Some(at_secs(12).timestamp_millis()),
        ..SharedStatePatch::default()
    };
    assert!(fresh.apply_to(&mut engine, at_secs(12)).stats_cleared);
    assert!(engine.tracker().is_empty());
    assert!(!engine.event_has_started());
}

#[test]
fn test_patch_fields_apply_independently() {
    let mut engine = engine_with_plan("pacer-a");
    let patch: SharedStatePatch = serde_json::from_value(json!({
        "powerBias": 1.04,
        "distanceOffset": 750,
        "homeAthleteId": " 1001 ",
        "finishPrediction": {"predictedSeconds": 1190, "remainingSeconds": 590, "deltaSeconds": -10, "publisherId": "pacer-b"}
    }))
    .unwrap();

    let outcome = patch.apply_to(&mut engine, at_secs(0));
    assert!(outcome.bias_changed && outcome.offset_changed && outcome.home_changed);
    assert!(outcome.prediction_changed);
    assert!(!outcome.plan_changed);

    assert_close(engine.power_bias().value(), 1.04);
    // shared offsets are not clamped
    assert_close(engine.reconciliation().manual_offset_m, 750.0);
    assert_eq!(engine.home_athlete_id(), Some("1001"));
    let prediction = engine.prediction().expect("remote prediction");
    assert_close(prediction.remaining_plan_seconds, 600.0);
    assert_eq!(prediction.publisher_id, "pacer-b");
}
