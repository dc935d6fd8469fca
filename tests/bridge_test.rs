// ABOUTME: Host bridge command tests: decoding, engine effects and the patches they share
// ABOUTME: Covers plan loading with heavy-field stripping, offsets, home athlete and power bias controls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use common::{assert_close, at_secs, engine_with_plan, init_test_logging, Ride};
use pacing_core::config::PacingConfig;
use pacing_core::errors::ErrorCode;
use pacing_engine::bias::BiasDirection;
use pacing_engine::PacingEngine;
use serde_json::json;
use tt_pacer::bridge::BridgeCommand;

#[test]
fn test_set_plan_strips_geometry_and_shares_snapshot() -> Result<()> {
    init_test_logging();
    let command = BridgeCommand::from_json(
        &json!({
            "type": "tt-plan:set",
            "plan": {
                "route": {"name": "Volcano Flat", "points": [[0.0, 1.0], [2.0, 3.0]]},
                "chartData": [1, 2, 3],
                "intervals": [
                    {"start_km": 0, "end_km": 4, "power_w": 240, "duration_s": 400},
                    {"start_km": 4, "end_km": 8.2, "power_w": 260, "duration_text": "7:00"}
                ]
            }
        })
        .to_string(),
    )?;

    let mut engine = PacingEngine::with_instance_id(PacingConfig::default(), "pacer-a");
    engine.set_home_athlete(Some("1001"));
    let effect = command.apply(&mut engine, at_secs(3))?;

    assert!(effect.changed && effect.persist);
    assert!(engine.plan_signature().is_some());
    assert_eq!(engine.home_athlete_id(), None);

    let patch = serde_json::to_value(&effect.patch)?;
    assert_eq!(patch["plan"]["route"], json!({"name": "Volcano Flat"}));
    assert!(patch["plan"].get("chartData").is_none());
    assert_eq!(patch["powerBias"], json!(1.0));
    assert_eq!(patch["clearStatsTimestamp"], json!(at_secs(3).timestamp_millis()));
    Ok(())
}

#[test]
fn test_undecodable_commands_are_rejected() {
    let unknown = BridgeCommand::from_json(r#"{"type": "self-destruct"}"#).unwrap_err();
    assert_eq!(unknown.code, ErrorCode::InvalidFormat);

    let mut engine = engine_with_plan("pacer-a");
    let bad_plan = BridgeCommand::SetPlan {
        plan: json!({"intervals": "many"}),
    };
    let err = bad_plan.apply(&mut engine, at_secs(0)).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFormat);
    assert!(engine.plan().is_some());
}

#[test]
fn test_clear_plan_shares_null_plan() -> Result<()> {
    let mut engine = engine_with_plan("pacer-a");
    let effect = BridgeCommand::from_json(r#"{"type": "tt-plan:clear"}"#)?.apply(&mut engine, at_secs(9))?;
    assert!(engine.plan().is_none());
    assert_eq!(
        serde_json::to_value(&effect.patch)?,
        json!({"plan": null, "clearStatsTimestamp": at_secs(9).timestamp_millis()})
    );
    Ok(())
}

#[test]
fn test_offset_commands() -> Result<()> {
    let mut engine = engine_with_plan("pacer-a");

    let effect = BridgeCommand::from_json(r#"{"type": "set-offset", "meters": -900, "clamp": true}"#)?
        .apply(&mut engine, at_secs(0))?;
    assert!(effect.persist);
    assert_eq!(effect.patch.distance_offset, Some(-500.0));

    let same = BridgeCommand::SetOffset {
        meters: -500.0,
        clamp: false,
    }
    .apply(&mut engine, at_secs(1))?;
    assert!(!same.changed);
    assert!(same.patch.is_empty());

    let err = BridgeCommand::SetOffset {
        meters: f64::NAN,
        clamp: false,
    }
    .apply(&mut engine, at_secs(2))
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_close(engine.reconciliation().manual_offset_m, -500.0);
    Ok(())
}

#[test]
fn test_home_athlete_commands() -> Result<()> {
    let mut engine = engine_with_plan("pacer-a");

    let nothing_seen = BridgeCommand::LockHome.apply(&mut engine, at_secs(0))?;
    assert!(!nothing_seen.changed);

    let numeric = BridgeCommand::from_json(r#"{"type": "set-home-athlete", "athleteId": 1001}"#)?
        .apply(&mut engine, at_secs(1))?;
    assert_eq!(numeric.patch.home_athlete_id, Some(Some("1001".to_owned())));
    assert_eq!(engine.home_athlete_id(), Some("1001"));

    let cleared = BridgeCommand::ClearHomeAthlete.apply(&mut engine, at_secs(2))?;
    assert_eq!(cleared.patch.home_athlete_id, Some(None));

    let outcome = engine.handle_telemetry(&Ride::default().as_athlete("3003").at(0.0, 0.0, 100.0), at_secs(3));
    assert!(outcome.home_adopted);
    engine.set_home_athlete(Some("1001"));
    let locked = BridgeCommand::LockHome.apply(&mut engine, at_secs(5))?;
    assert!(locked.changed);
    assert_eq!(engine.home_athlete_id(), Some("3003"));
    Ok(())
}

#[test]
fn test_power_bias_commands() -> Result<()> {
    let mut engine = engine_with_plan("pacer-a");

    let up = BridgeCommand::AdjustPowerBias {
        direction: BiasDirection::Up,
    }
    .apply(&mut engine, at_secs(0))?;
    assert_close(up.patch.power_bias.expect("bias"), 1.01);

    let clamped = BridgeCommand::from_json(r#"{"type": "set-power-bias", "bias": 2.0}"#)?
        .apply(&mut engine, at_secs(1))?;
    assert_close(clamped.patch.power_bias.expect("bias"), 1.3);

    let again = BridgeCommand::SetPowerBias { bias: 1.5 }.apply(&mut engine, at_secs(2))?;
    assert!(!again.changed);
    Ok(())
}

#[test]
fn test_reset_tracking_is_shared_but_not_persisted() -> Result<()> {
    let ride = Ride::default();
    let mut engine = engine_with_plan("pacer-a");
    engine.handle_telemetry(&ride.at(0.0, 0.0, 150.0), at_secs(0));
    engine.handle_telemetry(&ride.at(10.0, 0.0, 200.0), at_secs(1));

    let effect = BridgeCommand::from_json(r#"{"type": "reset-tracking"}"#)?.apply(&mut engine, at_secs(2))?;
    assert!(effect.changed);
    assert!(!effect.persist);
    assert_eq!(effect.patch.clear_stats_timestamp, Some(at_secs(2).timestamp_millis()));
    assert!(engine.tracker().is_empty());
    Ok(())
}
