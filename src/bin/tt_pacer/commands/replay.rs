// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
// ABOUTME: Replay command feeding timed telemetry snapshots through a pacing session
// ABOUTME: Emits prediction changes, segment events and a final summary as JSON lines

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pacing_core::config::PacingConfig;
use pacing_core::models::TelemetrySnapshot;
use pacing_engine::display::format_delta_seconds;
use pacing_engine::PacingEngine;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tt_pacer::bridge::BridgeCommand;
use tt_pacer::config::SessionConfig;
use tt_pacer::session::PacerSession;
use tt_pacer::storage::{FileStateStore, MemoryStateStore, StateStore};
use tt_pacer::sync::SyncHub;

use super::read_plan;

/// Inputs of a replay
pub struct ReplayArgs {
    pub plan: PathBuf,
    pub telemetry: PathBuf,
    pub state: Option<PathBuf>,
    pub offset: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedSnapshot {
    at_ms: i64,
    #[serde(flatten)]
    snapshot: TelemetrySnapshot,
}

fn emit(value: &Value) {
    println!("{value}");
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let session_config = SessionConfig::from_env();
    let engine = PacingEngine::with_instance_id(
        PacingConfig::global().clone(),
        session_config.new_instance_id(),
    );
    let store: Arc<dyn StateStore> = match &args.state {
        Some(path) => Arc::new(FileStateStore::new(path)),
        None => Arc::new(MemoryStateStore::new()),
    };
    let mut session = PacerSession::new(engine, SyncHub::new(session_config.sync_capacity), store);

    let plan = read_plan(&args.plan).await?;
    let mut now = Utc::now();
    session
        .handle_command(BridgeCommand::SetPlan { plan }, now)
        .await
        .context("loading plan")?;
    if let Some(meters) = args.offset {
        session
            .handle_command(BridgeCommand::SetOffset { meters, clamp: false }, now)
            .await?;
    }

    let file = File::open(&args.telemetry)
        .await
        .with_context(|| format!("opening telemetry {}", args.telemetry.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0_usize;
    let mut ticks = 0_usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let timed: TimedSnapshot = match serde_json::from_str(&line) {
            Ok(timed) => timed,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed telemetry line");
                continue;
            }
        };
        let Some(at) = DateTime::<Utc>::from_timestamp_millis(timed.at_ms) else {
            warn!(line = line_no, at_ms = timed.at_ms, "Skipping telemetry with invalid timestamp");
            continue;
        };
        now = at;
        ticks += 1;

        let outcome = session.handle_telemetry(&timed.snapshot, now).await;
        if let Some(transition) = &outcome.transition {
            emit(&json!({"event": "lifecycle", "atMs": timed.at_ms, "transition": transition}));
        }
        if let Some(index) = outcome.finished_segment {
            let row = session.engine().rows().into_iter().nth(index);
            emit(&json!({"event": "segment-finished", "atMs": timed.at_ms, "row": row}));
        }
        if outcome.prediction_changed {
            let prediction = session.prediction();
            emit(&json!({
                "event": "prediction",
                "atMs": timed.at_ms,
                "segment": outcome.current_index,
                "prediction": prediction,
                "delta": prediction.map(|p| format_delta_seconds(Some(p.delta_seconds))),
            }));
        }
        if outcome.event_completed {
            emit(&json!({"event": "event-complete", "atMs": timed.at_ms}));
        }
    }

    let engine = session.engine();
    emit(&json!({
        "event": "summary",
        "ticks": ticks,
        "signature": engine.plan_signature(),
        "eventComplete": engine.event_complete(),
        "prediction": engine.prediction(),
        "progress": engine.progress_summary(),
        "rows": engine.rows(),
    }));
    info!(ticks, lines = line_no, "Replay finished");

    if args.state.is_some() {
        session.persist().await;
    }
    Ok(())
}
