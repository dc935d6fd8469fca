// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
// ABOUTME: Plan signature command printing the fingerprint and derived totals of a plan
// ABOUTME: Uses the same loading path as the engine so summary corrections apply

use std::path::Path;

use anyhow::{Context, Result};
use pacing_core::models::Plan;
use pacing_engine::display::format_countdown;
use pacing_engine::LoadedPlan;
use serde_json::json;
use tt_pacer::sync::strip_heavy_fields;

use super::read_plan;

pub async fn run(path: &Path) -> Result<()> {
    let raw = read_plan(path).await?;
    let plan: Plan = serde_json::from_value(strip_heavy_fields(&raw))
        .with_context(|| format!("decoding plan {}", path.display()))?;
    let loaded = LoadedPlan::new(plan);
    let stats = loaded.stats();

    println!(
        "{}",
        json!({
            "signature": loaded.signature(),
            "route": loaded.plan().route_name(),
            "segments": loaded.plan().len(),
            "stats": stats,
            "plannedTime": format_countdown(stats.display_duration_s),
        })
    );
    Ok(())
}
