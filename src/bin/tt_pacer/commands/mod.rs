// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
// ABOUTME: Re-exports command modules for tt-pacer
// ABOUTME: Provides the replay and plan signature commands plus shared plan loading

pub mod replay;
pub mod signature;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;

/// Read a plan document as raw JSON
pub async fn read_plan(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading plan {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing plan {}", path.display()))
}
