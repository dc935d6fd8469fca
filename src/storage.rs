// ABOUTME: Persisted pacing state and the async StateStore abstraction with file and in-memory backends
// ABOUTME: Saves the plan, offsets, bias, smoothing window and home athlete between runs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # State Storage
//!
//! Persistence is best effort: callers log failures and carry on with the
//! in-memory state.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use pacing_core::errors::{AppError, AppResult};
use pacing_core::models::Plan;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

/// State that survives restarts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Manual distance offset (metres)
    #[serde(default)]
    pub distance_offset: f64,
    /// Power bias multiplier
    #[serde(default = "neutral_bias")]
    pub power_bias: f64,
    /// Display power smoothing window (seconds)
    #[serde(default)]
    pub power_smoothing_sec: f64,
    /// Locked home athlete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_athlete_id: Option<String>,
    /// Loaded plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}

const fn neutral_bias() -> f64 {
    1.0
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            distance_offset: 0.0,
            power_bias: neutral_bias(),
            power_smoothing_sec: 0.0,
            home_athlete_id: None,
            plan: None,
        }
    }
}

/// Storage backend for [`PersistedState`]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the saved state, `None` when nothing was saved yet
    ///
    /// # Errors
    ///
    /// Returns an error if stored state exists but cannot be read or decoded
    async fn load(&self) -> AppResult<Option<PersistedState>>;

    /// Replace the saved state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written
    async fn save(&self, state: &PersistedState) -> AppResult<()>;
}

/// JSON file backend
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Store at `path`; parent directories are created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> AppResult<Option<PersistedState>> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::storage(format!("read {}", self.path.display())).with_source(e))
            }
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        let state = serde_json::from_str(&text)?;
        debug!(path = %self.path.display(), "Loaded persisted state");
        Ok(Some(state))
    }

    async fn save(&self, state: &PersistedState) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let text = serde_json::to_string_pretty(state)?;
        // write then rename so a crash never leaves a truncated file
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, text).await?;
        fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), "Saved persisted state");
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    state: Arc<RwLock<Option<PersistedState>>>,
}

impl MemoryStateStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `state`
    #[must_use]
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Arc::new(RwLock::new(Some(state))),
        }
    }

    /// Last saved state
    pub async fn snapshot(&self) -> Option<PersistedState> {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> AppResult<Option<PersistedState>> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &PersistedState) -> AppResult<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}
