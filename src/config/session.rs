// ABOUTME: Session configuration for the pacer service loaded from TT_PACER_* environment variables
// ABOUTME: Resolves the persisted-state path, sync channel capacity and instance id prefix
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::path::PathBuf;

use pacing_core::constants::service_names;
use pacing_core::constants::session::{DEFAULT_SYNC_CAPACITY, STATE_DIR_NAME, STATE_FILE_NAME};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-process session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File holding the persisted pacing state
    pub state_path: PathBuf,
    /// Buffered messages per sync topic
    pub sync_capacity: usize,
    /// Prefix for generated instance ids
    pub instance_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            sync_capacity: DEFAULT_SYNC_CAPACITY,
            instance_prefix: service_names::TT_PACER.to_owned(),
        }
    }
}

impl SessionConfig {
    /// Load session configuration from environment
    ///
    /// `TT_PACER_STATE_PATH`, `TT_PACER_SYNC_CAPACITY` and
    /// `TT_PACER_INSTANCE_PREFIX`; unparseable or zero capacities fall back to
    /// the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            state_path: env::var("TT_PACER_STATE_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty())
                .map_or_else(default_state_path, PathBuf::from),
            sync_capacity: env::var("TT_PACER_SYNC_CAPACITY")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_SYNC_CAPACITY),
            instance_prefix: env::var("TT_PACER_INSTANCE_PREFIX")
                .ok()
                .map(|prefix| prefix.trim().to_owned())
                .filter(|prefix| !prefix.is_empty())
                .unwrap_or_else(|| service_names::TT_PACER.to_owned()),
        }
    }

    /// Fresh instance id, `<prefix>-<uuid>`
    #[must_use]
    pub fn new_instance_id(&self) -> String {
        format!("{}-{}", self.instance_prefix, Uuid::new_v4().simple())
    }
}

/// `<config dir>/tt-pacer/state.json`, relative to the working directory when no config dir exists
fn default_state_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_DIR_NAME)
        .join(STATE_FILE_NAME)
}
