// ABOUTME: Configuration module for the pacer service
// ABOUTME: Re-exports the pacing policy and the session settings loaded from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Configuration module for tt-pacer
//!
//! - **Pacing policy**: thresholds used by the engine, see [`PacingConfig`]
//! - **Session**: persisted-state location, sync channel sizing and instance naming

/// Session settings (state file, sync capacity, instance id)
pub mod session;

pub use pacing_core::config::{ConfigError, PacingConfig};
pub use session::SessionConfig;
