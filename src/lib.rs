// ABOUTME: Main library entry point for the tt-pacer time-trial pacing service
// ABOUTME: Wires the pacing engine to logging, configuration, sync transport, persistence and bridge commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # tt-pacer
//!
//! Live pacing for time trials: a rider follows a plan of distance-bound
//! power segments while the engine tracks each segment against telemetry and
//! projects the finish time.
//!
//! ## Architecture
//!
//! - **pacing-core**: errors, constants, policy configuration, data models
//! - **pacing-engine**: the synchronous engine driven by telemetry ticks
//! - **sync**: cross-instance messages over a topic hub
//! - **storage**: persisted state behind an async store trait
//! - **bridge**: host commands (plan, offset, home athlete, bias)
//! - **session**: one engine plus its I/O collaborators
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use tt_pacer::config::{PacingConfig, SessionConfig};
//! use tt_pacer::session::PacerSession;
//! use tt_pacer::storage::FileStateStore;
//! use tt_pacer::sync::SyncHub;
//! use pacing_engine::PacingEngine;
//!
//! # async fn example() -> Result<(), pacing_core::errors::AppError> {
//! let session_config = SessionConfig::from_env();
//! let engine = PacingEngine::with_instance_id(
//!     PacingConfig::global().clone(),
//!     session_config.new_instance_id(),
//! );
//! let store = Arc::new(FileStateStore::new(&session_config.state_path));
//! let mut session = PacerSession::new(engine, SyncHub::new(session_config.sync_capacity), store);
//! session.restore(Utc::now()).await?;
//! # Ok(())
//! # }
//! ```

/// Host-facing bridge commands
pub mod bridge;

/// Pacing policy and session configuration
pub mod config;

/// Structured logging setup
pub mod logging;

/// Engine session with sync and persistence
pub mod session;

/// Persisted state and stores
pub mod storage;

/// Cross-instance synchronisation
pub mod sync;
