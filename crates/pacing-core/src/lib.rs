// ABOUTME: Core types and constants for the time-trial pacing engine
// ABOUTME: Foundation crate with error handling, policy configuration, and data models
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pacing Core
//!
//! Foundation crate providing shared types and constants for the time-trial
//! pacing engine. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Pacing policy defaults and numeric limits
//! - **config**: Configurable pacing policy (`PacingConfig`) with env overrides
//! - **models**: Plan, segment, telemetry snapshot and finish prediction types

/// Unified error handling system with standard error codes
pub mod errors;

/// Pacing constants organized by concern
pub mod constants;

/// Configurable pacing policy with environment overrides
pub mod config;

/// Core data models (Plan, Segment, `TelemetrySnapshot`, `FinishPrediction`)
pub mod models;
