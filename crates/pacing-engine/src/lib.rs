// ABOUTME: Time-trial pacing engine: plan reconciliation, segment tracking and finish prediction
// ABOUTME: Pure synchronous state machine driven by telemetry snapshots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pacing Engine
//!
//! Everything that turns a pacing plan plus live telemetry into tracking
//! state and a finish-time projection. No I/O happens here; transports and
//! storage live in the root crate.
//!
//! ## Modules
//!
//! - **duration** / **signature**: duration parsing and plan fingerprints
//! - **reconciliation**: plan-to-course distance mapping and offsets
//! - **locator**: active segment lookup
//! - **tracking**: per-segment runs with power integration
//! - **wbal**: W' balance model
//! - **prediction**: finish-time projection
//! - **lifecycle**: event start and reset detection
//! - **engine**: the [`PacingEngine`] tying it all together

/// Bias multiplier on target power
pub mod bias;
/// Countdown formatting and display smoothing
pub mod display;
/// Segment duration parsing
pub mod duration;
/// Per-session engine and telemetry tick
pub mod engine;
/// Event lifecycle detection
pub mod lifecycle;
/// Active segment lookup
pub mod locator;
/// Plan load-time derivations
pub mod plan_stats;
/// Finish-time projection
pub mod prediction;
/// Plan to course distance mapping
pub mod reconciliation;
/// Plan-over-telemetry metric resolution
pub mod resolve;
/// Plan fingerprint
pub mod signature;
/// Rows and progress summary for rendering
pub mod summary;
/// Segment run tracking
pub mod tracking;
/// W' balance model
pub mod wbal;

pub use engine::{PacingEngine, TickOutcome};
pub use lifecycle::LifecycleTransition;
pub use plan_stats::LoadedPlan;
pub use summary::{ProgressSummary, SegmentRow};
