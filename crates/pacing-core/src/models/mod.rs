// ABOUTME: Core data models for the pacing engine
// ABOUTME: Re-exports plan, telemetry snapshot and finish prediction types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! - `Plan` / `Segment`: the authored pacing plan, immutable once loaded
//! - `TelemetrySnapshot`: one inbound sample of live rider data
//! - `FinishPrediction`: the projected finish time published to other views

mod plan;
mod prediction;
mod telemetry;

pub use plan::{Plan, PlanSettings, PlanSummary, RiderSettings, RouteInfo, Segment};
pub use prediction::{FinishPrediction, SharedPrediction};
pub use telemetry::{finite, normalize_id, TelemetrySnapshot};
