// ABOUTME: Cross-instance synchronisation of predictions, interval averages and shared session state
// ABOUTME: Message types, topic naming, publish de-duplication, subscriber filtering and the in-process hub
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Sync
//!
//! Instances never share memory. Each message carries a full value plus the
//! sender's instance id and a signature, so receivers can apply it
//! idempotently and ignore their own echoes.

/// Publish de-duplication and inbound filtering
pub mod dedup;
/// Topic registry over tokio broadcast channels
pub mod hub;
/// Message types and topic names
pub mod messages;
/// Shared-state patches
pub mod shared_state;

pub use dedup::{RemoteUpdate, SyncFilter, SyncPublisher};
pub use hub::{SyncHub, SyncSubscription};
pub use messages::{interval_avg_topic, normalize_prediction, prediction_topic, SyncMessage};
pub use shared_state::{strip_heavy_fields, PatchOutcome, SharedStatePatch};
