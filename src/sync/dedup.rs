// ABOUTME: Outbound de-duplication of predictions and interval averages, inbound filtering of remote messages
// ABOUTME: Publishers skip unchanged signatures; subscribers drop self, foreign-athlete and repeated messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::constants::tracking::INTERVAL_AVG_REBROADCAST_MS;
use pacing_core::models::{normalize_id, FinishPrediction};

use super::messages::{normalize_prediction, SyncMessage};
use super::shared_state::SharedStatePatch;

/// Builds outbound messages, suppressing ones that would repeat the last
#[derive(Debug, Clone)]
pub struct SyncPublisher {
    instance_id: String,
    last_prediction_signature: Option<String>,
    last_interval_signature: Option<Option<i64>>,
    last_interval_ms: i64,
}

impl SyncPublisher {
    /// Publisher stamping messages with `instance_id`
    #[must_use]
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            last_prediction_signature: None,
            last_interval_signature: None,
            last_interval_ms: 0,
        }
    }

    /// Identity stamped on messages
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Prediction message, or `None` when the signature is unchanged
    pub fn prediction(
        &mut self,
        athlete_id: Option<&str>,
        prediction: Option<&FinishPrediction>,
        now_ms: i64,
    ) -> Option<SyncMessage> {
        let signature = FinishPrediction::signature_of(prediction);
        if self.last_prediction_signature.as_deref() == Some(signature.as_str()) {
            return None;
        }
        self.last_prediction_signature = Some(signature.clone());
        Some(SyncMessage::FinishPrediction {
            instance_id: self.instance_id.clone(),
            athlete_id: athlete_id.and_then(normalize_id),
            signature,
            payload: prediction.map(|p| {
                let mut shared = p.to_shared(now_ms);
                shared.publisher_id = Some(self.instance_id.clone());
                shared
            }),
        })
    }

    /// Interval-average message; identical rounded watts are held back for 700 ms
    pub fn interval_avg(
        &mut self,
        athlete_id: Option<&str>,
        avg_power: Option<f64>,
        now_ms: i64,
    ) -> Option<SyncMessage> {
        let avg_power = avg_power.filter(|p| p.is_finite());
        let signature = avg_power.map(|p| p.round() as i64);
        if self.last_interval_signature == Some(signature)
            && now_ms - self.last_interval_ms < INTERVAL_AVG_REBROADCAST_MS
        {
            return None;
        }
        self.last_interval_signature = Some(signature);
        self.last_interval_ms = now_ms;
        Some(SyncMessage::IntervalAvg {
            instance_id: self.instance_id.clone(),
            athlete_id: athlete_id.and_then(normalize_id),
            avg_power,
            updated_at: now_ms,
        })
    }

    /// Shared-state message; empty patches are not sent
    #[must_use]
    pub fn shared_state(&self, patch: SharedStatePatch) -> Option<SyncMessage> {
        (!patch.is_empty()).then(|| SyncMessage::SharedState {
            instance_id: self.instance_id.clone(),
            patch,
        })
    }

    /// Forget what was published, e.g. after the topic scope changed
    pub fn forget(&mut self) {
        self.last_prediction_signature = None;
        self.last_interval_signature = None;
        self.last_interval_ms = 0;
    }
}

/// Remote update accepted by a [`SyncFilter`]
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteUpdate {
    /// Replace the prediction; `None` clears it
    Prediction(Option<FinishPrediction>),
    /// Another instance's live interval average
    IntervalAvg {
        /// Average power (watts)
        avg_power: Option<f64>,
        /// Publication time (unix ms)
        updated_at: i64,
    },
    /// Shared-state patch to apply
    SharedState(SharedStatePatch),
}

/// Drops messages a session must not act on
#[derive(Debug, Clone)]
pub struct SyncFilter {
    instance_id: String,
    last_signature: Option<String>,
}

impl SyncFilter {
    /// Filter for the session identified by `instance_id`
    #[must_use]
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            last_signature: None,
        }
    }

    /// Accept or drop a message
    ///
    /// Rejects messages sent by this instance, messages scoped to another
    /// athlete than `home_athlete` (when both are known), repeated prediction
    /// signatures and prediction payloads that do not normalise.
    pub fn accept(
        &mut self,
        message: SyncMessage,
        home_athlete: Option<&str>,
        received_at: i64,
    ) -> Option<RemoteUpdate> {
        if message.instance_id() == self.instance_id {
            return None;
        }
        let home = home_athlete.and_then(normalize_id);
        if let (Some(sender), Some(home)) = (message.athlete_id(), home) {
            if sender != home {
                return None;
            }
        }

        match message {
            SyncMessage::FinishPrediction {
                signature, payload, ..
            } => {
                if self.last_signature.as_deref() == Some(signature.as_str()) {
                    return None;
                }
                let update = match payload {
                    None => None,
                    Some(raw) => Some(normalize_prediction(&raw, received_at)?),
                };
                self.last_signature = Some(signature);
                Some(RemoteUpdate::Prediction(update))
            }
            SyncMessage::IntervalAvg {
                avg_power,
                updated_at,
                ..
            } => Some(RemoteUpdate::IntervalAvg {
                avg_power: avg_power.filter(|p| p.is_finite()),
                updated_at,
            }),
            SyncMessage::SharedState { patch, .. } => Some(RemoteUpdate::SharedState(patch)),
        }
    }
}
