// ABOUTME: In-process publish/subscribe hub carrying JSON sync messages per named topic
// ABOUTME: Lazily creates one tokio broadcast channel per topic; delivery is best effort
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;
use std::sync::Arc;

use pacing_core::errors::{AppError, AppResult};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use super::messages::SyncMessage;

/// Topic registry shared by every session in the process
///
/// Messages travel as JSON text so the hub behaves like any other
/// cross-process transport.
#[derive(Debug, Clone)]
pub struct SyncHub {
    capacity: usize,
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
}

impl SyncHub {
    /// Create a hub buffering `capacity` messages per topic
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        if let Some(sender) = self.topics.read().await.get(topic) {
            return sender.clone();
        }
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish a message; returns how many subscribers received it
    ///
    /// A topic without subscribers is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be encoded
    pub async fn publish(&self, topic: &str, message: &SyncMessage) -> AppResult<usize> {
        let encoded = serde_json::to_string(message)
            .map_err(|e| AppError::transport(format!("encode {topic}: {e}")).with_source(e))?;
        let sender = self.sender(topic).await;
        match sender.send(encoded) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                debug!(topic, "No subscribers for sync message");
                Ok(0)
            }
        }
    }

    /// Subscribe to a topic
    pub async fn subscribe(&self, topic: &str) -> SyncSubscription {
        SyncSubscription {
            topic: topic.to_owned(),
            receiver: self.sender(topic).await.subscribe(),
        }
    }

    /// Current subscriber count of a topic
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

/// Receiving end of one topic
#[derive(Debug)]
pub struct SyncSubscription {
    topic: String,
    receiver: broadcast::Receiver<String>,
}

impl SyncSubscription {
    /// Topic name
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next decodable message; `None` once the topic is gone
    ///
    /// Malformed messages and lag gaps are logged and skipped.
    pub async fn recv(&mut self) -> Option<SyncMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(text) => match serde_json::from_str(&text) {
                    Ok(message) => return Some(message),
                    Err(e) => warn!(topic = %self.topic, error = %e, "Dropping malformed sync message"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Sync subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next message already queued, without waiting
    pub fn try_recv(&mut self) -> Option<SyncMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(text) => match serde_json::from_str(&text) {
                    Ok(message) => return Some(message),
                    Err(e) => warn!(topic = %self.topic, error = %e, "Dropping malformed sync message"),
                },
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Sync subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}
