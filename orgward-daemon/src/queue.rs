//! The durable FIFO queue port and its in-memory implementation.
//!
//! The production queue is an external FIFO service; implementations must
//! honour the dedup contract (`delivery_id` is the deduplication id, the
//! process name the message group id) so that a forge redelivery within the
//! dedup window cannot be processed twice.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// One webhook delivery, wrapped for queueing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub installation_id: i64,
    pub event_type: String,
    pub delivery_id: String,
    pub payload: String,
}

/// Opaque token identifying a received message until it is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptHandle(pub String);

/// Contract over the FIFO queue.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Put the message on the queue.
    async fn submit(&self, message: &QueueMessage) -> Result<(), DaemonError>;

    /// Fetch at most one message. An empty vector means the queue is idle.
    async fn receive(&self) -> Result<Vec<(QueueMessage, ReceiptHandle)>, DaemonError>;

    /// Remove a received message, marking it successfully processed.
    async fn delete(&self, handle: ReceiptHandle) -> Result<(), DaemonError>;

    /// Cheap liveness probe for the smoke surface.
    async fn probe(&self) -> Result<(), DaemonError>;
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueueMessage>,
    in_flight: HashMap<String, QueueMessage>,
    seen_delivery_ids: HashSet<String>,
    next_handle: u64,
}

/// In-process FIFO queue with delivery-id deduplication.
#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of messages waiting to be received.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }
}

#[async_trait]
impl EventQueue for InMemoryQueue {
    async fn submit(&self, message: &QueueMessage) -> Result<(), DaemonError> {
        let mut state = self.lock();
        if !state.seen_delivery_ids.insert(message.delivery_id.clone()) {
            tracing::debug!(
                delivery_id = %message.delivery_id,
                "dropping duplicate delivery"
            );
            return Ok(());
        }
        state.pending.push_back(message.clone());
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<(QueueMessage, ReceiptHandle)>, DaemonError> {
        let mut state = self.lock();
        match state.pending.pop_front() {
            Some(message) => {
                let handle = ReceiptHandle(state.next_handle.to_string());
                state.next_handle += 1;
                state.in_flight.insert(handle.0.clone(), message.clone());
                Ok(vec![(message, handle)])
            }
            None => Ok(Vec::new()),
        }
    }

    async fn delete(&self, handle: ReceiptHandle) -> Result<(), DaemonError> {
        self.lock().in_flight.remove(&handle.0);
        Ok(())
    }

    async fn probe(&self) -> Result<(), DaemonError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(delivery_id: &str) -> QueueMessage {
        QueueMessage {
            installation_id: 42,
            event_type: "team".to_string(),
            delivery_id: delivery_id.to_string(),
            payload: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn messages_come_back_in_fifo_order() {
        let queue = InMemoryQueue::new();
        queue.submit(&message("a")).await.expect("submit a");
        queue.submit(&message("b")).await.expect("submit b");

        let first = queue.receive().await.expect("receive");
        assert_eq!(first[0].0.delivery_id, "a");
        let second = queue.receive().await.expect("receive");
        assert_eq!(second[0].0.delivery_id, "b");
        assert!(queue.receive().await.expect("receive").is_empty());
    }

    #[tokio::test]
    async fn duplicate_deliveries_are_dropped() {
        let queue = InMemoryQueue::new();
        queue.submit(&message("dup")).await.expect("submit");
        queue.submit(&message("dup")).await.expect("resubmit");

        assert_eq!(queue.pending(), 1);
    }

    #[tokio::test]
    async fn delete_settles_the_receipt() {
        let queue = InMemoryQueue::new();
        queue.submit(&message("a")).await.expect("submit");

        let mut batch = queue.receive().await.expect("receive");
        let (_, handle) = batch.pop().expect("one message");
        queue.delete(handle).await.expect("delete");

        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn message_envelope_round_trips_as_camel_case_json() {
        let encoded = serde_json::to_string(&message("d-1")).expect("encode");
        assert!(encoded.contains("\"installationId\":42"));
        assert!(encoded.contains("\"deliveryId\":\"d-1\""));
        let back: QueueMessage = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(back, message("d-1"));
    }
}
