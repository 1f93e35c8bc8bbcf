//! The single-flight queue worker.
//!
//! One message is processed end-to-end before the next receive; running two
//! workers against the same queue is unsupported by design. Every message
//! is deleted after dispatch irrespective of outcome — retries rely on
//! forge redelivery and the queue's dedup window.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use orgward_engine::Platform;

use crate::error::DaemonError;
use crate::event::{dispatch, TeamEvent};
use crate::queue::{EventQueue, QueueMessage};

/// How long the worker sleeps when the queue reports no messages.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Consume the queue until shutdown. Queue transport failures close the
/// loop; dispatch failures are logged and the message is still deleted.
pub async fn run_worker(
    plat: Arc<Platform>,
    queue: Arc<dyn EventQueue>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    tracing::info!("starting event worker");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            received = queue.receive() => {
                let batch = received?;

                if batch.len() > 1 {
                    return Err(DaemonError::Protocol(format!(
                        "received too many messages from the queue (expected 1, received {})",
                        batch.len()
                    )));
                }

                let Some((message, handle)) = batch.into_iter().next() else {
                    tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                    continue;
                };

                process_message(&plat, &message).await;

                if let Err(err) = queue.delete(handle).await {
                    tracing::error!(error = %err, "failed to delete message");
                }
            }
        }
    }

    tracing::info!("event worker stopped");
    Ok(())
}

/// Parse and dispatch one message. Malformed payloads are dropped; fork
/// repositories are short-circuited.
async fn process_message(plat: &Platform, message: &QueueMessage) {
    let event: TeamEvent = match serde_json::from_str(&message.payload) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(
                delivery_id = %message.delivery_id,
                error = %err,
                "dropping malformed event payload"
            );
            return;
        }
    };

    if let Some(repo) = &event.repo {
        if repo.fork {
            tracing::warn!(repo = %repo.full_name, "skipping fork repository");
            return;
        }
    }

    if let Err(err) = dispatch(plat, &event).await {
        tracing::error!(
            delivery_id = %message.delivery_id,
            error = %err,
            "event dispatch failed"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
