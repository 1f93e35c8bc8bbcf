//! The daemon HTTP surface: health, smoke, and the signed webhook receiver.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;

use orgward_engine::Platform;

use crate::event::TeamEvent;
use crate::queue::{EventQueue, QueueMessage};
use crate::signature::{verify_signature, SIGNATURE_HEADER};

const EVENT_HEADER: &str = "x-github-event";
const DELIVERY_HEADER: &str = "x-github-delivery";

/// Only `team` events are handled; everything else is acknowledged and
/// dropped at the door.
const TEAM_EVENT: &str = "team";

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<Platform>,
    pub queue: Arc<dyn EventQueue>,
}

/// The daemon router: `GET /health`, `GET /smoke`, `POST /hook`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/smoke", get(smoke))
        .route("/hook", post(hook))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    queue: String,
    checked_at: DateTime<Utc>,
}

/// Dependency liveness: probes the queue and reports per-dependency status.
async fn smoke(State(state): State<AppState>) -> impl IntoResponse {
    let queue = match state.queue.probe().await {
        Ok(()) => "ok".to_string(),
        Err(err) => format!("failed: {err}"),
    };

    let healthy = queue == "ok";
    let report = SmokeReport {
        queue,
        checked_at: Utc::now(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// Signed webhook receiver. Validates the signature over the raw body,
/// demultiplexes on the event type, and submits `team` events to the queue
/// keyed for deduplication by their delivery id.
async fn hook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = header_str(&headers, SIGNATURE_HEADER);
    let secret = &state.platform.config().webhook_secret;
    if !verify_signature(secret, &body, signature) {
        tracing::warn!("rejecting webhook with invalid signature");
        return (StatusCode::UNAUTHORIZED, "invalid signature");
    }

    let event_type = header_str(&headers, EVENT_HEADER);
    if event_type != TEAM_EVENT {
        return (StatusCode::OK, "ignored");
    }

    let delivery_id = header_str(&headers, DELIVERY_HEADER);
    if delivery_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "missing delivery id");
    }

    // The payload is parsed only far enough to stamp the installation id;
    // the worker does the real parse.
    let installation_id = serde_json::from_slice::<TeamEvent>(&body)
        .map(|e| e.installation_id())
        .unwrap_or(0);

    let message = QueueMessage {
        installation_id,
        event_type: event_type.to_string(),
        delivery_id: delivery_id.to_string(),
        payload: String::from_utf8_lossy(&body).into_owned(),
    };

    match state.queue.submit(&message).await {
        Ok(()) => {
            tracing::info!(delivery_id = %message.delivery_id, "queued team event");
            (StatusCode::OK, "queued")
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to queue team event");
            (StatusCode::INTERNAL_SERVER_ERROR, "queue submission failed")
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
