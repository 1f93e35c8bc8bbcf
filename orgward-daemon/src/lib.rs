//! Orgward daemon — webhook ingress, durable FIFO queue, and the
//! single-flight worker that re-derives admin topics.
//!
//! - [`config`] — environment configuration
//! - [`signature`] — webhook signature verification
//! - [`queue`] — the [`queue::EventQueue`] port and its in-memory form
//! - [`event`] — team event payloads and the dispatch table
//! - [`server`] — the HTTP surface (`/health`, `/smoke`, `/hook`)
//! - [`worker`] — the queue consumer loop

pub mod config;
pub mod error;
pub mod event;
pub mod queue;
pub mod server;
pub mod signature;
pub mod worker;

pub use config::DaemonConfig;
pub use error::DaemonError;
pub use event::{dispatch, TeamEvent};
pub use queue::{EventQueue, InMemoryQueue, QueueMessage, ReceiptHandle};
pub use server::{router, AppState};
pub use worker::run_worker;
