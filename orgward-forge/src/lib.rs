//! Orgward forge port — the capability interface over the source-code forge.
//!
//! - [`port`] — the [`ForgePort`] trait and [`ForgeError`]
//! - [`adapters`] — the read-only (dry-run) and stats-gathering adapters
//! - [`directory`] — the [`UserDirectory`] cache over the audit object
//! - [`mock`] — a complete in-memory [`ForgePort`] for tests and local runs
//!
//! The concrete REST/GraphQL forge clients, the object-store client, and
//! the queue client live outside this workspace; they implement these
//! contracts.

pub mod adapters;
pub mod directory;
pub mod mock;
pub mod port;

pub use adapters::{ForgeStats, ReadOnlyForge, StatsForge};
pub use directory::{AuditStore, UserDirectory};
pub use port::{ForgeError, ForgePort, WalkRepos, PHONY_TEAM_ID};
