//! Orgward engine — validation and reconciliation of organisational state.
//!
//! - [`platform`] — the [`Platform`] bundle handed to every operation
//! - [`rules`] — the rule engine and the built-in business rules
//! - [`apply`] — the team/membership reconciler
//! - [`repo_teams`] — bulk team permission changes across repositories
//! - [`topics`] — admin topic derivation
//! - [`dump`] — observed-state export

pub mod apply;
pub mod dump;
pub mod error;
pub mod platform;
pub mod repo_teams;
pub mod rules;
pub mod topics;

pub use apply::{apply_org, ApplyResult};
pub use dump::{dump_org, dump_repos};
pub use error::EngineError;
pub use platform::{Config, Platform};
pub use repo_teams::{update_repo_teams, RepoTeamsChangeSet, UpdateRepoTeamsResult};
pub use rules::{CompositeRuleError, Rule, RuleEngine, RuleViolation};
pub use topics::{
    update_admin_topics, update_repo_admin_topics, update_team_admin_topics,
    UpdateAdminTopicsResult, ADMIN_TOPIC_PREFIX, MAX_TOPIC_LENGTH,
};
