//! Orgward core library — domain types, document codec, filesystem layout.
//!
//! Public API surface:
//! - [`model`] — desired-state and observed-state domain structs
//! - [`normalise`] — canonical name normalisation
//! - [`document`] — strict YAML codec for `org.yaml` / `team.yaml`
//! - [`layout`] — merge/unmerge between an [`model::Org`] and a directory tree
//! - [`error`] — [`DocumentError`]

pub mod document;
pub mod error;
pub mod layout;
pub mod model;
pub mod normalise;

pub use error::DocumentError;
pub use model::{
    find_forge_team_from_desired, sort_org, sort_team, ForgeTeam, ForgeTeamId, Org, Repo,
    RepoPermission, Team, TeamPermission, TeamRole, User,
};
pub use normalise::normalise_name;
