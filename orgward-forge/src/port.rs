//! The [`ForgePort`] capability trait and its error surface.

use std::ops::ControlFlow;

use async_trait::async_trait;
use thiserror::Error;

use orgward_core::model::{ForgeTeam, ForgeTeamId, Repo, RepoPermission, TeamRole, User};

/// Sentinel team id handed out by the read-only adapter when a team creation
/// is stubbed. Recognised by member listings so that a dry run never queries
/// a team that does not actually exist.
pub const PHONY_TEAM_ID: ForgeTeamId = ForgeTeamId(-1);

/// Callback invoked for each repository during a walk. Returning
/// [`ControlFlow::Break`] halts the walk; the walk itself still returns
/// `Ok`. Callers that need to abort with an error capture it in the closure
/// and break.
pub type WalkRepos<'a> = dyn FnMut(&Repo) -> ControlFlow<()> + Send + 'a;

/// All errors that can arise from forge operations.
///
/// Transport and protocol failures from concrete adapters are surfaced
/// verbatim through [`ForgeError::Backend`].
#[derive(Debug, Error)]
pub enum ForgeError {
    /// No identity mapping exists for the user in the organisation.
    #[error(
        "could not find SSO information for user '{}' in org '{org_name}'",
        user_not_found_id(.email, .login)
    )]
    UserNotFound {
        org_name: String,
        email: Option<String>,
        login: Option<String>,
    },

    /// User information is only available for the single supported org.
    #[error("unsupported forge organisation '{org_name}'")]
    UnsupportedOrg { org_name: String },

    /// The named repository does not exist in the organisation.
    #[error("no repository '{repo_name}' in org '{org_name}'")]
    RepoNotFound {
        org_name: String,
        repo_name: String,
    },

    /// The audit object could not be parsed.
    #[error("could not parse the user audit document: {0}")]
    AuditDocument(#[from] serde_json::Error),

    /// A transport or protocol failure from the underlying adapter.
    #[error("forge backend error: {0}")]
    Backend(String),
}

fn user_not_found_id<'a>(email: &'a Option<String>, login: &'a Option<String>) -> &'a str {
    email.as_deref().or(login.as_deref()).unwrap_or_default()
}

impl ForgeError {
    /// A [`ForgeError::UserNotFound`] for an email lookup.
    pub fn user_not_found_by_email(org_name: impl Into<String>, email: impl Into<String>) -> Self {
        ForgeError::UserNotFound {
            org_name: org_name.into(),
            email: Some(email.into()),
            login: None,
        }
    }

    /// A [`ForgeError::UserNotFound`] for a login lookup.
    pub fn user_not_found_by_login(org_name: impl Into<String>, login: impl Into<String>) -> Self {
        ForgeError::UserNotFound {
            org_name: org_name.into(),
            email: None,
            login: Some(login.into()),
        }
    }

    /// Whether this error is the distinguished user-not-found kind.
    pub fn is_user_not_found(&self) -> bool {
        matches!(self, ForgeError::UserNotFound { .. })
    }
}

/// The capability interface over the forge.
///
/// List operations are paginated and complete: implementations must yield
/// every matching element and hide pagination. Walks observe cancellation
/// between page fetches at minimum. Secret-privacy teams are filtered at the
/// source and never observed through this interface; `walk_repos` and
/// `walk_repos_by_team` yield non-archived repositories only.
#[async_trait]
pub trait ForgePort: Send + Sync {
    /// All non-secret teams in the organisation.
    async fn list_teams(&self, org_name: &str) -> Result<Vec<ForgeTeam>, ForgeError>;

    /// Direct members of the team holding the given role.
    async fn list_team_members(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        role: TeamRole,
    ) -> Result<Vec<User>, ForgeError>;

    /// Create the team and return it as observed after creation.
    async fn create_team(&self, org_name: &str, team: &ForgeTeam)
        -> Result<ForgeTeam, ForgeError>;

    /// Update the team (name, description, parent) and return the result.
    async fn update_team(&self, team: &ForgeTeam) -> Result<ForgeTeam, ForgeError>;

    /// Delete the team. The forge cascades child teams.
    async fn delete_team(&self, team_id: ForgeTeamId) -> Result<(), ForgeError>;

    /// Add the user (by email) to the team with the given role.
    async fn add_team_membership(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        email: &str,
        role: TeamRole,
    ) -> Result<(), ForgeError>;

    /// Remove the user (by email) from the given role within the team.
    async fn remove_team_membership(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        email: &str,
        role: TeamRole,
    ) -> Result<(), ForgeError>;

    /// Grant the team the given permission on the repository.
    async fn add_team_repo_permission(
        &self,
        org_name: &str,
        repo_name: &str,
        team_id: ForgeTeamId,
        permission: RepoPermission,
    ) -> Result<(), ForgeError>;

    /// Revoke the team's permission on the repository.
    async fn remove_team_repo_permission(
        &self,
        org_name: &str,
        repo_name: &str,
        team_id: ForgeTeamId,
    ) -> Result<(), ForgeError>;

    /// Walk every repository in the organisation.
    async fn walk_repos(
        &self,
        org_name: &str,
        walk: &mut WalkRepos<'_>,
    ) -> Result<(), ForgeError>;

    /// Walk every repository directly accessible to the team.
    async fn walk_repos_by_team(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        walk: &mut WalkRepos<'_>,
    ) -> Result<(), ForgeError>;

    /// The repository with the given name.
    async fn repo_by_name(&self, org_name: &str, repo_name: &str) -> Result<Repo, ForgeError>;

    /// Replace the repository's topic set.
    async fn update_repo_topics(
        &self,
        org_name: &str,
        repo_name: &str,
        topics: &[String],
    ) -> Result<(), ForgeError>;

    /// The organisation's admin users.
    async fn list_admins(&self, org_name: &str) -> Result<Vec<User>, ForgeError>;

    /// The user with the given company email address, or
    /// [`ForgeError::UserNotFound`].
    async fn user_by_email(&self, org_name: &str, email: &str) -> Result<User, ForgeError>;

    /// The user with the given login name, or [`ForgeError::UserNotFound`].
    async fn user_by_login(&self, org_name: &str, login: &str) -> Result<User, ForgeError>;
}
