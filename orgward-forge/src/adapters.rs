//! Read-only and stats-gathering adapters over any [`ForgePort`].
//!
//! The adapters layer: a dry run wraps the concrete port in
//! [`ReadOnlyForge`], and the reconciler wraps whichever port it is handed
//! in [`StatsForge`] so that reported counts are authoritative.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use orgward_core::model::{ForgeTeam, ForgeTeamId, Repo, RepoPermission, TeamRole, User};

use crate::port::{ForgeError, ForgePort, WalkRepos, PHONY_TEAM_ID};

// ---------------------------------------------------------------------------
// Read-only adapter
// ---------------------------------------------------------------------------

/// A [`ForgePort`] adapter that forwards reads and turns every write into a
/// no-op, so a dry run is semantically indistinguishable to the caller.
///
/// `create_team` answers with a copy of the requested team carrying
/// [`PHONY_TEAM_ID`]; member listings for that sentinel id answer empty so
/// that the reconciler never queries a team that was never created.
pub struct ReadOnlyForge {
    delegate: Arc<dyn ForgePort>,
}

impl ReadOnlyForge {
    pub fn new(delegate: Arc<dyn ForgePort>) -> Self {
        Self { delegate }
    }
}

#[async_trait]
impl ForgePort for ReadOnlyForge {
    async fn list_teams(&self, org_name: &str) -> Result<Vec<ForgeTeam>, ForgeError> {
        self.delegate.list_teams(org_name).await
    }

    async fn list_team_members(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        role: TeamRole,
    ) -> Result<Vec<User>, ForgeError> {
        if team_id == PHONY_TEAM_ID {
            return Ok(Vec::new());
        }
        self.delegate.list_team_members(org_name, team_id, role).await
    }

    async fn create_team(
        &self,
        _org_name: &str,
        team: &ForgeTeam,
    ) -> Result<ForgeTeam, ForgeError> {
        let mut created = team.clone();
        created.id = PHONY_TEAM_ID;
        Ok(created)
    }

    async fn update_team(&self, team: &ForgeTeam) -> Result<ForgeTeam, ForgeError> {
        Ok(team.clone())
    }

    async fn delete_team(&self, _team_id: ForgeTeamId) -> Result<(), ForgeError> {
        Ok(())
    }

    async fn add_team_membership(
        &self,
        _org_name: &str,
        _team_id: ForgeTeamId,
        _email: &str,
        _role: TeamRole,
    ) -> Result<(), ForgeError> {
        Ok(())
    }

    async fn remove_team_membership(
        &self,
        _org_name: &str,
        _team_id: ForgeTeamId,
        _email: &str,
        _role: TeamRole,
    ) -> Result<(), ForgeError> {
        Ok(())
    }

    async fn add_team_repo_permission(
        &self,
        _org_name: &str,
        _repo_name: &str,
        _team_id: ForgeTeamId,
        _permission: RepoPermission,
    ) -> Result<(), ForgeError> {
        Ok(())
    }

    async fn remove_team_repo_permission(
        &self,
        _org_name: &str,
        _repo_name: &str,
        _team_id: ForgeTeamId,
    ) -> Result<(), ForgeError> {
        Ok(())
    }

    async fn walk_repos(
        &self,
        org_name: &str,
        walk: &mut WalkRepos<'_>,
    ) -> Result<(), ForgeError> {
        self.delegate.walk_repos(org_name, walk).await
    }

    async fn walk_repos_by_team(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        walk: &mut WalkRepos<'_>,
    ) -> Result<(), ForgeError> {
        self.delegate.walk_repos_by_team(org_name, team_id, walk).await
    }

    async fn repo_by_name(&self, org_name: &str, repo_name: &str) -> Result<Repo, ForgeError> {
        self.delegate.repo_by_name(org_name, repo_name).await
    }

    async fn update_repo_topics(
        &self,
        _org_name: &str,
        _repo_name: &str,
        _topics: &[String],
    ) -> Result<(), ForgeError> {
        Ok(())
    }

    async fn list_admins(&self, org_name: &str) -> Result<Vec<User>, ForgeError> {
        self.delegate.list_admins(org_name).await
    }

    async fn user_by_email(&self, org_name: &str, email: &str) -> Result<User, ForgeError> {
        self.delegate.user_by_email(org_name, email).await
    }

    async fn user_by_login(&self, org_name: &str, login: &str) -> Result<User, ForgeError> {
        self.delegate.user_by_login(org_name, login).await
    }
}

// ---------------------------------------------------------------------------
// Stats adapter
// ---------------------------------------------------------------------------

/// Counters for the five write kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForgeStats {
    pub teams_created: usize,
    pub teams_updated: usize,
    pub teams_deleted: usize,
    pub memberships_added: usize,
    pub memberships_deleted: usize,
}

/// A [`ForgePort`] adapter that delegates every call and counts the write
/// operations that succeed.
pub struct StatsForge {
    delegate: Arc<dyn ForgePort>,
    stats: Mutex<ForgeStats>,
}

impl StatsForge {
    pub fn new(delegate: Arc<dyn ForgePort>) -> Self {
        Self {
            delegate,
            stats: Mutex::new(ForgeStats::default()),
        }
    }

    /// Snapshot of the accumulated counters.
    pub fn stats(&self) -> ForgeStats {
        *self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reset the counters to zero.
    pub fn zero_stats(&self) {
        *self.stats.lock().unwrap_or_else(|e| e.into_inner()) = ForgeStats::default();
    }

    fn bump(&self, f: impl FnOnce(&mut ForgeStats)) {
        f(&mut self.stats.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

#[async_trait]
impl ForgePort for StatsForge {
    async fn list_teams(&self, org_name: &str) -> Result<Vec<ForgeTeam>, ForgeError> {
        self.delegate.list_teams(org_name).await
    }

    async fn list_team_members(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        role: TeamRole,
    ) -> Result<Vec<User>, ForgeError> {
        self.delegate.list_team_members(org_name, team_id, role).await
    }

    async fn create_team(&self, org_name: &str, team: &ForgeTeam) -> Result<ForgeTeam, ForgeError> {
        let created = self.delegate.create_team(org_name, team).await?;
        self.bump(|s| s.teams_created += 1);
        Ok(created)
    }

    async fn update_team(&self, team: &ForgeTeam) -> Result<ForgeTeam, ForgeError> {
        let updated = self.delegate.update_team(team).await?;
        self.bump(|s| s.teams_updated += 1);
        Ok(updated)
    }

    async fn delete_team(&self, team_id: ForgeTeamId) -> Result<(), ForgeError> {
        self.delegate.delete_team(team_id).await?;
        self.bump(|s| s.teams_deleted += 1);
        Ok(())
    }

    async fn add_team_membership(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        email: &str,
        role: TeamRole,
    ) -> Result<(), ForgeError> {
        self.delegate
            .add_team_membership(org_name, team_id, email, role)
            .await?;
        self.bump(|s| s.memberships_added += 1);
        Ok(())
    }

    async fn remove_team_membership(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        email: &str,
        role: TeamRole,
    ) -> Result<(), ForgeError> {
        self.delegate
            .remove_team_membership(org_name, team_id, email, role)
            .await?;
        self.bump(|s| s.memberships_deleted += 1);
        Ok(())
    }

    async fn add_team_repo_permission(
        &self,
        org_name: &str,
        repo_name: &str,
        team_id: ForgeTeamId,
        permission: RepoPermission,
    ) -> Result<(), ForgeError> {
        self.delegate
            .add_team_repo_permission(org_name, repo_name, team_id, permission)
            .await
    }

    async fn remove_team_repo_permission(
        &self,
        org_name: &str,
        repo_name: &str,
        team_id: ForgeTeamId,
    ) -> Result<(), ForgeError> {
        self.delegate
            .remove_team_repo_permission(org_name, repo_name, team_id)
            .await
    }

    async fn walk_repos(
        &self,
        org_name: &str,
        walk: &mut WalkRepos<'_>,
    ) -> Result<(), ForgeError> {
        self.delegate.walk_repos(org_name, walk).await
    }

    async fn walk_repos_by_team(
        &self,
        org_name: &str,
        team_id: ForgeTeamId,
        walk: &mut WalkRepos<'_>,
    ) -> Result<(), ForgeError> {
        self.delegate.walk_repos_by_team(org_name, team_id, walk).await
    }

    async fn repo_by_name(&self, org_name: &str, repo_name: &str) -> Result<Repo, ForgeError> {
        self.delegate.repo_by_name(org_name, repo_name).await
    }

    async fn update_repo_topics(
        &self,
        org_name: &str,
        repo_name: &str,
        topics: &[String],
    ) -> Result<(), ForgeError> {
        self.delegate
            .update_repo_topics(org_name, repo_name, topics)
            .await
    }

    async fn list_admins(&self, org_name: &str) -> Result<Vec<User>, ForgeError> {
        self.delegate.list_admins(org_name).await
    }

    async fn user_by_email(&self, org_name: &str, email: &str) -> Result<User, ForgeError> {
        self.delegate.user_by_email(org_name, email).await
    }

    async fn user_by_login(&self, org_name: &str, login: &str) -> Result<User, ForgeError> {
        self.delegate.user_by_login(org_name, login).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
