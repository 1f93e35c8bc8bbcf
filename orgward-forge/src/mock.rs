//! A complete in-memory [`ForgePort`] implementation.
//!
//! Used by the engine and daemon test suites and by local development runs.
//! Team ids are assigned from a monotonic counter; seeded fixtures may pin
//! their own ids. User lookups by email synthesise a login from the email's
//! local part unless the email has been registered or marked unknown, which
//! keeps membership-heavy fixtures short.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use orgward_core::model::{ForgeTeam, ForgeTeamId, Repo, RepoPermission, TeamPermission, TeamRole, User};

use crate::port::{ForgeError, ForgePort, WalkRepos};

#[derive(Default)]
struct State {
    next_team_id: i64,
    teams: Vec<ForgeTeam>,
    members: HashMap<(i64, TeamRole), Vec<User>>,
    repos: Vec<Repo>,
    admins: Vec<User>,
    users: HashMap<String, User>,
    unknown_emails: HashSet<String>,
}

/// In-memory forge fixture.
pub struct InMemoryForge {
    org_name: String,
    state: Mutex<State>,
}

impl InMemoryForge {
    pub fn new(org_name: impl Into<String>) -> Self {
        Self {
            org_name: org_name.into(),
            state: Mutex::new(State {
                next_team_id: 1,
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an observed team. Pinned ids advance the id counter.
    pub fn seed_team(&self, team: ForgeTeam) {
        let mut state = self.lock();
        state.next_team_id = state.next_team_id.max(team.id.0 + 1);
        state.teams.push(team);
    }

    /// Register the observed members of a team for one role.
    pub fn seed_team_members(&self, team_id: ForgeTeamId, role: TeamRole, emails: &[&str]) {
        let mut state = self.lock();
        let users = emails.iter().map(|e| synthesise_user(e)).collect();
        state.members.insert((team_id.0, role), users);
    }

    /// Register an observed repository.
    pub fn seed_repo(&self, repo: Repo) {
        self.lock().repos.push(repo);
    }

    /// Register an organisation admin.
    pub fn seed_admin(&self, email: &str) {
        self.lock().admins.push(synthesise_user(email));
    }

    /// Register an explicit user mapping (login and email keys).
    pub fn seed_user(&self, user: User) {
        let mut state = self.lock();
        state.users.insert(user.login.clone(), user.clone());
        state.users.insert(user.email.clone(), user);
    }

    /// Make `user_by_email` answer `UserNotFound` for this email.
    pub fn mark_unknown_email(&self, email: &str) {
        self.lock().unknown_emails.insert(email.to_string());
    }

    fn check_org(&self, org_name: &str) -> Result<(), ForgeError> {
        if org_name != self.org_name {
            return Err(ForgeError::UnsupportedOrg {
                org_name: org_name.to_string(),
            });
        }
        Ok(())
    }
}

/// A phony user whose login is the email's local part.
fn synthesise_user(email: &str) -> User {
    let login = email.split('@').next().unwrap_or(email).to_string();
    User {
        login,
        email: email.to_string(),
    }
}

#[async_trait]
impl ForgePort for InMemoryForge {
    async fn list_teams(&self, _org_name: &str) -> Result<Vec<ForgeTeam>, ForgeError> {
        Ok(self.lock().teams.clone())
    }

    async fn list_team_members(
        &self,
        _org_name: &str,
        team_id: ForgeTeamId,
        role: TeamRole,
    ) -> Result<Vec<User>, ForgeError> {
        Ok(self
            .lock()
            .members
            .get(&(team_id.0, role))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_team(
        &self,
        _org_name: &str,
        team: &ForgeTeam,
    ) -> Result<ForgeTeam, ForgeError> {
        let mut state = self.lock();
        let mut created = team.clone();
        created.id = ForgeTeamId(state.next_team_id);
        state.next_team_id += 1;
        state.teams.push(created.clone());
        Ok(created)
    }

    async fn update_team(&self, team: &ForgeTeam) -> Result<ForgeTeam, ForgeError> {
        let mut state = self.lock();
        let existing = state
            .teams
            .iter_mut()
            .find(|t| t.id == team.id)
            .ok_or_else(|| ForgeError::Backend(format!("no team with id {}", team.id)))?;
        existing.name = team.name.clone();
        existing.description = team.description.clone();
        existing.parent_id = team.parent_id;
        Ok(existing.clone())
    }

    async fn delete_team(&self, team_id: ForgeTeamId) -> Result<(), ForgeError> {
        let mut state = self.lock();

        // The forge cascades child teams on delete.
        let mut doomed = vec![team_id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor];
            cursor += 1;
            for t in &state.teams {
                if t.parent_id == parent {
                    doomed.push(t.id);
                }
            }
        }

        state.teams.retain(|t| !doomed.contains(&t.id));
        state
            .members
            .retain(|&(id, _), _| !doomed.contains(&ForgeTeamId(id)));
        Ok(())
    }

    async fn add_team_membership(
        &self,
        _org_name: &str,
        team_id: ForgeTeamId,
        email: &str,
        role: TeamRole,
    ) -> Result<(), ForgeError> {
        let mut state = self.lock();
        let user = state
            .users
            .get(email)
            .cloned()
            .unwrap_or_else(|| synthesise_user(email));
        let roster = state.members.entry((team_id.0, role)).or_default();
        if !roster.iter().any(|u| u.email == email) {
            roster.push(user);
        }
        Ok(())
    }

    async fn remove_team_membership(
        &self,
        _org_name: &str,
        team_id: ForgeTeamId,
        email: &str,
        role: TeamRole,
    ) -> Result<(), ForgeError> {
        let mut state = self.lock();
        if let Some(roster) = state.members.get_mut(&(team_id.0, role)) {
            roster.retain(|u| u.email != email);
        }
        Ok(())
    }

    async fn add_team_repo_permission(
        &self,
        _org_name: &str,
        repo_name: &str,
        team_id: ForgeTeamId,
        permission: RepoPermission,
    ) -> Result<(), ForgeError> {
        let mut state = self.lock();
        let team_name = state
            .teams
            .iter()
            .find(|t| t.id == team_id)
            .map(|t| t.name.clone())
            .ok_or_else(|| ForgeError::Backend(format!("no team with id {team_id}")))?;
        let repo = state
            .repos
            .iter_mut()
            .find(|r| r.name == repo_name)
            .ok_or_else(|| ForgeError::Backend(format!("no repo named '{repo_name}'")))?;

        // A team holds exactly one permission level per repo.
        repo.teams.retain(|tp| tp.team_name != team_name);
        repo.teams.push(TeamPermission {
            team_name,
            permission,
        });
        Ok(())
    }

    async fn remove_team_repo_permission(
        &self,
        _org_name: &str,
        repo_name: &str,
        team_id: ForgeTeamId,
    ) -> Result<(), ForgeError> {
        let mut state = self.lock();
        let team_name = state
            .teams
            .iter()
            .find(|t| t.id == team_id)
            .map(|t| t.name.clone())
            .ok_or_else(|| ForgeError::Backend(format!("no team with id {team_id}")))?;
        if let Some(repo) = state.repos.iter_mut().find(|r| r.name == repo_name) {
            repo.teams.retain(|tp| tp.team_name != team_name);
        }
        Ok(())
    }

    async fn walk_repos(
        &self,
        _org_name: &str,
        walk: &mut WalkRepos<'_>,
    ) -> Result<(), ForgeError> {
        let repos = self.lock().repos.clone();
        for repo in &repos {
            if walk(repo).is_break() {
                break;
            }
        }
        Ok(())
    }

    async fn walk_repos_by_team(
        &self,
        _org_name: &str,
        team_id: ForgeTeamId,
        walk: &mut WalkRepos<'_>,
    ) -> Result<(), ForgeError> {
        let state = self.lock();
        let team_name = state.teams.iter().find(|t| t.id == team_id).map(|t| t.name.clone());
        let repos: Vec<Repo> = match team_name {
            Some(name) => state
                .repos
                .iter()
                .filter(|r| r.teams.iter().any(|tp| tp.team_name == name))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        drop(state);

        for repo in &repos {
            if walk(repo).is_break() {
                break;
            }
        }
        Ok(())
    }

    async fn repo_by_name(&self, org_name: &str, repo_name: &str) -> Result<Repo, ForgeError> {
        self.lock()
            .repos
            .iter()
            .find(|r| r.name == repo_name)
            .cloned()
            .ok_or_else(|| ForgeError::RepoNotFound {
                org_name: org_name.to_string(),
                repo_name: repo_name.to_string(),
            })
    }

    async fn update_repo_topics(
        &self,
        org_name: &str,
        repo_name: &str,
        topics: &[String],
    ) -> Result<(), ForgeError> {
        let mut state = self.lock();
        let repo = state
            .repos
            .iter_mut()
            .find(|r| r.name == repo_name)
            .ok_or_else(|| ForgeError::RepoNotFound {
                org_name: org_name.to_string(),
                repo_name: repo_name.to_string(),
            })?;
        repo.topics = topics.to_vec();
        Ok(())
    }

    async fn list_admins(&self, _org_name: &str) -> Result<Vec<User>, ForgeError> {
        Ok(self.lock().admins.clone())
    }

    async fn user_by_email(&self, org_name: &str, email: &str) -> Result<User, ForgeError> {
        self.check_org(org_name)?;
        let state = self.lock();
        if state.unknown_emails.contains(email) {
            return Err(ForgeError::user_not_found_by_email(org_name, email));
        }
        Ok(state
            .users
            .get(email)
            .cloned()
            .unwrap_or_else(|| synthesise_user(email)))
    }

    async fn user_by_login(&self, org_name: &str, login: &str) -> Result<User, ForgeError> {
        self.check_org(org_name)?;
        self.lock()
            .users
            .get(login)
            .cloned()
            .ok_or_else(|| ForgeError::user_not_found_by_login(org_name, login))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_monotonic_ids() {
        let forge = InMemoryForge::new("acme");
        let a = forge
            .create_team("acme", &ForgeTeam::default())
            .await
            .expect("create a");
        let b = forge
            .create_team("acme", &ForgeTeam::default())
            .await
            .expect("create b");
        assert!(b.id.0 > a.id.0);
    }

    #[tokio::test]
    async fn seeded_ids_advance_the_counter() {
        let forge = InMemoryForge::new("acme");
        forge.seed_team(ForgeTeam {
            id: ForgeTeamId(100),
            ..ForgeTeam::default()
        });
        let created = forge
            .create_team("acme", &ForgeTeam::default())
            .await
            .expect("create");
        assert!(created.id.0 > 100);
    }

    #[tokio::test]
    async fn delete_cascades_to_child_teams() {
        let forge = InMemoryForge::new("acme");
        forge.seed_team(ForgeTeam {
            id: ForgeTeamId(1),
            name: "parent".to_string(),
            ..ForgeTeam::default()
        });
        forge.seed_team(ForgeTeam {
            id: ForgeTeamId(2),
            parent_id: ForgeTeamId(1),
            name: "child".to_string(),
            ..ForgeTeam::default()
        });

        forge.delete_team(ForgeTeamId(1)).await.expect("delete");
        assert!(forge.list_teams("acme").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn unknown_emails_answer_user_not_found() {
        let forge = InMemoryForge::new("acme");
        forge.mark_unknown_email("ghost@acme.example");

        let err = forge
            .user_by_email("acme", "ghost@acme.example")
            .await
            .expect_err("must fail");
        assert!(err.is_user_not_found());

        let ok = forge
            .user_by_email("acme", "alice@acme.example")
            .await
            .expect("synthesised");
        assert_eq!(ok.login, "alice");
    }

    #[tokio::test]
    async fn foreign_org_is_unsupported() {
        let forge = InMemoryForge::new("acme");
        let err = forge
            .user_by_email("globex", "alice@acme.example")
            .await
            .expect_err("must fail");
        assert!(matches!(err, ForgeError::UnsupportedOrg { .. }));
    }

    #[tokio::test]
    async fn repo_permission_add_replaces_existing_level() {
        let forge = InMemoryForge::new("acme");
        forge.seed_team(ForgeTeam {
            id: ForgeTeamId(1),
            name: "platform".to_string(),
            ..ForgeTeam::default()
        });
        forge.seed_repo(Repo {
            name: "api".to_string(),
            teams: vec![TeamPermission {
                team_name: "platform".to_string(),
                permission: RepoPermission::Read,
            }],
            ..Repo::default()
        });

        forge
            .add_team_repo_permission("acme", "api", ForgeTeamId(1), RepoPermission::Admin)
            .await
            .expect("add");

        let repo = forge.repo_by_name("acme", "api").await.expect("repo");
        assert_eq!(repo.teams.len(), 1);
        assert_eq!(repo.teams[0].permission, RepoPermission::Admin);
    }
}
