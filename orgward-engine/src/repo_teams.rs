//! Bulk team-permission changes across the organisation's repositories.

use std::collections::HashMap;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use orgward_core::model::{ForgeTeam, Repo, TeamPermission};

use crate::error::EngineError;
use crate::platform::Platform;

/// A declarative set of team-permission changes to apply across repos.
#[derive(Debug, Clone, Default)]
pub struct RepoTeamsChangeSet {
    /// Teams with associated permissions to be added.
    pub add_teams: Vec<TeamPermission>,
    /// Teams with associated permissions to be removed.
    pub remove_teams: Vec<TeamPermission>,
    /// Names of repos to exclude from the change (case-insensitive).
    pub exclude_repos: Vec<String>,
    /// Names of repos to limit the update to; empty means every repo.
    pub only_repos: Vec<String>,
}

/// The complete set of operations taken by [`update_repo_teams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRepoTeamsResult {
    pub team_permissions_removed: usize,
    pub team_permissions_added: usize,
}

/// Apply the change set across the org's repositories.
///
/// Exact `(team, permission)` matches gate both directions: the remove step
/// only touches exact matches, and the add step only fires when the exact
/// pair is absent, so a team present at a different level is left for the
/// add step to augment.
pub async fn update_repo_teams(
    plat: &Platform,
    org_name: &str,
    change_set: &RepoTeamsChangeSet,
) -> Result<UpdateRepoTeamsResult, EngineError> {
    let forge = plat.forge();

    let teams = forge.list_teams(org_name).await?;
    let teams_by_name: HashMap<&str, &ForgeTeam> =
        teams.iter().map(|t| (t.name.as_str(), t)).collect();

    // Every team referenced by the change set must exist before any repo is
    // touched.
    for tp in change_set.add_teams.iter().chain(&change_set.remove_teams) {
        if !teams_by_name.contains_key(tp.team_name.as_str()) {
            return Err(EngineError::UnknownTeam {
                name: tp.team_name.clone(),
            });
        }
    }

    // Snapshot the repos to update: the named ones (failing fast on a miss)
    // or the whole org.
    let repos: Vec<Repo> = if change_set.only_repos.is_empty() {
        let mut all = Vec::new();
        forge
            .walk_repos(org_name, &mut |r| {
                all.push(r.clone());
                ControlFlow::Continue(())
            })
            .await?;
        all
    } else {
        let mut named = Vec::new();
        for repo_name in &change_set.only_repos {
            named.push(forge.repo_by_name(org_name, repo_name).await?);
        }
        named
    };

    let excluded = |repo: &Repo| {
        change_set
            .exclude_repos
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&repo.name))
    };

    let mut result = UpdateRepoTeamsResult::default();

    for repo in &repos {
        if excluded(repo) {
            continue;
        }

        for tp in &change_set.remove_teams {
            if repo.teams.contains(tp) {
                forge
                    .remove_team_repo_permission(
                        org_name,
                        &repo.name,
                        teams_by_name[tp.team_name.as_str()].id,
                    )
                    .await?;
                tracing::debug!(
                    team = %tp.team_name,
                    repo = %repo.name,
                    permission = %tp.permission,
                    "removed team from repository"
                );
                result.team_permissions_removed += 1;
            }
        }

        for tp in &change_set.add_teams {
            if !repo.teams.contains(tp) {
                forge
                    .add_team_repo_permission(
                        org_name,
                        &repo.name,
                        teams_by_name[tp.team_name.as_str()].id,
                        tp.permission,
                    )
                    .await?;
                tracing::debug!(
                    team = %tp.team_name,
                    repo = %repo.name,
                    permission = %tp.permission,
                    "added team to repository"
                );
                result.team_permissions_added += 1;
            }
        }
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
