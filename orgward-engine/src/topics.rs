//! Admin topic derivation: repository labels naming the admin teams.

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use orgward_core::model::{ForgeTeamId, Repo, RepoPermission};
use orgward_core::normalise::normalise_name;

use crate::error::EngineError;
use crate::platform::Platform;

/// Prefix prepended to normalised team names to form admin topics.
pub const ADMIN_TOPIC_PREFIX: &str = "admin-";
/// Maximum length the forge accepts for a repository topic.
pub const MAX_TOPIC_LENGTH: usize = 35;

/// The number of repositories updated by a topic derivation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdminTopicsResult {
    pub repos_updated: usize,
}

/// Rewrite the repo's topics to the canonical set: every non-admin topic
/// kept, plus one `admin-<normalised team name>` topic per admin team,
/// deduplicated and sorted. Returns whether the repo changed.
pub fn rectify_repo_admin_topics(repo: &mut Repo) -> bool {
    let have: BTreeSet<String> = repo.topics.iter().cloned().collect();

    let mut want: BTreeSet<String> = repo
        .topics
        .iter()
        .filter(|topic| !topic.starts_with(ADMIN_TOPIC_PREFIX))
        .cloned()
        .collect();

    for tp in &repo.teams {
        if tp.permission == RepoPermission::Admin {
            let mut topic = format!("{ADMIN_TOPIC_PREFIX}{}", normalise_name(&tp.team_name));
            if topic.len() >= MAX_TOPIC_LENGTH {
                topic.truncate(MAX_TOPIC_LENGTH - 1);
            }
            want.insert(topic);
        }
    }

    if have == want {
        return false;
    }

    repo.topics = want.into_iter().collect();
    true
}

/// Update every repository in the org whose topics diverge from the
/// canonical set.
pub async fn update_admin_topics(
    plat: &Platform,
    org_name: &str,
) -> Result<UpdateAdminTopicsResult, EngineError> {
    let forge = plat.forge();

    let mut divergent = Vec::new();
    forge
        .walk_repos(org_name, &mut |r| {
            let mut repo = r.clone();
            if rectify_repo_admin_topics(&mut repo) {
                divergent.push(repo);
            }
            ControlFlow::Continue(())
        })
        .await?;

    for repo in &divergent {
        tracing::info!(
            repo = %repo.name,
            topics = %repo.topics.join(", "),
            "updating repository topics"
        );
        forge
            .update_repo_topics(org_name, &repo.name, &repo.topics)
            .await?;
    }

    Ok(UpdateAdminTopicsResult {
        repos_updated: divergent.len(),
    })
}

/// Update the admin topics of a single repository, if needed.
pub async fn update_repo_admin_topics(
    plat: &Platform,
    org_name: &str,
    repo_name: &str,
) -> Result<UpdateAdminTopicsResult, EngineError> {
    let forge = plat.forge();

    let mut repo = forge.repo_by_name(org_name, repo_name).await?;
    if !rectify_repo_admin_topics(&mut repo) {
        return Ok(UpdateAdminTopicsResult::default());
    }

    forge
        .update_repo_topics(org_name, &repo.name, &repo.topics)
        .await?;
    Ok(UpdateAdminTopicsResult { repos_updated: 1 })
}

/// Update the admin topics of every repository directly accessible to the
/// team, if needed.
pub async fn update_team_admin_topics(
    plat: &Platform,
    org_name: &str,
    team_id: ForgeTeamId,
) -> Result<UpdateAdminTopicsResult, EngineError> {
    let forge = plat.forge();

    let mut divergent = Vec::new();
    forge
        .walk_repos_by_team(org_name, team_id, &mut |r| {
            let mut repo = r.clone();
            if rectify_repo_admin_topics(&mut repo) {
                divergent.push(repo);
            }
            ControlFlow::Continue(())
        })
        .await?;

    for repo in &divergent {
        forge
            .update_repo_topics(org_name, &repo.name, &repo.topics)
            .await?;
    }

    Ok(UpdateAdminTopicsResult {
        repos_updated: divergent.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
