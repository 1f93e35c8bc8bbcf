//! Team event payloads and the dispatch table.

use serde::Deserialize;

use orgward_core::model::ForgeTeamId;
use orgward_engine::{update_repo_admin_topics, update_team_admin_topics, Platform};

use crate::error::DaemonError;

/// The subset of the forge's `team` event payload the daemon acts on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamEvent {
    pub action: Option<String>,
    pub team: Option<EventTeam>,
    #[serde(rename = "repository")]
    pub repo: Option<EventRepo>,
    #[serde(rename = "organization")]
    pub org: Option<EventOrg>,
    pub installation: Option<EventInstallation>,
}

impl TeamEvent {
    /// Installation id, `0` when absent.
    pub fn installation_id(&self) -> i64 {
        self.installation.as_ref().map(|i| i.id).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTeam {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRepo {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub fork: bool,
    pub owner: EventAccount,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventAccount {
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventOrg {
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventInstallation {
    pub id: i64,
}

/// Route one team event to the matching admin-topic re-derivation.
///
/// Membership and permission changes surface as `added_to_repository`,
/// `removed_from_repository`, or `edited`; an `edited` event without a
/// repository re-derives every repo the team can access. `created` and
/// `deleted` are no-ops (topic state follows later permission events).
pub async fn dispatch(plat: &Platform, event: &TeamEvent) -> Result<(), DaemonError> {
    let Some(action) = event.action.as_deref() else {
        return Ok(());
    };

    match action {
        "added_to_repository" | "removed_from_repository" => {
            let repo = require_repo(event)?;
            tracing::info!(
                repo = %repo.name,
                team = event.team.as_ref().and_then(|t| t.name.as_deref()).unwrap_or(""),
                "team update event for repository"
            );
            update_repo_admin_topics(plat, &repo.owner.login, &repo.name).await?;
        }
        "edited" => match &event.repo {
            Some(repo) => {
                update_repo_admin_topics(plat, &repo.owner.login, &repo.name).await?;
            }
            None => {
                let org = event
                    .org
                    .as_ref()
                    .ok_or_else(|| DaemonError::Protocol("team event without organization".to_string()))?;
                let team_id = event
                    .team
                    .as_ref()
                    .and_then(|t| t.id)
                    .ok_or_else(|| DaemonError::Protocol("team event without team id".to_string()))?;
                update_team_admin_topics(plat, &org.login, ForgeTeamId(team_id)).await?;
            }
        },
        "created" | "deleted" => {}
        other => {
            return Err(DaemonError::Protocol(format!(
                "don't recognise team action '{other}'"
            )))
        }
    }

    Ok(())
}

fn require_repo(event: &TeamEvent) -> Result<&EventRepo, DaemonError> {
    event
        .repo
        .as_ref()
        .ok_or_else(|| DaemonError::Protocol("team event without repository".to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
