//! Observed-state export: rebuild the desired-state documents from the live
//! forge.

use std::collections::HashMap;
use std::ops::ControlFlow;

use orgward_core::model::{sort_org, ForgeTeam, ForgeTeamId, Org, Repo, Team, TeamRole};

use crate::error::EngineError;
use crate::platform::Platform;

/// Maintainers are folded back into members on dump: the maintainer role is
/// derived at apply time and never round-trips through documents.
const DEMOTE_MAINTAINERS: bool = true;

/// The current structure of the organisation as a desired-state tree.
pub async fn dump_org(plat: &Platform, org_name: &str) -> Result<Org, EngineError> {
    let forge = plat.forge();
    let forge_teams = forge.list_teams(org_name).await?;

    let mut teams_by_id: HashMap<ForgeTeamId, Team> = HashMap::new();
    let mut children: HashMap<ForgeTeamId, Vec<ForgeTeamId>> = HashMap::new();
    let mut tops: Vec<ForgeTeamId> = Vec::new();

    for forge_team in &forge_teams {
        if forge_team.parent_id == ForgeTeamId::default() {
            tops.push(forge_team.id);
        } else {
            children
                .entry(forge_team.parent_id)
                .or_default()
                .push(forge_team.id);
        }

        let team = build_org_team(plat, org_name, forge_team).await?;
        teams_by_id.insert(forge_team.id, team);
    }

    fn assemble(
        id: ForgeTeamId,
        teams_by_id: &mut HashMap<ForgeTeamId, Team>,
        children: &HashMap<ForgeTeamId, Vec<ForgeTeamId>>,
    ) -> Team {
        let mut team = teams_by_id.remove(&id).unwrap_or_default();
        for child_id in children.get(&id).into_iter().flatten() {
            team.children
                .push(assemble(*child_id, teams_by_id, children));
        }
        team
    }

    let mut org = Org {
        name: org_name.to_string(),
        teams: Vec::new(),
    };
    for id in tops {
        org.teams.push(assemble(id, &mut teams_by_id, &children));
    }

    sort_org(&mut org);
    Ok(org)
}

/// Convert one observed team to its desired-state form with direct members
/// attached.
async fn build_org_team(
    plat: &Platform,
    org_name: &str,
    forge_team: &ForgeTeam,
) -> Result<Team, EngineError> {
    let forge = plat.forge();

    let mut team = Team {
        name: forge_team.name.clone(),
        description: forge_team.description.clone(),
        ..Team::default()
    };

    team.maintainers = forge
        .list_team_members(org_name, forge_team.id, TeamRole::Maintainer)
        .await?
        .into_iter()
        .map(|u| u.email)
        .collect();
    team.members = forge
        .list_team_members(org_name, forge_team.id, TeamRole::Member)
        .await?
        .into_iter()
        .map(|u| u.email)
        .collect();

    if DEMOTE_MAINTAINERS {
        team.members.append(&mut team.maintainers);
    }

    team.maintainers.sort();
    team.members.sort();
    Ok(team)
}

/// Every repository in the organisation, sorted by name.
pub async fn dump_repos(plat: &Platform, org_name: &str) -> Result<Vec<Repo>, EngineError> {
    let forge = plat.forge();

    let mut repos = Vec::new();
    forge
        .walk_repos(org_name, &mut |r| {
            repos.push(r.clone());
            ControlFlow::Continue(())
        })
        .await?;

    repos.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(repos)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use orgward_forge::mock::InMemoryForge;

    use crate::platform::Config;

    fn fixture() -> Platform {
        let forge = Arc::new(InMemoryForge::new("acme"));
        forge.seed_team(ForgeTeam {
            id: ForgeTeamId(100),
            name: "parent".to_string(),
            description: "Parent team".to_string(),
            ..ForgeTeam::default()
        });
        forge.seed_team(ForgeTeam {
            id: ForgeTeamId(101),
            parent_id: ForgeTeamId(100),
            name: "child".to_string(),
            ..ForgeTeam::default()
        });
        forge.seed_team_members(
            ForgeTeamId(100),
            TeamRole::Maintainer,
            &["maintainer@acme.example"],
        );
        forge.seed_team_members(
            ForgeTeamId(100),
            TeamRole::Member,
            &["bob@acme.example", "alice@acme.example"],
        );
        forge.seed_repo(Repo {
            name: "zulu".to_string(),
            ..Repo::default()
        });
        forge.seed_repo(Repo {
            name: "alpha".to_string(),
            ..Repo::default()
        });
        Platform::new(Config::default(), forge)
    }

    #[tokio::test]
    async fn dump_rebuilds_the_hierarchy() {
        let plat = fixture();
        let org = dump_org(&plat, "acme").await.expect("dump");

        assert_eq!(org.name, "acme");
        assert_eq!(org.teams.len(), 1);
        assert_eq!(org.teams[0].name, "parent");
        assert_eq!(org.teams[0].children.len(), 1);
        assert_eq!(org.teams[0].children[0].name, "child");
    }

    #[tokio::test]
    async fn dump_demotes_maintainers_and_sorts_members() {
        let plat = fixture();
        let org = dump_org(&plat, "acme").await.expect("dump");

        let parent = &org.teams[0];
        assert!(parent.maintainers.is_empty());
        assert_eq!(
            parent.members,
            vec![
                "alice@acme.example".to_string(),
                "bob@acme.example".to_string(),
                "maintainer@acme.example".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn dump_repos_sorts_by_name() {
        let plat = fixture();
        let repos = dump_repos(&plat, "acme").await.expect("dump");
        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zulu"]);
    }
}
