//! The org reconciler: diff the desired tree against the observed forge
//! state and converge teams, hierarchy, and memberships.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use orgward_core::model::{
    find_forge_team_from_desired, ForgeTeam, ForgeTeamId, Org, Team, TeamRole,
};
use orgward_forge::{ForgePort, StatsForge};

use crate::error::EngineError;
use crate::platform::Platform;

/// The complete set of operations taken by [`apply_org`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub teams_created: usize,
    pub teams_updated: usize,
    pub teams_deleted: usize,
    pub memberships_added: usize,
    pub memberships_deleted: usize,
}

impl ApplyResult {
    /// Whether the apply resulted in any changes.
    pub fn has_changes(&self) -> bool {
        *self != ApplyResult::default()
    }
}

/// A forge team retained by the reconciliation, with a flag recording
/// whether it was freshly created (created teams have no members to list).
struct KeptTeam {
    team: ForgeTeam,
    created: bool,
}

/// Apply the desired organisational structure against the forge, making the
/// necessary changes to teams and memberships.
///
/// Validation runs first; a failing rule engine produces zero forge writes.
/// The reconciler moves org-admin emails from `members` into `maintainers`
/// on the way through, which is the only mutation it makes to `org`.
pub async fn apply_org(plat: &Platform, org: &mut Org) -> Result<ApplyResult, EngineError> {
    plat.rules().run(org).await?;

    // Gather stats on the way through so the returned counts are
    // authoritative even for a read-only (dry-run) port.
    let forge = StatsForge::new(plat.forge());

    let have_teams = forge.list_teams(&org.name).await?;

    promote_admins(&forge, org).await?;

    let kept = configure_teams(&forge, org, &have_teams).await?;

    configure_team_memberships(&forge, org, &kept).await?;

    let stats = forge.stats();
    tracing::info!(
        teams_created = stats.teams_created,
        teams_updated = stats.teams_updated,
        teams_deleted = stats.teams_deleted,
        memberships_added = stats.memberships_added,
        memberships_deleted = stats.memberships_deleted,
        org = %org.name,
        "applied organisation state"
    );

    Ok(ApplyResult {
        teams_created: stats.teams_created,
        teams_updated: stats.teams_updated,
        teams_deleted: stats.teams_deleted,
        memberships_added: stats.memberships_added,
        memberships_deleted: stats.memberships_deleted,
    })
}

/// Move org admins from member to maintainer roles throughout the tree.
///
/// The forge does not allow an org admin to hold a plain member role in a
/// team; representing them as members would make every apply look like a
/// demotion that the forge immediately undoes.
async fn promote_admins(forge: &StatsForge, org: &mut Org) -> Result<(), EngineError> {
    let admins: HashSet<String> = forge
        .list_admins(&org.name)
        .await?
        .into_iter()
        .map(|u| u.email)
        .collect();

    fn shuffle(teams: &mut [Team], admins: &HashSet<String>) {
        for team in teams {
            let (promoted, remaining): (Vec<String>, Vec<String>) = team
                .members
                .drain(..)
                .partition(|email| admins.contains(email));
            team.maintainers.extend(promoted);
            team.members = remaining;
            shuffle(&mut team.children, admins);
        }
    }

    shuffle(&mut org.teams, &admins);
    Ok(())
}

/// Converge forge teams onto the desired tree. Returns every team retained
/// after all creates/updates/deletes have occurred.
async fn configure_teams(
    forge: &StatsForge,
    org: &Org,
    have_teams: &[ForgeTeam],
) -> Result<Vec<KeptTeam>, EngineError> {
    let mut kept = Vec::new();
    process_teams(forge, &org.name, None, &org.teams, have_teams, &mut kept).await?;

    // Delete the teams that were not retained, deepest first so that no
    // delete races the forge's own cascade of child teams.
    let kept_ids: HashSet<ForgeTeamId> = kept.iter().map(|k| k.team.id).collect();
    let mut orphans: Vec<&ForgeTeam> = have_teams
        .iter()
        .filter(|t| !kept_ids.contains(&t.id))
        .collect();

    let depths = observed_depths(have_teams)?;
    orphans.sort_by_key(|t| std::cmp::Reverse(depths.get(&t.id).copied().unwrap_or(0)));

    for orphan in orphans {
        tracing::info!(team = %orphan.name, "deleting forge team");
        forge.delete_team(orphan.id).await?;
    }

    Ok(kept)
}

/// Depth-first walk of the desired teams, creating and updating as
/// necessary, carrying the (kept) parent team.
fn process_teams<'a>(
    forge: &'a StatsForge,
    org_name: &'a str,
    parent: Option<&'a ForgeTeam>,
    want_teams: &'a [Team],
    have_teams: &'a [ForgeTeam],
    kept: &'a mut Vec<KeptTeam>,
) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
    Box::pin(async move {
        for want in want_teams {
            let (team, created) = match find_forge_team_from_desired(have_teams, want) {
                Some(have) => (update_team(forge, parent, have, want).await?, false),
                None => (create_team(forge, org_name, parent, want).await?, true),
            };

            kept.push(KeptTeam {
                team: team.clone(),
                created,
            });

            process_teams(forge, org_name, Some(&team), &want.children, have_teams, kept)
                .await?;
        }
        Ok(())
    })
}

/// Update the existing forge team to match the desired state under the
/// given parent; no write is issued when nothing differs.
async fn update_team(
    forge: &StatsForge,
    parent: Option<&ForgeTeam>,
    have: &ForgeTeam,
    want: &Team,
) -> Result<ForgeTeam, EngineError> {
    let want_parent_id = parent.map(|p| p.id).unwrap_or_default();

    let modified = have.parent_id != want_parent_id
        || have.description != want.description
        || have.name != want.name;
    if !modified {
        return Ok(have.clone());
    }

    if have.name != want.name {
        tracing::info!(from = %have.name, to = %want.name, "renaming forge team");
    }
    match parent {
        Some(p) if have.parent_id != want_parent_id => {
            tracing::info!(team = %have.name, parent = %p.name, "updating team parent");
        }
        None if have.parent_id != want_parent_id => {
            tracing::info!(team = %have.name, "updating team to be top level");
        }
        _ => {}
    }

    let updated = ForgeTeam {
        id: have.id,
        parent_id: want_parent_id,
        name: want.name.clone(),
        description: want.description.clone(),
    };
    Ok(forge.update_team(&updated).await?)
}

/// Create the desired team under the given parent.
async fn create_team(
    forge: &StatsForge,
    org_name: &str,
    parent: Option<&ForgeTeam>,
    want: &Team,
) -> Result<ForgeTeam, EngineError> {
    match parent {
        Some(p) => tracing::info!(team = %want.name, parent = %p.name, "creating forge team"),
        None => tracing::info!(team = %want.name, "creating top-level forge team"),
    }

    let new_team = ForgeTeam {
        id: ForgeTeamId::default(),
        parent_id: parent.map(|p| p.id).unwrap_or_default(),
        name: want.name.clone(),
        description: want.description.clone(),
    };
    Ok(forge.create_team(org_name, &new_team).await?)
}

/// Converge each kept team's maintainer and member rosters onto the desired
/// state. The two roles are reconciled independently.
async fn configure_team_memberships(
    forge: &StatsForge,
    org: &Org,
    kept: &[KeptTeam],
) -> Result<(), EngineError> {
    let want_by_name = teams_by_name(&org.teams);

    for have in kept {
        let want = want_by_name
            .get(have.team.name.as_str())
            .ok_or_else(|| EngineError::MissingDesiredTeam {
                name: have.team.name.clone(),
            })?;

        // Freshly created teams have no members by construction, so there is
        // nothing to list.
        let (have_maintainers, have_members) = if have.created {
            (Vec::new(), Vec::new())
        } else {
            let maintainers = forge
                .list_team_members(&org.name, have.team.id, TeamRole::Maintainer)
                .await?;
            let members = forge
                .list_team_members(&org.name, have.team.id, TeamRole::Member)
                .await?;
            (maintainers, members)
        };

        update_memberships(
            forge,
            &org.name,
            &have.team,
            have_maintainers.iter().map(|u| u.email.as_str()),
            want.maintainers.iter().map(String::as_str),
            TeamRole::Maintainer,
        )
        .await?;

        update_memberships(
            forge,
            &org.name,
            &have.team,
            have_members.iter().map(|u| u.email.as_str()),
            want.members.iter().map(String::as_str),
            TeamRole::Member,
        )
        .await?;
    }

    Ok(())
}

/// Diff one role's roster by email set and issue one call per change, in
/// sorted order for determinism.
async fn update_memberships<'a>(
    forge: &StatsForge,
    org_name: &str,
    team: &ForgeTeam,
    have: impl Iterator<Item = &'a str>,
    want: impl Iterator<Item = &'a str>,
    role: TeamRole,
) -> Result<(), EngineError> {
    let have: BTreeSet<&str> = have.collect();
    let want: BTreeSet<&str> = want.collect();

    for email in want.difference(&have) {
        tracing::info!(user = %email, team = %team.name, role = %role, "adding team membership");
        forge
            .add_team_membership(org_name, team.id, email, role)
            .await?;
    }

    for email in have.difference(&want) {
        tracing::info!(user = %email, team = %team.name, role = %role, "removing team membership");
        forge
            .remove_team_membership(org_name, team.id, email, role)
            .await?;
    }

    Ok(())
}

/// Flatten the desired tree into a map keyed by team name.
fn teams_by_name(teams: &[Team]) -> HashMap<&str, &Team> {
    let mut by_name = HashMap::new();
    let mut stack: Vec<&Team> = teams.iter().collect();
    while let Some(team) = stack.pop() {
        by_name.insert(team.name.as_str(), team);
        stack.extend(team.children.iter());
    }
    by_name
}

/// Depth of each observed team, following parent chains. A chain longer
/// than the team count means the observed hierarchy is not a forest.
fn observed_depths(
    have_teams: &[ForgeTeam],
) -> Result<HashMap<ForgeTeamId, usize>, EngineError> {
    let by_id: HashMap<ForgeTeamId, &ForgeTeam> =
        have_teams.iter().map(|t| (t.id, t)).collect();

    let mut depths = HashMap::new();
    for team in have_teams {
        let mut depth = 0;
        let mut cursor = team;
        while cursor.parent_id != ForgeTeamId::default() {
            match by_id.get(&cursor.parent_id) {
                Some(parent) => cursor = *parent,
                None => break,
            }
            depth += 1;
            if depth > have_teams.len() {
                return Err(EngineError::HierarchyCycle {
                    name: team.name.clone(),
                });
            }
        }
        depths.insert(team.id, depth);
    }
    Ok(depths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forge_team(id: i64, parent: i64, name: &str) -> ForgeTeam {
        ForgeTeam {
            id: ForgeTeamId(id),
            parent_id: ForgeTeamId(parent),
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn apply_result_zero_value_has_no_changes() {
        assert!(!ApplyResult::default().has_changes());
        assert!(ApplyResult {
            teams_created: 1,
            ..ApplyResult::default()
        }
        .has_changes());
    }

    #[test]
    fn observed_depths_follow_parent_chains() {
        let teams = vec![
            forge_team(1, 0, "root"),
            forge_team(2, 1, "child"),
            forge_team(3, 2, "grandchild"),
        ];
        let depths = observed_depths(&teams).expect("depths");
        assert_eq!(depths[&ForgeTeamId(1)], 0);
        assert_eq!(depths[&ForgeTeamId(2)], 1);
        assert_eq!(depths[&ForgeTeamId(3)], 2);
    }

    #[test]
    fn cyclic_observed_hierarchy_is_fatal() {
        let teams = vec![forge_team(1, 2, "a"), forge_team(2, 1, "b")];
        let err = observed_depths(&teams).expect_err("must fail");
        assert!(matches!(err, EngineError::HierarchyCycle { .. }));
    }

    #[test]
    fn teams_by_name_flattens_the_tree() {
        let tree = vec![Team {
            name: "parent".to_string(),
            children: vec![Team {
                name: "child".to_string(),
                ..Team::default()
            }],
            ..Team::default()
        }];
        let by_name = teams_by_name(&tree);
        assert!(by_name.contains_key("parent"));
        assert!(by_name.contains_key("child"));
    }
}
