//! End-to-end reconciliation scenarios against the in-memory forge.

use std::sync::Arc;

use orgward_core::model::{ForgeTeam, ForgeTeamId, Org, Repo, RepoPermission, Team, TeamPermission, TeamRole};
use orgward_engine::{apply_org, ApplyResult, Config, EngineError, Platform, RuleViolation};
use orgward_forge::mock::InMemoryForge;
use orgward_forge::ForgePort;

fn team(name: &str, members: &[&str]) -> Team {
    Team {
        name: name.to_string(),
        description: format!("{name} team"),
        members: members.iter().map(|m| m.to_string()).collect(),
        ..Team::default()
    }
}

/// A parent with two children and eight distinct members across the teams.
fn desired_org() -> Org {
    Org {
        name: "acme".to_string(),
        teams: vec![Team {
            restrict_members: vec![".*@acme.example".to_string()],
            children: vec![
                team("child1", &["carol@acme.example", "dan@acme.example", "erin@acme.example"]),
                team("child2", &["frank@acme.example", "grace@acme.example", "heidi@acme.example"]),
            ],
            ..team("parent", &["alice@acme.example", "bob@acme.example"])
        }],
    }
}

fn platform(forge: Arc<InMemoryForge>) -> Platform {
    Platform::new(Config::default(), forge)
}

#[tokio::test]
async fn create_from_scratch() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    let plat = platform(forge.clone());
    let mut org = desired_org();

    let result = apply_org(&plat, &mut org).await.expect("apply");

    assert_eq!(
        result,
        ApplyResult {
            teams_created: 3,
            memberships_added: 8,
            ..ApplyResult::default()
        }
    );

    let teams = forge.list_teams("acme").await.expect("list");
    assert_eq!(teams.len(), 3);
    let parent = teams.iter().find(|t| t.name == "parent").expect("parent");
    let child1 = teams.iter().find(|t| t.name == "child1").expect("child1");
    assert_eq!(parent.parent_id, ForgeTeamId(0));
    assert_eq!(child1.parent_id, parent.id);
}

#[tokio::test]
async fn second_apply_is_a_no_op() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    let plat = platform(forge);

    let mut org = desired_org();
    apply_org(&plat, &mut org).await.expect("first apply");

    let mut again = desired_org();
    let second = apply_org(&plat, &mut again).await.expect("second apply");
    assert!(!second.has_changes(), "second apply must write nothing: {second:?}");
}

#[tokio::test]
async fn observed_state_equal_to_desired_is_the_zero_value() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    forge.seed_team(ForgeTeam {
        id: ForgeTeamId(100),
        name: "platform".to_string(),
        description: "platform team".to_string(),
        ..ForgeTeam::default()
    });
    forge.seed_team_members(
        ForgeTeamId(100),
        TeamRole::Member,
        &["alice@acme.example", "bob@acme.example"],
    );

    let mut org = Org {
        name: "acme".to_string(),
        teams: vec![Team {
            restrict_members: vec![".*@acme.example".to_string()],
            description: "platform team".to_string(),
            ..team("platform", &["alice@acme.example", "bob@acme.example"])
        }],
    };

    let plat = platform(forge);
    let result = apply_org(&plat, &mut org).await.expect("apply");
    assert_eq!(result, ApplyResult::default());
}

#[tokio::test]
async fn rename_with_previously_preserves_identity() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    forge.seed_team(ForgeTeam {
        id: ForgeTeamId(101),
        parent_id: ForgeTeamId(100),
        name: "child1".to_string(),
        description: "child1 team".to_string(),
    });

    let mut org = Org {
        name: "acme".to_string(),
        teams: vec![Team {
            previously: vec!["child1".to_string()],
            restrict_members: vec![".*@acme.example".to_string()],
            description: "child1 team".to_string(),
            ..team("new-parent", &[])
        }],
    };

    let plat = platform(forge.clone());
    let result = apply_org(&plat, &mut org).await.expect("apply");

    assert_eq!(
        result,
        ApplyResult {
            teams_updated: 1,
            ..ApplyResult::default()
        }
    );

    let teams = forge.list_teams("acme").await.expect("list");
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, ForgeTeamId(101), "identity must be preserved");
    assert_eq!(teams[0].name, "new-parent");
    assert_eq!(teams[0].parent_id, ForgeTeamId(0), "now a top-level team");
}

#[tokio::test]
async fn orphan_with_active_repo_reference_fails_validation_with_zero_writes() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    forge.seed_team(ForgeTeam {
        id: ForgeTeamId(100),
        name: "Deleted Team".to_string(),
        ..ForgeTeam::default()
    });
    forge.seed_repo(Repo {
        name: "repo".to_string(),
        teams: vec![TeamPermission {
            team_name: "Deleted Team".to_string(),
            permission: RepoPermission::Admin,
        }],
        ..Repo::default()
    });

    let plat = platform(forge.clone());
    let mut org = Org {
        name: "acme".to_string(),
        teams: Vec::new(),
    };

    let err = apply_org(&plat, &mut org).await.expect_err("must fail");
    match err {
        EngineError::Rules(composite) => {
            assert_eq!(composite.violations.len(), 1);
            match &composite.violations[0] {
                RuleViolation::ActiveTeamDeletions(map) => {
                    assert_eq!(map["Deleted Team"], vec!["repo".to_string()]);
                }
                other => panic!("unexpected violation: {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }

    // Validator purity: nothing was written.
    let teams = forge.list_teams("acme").await.expect("list");
    assert_eq!(teams.len(), 1, "the team must not have been deleted");
}

#[tokio::test]
async fn orphans_without_references_are_deleted_deepest_first() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    forge.seed_team(ForgeTeam {
        id: ForgeTeamId(100),
        name: "stale-parent".to_string(),
        ..ForgeTeam::default()
    });
    forge.seed_team(ForgeTeam {
        id: ForgeTeamId(101),
        parent_id: ForgeTeamId(100),
        name: "stale-child".to_string(),
        ..ForgeTeam::default()
    });

    let plat = platform(forge.clone());
    let mut org = Org {
        name: "acme".to_string(),
        teams: Vec::new(),
    };

    let result = apply_org(&plat, &mut org).await.expect("apply");
    assert_eq!(result.teams_deleted, 2);
    assert!(forge.list_teams("acme").await.expect("list").is_empty());
}

#[tokio::test]
async fn admins_are_promoted_to_maintainers() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    forge.seed_admin("root@acme.example");

    let mut org = Org {
        name: "acme".to_string(),
        teams: vec![Team {
            restrict_members: vec![".*@acme.example".to_string()],
            ..team("platform", &["alice@acme.example", "root@acme.example"])
        }],
    };

    let plat = platform(forge.clone());
    let result = apply_org(&plat, &mut org).await.expect("apply");
    assert_eq!(result.memberships_added, 2);

    let teams = forge.list_teams("acme").await.expect("list");
    let maintainers = forge
        .list_team_members("acme", teams[0].id, TeamRole::Maintainer)
        .await
        .expect("maintainers");
    assert_eq!(maintainers.len(), 1);
    assert_eq!(maintainers[0].email, "root@acme.example");

    let members = forge
        .list_team_members("acme", teams[0].id, TeamRole::Member)
        .await
        .expect("members");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].email, "alice@acme.example");

    // The promotion converges: a second apply from a fresh document makes
    // no membership changes.
    let mut again = Org {
        name: "acme".to_string(),
        teams: vec![Team {
            restrict_members: vec![".*@acme.example".to_string()],
            ..team("platform", &["alice@acme.example", "root@acme.example"])
        }],
    };
    let second = apply_org(&plat, &mut again).await.expect("second apply");
    assert!(!second.has_changes(), "{second:?}");
}

#[tokio::test]
async fn membership_diffs_add_and_remove_per_role() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    forge.seed_team(ForgeTeam {
        id: ForgeTeamId(100),
        name: "platform".to_string(),
        description: "platform team".to_string(),
        ..ForgeTeam::default()
    });
    forge.seed_team_members(
        ForgeTeamId(100),
        TeamRole::Member,
        &["alice@acme.example", "leaver@acme.example"],
    );

    let mut org = Org {
        name: "acme".to_string(),
        teams: vec![Team {
            restrict_members: vec![".*@acme.example".to_string()],
            description: "platform team".to_string(),
            ..team("platform", &["alice@acme.example", "joiner@acme.example"])
        }],
    };

    let plat = platform(forge.clone());
    let result = apply_org(&plat, &mut org).await.expect("apply");

    assert_eq!(
        result,
        ApplyResult {
            memberships_added: 1,
            memberships_deleted: 1,
            ..ApplyResult::default()
        }
    );

    let members = forge
        .list_team_members("acme", ForgeTeamId(100), TeamRole::Member)
        .await
        .expect("members");
    let emails: Vec<&str> = members.iter().map(|u| u.email.as_str()).collect();
    assert!(emails.contains(&"alice@acme.example"));
    assert!(emails.contains(&"joiner@acme.example"));
    assert!(!emails.contains(&"leaver@acme.example"));
}

#[tokio::test]
async fn dry_run_reports_counts_without_writing() {
    let forge = Arc::new(InMemoryForge::new("acme"));
    let plat = Platform::read_only(Config::default(), forge.clone());
    let mut org = desired_org();

    let result = apply_org(&plat, &mut org).await.expect("apply");
    assert_eq!(result.teams_created, 3);
    assert_eq!(result.memberships_added, 8);

    assert!(
        forge.list_teams("acme").await.expect("list").is_empty(),
        "a dry run must not create teams"
    );
}
