//! `orgward repos` — repository dump, admin topics, and team permissions.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use orgward_core::model::{RepoPermission, TeamPermission};
use orgward_engine::{dump_repos, update_admin_topics, update_repo_teams, RepoTeamsChangeSet};

use crate::platform;
use crate::printer::{self, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum ReposCommand {
    /// Dump the observed repositories.
    Dump(ReposDumpArgs),

    /// Reconcile every repository's admin topics.
    UpdateAdminTopics(UpdateAdminTopicsArgs),

    /// Add and remove team permissions across repositories.
    UpdateTeams(UpdateTeamsArgs),
}

#[derive(Args, Debug)]
pub struct ReposDumpArgs {
    /// Name of the organisation that owns the repositories.
    #[arg(long)]
    pub org_name: String,
}

#[derive(Args, Debug)]
pub struct UpdateAdminTopicsArgs {
    /// Name of the organisation that owns the repositories.
    #[arg(long)]
    pub org_name: String,

    /// Simulate write operations.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct UpdateTeamsArgs {
    /// Name of the organisation that owns the repositories.
    #[arg(long)]
    pub org_name: String,

    /// Team to add with read permission.
    #[arg(long, value_delimiter = ',')]
    pub add_read_teams: Vec<String>,

    /// Team with read permission to remove.
    #[arg(long, value_delimiter = ',')]
    pub remove_read_teams: Vec<String>,

    /// Repos that should be excluded from the update.
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Repos that the update should be limited to.
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Simulate write operations.
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(command: ReposCommand, format: OutputFormat) -> Result<()> {
    match command {
        ReposCommand::Dump(args) => dump(args, format).await,
        ReposCommand::UpdateAdminTopics(args) => update_topics(args, format).await,
        ReposCommand::UpdateTeams(args) => update_teams(args, format).await,
    }
}

async fn dump(args: ReposDumpArgs, format: OutputFormat) -> Result<()> {
    let plat = platform::connect(true);
    let repos = dump_repos(&plat, &args.org_name)
        .await
        .context("error dumping repos")?;
    printer::print(format, &repos)
}

async fn update_topics(args: UpdateAdminTopicsArgs, format: OutputFormat) -> Result<()> {
    let plat = platform::connect(args.dry_run);
    let result = update_admin_topics(&plat, &args.org_name)
        .await
        .context("error updating admin topics")?;
    printer::print(format, &result)
}

async fn update_teams(args: UpdateTeamsArgs, format: OutputFormat) -> Result<()> {
    if args.add_read_teams.is_empty() && args.remove_read_teams.is_empty() {
        bail!("at least one of --add-read-teams or --remove-read-teams must be specified");
    }

    let change_set = RepoTeamsChangeSet {
        add_teams: read_permissions(&args.add_read_teams),
        remove_teams: read_permissions(&args.remove_read_teams),
        exclude_repos: args.exclude,
        only_repos: args.only,
    };

    let plat = platform::connect(args.dry_run);
    let result = update_repo_teams(&plat, &args.org_name, &change_set)
        .await
        .context("error updating repo teams")?;
    printer::print(format, &result)
}

fn read_permissions(teams: &[String]) -> Vec<TeamPermission> {
    teams
        .iter()
        .map(|name| TeamPermission {
            team_name: name.clone(),
            permission: RepoPermission::Read,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_teams_requires_a_change() {
        let args = UpdateTeamsArgs {
            org_name: "acme".to_string(),
            add_read_teams: Vec::new(),
            remove_read_teams: Vec::new(),
            exclude: Vec::new(),
            only: Vec::new(),
            dry_run: true,
        };

        let err = update_teams(args, OutputFormat::Quiet)
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("at least one of"));
    }

    #[test]
    fn read_permissions_map_to_read_level() {
        let perms = read_permissions(&["Foo".to_string()]);
        assert_eq!(perms[0].permission, RepoPermission::Read);
        assert_eq!(perms[0].team_name, "Foo");
    }
}
