//! Domain types for the organisational directory.
//!
//! The desired state ([`Org`], [`Team`]) is authored in YAML documents; the
//! observed state ([`ForgeTeam`], [`Repo`], [`User`]) is what the forge
//! reports at snapshot time. Document field names are part of the external
//! contract and are pinned with serde attributes.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Desired state
// ---------------------------------------------------------------------------

/// Root of the desired state for one organisation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Org {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<Team>,
}

/// Desired state for a single team.
///
/// `maintainers` is deliberately not part of the document surface: it cannot
/// be specified in YAML and is never serialised. The reconciler populates it
/// internally when promoting organisation admins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Team {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Prior names of this team; the rename channel across applies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previously: Vec<String>,

    #[serde(skip)]
    pub maintainers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,

    /// Regex patterns restricting who may be a member of this team and its
    /// descendants.
    #[serde(
        rename = "restrictMembers",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub restrict_members: Vec<String>,

    #[serde(rename = "teams", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Team>,
}

// ---------------------------------------------------------------------------
// Observed state
// ---------------------------------------------------------------------------

/// Opaque identifier of a team on the forge.
///
/// `0` means "no team": a [`ForgeTeam`] with `parent_id` 0 is a top-level
/// team, and a team that does not exist yet has id 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ForgeTeamId(pub i64);

impl fmt::Display for ForgeTeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for ForgeTeamId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A team as observed on the forge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForgeTeam {
    pub id: ForgeTeamId,
    pub parent_id: ForgeTeamId,
    pub name: String,
    pub description: String,
}

/// A user as observed on the forge, keyed by login and company email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub login: String,
    pub email: String,
}

/// A user's role within a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamRole {
    Maintainer,
    Member,
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamRole::Maintainer => write!(f, "maintainer"),
            TeamRole::Member => write!(f, "member"),
        }
    }
}

/// A team's permission level on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoPermission {
    Read,
    Write,
    Admin,
}

impl fmt::Display for RepoPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoPermission::Read => write!(f, "read"),
            RepoPermission::Write => write!(f, "write"),
            RepoPermission::Admin => write!(f, "admin"),
        }
    }
}

/// A team/permission pair on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPermission {
    pub team_name: String,
    pub permission: RepoPermission,
}

/// A repository as observed on the forge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Repo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<TeamPermission>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sort the teams and team members within the org alphanumerically to assist
/// with comparisons and stable output.
pub fn sort_org(org: &mut Org) {
    org.teams.sort_by(|a, b| a.name.cmp(&b.name));
    for team in &mut org.teams {
        sort_team(team);
    }
}

/// Sort the members, maintainers and child teams of the team.
pub fn sort_team(team: &mut Team) {
    team.maintainers.sort();
    team.members.sort();
    team.children.sort_by(|a, b| a.name.cmp(&b.name));
    for child in &mut team.children {
        sort_team(child);
    }
}

/// Return the observed team matching the desired team: first by current
/// name, then by each entry of `previously` in order. First hit wins.
pub fn find_forge_team_from_desired<'a>(
    teams: &'a [ForgeTeam],
    want: &Team,
) -> Option<&'a ForgeTeam> {
    std::iter::once(want.name.as_str())
        .chain(want.previously.iter().map(String::as_str))
        .find_map(|name| teams.iter().find(|t| t.name == name))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
