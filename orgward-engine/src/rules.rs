//! The rule engine and the built-in business rules.
//!
//! Rules run in registration order. A rule either passes, yields a
//! [`RuleViolation`], or fails with an infrastructure error; violations are
//! accumulated into one [`CompositeRuleError`] while infrastructure errors
//! short-circuit verbatim.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use orgward_core::model::{find_forge_team_from_desired, Org, Team};
use orgward_forge::ForgePort;

use crate::error::EngineError;
use crate::topics::MAX_TOPIC_LENGTH;

const DOC_URL: &str = "https://github.com/orgward/orgward/blob/main/docs/rules.md";

/// The maximum allowable length of a team name. Kept at the repository topic
/// limit; admin topics derived from maximal names truncate by one character
/// to stay under it.
pub const MAX_TEAM_NAME_LENGTH: usize = MAX_TOPIC_LENGTH;

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// A single rule violation, carrying its structured listing.
///
/// Listings are ordered maps keyed by team name so that composite rendering
/// is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    /// Emails that do not resolve to members of the forge org, per team.
    UnknownUsers(BTreeMap<String, Vec<String>>),
    /// Team names that appear more than once in the tree.
    TeamNamesUnique(Vec<String>),
    /// Emails repeated within a single team, per team.
    UsersUniqueWithinTeam(BTreeMap<String, Vec<String>>),
    /// Team names that exceed the maximum length.
    TeamNameLength(Vec<String>),
    /// Teams slated for deletion that are still listed on repositories.
    ActiveTeamDeletions(BTreeMap<String, Vec<String>>),
    /// Emails not admitted by the team's inherited membership restrictions.
    CrossOrgMemberships(BTreeMap<String, Vec<String>>),
}

impl RuleViolation {
    /// Human description of the violated rule.
    pub fn description(&self) -> String {
        match self {
            RuleViolation::UnknownUsers(_) => "Users must be members of the forge org".to_string(),
            RuleViolation::TeamNamesUnique(_) => {
                "Team names must be unique within an organisation".to_string()
            }
            RuleViolation::UsersUniqueWithinTeam(_) => {
                "Users must not be repeated within a team".to_string()
            }
            RuleViolation::TeamNameLength(_) => {
                format!("Team names must not exceed {MAX_TEAM_NAME_LENGTH} characters")
            }
            RuleViolation::ActiveTeamDeletions(_) => {
                "Teams cannot be deleted if they are listed on one or more repositories".to_string()
            }
            RuleViolation::CrossOrgMemberships(_) => {
                "Team membership violations were detected".to_string()
            }
        }
    }

    /// The structured violation listing rendered as one line.
    pub fn constraint_violations(&self) -> String {
        match self {
            RuleViolation::UnknownUsers(v)
            | RuleViolation::UsersUniqueWithinTeam(v)
            | RuleViolation::ActiveTeamDeletions(v)
            | RuleViolation::CrossOrgMemberships(v) => render_map(v),
            RuleViolation::TeamNamesUnique(v) | RuleViolation::TeamNameLength(v) => quote_join(v),
        }
    }

    /// Link to the rule's documentation.
    pub fn link(&self) -> String {
        let anchor = match self {
            RuleViolation::UnknownUsers(_) => "unknown-users",
            RuleViolation::TeamNamesUnique(_) => "duplicate-team-names",
            RuleViolation::UsersUniqueWithinTeam(_) => "duplicate-team-members",
            RuleViolation::TeamNameLength(_) => "team-name-length",
            RuleViolation::ActiveTeamDeletions(_) => "active-team-deletions",
            RuleViolation::CrossOrgMemberships(_) => "cross-organisation-memberships",
        };
        format!("{DOC_URL}#{anchor}")
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description(), self.constraint_violations())
    }
}

/// Aggregate of one or more rule violations, returned as a single error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeRuleError {
    pub org_name: String,
    pub violations: Vec<RuleViolation>,
}

impl fmt::Display for CompositeRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .violations
            .iter()
            .map(|v| {
                format!(
                    "Rule: {} /// Violations: {} /// See: {}",
                    v.description(),
                    v.constraint_violations(),
                    v.link()
                )
            })
            .collect::<Vec<_>>()
            .join(" ///// ");
        write!(
            f,
            "the following rules are violated by org '{}': {rendered}",
            self.org_name
        )
    }
}

impl std::error::Error for CompositeRuleError {}

fn render_map(violations: &BTreeMap<String, Vec<String>>) -> String {
    violations
        .iter()
        .map(|(team, items)| format!("'{team}': {}", quote_join(items)))
        .collect::<Vec<_>>()
        .join("; ")
}

fn quote_join(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A single business rule run against a desired org.
#[async_trait]
pub trait Rule: Send + Sync {
    async fn check(&self, org: &Org) -> Result<Option<RuleViolation>, EngineError>;
}

/// An ordered list of rules.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    /// An engine with no rules registered.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// An engine with all built-in rules, in their reporting order.
    pub fn with_builtin_rules(forge: Arc<dyn ForgePort>) -> Self {
        let mut engine = Self::empty();
        engine.add(Box::new(UnknownUsersRule {
            forge: forge.clone(),
        }));
        engine.add(Box::new(TeamNamesUniqueRule));
        engine.add(Box::new(UsersUniqueWithinTeamRule));
        engine.add(Box::new(TeamNameLengthRule {
            max_length: MAX_TEAM_NAME_LENGTH,
        }));
        engine.add(Box::new(ActiveTeamDeletionsRule { forge }));
        engine.add(Box::new(CrossOrgMembershipsRule));
        engine
    }

    pub fn add(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Run every rule in registration order. Violations accumulate into a
    /// [`CompositeRuleError`]; any other failure short-circuits.
    pub async fn run(&self, org: &Org) -> Result<(), EngineError> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            if let Some(violation) = rule.check(org).await? {
                violations.push(violation);
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Rules(CompositeRuleError {
                org_name: org.name.clone(),
                violations,
            }))
        }
    }
}

/// Pre-order traversal of the whole desired tree.
fn all_teams(org: &Org) -> Vec<&Team> {
    let mut teams = Vec::new();
    let mut stack: Vec<&Team> = org.teams.iter().rev().collect();
    while let Some(team) = stack.pop() {
        teams.push(team);
        for child in team.children.iter().rev() {
            stack.push(child);
        }
    }
    teams
}

/// Maintainers followed by members, as listed.
fn team_emails(team: &Team) -> impl Iterator<Item = &String> {
    team.maintainers.iter().chain(team.members.iter())
}

// ---------------------------------------------------------------------------
// Built-in rules
// ---------------------------------------------------------------------------

/// Every listed email must resolve to a member of the forge org.
struct UnknownUsersRule {
    forge: Arc<dyn ForgePort>,
}

#[async_trait]
impl Rule for UnknownUsersRule {
    async fn check(&self, org: &Org) -> Result<Option<RuleViolation>, EngineError> {
        let mut violations: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for team in all_teams(org) {
            for email in team_emails(team) {
                match self.forge.user_by_email(&org.name, email).await {
                    Ok(_) => {}
                    Err(err) if err.is_user_not_found() => {
                        violations
                            .entry(team.name.clone())
                            .or_default()
                            .push(email.clone());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        Ok((!violations.is_empty()).then_some(RuleViolation::UnknownUsers(violations)))
    }
}

/// Team names must be unique across the entire tree, not just per parent.
struct TeamNamesUniqueRule;

#[async_trait]
impl Rule for TeamNamesUniqueRule {
    async fn check(&self, org: &Org) -> Result<Option<RuleViolation>, EngineError> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut violations = Vec::new();

        for team in all_teams(org) {
            if !seen.insert(team.name.clone()) && reported.insert(team.name.clone()) {
                violations.push(team.name.clone());
            }
        }

        Ok((!violations.is_empty()).then_some(RuleViolation::TeamNamesUnique(violations)))
    }
}

/// No email may appear more than once across a team's roles.
struct UsersUniqueWithinTeamRule;

#[async_trait]
impl Rule for UsersUniqueWithinTeamRule {
    async fn check(&self, org: &Org) -> Result<Option<RuleViolation>, EngineError> {
        let mut violations: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for team in all_teams(org) {
            let mut seen = HashSet::new();
            let mut reported = HashSet::new();
            for email in team_emails(team) {
                if !seen.insert(email.clone()) && reported.insert(email.clone()) {
                    violations
                        .entry(team.name.clone())
                        .or_default()
                        .push(email.clone());
                }
            }
        }

        Ok((!violations.is_empty()).then_some(RuleViolation::UsersUniqueWithinTeam(violations)))
    }
}

/// Team names must be short enough to serve as topic identifiers.
struct TeamNameLengthRule {
    max_length: usize,
}

#[async_trait]
impl Rule for TeamNameLengthRule {
    async fn check(&self, org: &Org) -> Result<Option<RuleViolation>, EngineError> {
        let violations: Vec<String> = all_teams(org)
            .into_iter()
            .filter(|t| t.name.len() > self.max_length)
            .map(|t| t.name.clone())
            .collect();

        Ok((!violations.is_empty()).then_some(RuleViolation::TeamNameLength(violations)))
    }
}

/// A team observed on the forge with no match in the desired tree may only
/// be deleted if no repository still lists it.
struct ActiveTeamDeletionsRule {
    forge: Arc<dyn ForgePort>,
}

#[async_trait]
impl Rule for ActiveTeamDeletionsRule {
    async fn check(&self, org: &Org) -> Result<Option<RuleViolation>, EngineError> {
        let have_teams = self.forge.list_teams(&org.name).await?;

        // Strike out every observed team matched by the desired tree, by
        // current name or any prior name.
        let mut doomed: BTreeMap<_, _> = have_teams.iter().map(|t| (t.id, t)).collect();
        for want in all_teams(org) {
            if let Some(have) = find_forge_team_from_desired(&have_teams, want) {
                doomed.remove(&have.id);
            }
        }

        let mut violations: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for have in doomed.values() {
            let mut repo_names = Vec::new();
            self.forge
                .walk_repos_by_team(&org.name, have.id, &mut |r| {
                    repo_names.push(r.name.clone());
                    ControlFlow::Continue(())
                })
                .await?;

            if !repo_names.is_empty() {
                violations.insert(have.name.clone(), repo_names);
            }
        }

        Ok((!violations.is_empty()).then_some(RuleViolation::ActiveTeamDeletions(violations)))
    }
}

/// Team memberships must satisfy every `restrictMembers` layer inherited
/// from ancestor teams.
///
/// Top-level teams must declare at least one pattern to admit anyone;
/// descendant teams that declare none inherit their ancestors' restrictions
/// via an allow-all layer of their own.
struct CrossOrgMembershipsRule;

#[async_trait]
impl Rule for CrossOrgMembershipsRule {
    async fn check(&self, org: &Org) -> Result<Option<RuleViolation>, EngineError> {
        let mut violations = BTreeMap::new();
        check_memberships(&org.teams, &[], true, &mut violations)?;
        Ok((!violations.is_empty()).then_some(RuleViolation::CrossOrgMemberships(violations)))
    }
}

fn check_memberships(
    teams: &[Team],
    stack: &[Vec<Regex>],
    is_root: bool,
    violations: &mut BTreeMap<String, Vec<String>>,
) -> Result<(), EngineError> {
    for team in teams {
        let own_patterns: Vec<String> = if !is_root && team.restrict_members.is_empty() {
            vec![".*".to_string()]
        } else {
            team.restrict_members.clone()
        };

        let own_layer = own_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| EngineError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut child_stack = stack.to_vec();
        child_stack.push(own_layer);

        for email in team_emails(team) {
            let admitted = child_stack
                .iter()
                .all(|layer| layer.iter().any(|re| re.is_match(email)));
            if !admitted {
                let listed = violations.entry(team.name.clone()).or_default();
                if !listed.contains(email) {
                    listed.push(email.clone());
                }
            }
        }

        check_memberships(&team.children, &child_stack, false, violations)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
