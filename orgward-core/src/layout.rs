//! Merge/unmerge between an [`Org`] and a filesystem hierarchy.
//!
//! A root directory holds exactly one `org.yaml`. Each team lives in a
//! subdirectory (at any depth) holding exactly one `team.yaml` plus zero or
//! more child team subdirectories. A team's directory name must equal the
//! normalised form of its team name. Any other file is an error.

use std::path::{Path, PathBuf};

use crate::document;
use crate::error::{io_err, DocumentError};
use crate::model::{Org, Team};
use crate::normalise::normalise_name;

/// Control file that describes an org.
pub const ORG_FILE: &str = "org.yaml";
/// Control file that describes a team within an org.
pub const TEAM_FILE: &str = "team.yaml";

const UNRECOGNISED_FILE_REASON: &str = "only org.yaml and team.yaml files are supported";
const MULTIPLE_ORG_FILES_REASON: &str = "multiple org.yaml files detected";
const NO_SIBLING_FILES_REASON: &str = "org.yaml and team.yaml files can't be siblings";

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Descend into `dir`, reading the `org.yaml` and `team.yaml` files, and
/// construct an [`Org`].
pub fn merge_org(dir: &Path) -> Result<Org, DocumentError> {
    let org_path = dir.join(ORG_FILE);
    if !org_path.exists() {
        return Err(DocumentError::MissingControlFile {
            dir: dir.to_path_buf(),
            file: ORG_FILE,
        });
    }

    let mut org = document::read_org_file(&org_path)?;
    org.teams = descend(dir, true)?;
    Ok(org)
}

/// Read the teams nested under `dir`, validating the layout as we go.
fn descend(dir: &Path, is_root: bool) -> Result<Vec<Team>, DocumentError> {
    let mut teams = Vec::new();

    for path in sorted_entries(dir)? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if path.is_dir() {
            // Every subdirectory must contain a team.yaml file.
            let team_path = path.join(TEAM_FILE);
            if !team_path.exists() {
                return Err(DocumentError::MissingControlFile {
                    dir: path.clone(),
                    file: TEAM_FILE,
                });
            }
            let mut team = read_team(&team_path)?;

            // The directory must be named after the normalised team name.
            let norm_name = normalise_name(&team.name);
            if file_name != norm_name {
                return Err(DocumentError::InvalidTeamDirName {
                    dir: path.clone(),
                    valid_dir: dir.join(&norm_name),
                    team_name: team.name,
                });
            }

            team.children = descend(&path, false)?;
            teams.push(team);
            continue;
        }

        // org.yaml is only legal in the top-level org directory.
        if file_name == ORG_FILE {
            if !is_root {
                return Err(DocumentError::UnexpectedFile {
                    path,
                    reason: MULTIPLE_ORG_FILES_REASON.to_string(),
                });
            }
            continue;
        }

        // team.yaml is only legal in subdirectories of the org directory.
        if file_name == TEAM_FILE {
            if is_root {
                return Err(DocumentError::UnexpectedFile {
                    path,
                    reason: NO_SIBLING_FILES_REASON.to_string(),
                });
            }
            continue;
        }

        return Err(DocumentError::UnexpectedFile {
            path,
            reason: UNRECOGNISED_FILE_REASON.to_string(),
        });
    }

    Ok(teams)
}

// ---------------------------------------------------------------------------
// Unmerge
// ---------------------------------------------------------------------------

/// Decompose the org into a hierarchy of team directories under
/// `dir/<normalise(org.name)>/`.
///
/// The written `org.yaml` carries no `teams` and each `team.yaml` carries no
/// nested `teams`: the hierarchy itself encodes the tree.
pub fn unmerge_org(org: &Org, dir: &Path) -> Result<(), DocumentError> {
    let org_dir = dir.join(normalise_name(&org.name));
    std::fs::create_dir(&org_dir).map_err(|e| io_err(&org_dir, e))?;

    let mut flat = org.clone();
    flat.teams = Vec::new();
    write_file(&org_dir.join(ORG_FILE), &document::encode_org(&flat)?)?;

    write_teams(&org_dir, &org.teams)
}

fn write_teams(dir: &Path, teams: &[Team]) -> Result<(), DocumentError> {
    for team in teams {
        let team_dir = dir.join(normalise_name(&team.name));
        std::fs::create_dir(&team_dir).map_err(|e| io_err(&team_dir, e))?;

        let mut flat = team.clone();
        flat.children = Vec::new();
        write_file(&team_dir.join(TEAM_FILE), &document::encode_team(&flat)?)?;

        write_teams(&team_dir, &team.children)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Directory entries in name order, so that validation errors and merged
/// output are deterministic.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn read_team(path: &Path) -> Result<Team, DocumentError> {
    let buf = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    document::decode_team(&buf).map_err(|source| DocumentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), DocumentError> {
    std::fs::write(path, contents).map_err(|e| io_err(path, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
