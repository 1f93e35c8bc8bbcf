//! Strict YAML codec for org and team documents.
//!
//! The decoder rejects unknown keys, which in particular keeps the
//! `maintainers` key off the document surface: maintainer state is derived
//! at apply time and must never round-trip through persisted YAML.

use std::path::Path;

use crate::error::DocumentError;
use crate::model::{Org, Team};

/// Decode an org document from YAML.
pub fn decode_org(buf: &str) -> Result<Org, serde_yaml::Error> {
    serde_yaml::from_str(buf)
}

/// Decode a team document from YAML.
pub fn decode_team(buf: &str) -> Result<Team, serde_yaml::Error> {
    serde_yaml::from_str(buf)
}

/// Encode an org document as YAML.
pub fn encode_org(org: &Org) -> Result<String, DocumentError> {
    Ok(serde_yaml::to_string(org)?)
}

/// Encode a team document as YAML.
pub fn encode_team(team: &Team) -> Result<String, DocumentError> {
    Ok(serde_yaml::to_string(team)?)
}

/// Read and decode an org document from a file, annotating parse failures
/// with the offending path.
pub fn read_org_file(path: &Path) -> Result<Org, DocumentError> {
    let buf = std::fs::read_to_string(path).map_err(|e| crate::error::io_err(path, e))?;
    decode_org(&buf).map_err(|source| DocumentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_document_roundtrip() {
        let yaml = "\
name: acme
teams:
  - name: platform
    description: Platform team
    members:
      - alice@acme.example
";
        let org = decode_org(yaml).expect("decode");
        assert_eq!(org.name, "acme");
        assert_eq!(org.teams.len(), 1);
        assert_eq!(org.teams[0].members, vec!["alice@acme.example"]);

        let encoded = encode_org(&org).expect("encode");
        let back = decode_org(&encoded).expect("decode again");
        assert_eq!(org, back);
    }

    #[test]
    fn nested_teams_use_the_teams_key() {
        let yaml = "\
name: parent
teams:
  - name: child
";
        let team = decode_team(yaml).expect("decode");
        assert_eq!(team.children.len(), 1);
        assert_eq!(team.children[0].name, "child");
    }

    #[test]
    fn restrict_members_uses_camel_case() {
        let yaml = "\
name: secure
restrictMembers:
  - \".*@acme.example\"
";
        let team = decode_team(yaml).expect("decode");
        assert_eq!(team.restrict_members, vec![".*@acme.example"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = "\
name: acme
colour: blue
";
        assert!(decode_org(yaml).is_err());
    }

    #[test]
    fn maintainers_key_is_rejected() {
        let yaml = "\
name: platform
maintainers:
  - sneaky@acme.example
";
        assert!(decode_team(yaml).is_err());
    }

    #[test]
    fn maintainers_are_never_serialised() {
        let team = Team {
            name: "platform".to_string(),
            maintainers: vec!["admin@acme.example".to_string()],
            members: vec!["alice@acme.example".to_string()],
            ..Team::default()
        };

        let encoded = encode_team(&team).expect("encode");
        assert!(!encoded.contains("admin@acme.example"));
        assert!(encoded.contains("alice@acme.example"));
    }

    #[test]
    fn empty_collections_are_omitted() {
        let team = Team {
            name: "bare".to_string(),
            ..Team::default()
        };

        let encoded = encode_team(&team).expect("encode");
        assert!(!encoded.contains("members"));
        assert!(!encoded.contains("previously"));
        assert!(!encoded.contains("teams"));
    }
}
