//! Error types for orgward-engine.

use thiserror::Error;

use orgward_forge::ForgeError;

use crate::rules::CompositeRuleError;

/// All errors that can arise from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A forge operation failed; surfaced verbatim.
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// One or more business rules are violated.
    #[error(transparent)]
    Rules(#[from] CompositeRuleError),

    /// A `restrictMembers` pattern does not compile.
    #[error("invalid restrictMembers pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A change set references a team that does not exist on the forge.
    #[error("team '{name}' does not exist")]
    UnknownTeam { name: String },

    /// A kept forge team has no counterpart in the desired tree.
    #[error("expected team '{name}' to be in desired state")]
    MissingDesiredTeam { name: String },

    /// The observed parent chain loops; the hierarchy must be a forest.
    #[error("observed team hierarchy contains a cycle through team '{name}'")]
    HierarchyCycle { name: String },
}
