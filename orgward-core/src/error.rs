//! Error types for orgward-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from document and layout operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Underlying I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (encode path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes the file path for context.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A directory that must hold a control file does not.
    #[error("expected '{file}' in directory '{dir}' but none found")]
    MissingControlFile { dir: PathBuf, file: &'static str },

    /// A file that has no place in the organisational structure.
    #[error("unexpected file '{path}': {reason}")]
    UnexpectedFile { path: PathBuf, reason: String },

    /// A team directory whose name disagrees with the normalised team name.
    #[error(
        "team directory '{dir}' should be named '{valid_dir}' to be consistent \
         with normalisation of team name '{team_name}'"
    )]
    InvalidTeamDirName {
        dir: PathBuf,
        valid_dir: PathBuf,
        team_name: String,
    },
}

/// Convenience constructor for [`DocumentError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DocumentError {
    DocumentError::Io {
        path: path.into(),
        source,
    }
}
