//! `orgward version` — build metadata.

use anyhow::Result;
use serde::Serialize;

use crate::printer::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<&'static str>,
}

pub fn run(format: OutputFormat) -> Result<()> {
    let info = BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("ORGWARD_COMMIT"),
    };
    printer::print(format, &info)
}
