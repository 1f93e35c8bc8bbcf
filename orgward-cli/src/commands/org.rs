//! `orgward org` — apply, dump, and merge organisation configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use orgward_core::{document, layout, model::Org};
use orgward_engine::{apply_org, dump_org};

use crate::platform;
use crate::printer::{self, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// Validate and apply organisation and team configuration.
    Apply(ApplyArgs),

    /// Dump the observed organisation structure.
    Dump(DumpArgs),

    /// Merge an org directory and print the resulting document (no network).
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// The org directory to apply.
    #[arg(long, conflicts_with = "file")]
    pub dir: Option<PathBuf>,

    /// The org config file to apply.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Simulate write operations.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Name of the organisation to dump.
    #[arg(long)]
    pub org_name: String,

    /// Directory to write the org hierarchy to; omitted means stdout.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// The org directory to merge.
    #[arg(long)]
    pub dir: PathBuf,
}

pub async fn run(command: OrgCommand, format: OutputFormat) -> Result<()> {
    match command {
        OrgCommand::Apply(args) => apply(args, format).await,
        OrgCommand::Dump(args) => dump(args, format).await,
        OrgCommand::Merge(args) => merge(args, format),
    }
}

async fn apply(args: ApplyArgs, format: OutputFormat) -> Result<()> {
    let mut org = read_org(args.file.as_deref(), args.dir.as_deref())?;

    let plat = platform::connect(args.dry_run);
    let result = apply_org(&plat, &mut org)
        .await
        .context("error applying org")?;

    printer::print(format, &result)
}

async fn dump(args: DumpArgs, format: OutputFormat) -> Result<()> {
    let plat = platform::connect(true);
    let org = dump_org(&plat, &args.org_name)
        .await
        .context("error dumping org")?;

    match args.dir {
        Some(dir) => layout::unmerge_org(&org, &dir)
            .with_context(|| format!("could not write org hierarchy under {}", dir.display()))
            .map(|_| ()),
        None => printer::print(format, &org),
    }
}

fn merge(args: MergeArgs, format: OutputFormat) -> Result<()> {
    let org = layout::merge_org(&args.dir)
        .with_context(|| format!("could not merge dir {}", args.dir.display()))?;
    printer::print(format, &org)
}

/// Read org configuration from either a single file or a directory
/// hierarchy; exactly one source must be given.
fn read_org(file: Option<&Path>, dir: Option<&Path>) -> Result<Org> {
    match (file, dir) {
        (Some(_), Some(_)) => bail!("either --dir or --file must be specified but not both"),
        (Some(file), None) => document::read_org_file(file)
            .with_context(|| format!("could not read {}", file.display())),
        (None, Some(dir)) => layout::merge_org(dir)
            .with_context(|| format!("could not merge dir {}", dir.display())),
        (None, None) => bail!("either --dir or --file must be specified"),
    }
}
