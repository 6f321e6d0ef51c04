//! Subcommand execution.
//!
//! Each subcommand loads its configuration, picks a workflow and hands it
//! to the shared orchestrator run in [`common`]:
//!
//! - **consolidate**: fold every listed `dbt_<x>_source` package into its
//!   `dbt_<x>` transform package.
//! - **update**: apply the removals, additions, text edits and version bump
//!   of a `package_manager.yml` to every listed repository.
//!
//! Both return the per-package reports so the caller can summarize them.
use crate::{cli, error::Result, orchestrator::PackageReport};

pub mod common;
pub mod consolidate;
pub mod update;

/// Runs the subcommand selected in `args`.
pub fn execute(args: &cli::Args) -> Result<Vec<PackageReport>> {
    match &args.command {
        cli::Command::Consolidate { config } => {
            consolidate::execute(args, config)
        }
        cli::Command::Update { config } => update::execute(args, config),
    }
}
