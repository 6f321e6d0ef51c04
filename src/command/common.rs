//! Setup shared by every subcommand.
use chrono::Utc;
use log::*;

use crate::{
    cli,
    config::{Credentials, RemoteConfig},
    error::Result,
    orchestrator::{Orchestrator, PackageReport, default_branch, workflow::Workflow},
    repo::GitClient,
};

/// Branch precedence: `--branch`, then the configured branch, then a fresh
/// `<prefix>/<timestamp>` branch.
pub fn resolve_branch(
    cli_branch: Option<&str>,
    configured: Option<&str>,
    prefix: &str,
) -> String {
    cli_branch
        .or(configured)
        .map(str::to_string)
        .unwrap_or_else(|| default_branch(prefix, Utc::now()))
}

/// Connects to `host`/`owner` with the credentials named in `args` and
/// runs `workflow` over `repositories`.
pub fn run_workflow(
    args: &cli::Args,
    workflow: Box<dyn Workflow>,
    host: &str,
    owner: &str,
    branch: String,
    repositories: &[String],
) -> Result<Vec<PackageReport>> {
    let credentials = Credentials::load(&args.credentials)?;
    let remote = RemoteConfig::new(host, owner, &credentials, args.clone_depth);

    info!(
        "processing {} package(s) from {host}/{owner} on branch {branch}",
        repositories.len()
    );

    let orchestrator = Orchestrator::builder()
        .workflow(workflow)
        .vcs(Box::new(GitClient::new(remote)))
        .work_dir(args.work_dir.clone())
        .branch(branch)
        .dry_run(args.dry_run)
        .build()?;

    Ok(orchestrator.run(repositories))
}
