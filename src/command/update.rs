//! `update` subcommand.
use log::*;
use std::path::Path;

use crate::{
    cli,
    command::common,
    config::UpdateConfig,
    error::Result,
    orchestrator::{
        PackageReport,
        workflow::{UPDATE_BRANCH_PREFIX, UpdateWorkflow},
    },
};

pub fn execute(args: &cli::Args, config: &Path) -> Result<Vec<PackageReport>> {
    let update = UpdateConfig::load(config)?;

    if update.repositories.is_empty() {
        warn!("{} lists no repositories: nothing to do", config.display());
        return Ok(vec![]);
    }

    if !update.files_to_add.is_empty() && !update.files_to_add_directory.is_dir()
    {
        warn!(
            "files to add directory {} does not exist",
            update.files_to_add_directory.display()
        );
    }

    let branch = common::resolve_branch(
        args.branch.as_deref(),
        update.branch_name.as_deref(),
        UPDATE_BRANCH_PREFIX,
    );

    let host = update.host.clone();
    let owner = update.owner.clone();
    let repositories = update.repositories.clone();

    common::run_workflow(
        args,
        Box::new(UpdateWorkflow::new(update)),
        &host,
        &owner,
        branch,
        &repositories,
    )
}
