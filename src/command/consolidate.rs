//! `consolidate` subcommand.
use log::*;
use std::path::Path;

use crate::{
    cli,
    command::common,
    config::PackageList,
    error::Result,
    orchestrator::{
        PackageReport,
        workflow::{CONSOLIDATE_BRANCH_PREFIX, ConsolidateWorkflow},
    },
};

pub fn execute(args: &cli::Args, config: &Path) -> Result<Vec<PackageReport>> {
    let list = PackageList::load(config)?;

    if list.repositories.is_empty() {
        warn!("{} lists no repositories: nothing to do", config.display());
        return Ok(vec![]);
    }

    let branch = common::resolve_branch(
        args.branch.as_deref(),
        None,
        CONSOLIDATE_BRANCH_PREFIX,
    );

    common::run_workflow(
        args,
        Box::new(ConsolidateWorkflow),
        &list.host,
        &list.owner,
        branch,
        &list.repositories,
    )
}
