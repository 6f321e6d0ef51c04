//! Command line arguments.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    config::{
        DEFAULT_CREDENTIALS_FILE, DEFAULT_PACKAGE_LIST_FILE,
        DEFAULT_UPDATE_CONFIG_FILE,
    },
    orchestrator::DEFAULT_WORK_DIR,
};

/// Global options shared by every subcommand.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    #[arg(long, default_value_t = false, global = true)]
    /// Apply changes locally and report them without committing or pushing.
    pub dry_run: bool,

    #[arg(long, default_value = DEFAULT_CREDENTIALS_FILE, global = true)]
    /// YAML file with `username` and `access_token`. The token falls back
    /// to the GITHUB_TOKEN env var.
    pub credentials: PathBuf,

    #[arg(long, default_value = DEFAULT_WORK_DIR, global = true)]
    /// Directory packages are cloned into. Existing package directories
    /// inside it are replaced.
    pub work_dir: PathBuf,

    #[arg(long, global = true)]
    /// Branch to commit to. Defaults to a timestamped branch per run.
    pub branch: Option<String>,

    #[arg(long, default_value_t = 0, global = true)]
    /// Git clone depth. Use 0 for full history.
    pub clone_depth: u32,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Merge each `dbt_<x>_source` package into its `dbt_<x>` package.
    Consolidate {
        #[arg(long, default_value = DEFAULT_PACKAGE_LIST_FILE)]
        /// Package list to consolidate.
        config: PathBuf,
    },

    /// Apply the file updates of a package manager config to every listed
    /// repository.
    Update {
        #[arg(long, default_value = DEFAULT_UPDATE_CONFIG_FILE)]
        /// Bulk update description.
        config: PathBuf,
    },
}
