//! Bulk file updates described by `package_manager.yml`.
//!
//! Each operation edits a package checkout in place and reports the files
//! it touched. Operations run in a fixed order: removals, additions,
//! find-and-replace, line insertions, the version bump and finally the
//! `packages.yml` dependency update.
use log::*;
use std::path::Path;

use crate::{changes::ChangeSet, config::UpdateConfig, error::Result};

pub mod files;
pub mod packages;
pub mod replace;
pub mod version;

/// Applies every configured operation to the checkout at `repo_path`.
pub fn apply_updates(config: &UpdateConfig, repo_path: &Path) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();

    changes.extend(files::remove_files(repo_path, &config.files_to_remove)?);
    changes.extend(files::add_files(
        repo_path,
        &config.files_to_add_directory,
        &config.files_to_add,
    )?);
    changes.extend(replace::find_and_replace(
        repo_path,
        &config.find_and_replace,
    )?);
    changes.extend(replace::add_to_file(repo_path, &config.files_to_add_to)?);

    if let Some(bump) = config.version_bump_type {
        changes.extend(version::bump_project_version(repo_path, bump)?);
    }

    changes.extend(packages::update_packages(
        repo_path,
        config.fivetran_utils_version.as_ref(),
        config.source_bump_type,
    )?);

    info!(
        "{}: {} file(s) updated",
        repo_path.display(),
        changes.files.len()
    );

    Ok(changes)
}
