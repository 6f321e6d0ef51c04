//! Consolidation of a dbt source package into its transform package.
//!
//! A transform package `dbt_<name>` builds on the staging models of
//! `dbt_<name>_source`. Consolidation folds the source package into the
//! transform package in three steps:
//!
//! 1. The source `dbt_project.yml` becomes the transform's baseline while
//!    the transform's model and variable settings are carried forward
//!    ([`project::consolidate_project`]), and the source `packages.yml`
//!    replaces the transform's ([`project::copy_packages_file`]).
//! 2. Source `models/` and `macros/` are copied under `staging/`
//!    ([`directory::merge_subtree`]).
//! 3. Transform models that read the carried-forward variables are pointed
//!    at the new staging models ([`references::rewrite_variable_references`]).
//!
//! Every step reports the files it changed so the caller can skip
//! committing when nothing moved.
use log::*;
use std::path::{Path, PathBuf};

use crate::{
    changes::ChangeSet,
    consolidate::references::VariableReferenceMap,
    error::Result,
};

pub mod directory;
pub mod project;
pub mod references;

/// Prefix shared by every dbt package repository name.
pub const PACKAGE_PREFIX: &str = "dbt_";
/// Suffix distinguishing a source package from its transform package.
pub const SOURCE_SUFFIX: &str = "_source";

/// The transform package and its source package, checked out side by side
/// under `package_root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePair {
    /// Transform repository name, e.g. `dbt_jira`.
    pub transform_name: String,
    /// Source repository name, e.g. `dbt_jira_source`.
    pub source_name: String,
    /// Directory containing both checkouts.
    pub package_root: PathBuf,
}

impl PackagePair {
    /// Builds the pair for a transform package identifier. Identifiers may
    /// omit the `dbt_` prefix; the pair lives in `work_dir/<base name>`.
    pub fn new(identifier: &str, work_dir: &Path) -> Self {
        let base = base_name(identifier);
        let transform_name = format!("{PACKAGE_PREFIX}{base}");
        let source_name = format!("{transform_name}{SOURCE_SUFFIX}");

        Self {
            transform_name,
            source_name,
            package_root: work_dir.join(base),
        }
    }

    /// Transform name without the `dbt_` prefix, e.g. `jira`. Also the
    /// key of the transform package inside `models` and `vars`.
    pub fn transform_base(&self) -> String {
        base_name(&self.transform_name)
    }

    /// Key of the source package inside `models` and `vars`.
    pub fn source_base(&self) -> String {
        base_name(&self.source_name)
    }

    pub fn transform_path(&self) -> PathBuf {
        self.package_root.join(&self.transform_name)
    }

    pub fn source_path(&self) -> PathBuf {
        self.package_root.join(&self.source_name)
    }
}

/// Strips the `dbt_` prefix: `dbt_jira` -> `jira`.
pub fn base_name(name: &str) -> String {
    name.strip_prefix(PACKAGE_PREFIX).unwrap_or(name).to_string()
}

/// Runs every consolidation stage for `pair` and folds their changes.
pub fn consolidate_package(pair: &PackagePair) -> Result<ChangeSet> {
    let source = pair.source_path();
    let transform = pair.transform_path();

    let mut changes = project::consolidate_project(pair)?;
    let variables = changes.variables.clone();

    changes.extend(project::copy_packages_file(pair)?);
    changes.extend(directory::merge_subtree(
        &source,
        &transform,
        "models",
        Some("models/staging"),
    )?);
    changes.extend(directory::merge_subtree(
        &source,
        &transform,
        "macros",
        Some("macros/staging"),
    )?);

    let reference_map =
        VariableReferenceMap::build(&pair.transform_base(), &variables);
    let rewritten = references::rewrite_variable_references(
        &transform.join("models"),
        &reference_map,
    )?;
    changes.files.extend(rewritten.files);

    info!(
        "{}: {} file(s) changed during consolidation",
        pair.transform_name,
        changes.files.len()
    );

    Ok(changes)
}
