//! What the orchestrator does to each listed package.
use std::path::{Path, PathBuf};

use crate::{
    changes::ChangeSet,
    config::UpdateConfig,
    consolidate::{self, PackagePair},
    error::Result,
    updates,
};

/// Branch prefix used by `consolidate` when no branch is given.
pub const CONSOLIDATE_BRANCH_PREFIX: &str = "consolidate-source";
/// Branch prefix used by `update` when no branch is given.
pub const UPDATE_BRANCH_PREFIX: &str = "package-update";
/// Commit message for consolidation commits.
pub const CONSOLIDATE_COMMIT_MESSAGE: &str =
    "Consolidate dbt source into transform";
/// Commit message for bulk updates without a configured message.
pub const DEFAULT_UPDATE_COMMIT_MESSAGE: &str = "Update package files";

/// A repository to clone and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub repo: String,
    pub path: PathBuf,
}

/// Working layout for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePlan {
    /// Name reported in logs and outcomes.
    pub name: String,
    /// Directory owned by this package for the duration of the run.
    pub root: PathBuf,
    /// Repositories to clone. The first one receives the branch, commit
    /// and push.
    pub checkouts: Vec<Checkout>,
}

impl PackagePlan {
    pub fn primary(&self) -> Option<&Checkout> {
        self.checkouts.first()
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Workflow {
    /// Layout for `package` under `work_dir`.
    fn plan(&self, package: &str, work_dir: &Path) -> PackagePlan;
    /// Edits the cloned checkouts and reports what changed.
    fn apply(&self, package: &str, work_dir: &Path) -> Result<ChangeSet>;
    fn commit_message(&self) -> String;
}

/// Folds `dbt_<x>_source` into `dbt_<x>`.
pub struct ConsolidateWorkflow;

impl Workflow for ConsolidateWorkflow {
    fn plan(&self, package: &str, work_dir: &Path) -> PackagePlan {
        let pair = PackagePair::new(package, work_dir);

        PackagePlan {
            name: pair.transform_name.clone(),
            root: pair.package_root.clone(),
            checkouts: vec![
                Checkout {
                    repo: pair.transform_name.clone(),
                    path: pair.transform_path(),
                },
                Checkout {
                    repo: pair.source_name.clone(),
                    path: pair.source_path(),
                },
            ],
        }
    }

    fn apply(&self, package: &str, work_dir: &Path) -> Result<ChangeSet> {
        consolidate::consolidate_package(&PackagePair::new(package, work_dir))
    }

    fn commit_message(&self) -> String {
        CONSOLIDATE_COMMIT_MESSAGE.to_string()
    }
}

/// Applies `package_manager.yml` to each repository.
pub struct UpdateWorkflow {
    config: UpdateConfig,
}

impl UpdateWorkflow {
    pub fn new(config: UpdateConfig) -> Self {
        Self { config }
    }
}

impl Workflow for UpdateWorkflow {
    fn plan(&self, package: &str, work_dir: &Path) -> PackagePlan {
        let root = work_dir.join(package);

        PackagePlan {
            name: package.to_string(),
            root: root.clone(),
            checkouts: vec![Checkout {
                repo: package.to_string(),
                path: root,
            }],
        }
    }

    fn apply(&self, package: &str, work_dir: &Path) -> Result<ChangeSet> {
        updates::apply_updates(&self.config, &work_dir.join(package))
    }

    fn commit_message(&self) -> String {
        self.config
            .commit_message
            .clone()
            .unwrap_or_else(|| DEFAULT_UPDATE_COMMIT_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consolidate_plan_clones_transform_first() {
        let plan = ConsolidateWorkflow.plan("jira", Path::new("tmp"));

        assert_eq!(plan.name, "dbt_jira");
        assert_eq!(plan.root, PathBuf::from("tmp/jira"));
        assert_eq!(
            plan.checkouts,
            vec![
                Checkout {
                    repo: "dbt_jira".into(),
                    path: PathBuf::from("tmp/jira/dbt_jira"),
                },
                Checkout {
                    repo: "dbt_jira_source".into(),
                    path: PathBuf::from("tmp/jira/dbt_jira_source"),
                },
            ]
        );
        assert_eq!(plan.primary().unwrap().repo, "dbt_jira");
    }

    #[test]
    fn update_plan_clones_single_repository() {
        let workflow = UpdateWorkflow::new(UpdateConfig::default());

        let plan = workflow.plan("dbt_jira", Path::new("tmp"));

        assert_eq!(plan.root, PathBuf::from("tmp/dbt_jira"));
        assert_eq!(plan.checkouts.len(), 1);
        assert_eq!(plan.primary().unwrap().path, PathBuf::from("tmp/dbt_jira"));
    }

    #[test]
    fn update_commit_message_defaults() {
        let workflow = UpdateWorkflow::new(UpdateConfig::default());
        assert_eq!(workflow.commit_message(), DEFAULT_UPDATE_COMMIT_MESSAGE);

        let workflow = UpdateWorkflow::new(UpdateConfig {
            commit_message: Some("Bump versions".into()),
            ..UpdateConfig::default()
        });
        assert_eq!(workflow.commit_message(), "Bump versions");
    }
}
