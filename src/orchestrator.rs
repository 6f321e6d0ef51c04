//! Drives a [`Workflow`] over every listed package.
//!
//! Packages are processed one at a time. For each one the orchestrator
//! resets its working directory, clones the workflow's repositories,
//! switches the primary checkout to the run's branch, applies the workflow
//! and then commits and pushes when something changed. A failing package is
//! logged and skipped; the run always visits every package.
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use log::*;
use std::{fmt, fs, path::PathBuf};

use crate::{
    error::{Result, UpdaterError},
    orchestrator::workflow::{PackagePlan, Workflow},
    repo::VersionControl,
};

pub mod workflow;

/// Default directory packages are cloned into.
pub const DEFAULT_WORK_DIR: &str = "tmp";

/// Per-run branch name: `<prefix>/<UTC timestamp>`.
pub fn default_branch(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}/{}", now.format("%Y%m%d-%H%M%S"))
}

/// How processing a package ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// Changes were committed and pushed to the branch.
    Pushed { branch: String },
    /// Changes were found but not committed.
    DryRun,
    NoChanges,
    Failed { reason: String },
}

impl fmt::Display for PackageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pushed { branch } => write!(f, "pushed to {branch}"),
            Self::DryRun => write!(f, "changes detected (dry run, not committed)"),
            Self::NoChanges => write!(f, "no changes needed"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub package: String,
    pub outcome: PackageOutcome,
}

#[derive(Builder)]
#[builder(pattern = "owned", build_fn(private, name = "_build"))]
pub struct OrchestratorParams {
    pub workflow: Box<dyn Workflow>,
    pub vcs: Box<dyn VersionControl>,
    #[builder(setter(into))]
    pub work_dir: PathBuf,
    #[builder(setter(into))]
    pub branch: String,
    #[builder(default)]
    pub dry_run: bool,
}

impl OrchestratorParamsBuilder {
    pub fn build(self) -> Result<Orchestrator> {
        let params = self._build().map_err(|e| {
            UpdaterError::invalid_config(format!(
                "Failed to build orchestrator: {}",
                e
            ))
        })?;
        Orchestrator::new(params)
    }
}

pub struct Orchestrator {
    workflow: Box<dyn Workflow>,
    vcs: Box<dyn VersionControl>,
    work_dir: PathBuf,
    branch: String,
    dry_run: bool,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorParamsBuilder {
        OrchestratorParamsBuilder::default()
    }

    pub fn new(params: OrchestratorParams) -> Result<Self> {
        if params.branch.trim().is_empty() {
            return Err(UpdaterError::invalid_config("branch name is empty"));
        }

        Ok(Self {
            workflow: params.workflow,
            vcs: params.vcs,
            work_dir: params.work_dir,
            branch: params.branch,
            dry_run: params.dry_run,
        })
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Processes every package in order. Failures are reported in the
    /// returned list rather than aborting the run.
    pub fn run(&self, packages: &[String]) -> Vec<PackageReport> {
        if self.dry_run {
            info!("dry run: changes will not be committed or pushed");
        }

        let mut reports = vec![];

        for package in packages {
            let plan = self.workflow.plan(package, &self.work_dir);
            info!("processing {}", plan.name);

            let outcome = match self.process_package(package, &plan) {
                Ok(outcome) => outcome,
                Err(err) if err.is_version_control() => {
                    error!("git error for {}: {err}", plan.name);
                    PackageOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
                Err(err) => {
                    error!("unexpected error for {}: {err}", plan.name);
                    PackageOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            };

            info!("{}: {outcome}", plan.name);
            reports.push(PackageReport {
                package: plan.name,
                outcome,
            });
        }

        reports
    }

    fn process_package(
        &self,
        package: &str,
        plan: &PackagePlan,
    ) -> Result<PackageOutcome> {
        if plan.root.exists() {
            debug!("removing previous checkout {}", plan.root.display());
            fs::remove_dir_all(&plan.root)?;
        }
        fs::create_dir_all(&plan.root)?;

        for checkout in plan.checkouts.iter() {
            self.vcs.clone_repo(&checkout.repo, &checkout.path)?;
        }

        let primary = plan.primary().ok_or_else(|| {
            UpdaterError::invalid_config(format!(
                "no repositories to clone for {}",
                plan.name
            ))
        })?;

        self.vcs.create_branch(&primary.path, &self.branch)?;

        let changes = self.workflow.apply(package, &self.work_dir)?;

        if !changes.is_changed() {
            return Ok(PackageOutcome::NoChanges);
        }

        for file in changes.files.iter() {
            debug!("changed: {}", file.display());
        }

        if self.dry_run {
            return Ok(PackageOutcome::DryRun);
        }

        self.vcs
            .commit_all(&primary.path, &self.workflow.commit_message())?;
        self.vcs.push_branch(&primary.path, &self.branch)?;

        Ok(PackageOutcome::Pushed {
            branch: self.branch.clone(),
        })
    }
}

/// Logs one line per package and a final tally.
pub fn log_summary(reports: &[PackageReport]) {
    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, PackageOutcome::Failed { .. }))
        .count();

    info!("summary:");
    for report in reports {
        info!("  {}: {}", report.package, report.outcome);
    }

    if failed > 0 {
        warn!("{failed} of {} package(s) failed", reports.len());
    } else {
        info!("{} package(s) processed", reports.len());
    }
}
