//! Package version bumps in `dbt_project.yml`.
use log::*;
use regex::{Captures, Regex};
use semver::Version;
use serde::Deserialize;
use std::{fs, path::Path, sync::LazyLock};
use strum::{Display, EnumString};

use crate::{changes::ChangeSet, error::Result, project::PROJECT_FILE};

/// Project files carrying the package version.
pub const VERSIONED_PROJECT_FILES: [&str; 2] =
    [PROJECT_FILE, "integration_tests/dbt_project.yml"];

/// Matches the top-level `version:` line, keeping its quoting intact.
static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^(?<prefix>version:[ \t]*)(?<open>['"]?)(?<version>[0-9][0-9A-Za-z.+-]*)(?<close>['"]?)"#,
    )
    .unwrap()
});

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BumpType {
    Patch,
    Minor,
    Major,
}

/// Applies `bump` to an `x.y.z` version. Pre-release and build metadata
/// are dropped.
pub fn bump_version(current: &str, bump: BumpType) -> Result<String> {
    let version = Version::parse(current.trim())?;

    let next = match bump {
        BumpType::Patch => {
            Version::new(version.major, version.minor, version.patch + 1)
        }
        BumpType::Minor => Version::new(version.major, version.minor + 1, 0),
        BumpType::Major => Version::new(version.major + 1, 0, 0),
    };

    Ok(next.to_string())
}

/// Rewrites the `version:` line of `content`. Returns `None` when there is
/// no top-level version.
pub fn bump_content(content: &str, bump: BumpType) -> Result<Option<String>> {
    let Some(caps) = VERSION_LINE.captures(content) else {
        return Ok(None);
    };

    let current = &caps["version"];
    let next = bump_version(current, bump)?;
    debug!("bumping version {current} -> {next}");

    let updated = VERSION_LINE.replacen(content, 1, |caps: &Captures| {
        format!(
            "{}{}{}{}",
            &caps["prefix"], &caps["open"], next, &caps["close"]
        )
    });

    Ok(Some(updated.into_owned()))
}

/// Bumps the version of the root and integration test projects, leaving
/// every other line of those files untouched.
pub fn bump_project_version(
    repo_path: &Path,
    bump: BumpType,
) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();

    for file in VERSIONED_PROJECT_FILES {
        let path = repo_path.join(file);

        if !path.is_file() {
            warn!("ignoring {}: not found", path.display());
            continue;
        }

        let content = fs::read_to_string(&path)?;

        match bump_content(&content, bump)? {
            Some(updated) if updated != content => {
                fs::write(&path, updated)?;
                info!("applied {bump} version bump to {}", path.display());
                changes.record(&path);
            }
            Some(_) => {}
            None => warn!("{} has no version to bump", path.display()),
        }
    }

    Ok(changes)
}
