//! Dependency pins in `packages.yml`.
//!
//! Entries are edited line by line so comments, ordering and quoting of
//! everything else in the file survive.
use log::*;
use regex::Regex;
use serde::Deserialize;
use std::{fs, path::Path, sync::LazyLock};

use crate::{
    changes::ChangeSet,
    error::Result,
    updates::version::{BumpType, bump_version},
};

/// Dependency file at the root of every package.
pub const PACKAGES_FILE: &str = "packages.yml";
/// Hub name of the shared macro package.
pub const UTILS_PACKAGE: &str = "fivetran/fivetran_utils";
/// Hub namespace whose ranges follow the source bump.
const OWNED_NAMESPACE: &str = "fivetran";

static ITEM_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s").unwrap());

static PACKAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:-\s+)?package:\s*['"]?(?<name>[^'"\s#]+)"#).unwrap()
});

static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<prefix>\s*(?:-\s+)?version:[ \t]*)(?<value>[^\r\n]*?)(?<eol>\r?\n?)$")
        .unwrap()
});

static SEMVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").unwrap());

/// Version requirement written for a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VersionRequirement {
    Exact(String),
    Range(Vec<String>),
}

impl VersionRequirement {
    /// Inline YAML for the `version:` value.
    pub fn render(&self) -> String {
        match self {
            Self::Exact(version) => format!("\"{version}\""),
            Self::Range(bounds) => {
                let quoted: Vec<String> =
                    bounds.iter().map(|b| format!("\"{b}\"")).collect();
                format!("[{}]", quoted.join(", "))
            }
        }
    }
}

/// Shifts a `[">=x.y.z", "<a.b.c"]` range by `bump`. Returns `None` when
/// the value does not hold exactly two versions.
pub fn bump_range(value: &str, bump: BumpType) -> Result<Option<String>> {
    let bounds: Vec<&str> = SEMVER.find_iter(value).map(|m| m.as_str()).collect();

    let [min, max] = bounds[..] else {
        return Ok(None);
    };

    let new_min = bump_version(min, bump)?;
    let mut new_max = bump_version(max, bump)?;

    // a major bump collapses "<0.x" ranges onto the new minimum
    if semver::Version::parse(&new_max)? <= semver::Version::parse(&new_min)? {
        new_max = bump_version(&new_min, BumpType::Minor)?;
    }

    Ok(Some(format!("[\">={new_min}\", \"<{new_max}\"]")))
}

fn entry_version(
    name: &str,
    current: &str,
    utils_version: Option<&VersionRequirement>,
    source_bump: Option<BumpType>,
) -> Result<Option<String>> {
    if name == UTILS_PACKAGE {
        return Ok(utils_version.map(VersionRequirement::render));
    }

    match source_bump {
        Some(bump) if bump != BumpType::Patch && name.contains(OWNED_NAMESPACE) => {
            let updated = bump_range(current, bump)?;
            if updated.is_none() {
                warn!("{name}: cannot read version range {current}, leaving it");
            }
            Ok(updated)
        }
        _ => Ok(None),
    }
}

/// Rewrites the `version:` of each matching entry of a `packages.yml`
/// document.
pub fn update_content(
    content: &str,
    utils_version: Option<&VersionRequirement>,
    source_bump: Option<BumpType>,
) -> Result<String> {
    let mut lines: Vec<String> =
        content.split_inclusive('\n').map(str::to_string).collect();

    // entries as [start, end) line ranges
    let mut starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| ITEM_START.is_match(line))
        .map(|(index, _)| index)
        .collect();
    starts.push(lines.len());

    for window in starts.windows(2) {
        let entry = window[0]..window[1];

        let Some(name) = lines[entry.clone()]
            .iter()
            .find_map(|line| PACKAGE_LINE.captures(line))
            .map(|caps| caps["name"].to_string())
        else {
            continue;
        };

        let Some(index) = entry.clone().find(|i| VERSION_LINE.is_match(&lines[*i]))
        else {
            continue;
        };

        let Some(caps) = VERSION_LINE.captures(&lines[index]) else {
            continue;
        };
        let prefix = caps["prefix"].to_string();
        let current = caps["value"].trim().to_string();
        let eol = caps["eol"].to_string();

        if let Some(next) =
            entry_version(&name, &current, utils_version, source_bump)?
            && next != current
        {
            debug!("{name}: {current} -> {next}");
            lines[index] = format!("{prefix}{next}{eol}");
        }
    }

    Ok(lines.concat())
}

/// Pins the shared utils package and shifts owned package ranges in the
/// checkout's `packages.yml`.
pub fn update_packages(
    repo_path: &Path,
    utils_version: Option<&VersionRequirement>,
    source_bump: Option<BumpType>,
) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();

    if utils_version.is_none() && source_bump.is_none() {
        return Ok(changes);
    }

    let path = repo_path.join(PACKAGES_FILE);

    if !path.is_file() {
        warn!("ignoring {}: not found", path.display());
        return Ok(changes);
    }

    let content = fs::read_to_string(&path)?;
    let updated = update_content(&content, utils_version, source_bump)?;

    if updated != content {
        fs::write(&path, updated)?;
        info!("updated package dependencies in {}", path.display());
        changes.record(&path);
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const PACKAGES: &str = indoc! {r#"
        packages:
          # sources
          - package: fivetran/jira_source
            version: [">=0.7.0", "<0.8.0"]

          - package: fivetran/fivetran_utils
            version: [">=0.4.0", "<0.5.0"]

          - package: dbt-labs/dbt_utils
            version: [">=1.0.0", "<2.0.0"]
    "#};

    fn utils_range() -> VersionRequirement {
        VersionRequirement::Range(vec![">=0.5.0".into(), "<0.6.0".into()])
    }

    #[test]
    fn pins_utils_and_shifts_owned_ranges() {
        let updated =
            update_content(PACKAGES, Some(&utils_range()), Some(BumpType::Minor))
                .unwrap();

        assert_eq!(
            updated,
            indoc! {r#"
                packages:
                  # sources
                  - package: fivetran/jira_source
                    version: [">=0.8.0", "<0.9.0"]

                  - package: fivetran/fivetran_utils
                    version: [">=0.5.0", "<0.6.0"]

                  - package: dbt-labs/dbt_utils
                    version: [">=1.0.0", "<2.0.0"]
            "#}
        );
    }

    #[test]
    fn patch_source_bump_leaves_ranges() {
        let updated =
            update_content(PACKAGES, None, Some(BumpType::Patch)).unwrap();

        assert_eq!(updated, PACKAGES);
    }

    #[test]
    fn exact_utils_version_is_quoted() {
        let content = indoc! {"
            packages:
              - package: 'fivetran/fivetran_utils'
                version: 0.4.0
        "};
        let pin = VersionRequirement::Exact("0.4.2".into());

        let updated = update_content(content, Some(&pin), None).unwrap();

        assert_eq!(
            updated,
            indoc! {r#"
                packages:
                  - package: 'fivetran/fivetran_utils'
                    version: "0.4.2"
            "#}
        );
    }

    #[test]
    fn major_bump_keeps_range_open() {
        assert_eq!(
            bump_range(r#"[">=0.7.0", "<0.8.0"]"#, BumpType::Major)
                .unwrap()
                .as_deref(),
            Some(r#"[">=1.0.0", "<1.1.0"]"#)
        );
    }

    #[test]
    fn unreadable_range_is_left_alone() {
        let content = indoc! {"
            packages:
              - package: fivetran/jira_source
                version: 0.7.0
        "};

        let updated =
            update_content(content, None, Some(BumpType::Minor)).unwrap();

        assert_eq!(updated, content);
    }

    #[test]
    fn version_before_package_is_matched_within_entry() {
        let content = indoc! {r#"
            packages:
              - version: [">=0.7.0", "<0.8.0"]
                package: fivetran/jira_source
        "#};

        let updated =
            update_content(content, None, Some(BumpType::Minor)).unwrap();

        assert_eq!(
            updated,
            indoc! {r#"
                packages:
                  - version: [">=0.8.0", "<0.9.0"]
                    package: fivetran/jira_source
            "#}
        );
    }

    #[test_log::test]
    fn writes_packages_file_only_when_changed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(PACKAGES_FILE), PACKAGES).unwrap();

        let changes =
            update_packages(tmp.path(), None, Some(BumpType::Patch)).unwrap();
        assert!(!changes.is_changed());

        let changes =
            update_packages(tmp.path(), Some(&utils_range()), None).unwrap();
        assert_eq!(changes.files, vec![tmp.path().join(PACKAGES_FILE)]);
        assert!(
            fs::read_to_string(tmp.path().join(PACKAGES_FILE))
                .unwrap()
                .contains(r#"version: [">=0.5.0", "<0.6.0"]"#)
        );
    }

    #[test_log::test]
    fn missing_packages_file_is_skipped() {
        let tmp = TempDir::new().unwrap();

        let changes =
            update_packages(tmp.path(), Some(&utils_range()), None).unwrap();

        assert!(!changes.is_changed());
    }
}
