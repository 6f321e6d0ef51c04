//! Adding and removing whole files in a package checkout.
use log::*;
use std::{fs, path::Path};
use walkdir::WalkDir;

use crate::{changes::ChangeSet, error::Result};

/// Deletes each path (file or directory tree) relative to `repo_path`.
/// Paths that do not exist are logged and skipped.
pub fn remove_files(repo_path: &Path, paths: &[impl AsRef<Path>]) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();

    for rel in paths {
        let target = repo_path.join(rel);

        if target.is_dir() {
            fs::remove_dir_all(&target)?;
            info!("removed directory {}", rel.as_ref().display());
        } else if target.is_file() {
            fs::remove_file(&target)?;
            info!("removed file {}", rel.as_ref().display());
        } else {
            warn!("ignoring {}: not found", target.display());
            continue;
        }

        changes.record(&target);
    }

    Ok(changes)
}

/// Copies each path from `source_dir` into the same relative location in
/// `repo_path`, overwriting what is there. Directories are copied
/// recursively. Only files whose contents differ are recorded.
pub fn add_files(
    repo_path: &Path,
    source_dir: &Path,
    paths: &[impl AsRef<Path>],
) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();

    for rel in paths {
        let source = source_dir.join(rel);
        let dest = repo_path.join(rel);

        if source.is_dir() {
            for entry in WalkDir::new(&source).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative =
                    entry.path().strip_prefix(&source).unwrap_or(entry.path());
                copy_if_changed(entry.path(), &dest.join(relative), &mut changes)?;
            }
            info!("added directory {}", rel.as_ref().display());
        } else if source.is_file() {
            copy_if_changed(&source, &dest, &mut changes)?;
            info!("added file {}", rel.as_ref().display());
        } else {
            warn!("ignoring {}: not found", source.display());
        }
    }

    Ok(changes)
}

fn copy_if_changed(
    source: &Path,
    dest: &Path,
    changes: &mut ChangeSet,
) -> Result<()> {
    let content = fs::read(source)?;

    if dest.is_file() && fs::read(dest)? == content {
        debug!("{} is already up to date", dest.display());
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(dest, content)?;
    changes.record(dest);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test_log::test]
    fn removes_files_and_directories() {
        let repo = TempDir::new().unwrap();
        write(repo.path(), ".circleci/config.yml", "version: 2");
        write(repo.path(), "old.md", "old");
        write(repo.path(), "keep.md", "keep");

        let changes =
            remove_files(repo.path(), &[".circleci", "old.md", "missing.md"])
                .unwrap();

        assert_eq!(
            changes.files,
            vec![repo.path().join(".circleci"), repo.path().join("old.md")]
        );
        assert!(!repo.path().join(".circleci").exists());
        assert!(!repo.path().join("old.md").exists());
        assert!(repo.path().join("keep.md").exists());
    }

    #[test_log::test]
    fn adds_files_and_directory_trees() {
        let repo = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        write(source.path(), ".github/PULL_REQUEST_TEMPLATE.md", "## PR");
        write(source.path(), ".github/ISSUE_TEMPLATE/bug.yml", "name: bug");
        write(source.path(), "LICENSE", "Apache");

        let changes = add_files(
            repo.path(),
            source.path(),
            &[".github", "LICENSE", "missing.txt"],
        )
        .unwrap();

        assert_eq!(changes.files.len(), 3);
        assert_eq!(
            fs::read_to_string(repo.path().join(".github/ISSUE_TEMPLATE/bug.yml"))
                .unwrap(),
            "name: bug"
        );
        assert_eq!(
            fs::read_to_string(repo.path().join("LICENSE")).unwrap(),
            "Apache"
        );
    }

    #[test]
    fn identical_files_are_not_reported() {
        let repo = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        write(source.path(), "LICENSE", "Apache");
        write(repo.path(), "LICENSE", "Apache");

        let changes = add_files(repo.path(), source.path(), &["LICENSE"]).unwrap();

        assert!(!changes.is_changed());
    }

    #[test]
    fn existing_files_are_overwritten() {
        let repo = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        write(source.path(), "LICENSE", "Apache");
        write(repo.path(), "LICENSE", "MIT");

        let changes = add_files(repo.path(), source.path(), &["LICENSE"]).unwrap();

        assert!(changes.is_changed());
        assert_eq!(
            fs::read_to_string(repo.path().join("LICENSE")).unwrap(),
            "Apache"
        );
    }
}
