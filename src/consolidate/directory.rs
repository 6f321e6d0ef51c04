//! Copies a subtree of the source package into the transform package.
use log::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

use crate::{changes::ChangeSet, error::Result};

/// Suffix inserted before the extension of an incoming file whose name is
/// already taken at the destination.
pub const COLLISION_SUFFIX: &str = "_source";

/// Copies every file under `source_root/subfolder` into
/// `dest_root/dest_override` (or `dest_root/subfolder`), recreating the
/// relative directory structure.
///
/// Existing destination files are never overwritten: the incoming file is
/// renamed with [`COLLISION_SUFFIX`] instead, repeated until the name is
/// free. A missing source subtree is
/// not an error and yields an empty change set.
pub fn merge_subtree(
    source_root: &Path,
    dest_root: &Path,
    subfolder: &str,
    dest_override: Option<&str>,
) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();
    let src_path = source_root.join(subfolder);
    let dst_path = dest_root.join(dest_override.unwrap_or(subfolder));

    if !src_path.is_dir() {
        debug!("no {subfolder} to merge from {}", source_root.display());
        return Ok(changes);
    }

    for entry in WalkDir::new(&src_path).sort_by_file_name() {
        let entry = entry?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&src_path)
            .unwrap_or(entry.path());

        let mut dest_file = dst_path.join(relative);

        if let Some(parent) = dest_file.parent() {
            fs::create_dir_all(parent)?;
        }

        if dest_file.exists() {
            let mut renamed = collision_name(&dest_file);
            while renamed.exists() {
                renamed = collision_name(&renamed);
            }
            warn!(
                "{} already exists, copying as {}",
                dest_file.display(),
                renamed.display()
            );
            dest_file = renamed;
        }

        fs::copy(entry.path(), &dest_file)?;
        debug!("copied {} -> {}", entry.path().display(), dest_file.display());
        changes.record(&dest_file);
    }

    info!(
        "merged {} files from {} into {}",
        changes.files.len(),
        src_path.display(),
        dst_path.display()
    );

    Ok(changes)
}

/// `utils.sql` -> `utils_source.sql`, `.gitkeep` -> `.gitkeep_source`
fn collision_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(ext) => {
            format!("{stem}{COLLISION_SUFFIX}.{}", ext.to_string_lossy())
        }
        None => format!("{stem}{COLLISION_SUFFIX}"),
    };

    path.with_file_name(file_name)
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

    #[test]
    fn collision_name_inserts_suffix_before_extension() {
        assert_eq!(
            collision_name(Path::new("macros/utils.sql")),
            PathBuf::from("macros/utils_source.sql")
        );
        assert_eq!(
            collision_name(Path::new("models/a.b.yml")),
            PathBuf::from("models/a.b_source.yml")
        );
        assert_eq!(
            collision_name(Path::new("models/.gitkeep")),
            PathBuf::from("models/.gitkeep_source")
        );
        assert_eq!(
            collision_name(Path::new("README")),
            PathBuf::from("README_source")
        );
    }

    #[test]
    fn missing_subtree_is_not_an_error() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let changes =
            merge_subtree(source.path(), dest.path(), "macros", Some("macros/staging"))
                .unwrap();

        assert!(!changes.is_changed());
        assert!(!dest.path().join("macros").exists());
    }

    #[test]
    fn copies_nested_structure_under_override() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(source.path(), "models/stg_jira__issue.sql", "select 1");
        write(source.path(), "models/tmp/stg_jira__issue_tmp.sql", "select 2");

        let changes =
            merge_subtree(source.path(), dest.path(), "models", Some("models/staging"))
                .unwrap();

        assert_eq!(changes.files.len(), 2);
        assert_eq!(
            fs::read_to_string(
                dest.path().join("models/staging/stg_jira__issue.sql")
            )
            .unwrap(),
            "select 1"
        );
        assert_eq!(
            fs::read_to_string(
                dest.path().join("models/staging/tmp/stg_jira__issue_tmp.sql")
            )
            .unwrap(),
            "select 2"
        );
    }

    #[test]
    fn copies_to_same_subfolder_without_override() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(source.path(), "seeds/a.csv", "id\n1\n");

        let changes =
            merge_subtree(source.path(), dest.path(), "seeds", None).unwrap();

        assert!(changes.is_changed());
        assert!(dest.path().join("seeds/a.csv").exists());
    }

    #[test]
    fn collision_keeps_existing_file_and_adds_suffixed_copy() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(source.path(), "macros/helper.sql", "-- from source");
        write(dest.path(), "macros/staging/helper.sql", "-- from transform");

        let changes =
            merge_subtree(source.path(), dest.path(), "macros", Some("macros/staging"))
                .unwrap();

        assert_eq!(
            changes.files,
            vec![dest.path().join("macros/staging/helper_source.sql")]
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("macros/staging/helper.sql"))
                .unwrap(),
            "-- from transform"
        );
        assert_eq!(
            fs::read_to_string(
                dest.path().join("macros/staging/helper_source.sql")
            )
            .unwrap(),
            "-- from source"
        );
    }

    #[test]
    fn second_run_produces_suffixed_duplicates() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(source.path(), "models/a.sql", "select 1");
        write(source.path(), "models/nested/b.sql", "select 2");

        let first =
            merge_subtree(source.path(), dest.path(), "models", Some("models/staging"))
                .unwrap();
        let second =
            merge_subtree(source.path(), dest.path(), "models", Some("models/staging"))
                .unwrap();

        assert_eq!(first.files.len(), 2);
        assert_eq!(second.files.len(), 2);
        assert!(dest.path().join("models/staging/a_source.sql").exists());
        assert!(
            dest.path()
                .join("models/staging/nested/b_source.sql")
                .exists()
        );
    }

    #[test]
    fn repeated_merges_never_overwrite_suffixed_copies() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(dest.path(), "macros/helper.sql", "-- from transform");

        for run in 1..=3 {
            write(source.path(), "macros/helper.sql", &format!("-- run {run}"));
            merge_subtree(source.path(), dest.path(), "macros", None).unwrap();
        }

        let read = |name: &str| {
            fs::read_to_string(dest.path().join("macros").join(name)).unwrap()
        };
        assert_eq!(read("helper.sql"), "-- from transform");
        assert_eq!(read("helper_source.sql"), "-- run 1");
        assert_eq!(read("helper_source_source.sql"), "-- run 2");
        assert_eq!(read("helper_source_source_source.sql"), "-- run 3");
    }
}
