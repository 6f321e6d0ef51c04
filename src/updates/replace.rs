//! In-place text edits: literal find/replace and line insertion.
use log::*;
use std::{fs, path::Path};

use crate::{
    changes::ChangeSet,
    config::{AddToFile, FindAndReplace},
    error::Result,
};

/// Reads `path`, applies `edit` and writes the result back when it differs.
/// Missing files are logged and skipped.
fn edit_file(
    path: &Path,
    changes: &mut ChangeSet,
    edit: impl FnOnce(&str) -> String,
) -> Result<()> {
    if !path.is_file() {
        warn!("ignoring {}: not found", path.display());
        return Ok(());
    }

    let content = fs::read_to_string(path)?;
    let updated = edit(&content);

    if updated != content {
        fs::write(path, updated)?;
        debug!("updated {}", path.display());
        if !changes.files.iter().any(|f| f == path) {
            changes.record(path);
        }
    }

    Ok(())
}

/// Replaces every literal occurrence of `find` with `replace` in each of
/// the rule's files.
pub fn find_and_replace(
    repo_path: &Path,
    rules: &[FindAndReplace],
) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();

    for rule in rules {
        if rule.find.is_empty() {
            warn!("skipping find-and-replace rule with an empty search string");
            continue;
        }

        for (index, file) in rule.file_paths.iter().enumerate() {
            info!(
                "find-and-replace {}/{}: {}",
                index + 1,
                rule.file_paths.len(),
                file.display()
            );
            edit_file(&repo_path.join(file), &mut changes, |content| {
                content.replace(&rule.find, &rule.replace)
            })?;
        }
    }

    Ok(changes)
}

/// Inserts the rule's line at the top of each file, or appends it on a
/// line of its own at the bottom.
pub fn add_to_file(repo_path: &Path, rules: &[AddToFile]) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();

    for rule in rules {
        for file in rule.file_paths.iter() {
            info!("adding {:?} to {}", rule.new_line, file.display());
            edit_file(&repo_path.join(file), &mut changes, |content| {
                if rule.insert_at_top {
                    format!("{}\n{content}", rule.new_line)
                } else {
                    format!("{content}\n{}\n", rule.new_line)
                }
            })?;
        }
    }

    Ok(changes)
}
