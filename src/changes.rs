//! Change tracking shared by every pipeline stage.
use std::path::{Path, PathBuf};

/// Files a stage modified plus any dbt variables it touched.
///
/// Every stage returns one of these and the orchestrator folds them
/// together to decide whether there is anything to commit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files written, copied or removed, in the order they changed.
    pub files: Vec<PathBuf>,
    /// Variable names carried forward by the project merge.
    pub variables: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_changed(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn record(&mut self, path: impl AsRef<Path>) {
        self.files.push(path.as_ref().to_path_buf());
    }

    /// Folds another stage's changes into this one.
    pub fn extend(&mut self, other: ChangeSet) {
        self.files.extend(other.files);
        self.variables.extend(other.variables);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_change_set_is_unchanged() {
        let changes = ChangeSet::new();
        assert!(!changes.is_changed());
    }

    #[test]
    fn variables_alone_do_not_count_as_changes() {
        let changes = ChangeSet {
            files: vec![],
            variables: vec!["issues".into()],
        };
        assert!(!changes.is_changed());
    }

    #[test]
    fn extend_folds_files_and_variables() {
        let mut first = ChangeSet::new();
        first.record("models/a.sql");

        let mut second = ChangeSet::new();
        second.record("dbt_project.yml");
        second.variables.push("issues".into());

        first.extend(second);

        assert!(first.is_changed());
        assert_eq!(
            first.files,
            vec![
                PathBuf::from("models/a.sql"),
                PathBuf::from("dbt_project.yml")
            ]
        );
        assert_eq!(first.variables, vec!["issues".to_string()]);
    }
}
