//! Rewrites `var()` lookups in transform models into `ref()` calls that
//! point at the staging models merged in from the source package.
use log::*;
use regex::Regex;
use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path},
};
use walkdir::WalkDir;

use crate::{changes::ChangeSet, error::Result};

/// Directory name holding the relocated source models, which are the
/// targets of the rewrite and never rewritten themselves.
pub const STAGING_DIR: &str = "staging";

/// Variable name -> staging model name, kept in variable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableReferenceMap {
    entries: Vec<(String, String)>,
}

impl VariableReferenceMap {
    /// Maps every variable to `stg_{base_name}__{variable}`.
    pub fn build(base_name: &str, variables: &[String]) -> Self {
        Self {
            entries: variables
                .iter()
                .map(|var| (var.clone(), format!("stg_{base_name}__{var}")))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == variable)
            .map(|(_, v)| v.as_str())
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Compiled replacement for a single variable.
struct Replacement {
    regex: Regex,
    expression: String,
}

fn compile(map: &VariableReferenceMap) -> Result<Vec<Replacement>> {
    map.iter()
        .map(|(var, model)| {
            let pattern = format!(
                r#"\{{\{{\s*var\(\s*['"]{}['"]\s*\)\s*\}}\}}"#,
                regex::escape(var)
            );
            Ok(Replacement {
                regex: Regex::new(&pattern)?,
                expression: format!("{{{{ ref('{model}') }}}}"),
            })
        })
        .collect()
}

/// `'{{` -> `{{` and `}}'` -> `}}` across the whole file.
fn strip_template_quotes(content: &str) -> String {
    content.replace("'{{", "{{").replace("}}'", "}}")
}

/// Applies every replacement to `content`, then strips quotes around
/// template expressions.
pub fn rewrite_content(content: &str, map: &VariableReferenceMap) -> Result<String> {
    let mut rewritten = content.to_string();
    for replacement in compile(map)? {
        rewritten = replacement
            .regex
            .replace_all(&rewritten, regex::NoExpand(&replacement.expression))
            .into_owned();
    }
    Ok(strip_template_quotes(&rewritten))
}

fn in_staging(models_root: &Path, path: &Path) -> bool {
    path.strip_prefix(models_root)
        .unwrap_or(path)
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == STAGING_DIR))
}

/// Rewrites every `.sql` file under `models_root` outside of any `staging`
/// directory, writing back only files whose content changed. Quotes around
/// template expressions are stripped in every visited file, mapped or not.
pub fn rewrite_variable_references(
    models_root: &Path,
    map: &VariableReferenceMap,
) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();

    if !models_root.is_dir() {
        debug!("no models to rewrite in {}", models_root.display());
        return Ok(changes);
    }

    info!(
        "replacing vars using keys: {:?}",
        map.variables().collect::<Vec<_>>()
    );

    let replacements = compile(map)?;
    let mut per_variable: BTreeMap<String, usize> = BTreeMap::new();

    for entry in WalkDir::new(models_root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();

        if !entry.file_type().is_file()
            || path.extension().is_none_or(|ext| ext != "sql")
            || in_staging(models_root, path)
        {
            continue;
        }

        let original = fs::read_to_string(path)?;
        let mut content = original.clone();

        for (replacement, var) in replacements.iter().zip(map.variables()) {
            let count = replacement.regex.find_iter(&content).count();
            if count == 0 {
                continue;
            }
            *per_variable.entry(var.to_string()).or_default() += count;
            content = replacement
                .regex
                .replace_all(&content, regex::NoExpand(&replacement.expression))
                .into_owned();
        }
        content = strip_template_quotes(&content);

        if content != original {
            fs::write(path, &content)?;
            info!("updated: {}", path.display());
            changes.record(path);
        }
    }

    for (var, count) in per_variable.iter() {
        debug!("rewrote {count} reference(s) to var('{var}')");
    }
    changes.variables = per_variable.into_keys().collect();

    Ok(changes)
}
