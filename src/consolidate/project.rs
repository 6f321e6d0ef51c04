//! Merges the source package's `dbt_project.yml` into the transform package.
use log::*;
use serde_yaml::Value;
use std::{fs, path::Path};

use crate::{
    changes::ChangeSet,
    consolidate::PackagePair,
    error::{Result, UpdaterError},
    project::{PROJECT_FILE, ProjectDocument, ProjectMapping, ProjectValue},
};

/// Name of the dependency file copied over from the source package.
pub const PACKAGES_FILE: &str = "packages.yml";

/// Materialization key written for models relocated under `staging`.
pub const MATERIALIZED_KEY: &str = "+materialized";

/// Rewrites the transform package's project file so the source package's
/// settings become the baseline, while keeping the transform's own model
/// and variable configuration.
///
/// The returned change set lists the project file only when its content
/// actually differs, and always carries the transform package's variable
/// names for reference rewriting.
pub fn consolidate_project(pair: &PackagePair) -> Result<ChangeSet> {
    let transform_file = pair.transform_path().join(PROJECT_FILE);
    let source_file = pair.source_path().join(PROJECT_FILE);

    let previous_content = read_optional(&transform_file)?;

    let transform_original = match &previous_content {
        Some(content) => ProjectDocument::parse(&transform_file, content)?,
        None => {
            info!(
                "{} has no {PROJECT_FILE}, treating as first consolidation",
                pair.transform_name
            );
            ProjectDocument::default()
        }
    };

    let source = ProjectDocument::load(&source_file)?
        .ok_or_else(|| UpdaterError::MissingSourceProject(source_file.clone()))?;

    let (merged, variables) = merge_documents(
        &transform_original,
        source,
        &pair.transform_base(),
        &pair.source_base(),
    );

    let rendered = merged.render()?;

    let mut changes = ChangeSet::new();
    changes.variables = variables;

    if previous_content.as_deref() == Some(rendered.as_str()) {
        debug!("{} unchanged", transform_file.display());
        return Ok(changes);
    }

    fs::write(&transform_file, rendered)?;
    info!("rewrote {}", transform_file.display());
    changes.record(&transform_file);

    Ok(changes)
}

/// Computes the merged project: `source` is the baseline, the transform's
/// unrelated model blocks are restored, its own model block gains a
/// `staging` view materialization and its vars are carried forward.
///
/// Returns the merged document and the transform variable names in order.
pub fn merge_documents(
    transform_original: &ProjectDocument,
    source: ProjectDocument,
    transform_package: &str,
    source_package: &str,
) -> (ProjectDocument, Vec<String>) {
    let mut merged = source;

    let original_models = transform_original
        .root
        .get_mapping("models")
        .cloned()
        .unwrap_or_default();

    let original_vars = transform_original
        .root
        .get_mapping("vars")
        .cloned()
        .unwrap_or_default();

    {
        let models = merged.root.mapping_entry("models");
        models.remove(source_package);
        models.remove(transform_package);

        for (key, value) in original_models.iter() {
            if key != source_package && key != transform_package {
                models.insert(key, value.clone());
            }
        }

        let mut transform_block = original_models
            .get_mapping(transform_package)
            .cloned()
            .unwrap_or_default();

        let staging: ProjectMapping = [(
            MATERIALIZED_KEY.to_string(),
            ProjectValue::Scalar(Value::String("view".into())),
        )]
        .into_iter()
        .collect();

        transform_block.insert("staging", staging.into());
        models.insert(transform_package, transform_block.into());
    }

    let transform_vars = original_vars
        .get_mapping(transform_package)
        .cloned()
        .unwrap_or_default();

    let variables: Vec<String> =
        transform_vars.keys().map(str::to_string).collect();

    merged
        .root
        .mapping_entry("vars")
        .insert(transform_package, transform_vars.into());

    debug!("carrying forward {transform_package} vars: {variables:?}");

    (merged, variables)
}

/// Copies the source package's `packages.yml` over the transform's.
///
/// Nothing happens when the source has no such file; the change set is
/// empty when the contents are already identical.
pub fn copy_packages_file(pair: &PackagePair) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();
    let source_file = pair.source_path().join(PACKAGES_FILE);
    let transform_file = pair.transform_path().join(PACKAGES_FILE);

    let Some(content) = read_optional(&source_file)? else {
        debug!("{} has no {PACKAGES_FILE}", pair.source_name);
        return Ok(changes);
    };

    if read_optional(&transform_file)?.as_deref() == Some(content.as_str()) {
        return Ok(changes);
    }

    fs::write(&transform_file, content)?;
    info!("copied {PACKAGES_FILE} from {}", pair.source_name);
    changes.record(&transform_file);

    Ok(changes)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(path)?))
}
