//! Ordered, format-aware model of a `dbt_project.yml` document.
//!
//! Values loaded through `serde_yaml` are converted into [`ProjectValue`],
//! which tags Jinja template expressions and inline version lists
//! explicitly so [`emitter`] can write them back in the form dbt expects
//! without patching serializer output afterwards.
use log::*;
use regex::Regex;
use serde_yaml::Value;
use std::{fs, path::Path, sync::LazyLock};

use crate::error::{Result, UpdaterError};

pub mod emitter;

/// Name of the project file at the root of every dbt package.
pub const PROJECT_FILE: &str = "dbt_project.yml";

/// Keys whose sequences are written in flow style,
/// e.g. `require-dbt-version: [">=1.3.0", "<2.0.0"]`.
pub const FLOW_SEQUENCE_KEYS: &[&str] = &["require-dbt-version"];

static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{.*\}\}|\{%.*%\}").unwrap()
});

/// A single value inside a project document.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectValue {
    /// Plain YAML scalar: null, bool, number or ordinary string.
    Scalar(Value),
    /// Raw Jinja expression such as `{{ var('issues') }}`.
    Template(String),
    /// Block-style sequence.
    Sequence(Vec<ProjectValue>),
    /// Inline sequence of scalars.
    FlowSequence(Vec<ProjectValue>),
    Mapping(ProjectMapping),
}

impl ProjectValue {
    /// Builds a string value, tagging it as a template when it contains
    /// a Jinja expression.
    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        if is_template(&value) {
            ProjectValue::Template(value)
        } else {
            ProjectValue::Scalar(Value::String(value))
        }
    }

    pub fn as_mapping(&self) -> Option<&ProjectMapping> {
        match self {
            ProjectValue::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ProjectValue::Scalar(Value::String(s)) => Some(s),
            ProjectValue::Template(s) => Some(s),
            _ => None,
        }
    }

    fn from_yaml(value: Value, flow: bool) -> Self {
        match value {
            Value::String(s) => ProjectValue::string(s),
            Value::Sequence(items) => {
                let items: Vec<ProjectValue> = items
                    .into_iter()
                    .map(|v| ProjectValue::from_yaml(v, false))
                    .collect();
                let all_scalars = items.iter().all(|i| {
                    matches!(
                        i,
                        ProjectValue::Scalar(_) | ProjectValue::Template(_)
                    )
                });
                if flow && all_scalars {
                    ProjectValue::FlowSequence(items)
                } else {
                    ProjectValue::Sequence(items)
                }
            }
            Value::Mapping(mapping) => {
                ProjectValue::Mapping(ProjectMapping::from_yaml(mapping))
            }
            Value::Tagged(tagged) => {
                debug!("dropping yaml tag {} from project value", tagged.tag);
                ProjectValue::from_yaml(tagged.value, flow)
            }
            scalar => ProjectValue::Scalar(scalar),
        }
    }
}

impl From<ProjectMapping> for ProjectValue {
    fn from(mapping: ProjectMapping) -> Self {
        ProjectValue::Mapping(mapping)
    }
}

/// Insertion-ordered mapping with string keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectMapping {
    entries: Vec<(String, ProjectValue)>,
}

impl ProjectMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ProjectValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mapping(&self, key: &str) -> Option<&ProjectMapping> {
        self.get(key).and_then(ProjectValue::as_mapping)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets `key`, keeping its position when it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: ProjectValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ProjectValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Returns the mapping stored under `key`, replacing a missing or
    /// non-mapping value with an empty one.
    pub fn mapping_entry(&mut self, key: &str) -> &mut ProjectMapping {
        let idx = match self.entries.iter().position(|(k, _)| k == key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key.to_string(), ProjectMapping::new().into()));
                self.entries.len() - 1
            }
        };

        let slot = &mut self.entries[idx].1;
        if !matches!(slot, ProjectValue::Mapping(_)) {
            *slot = ProjectMapping::new().into();
        }

        match slot {
            ProjectValue::Mapping(mapping) => mapping,
            _ => unreachable!("slot was just replaced with a mapping"),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProjectValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn from_yaml(mapping: serde_yaml::Mapping) -> Self {
        let mut result = ProjectMapping::new();
        for (key, value) in mapping {
            let key = key_to_string(&key);
            let flow = FLOW_SEQUENCE_KEYS.contains(&key.as_str());
            result.insert(key, ProjectValue::from_yaml(value, flow));
        }
        result
    }
}

impl FromIterator<(String, ProjectValue)> for ProjectMapping {
    fn from_iter<T: IntoIterator<Item = (String, ProjectValue)>>(
        iter: T,
    ) -> Self {
        let mut mapping = ProjectMapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

/// A parsed `dbt_project.yml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectDocument {
    pub root: ProjectMapping,
}

impl ProjectDocument {
    /// Parses document content. An empty document yields an empty mapping.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        match value {
            Value::Null => Ok(Self::default()),
            Value::Mapping(mapping) => Ok(Self {
                root: ProjectMapping::from_yaml(mapping),
            }),
            _ => Err(UpdaterError::MalformedProject {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Loads the document at `path`, or `None` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(Self::parse(path, &content)?))
    }

    pub fn render(&self) -> Result<String> {
        emitter::render_document(&self.root)
    }
}

/// Whether a string holds a Jinja expression or statement.
pub fn is_template(value: &str) -> bool {
    TEMPLATE_REGEX.is_match(value)
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
