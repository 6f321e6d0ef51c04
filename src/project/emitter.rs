//! Block-style YAML writer for [`ProjectMapping`] documents.
//!
//! Plain scalars are rendered by `serde_yaml` so quoting stays correct.
//! Template expressions are always written double-quoted and verbatim,
//! and flow sequences are written inline with double-quoted strings.
use serde_yaml::Value;

use crate::{
    error::Result,
    project::{ProjectMapping, ProjectValue},
};

const INDENT: usize = 2;

pub fn render_document(root: &ProjectMapping) -> Result<String> {
    let mut out = String::new();
    write_mapping(&mut out, root, 0)?;
    Ok(out)
}

fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

fn write_mapping(
    out: &mut String,
    mapping: &ProjectMapping,
    indent: usize,
) -> Result<()> {
    for (key, value) in mapping.iter() {
        out.push_str(&pad(indent));
        out.push_str(&render_scalar(&Value::String(key.to_string()))?);
        out.push(':');

        match value {
            ProjectValue::Mapping(m) if m.is_empty() => out.push_str(" {}\n"),
            ProjectValue::Mapping(m) => {
                out.push('\n');
                write_mapping(out, m, indent + INDENT)?;
            }
            // sequences sit at the same indentation as their key
            ProjectValue::Sequence(items) if items.is_empty() => {
                out.push_str(" []\n")
            }
            ProjectValue::Sequence(items) => {
                out.push('\n');
                write_sequence(out, items, indent)?;
            }
            other => {
                out.push(' ');
                out.push_str(&render_inline(other)?);
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn write_sequence(
    out: &mut String,
    items: &[ProjectValue],
    indent: usize,
) -> Result<()> {
    for item in items {
        match item {
            ProjectValue::Mapping(m) if !m.is_empty() => {
                let mut nested = String::new();
                write_mapping(&mut nested, m, indent + INDENT)?;
                push_dashed(out, &nested, indent);
            }
            ProjectValue::Sequence(s) if !s.is_empty() => {
                let mut nested = String::new();
                write_sequence(&mut nested, s, indent + INDENT)?;
                push_dashed(out, &nested, indent);
            }
            ProjectValue::Mapping(_) => {
                out.push_str(&format!("{}- {{}}\n", pad(indent)))
            }
            ProjectValue::Sequence(_) => {
                out.push_str(&format!("{}- []\n", pad(indent)))
            }
            other => {
                out.push_str(&format!(
                    "{}- {}\n",
                    pad(indent),
                    render_inline(other)?
                ));
            }
        }
    }
    Ok(())
}

/// Replaces the leading indentation of an already rendered nested block
/// with a sequence dash so its first entry shares the dash line.
fn push_dashed(out: &mut String, nested: &str, indent: usize) {
    let first_line_start = pad(indent + INDENT);
    let rest = nested.strip_prefix(&first_line_start).unwrap_or(nested);
    out.push_str(&pad(indent));
    out.push_str("- ");
    out.push_str(rest);
}

fn render_inline(value: &ProjectValue) -> Result<String> {
    match value {
        ProjectValue::Scalar(v) => render_scalar(v),
        ProjectValue::Template(t) => Ok(double_quoted(t)),
        ProjectValue::FlowSequence(items) => {
            let rendered = items
                .iter()
                .map(render_flow_item)
                .collect::<Result<Vec<String>>>()?;
            Ok(format!("[{}]", rendered.join(", ")))
        }
        ProjectValue::Mapping(m) if m.is_empty() => Ok("{}".into()),
        ProjectValue::Sequence(s) if s.is_empty() => Ok("[]".into()),
        // nested collections are handled by the block writers
        ProjectValue::Mapping(_) | ProjectValue::Sequence(_) => {
            Ok(String::new())
        }
    }
}

fn render_flow_item(value: &ProjectValue) -> Result<String> {
    match value {
        ProjectValue::Scalar(Value::String(s)) => Ok(double_quoted(s)),
        other => render_inline(other),
    }
}

/// Renders a single scalar through `serde_yaml`, which decides whether the
/// value needs quoting.
fn render_scalar(value: &Value) -> Result<String> {
    if let Value::String(s) = value
        && s.contains('\n')
    {
        return Ok(double_quoted(s));
    }

    let rendered = serde_yaml::to_string(value)?;
    let rendered = rendered
        .strip_prefix("---\n")
        .or_else(|| rendered.strip_prefix("--- "))
        .unwrap_or(&rendered);
    Ok(rendered.trim_end_matches('\n').to_string())
}

fn double_quoted(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t");
    format!("\"{escaped}\"")
}
