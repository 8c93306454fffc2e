//! YAML filter codec
//!
//! Documents have two top-level keys, `namespaces` and `filter`:
//!
//! ```yaml
//! namespaces:
//!   apps: "http://schemas.google.com/apps/2006"
//!   atom: "http://www.w3.org/2005/Atom"
//! filter:
//!   - from: "boss@co"
//!     shouldStar: "true"
//! ```
//!
//! Parsing goes through `serde_yaml`. Output is written by a small emitter
//! for this fixed shape so that every value comes out double-quoted and
//! `"123"` or `"true"` read back as strings.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{GfmError, Result};
use crate::models::{Filter, FilterEntry, Namespaces, PropertyValue};

#[derive(Debug, Deserialize)]
struct Document {
    namespaces: Option<BTreeMap<String, String>>,
    #[serde(alias = "filters")]
    filter: Option<Vec<FilterEntry>>,
}

/// Reads a YAML filter document from `path`
pub async fn read(path: impl AsRef<Path>) -> Result<Filter> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GfmError::io_at(path, e))?;
    let filter = from_str(&text)?;
    info!("Read {} filter entries from {}", filter.len(), path.display());
    Ok(filter)
}

/// Writes `filter` as a YAML document to `path`
pub async fn write(path: impl AsRef<Path>, filter: &Filter) -> Result<()> {
    let path = path.as_ref();
    let yaml = to_string(filter)?;
    tokio::fs::write(path, yaml)
        .await
        .map_err(|e| GfmError::io_at(path, e))?;
    info!("Wrote {} filter entries to {}", filter.len(), path.display());
    Ok(())
}

/// Parses a YAML filter document
pub fn from_str(input: &str) -> Result<Filter> {
    let document: Document =
        serde_yaml::from_str(input).map_err(|e| GfmError::ParseError(e.to_string()))?;

    let namespaces = match document.namespaces {
        Some(declared) => Namespaces::from_declarations(declared),
        None => {
            debug!("No namespaces in document, using the Gmail defaults");
            Namespaces::default()
        }
    };

    let mut entries = document.filter.ok_or_else(|| {
        GfmError::SchemaError("document has no `filter` list".to_string())
    })?;
    for entry in &mut entries {
        entry.repair_size();
    }

    Ok(Filter {
        namespaces,
        entries,
    })
}

/// Renders `filter` as a YAML document
pub fn to_string(filter: &Filter) -> Result<String> {
    let mut out = String::new();

    if filter.namespaces.is_empty() {
        out.push_str("namespaces: {}\n");
    } else {
        out.push_str("namespaces:\n");
        for (prefix, uri) in filter.namespaces.iter() {
            writeln!(out, "  {}: {}", key(prefix)?, quoted(uri)?).map_err(render_error)?;
        }
    }

    if filter.entries.is_empty() {
        out.push_str("filter: []\n");
        return Ok(out);
    }

    out.push_str("filter:\n");
    for entry in &filter.entries {
        write_entry(&mut out, entry)?;
    }
    Ok(out)
}

fn write_entry(out: &mut String, entry: &FilterEntry) -> Result<()> {
    if entry.is_empty() {
        out.push_str("  - {}\n");
        return Ok(());
    }

    for (index, (name, value)) in entry.iter().enumerate() {
        let lead = if index == 0 { "  - " } else { "    " };
        match value {
            PropertyValue::Single(text) => {
                writeln!(out, "{}{}: {}", lead, key(name)?, quoted(text)?)
                    .map_err(render_error)?;
            }
            PropertyValue::List(values) if values.is_empty() => {
                writeln!(out, "{}{}: []", lead, key(name)?).map_err(render_error)?;
            }
            PropertyValue::List(values) => {
                writeln!(out, "{}{}:", lead, key(name)?).map_err(render_error)?;
                for text in values {
                    writeln!(out, "      - {}", quoted(text)?).map_err(render_error)?;
                }
            }
        }
    }
    Ok(())
}

fn render_error(error: std::fmt::Error) -> GfmError {
    GfmError::ParseError(format!("failed to render YAML: {}", error))
}

/// Double-quoted scalar; JSON string syntax is valid YAML here
///
/// JSON leaves DEL, the C1 range and a few other characters unescaped,
/// which YAML either rejects or folds, so those are written as `\uXXXX`.
fn quoted(text: &str) -> Result<String> {
    let json = serde_json::to_string(text)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if is_yaml_printable(c) {
            out.push(c);
        } else {
            write!(out, "\\u{:04X}", c as u32).map_err(render_error)?;
        }
    }
    Ok(out)
}

fn is_yaml_printable(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{2027}' | '\u{202A}'..='\u{D7FF}'
    ) || (('\u{E000}'..='\u{FFFD}').contains(&c) && c != '\u{FEFF}')
        || c >= '\u{10000}'
}

/// Mapping key, plain when YAML reads it back as the same string
fn key(name: &str) -> Result<String> {
    if is_plain_key(name) {
        Ok(name.to_string())
    } else {
        quoted(name)
    }
}

fn is_plain_key(name: &str) -> bool {
    const RESERVED: &[&str] = &["true", "false", "null", "yes", "no", "on", "off", "y", "n"];

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !RESERVED.iter().any(|word| word.eq_ignore_ascii_case(name))
}
