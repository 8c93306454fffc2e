//! Gmail XML export codec
//!
//! Reads and writes the Atom feed Gmail produces under
//! Settings > Filters > Export. Only the filter-entry schema is handled:
//! `apps:property` children of `entry` elements become entry properties,
//! everything else inside an entry is skipped.

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, info};

use crate::error::{GfmError, Result};
use crate::models::{
    Filter, FilterEntry, Namespaces, PropertyValue, APPS_NS, APPS_PREFIX, ATOM_NS, ATOM_PREFIX,
    LABEL_PROPERTY,
};

const FEED_TITLE: &str = "Mail Filters";
const ENTRY_TITLE: &str = "Mail Filter";

/// Reads an XML filter export from `path`
pub async fn read(path: impl AsRef<Path>) -> Result<Filter> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GfmError::io_at(path, e))?;
    let filter = from_str(&text)?;
    info!("Read {} filter entries from {}", filter.len(), path.display());
    Ok(filter)
}

/// Writes `filter` as an XML filter export to `path`
///
/// The document is rendered completely before the file is touched.
pub async fn write(path: impl AsRef<Path>, filter: &Filter) -> Result<()> {
    let path = path.as_ref();
    let xml = to_string(filter)?;
    tokio::fs::write(path, xml)
        .await
        .map_err(|e| GfmError::io_at(path, e))?;
    info!("Wrote {} filter entries to {}", filter.len(), path.display());
    Ok(())
}

/// Parses an XML filter export
pub fn from_str(input: &str) -> Result<Filter> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut namespaces: Option<Namespaces> = None;
    let mut entries = Vec::new();
    let mut current: Option<FilterEntry> = None;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            GfmError::ParseError(format!("{} (at byte {})", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(element) => {
                open_element(&element, depth, &mut namespaces, &mut current)?;
                depth += 1;
            }
            Event::Empty(element) => {
                open_element(&element, depth, &mut namespaces, &mut current)?;
                if depth == 1 {
                    close_entry(&mut current, &mut entries);
                }
            }
            Event::End(element) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| GfmError::ParseError("unexpected closing tag".to_string()))?;
                if depth == 1 && local_name(&qualified_name(element.name().as_ref())) == "entry" {
                    close_entry(&mut current, &mut entries);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(GfmError::ParseError(
            "document ended inside an open element".to_string(),
        ));
    }

    let namespaces =
        namespaces.ok_or_else(|| GfmError::SchemaError("no feed element found".to_string()))?;
    debug!("Parsed {} entries with namespaces {:?}", entries.len(), namespaces);

    Ok(Filter {
        namespaces,
        entries,
    })
}

fn open_element(
    element: &BytesStart<'_>,
    depth: usize,
    namespaces: &mut Option<Namespaces>,
    current: &mut Option<FilterEntry>,
) -> Result<()> {
    let name = qualified_name(element.name().as_ref());

    if depth == 0 {
        if namespaces.is_some() {
            return Err(GfmError::ParseError(
                "document has more than one root element".to_string(),
            ));
        }
        if local_name(&name) != "feed" {
            return Err(GfmError::SchemaError(format!(
                "root element must be feed, found {}",
                name
            )));
        }
        *namespaces = Some(feed_namespaces(element)?);
        return Ok(());
    }

    if depth == 1 && local_name(&name) == "entry" {
        *current = Some(FilterEntry::new());
        return Ok(());
    }

    if depth == 2 && local_name(&name) == "property" {
        let (Some(entry), Some(namespaces)) = (current.as_mut(), namespaces.as_ref()) else {
            return Ok(());
        };
        let in_apps = prefix(&name)
            .and_then(|p| namespaces.get(p))
            .is_some_and(|uri| uri == APPS_NS);
        if in_apps {
            add_property(entry, element)?;
        }
    }

    Ok(())
}

fn close_entry(current: &mut Option<FilterEntry>, entries: &mut Vec<FilterEntry>) {
    if let Some(mut entry) = current.take() {
        if entry.repair_size() {
            debug!("Dropped size operator/unit from entry without size");
        }
        entries.push(entry);
    }
}

/// Namespace declarations of the root element
fn feed_namespaces(element: &BytesStart<'_>) -> Result<Namespaces> {
    let mut namespaces = Namespaces::empty();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| GfmError::ParseError(e.to_string()))?;
        let key = qualified_name(attribute.key.as_ref());
        let declared = if key == "xmlns" {
            Some("")
        } else {
            key.strip_prefix("xmlns:")
        };
        if let Some(declared) = declared {
            let uri = attribute
                .unescape_value()
                .map_err(|e| GfmError::ParseError(e.to_string()))?;
            namespaces.insert(declared, uri.into_owned());
        }
    }

    if namespaces.get(ATOM_PREFIX).is_none() {
        return Err(GfmError::SchemaError(
            "feed does not declare the default (atom) namespace".to_string(),
        ));
    }
    if namespaces.prefix_for(APPS_NS).is_none() {
        return Err(GfmError::SchemaError(format!(
            "feed does not declare the apps namespace {}",
            APPS_NS
        )));
    }
    Ok(namespaces)
}

fn add_property(entry: &mut FilterEntry, element: &BytesStart<'_>) -> Result<()> {
    let mut name = None;
    let mut value = None;
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| GfmError::ParseError(e.to_string()))?;
        let key = qualified_name(attribute.key.as_ref());
        let text = attribute
            .unescape_value()
            .map_err(|e| GfmError::ParseError(e.to_string()))?
            .into_owned();
        match key.as_str() {
            "name" => name = Some(text),
            "value" => value = Some(text),
            _ => {}
        }
    }

    let (Some(name), Some(value)) = (name, value) else {
        return Err(GfmError::SchemaError(
            "apps:property needs both name and value attributes".to_string(),
        ));
    };

    if name == LABEL_PROPERTY && entry.contains(LABEL_PROPERTY) {
        entry.push_label(value);
    } else {
        entry.set(name, value);
    }
    Ok(())
}

fn qualified_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn prefix(name: &str) -> Option<&str> {
    name.split_once(':').map(|(prefix, _)| prefix)
}

fn write_error(error: impl std::fmt::Display) -> GfmError {
    GfmError::ParseError(format!("failed to render XML: {}", error))
}

/// Renders `filter` as a Gmail XML export
///
/// An entry whose `label` is a list is written once per label.
pub fn to_string(filter: &Filter) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;

    let apps_prefix = filter
        .namespaces
        .prefix_for(APPS_NS)
        .unwrap_or(APPS_PREFIX)
        .to_string();

    let mut feed = BytesStart::new("feed");
    feed.push_attribute((
        "xmlns",
        filter.namespaces.get(ATOM_PREFIX).unwrap_or(ATOM_NS),
    ));
    for (prefix, uri) in filter.namespaces.iter() {
        if prefix != ATOM_PREFIX {
            let key = format!("xmlns:{}", prefix);
            feed.push_attribute((key.as_str(), uri));
        }
    }
    if filter.namespaces.prefix_for(APPS_NS).is_none() {
        let key = format!("xmlns:{}", APPS_PREFIX);
        feed.push_attribute((key.as_str(), APPS_NS));
    }
    writer.write_event(Event::Start(feed)).map_err(write_error)?;
    write_title(&mut writer, FEED_TITLE)?;

    let property_tag = format!("{}:property", apps_prefix);
    for entry in &filter.entries {
        for properties in fan_out(entry) {
            writer
                .write_event(Event::Start(BytesStart::new("entry")))
                .map_err(write_error)?;
            writer
                .write_event(Event::Empty(
                    BytesStart::new("category").with_attributes([("term", "filter")]),
                ))
                .map_err(write_error)?;
            write_title(&mut writer, ENTRY_TITLE)?;

            for (name, value) in properties {
                let name = escape_attribute(name);
                let value = escape_attribute(&value);
                let mut property = BytesStart::new(property_tag.as_str());
                property.push_attribute((b"name".as_slice(), name.as_bytes()));
                property.push_attribute((b"value".as_slice(), value.as_bytes()));
                writer
                    .write_event(Event::Empty(property))
                    .map_err(write_error)?;
            }

            writer
                .write_event(Event::End(BytesEnd::new("entry")))
                .map_err(write_error)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("feed")))
        .map_err(write_error)?;

    let mut xml = String::from_utf8(writer.into_inner()).map_err(write_error)?;
    xml.push('\n');
    Ok(xml)
}

/// Attribute text with markup escaped; tab, CR and LF become character
/// references so attribute-value normalization keeps them
fn escape_attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn write_title(writer: &mut Writer<Vec<u8>>, title: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("title")))
        .map_err(write_error)?;
    writer
        .write_event(Event::Text(BytesText::new(title)))
        .map_err(write_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("title")))
        .map_err(write_error)?;
    Ok(())
}

/// Property lists of the XML entries an entry expands to
///
/// Each list keeps the entry's property order; a list-valued `label` is
/// replaced by one of its names. Any other list value is written joined.
fn fan_out(entry: &FilterEntry) -> Vec<Vec<(&str, String)>> {
    let labels: Option<Vec<&str>> = match entry.get(LABEL_PROPERTY) {
        Some(PropertyValue::List(values)) => Some(values.iter().map(String::as_str).collect()),
        _ => None,
    };

    let render = |label: Option<&str>| {
        entry
            .iter()
            .filter_map(|(name, value)| match (name, label) {
                (LABEL_PROPERTY, Some(label)) => Some((name, label.to_string())),
                (LABEL_PROPERTY, None) if matches!(value, PropertyValue::List(_)) => None,
                _ => Some((name, value.values().join(","))),
            })
            .collect::<Vec<_>>()
    };

    match labels {
        Some(labels) if !labels.is_empty() => labels.into_iter().map(|l| render(Some(l))).collect(),
        _ => vec![render(None)],
    }
}
