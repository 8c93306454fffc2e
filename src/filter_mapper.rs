//! Translation between Gmail API filters and filter entries
//!
//! The API side is typed (`FilterCriteria`, `FilterAction` with label-ID
//! lists); the entry side is the flat XML property vocabulary. Label IDs
//! that are not action flags are user labels and go through the
//! [`LabelResolver`].

use google_gmail1::api::{Filter as ApiFilter, FilterAction, FilterCriteria};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{GfmError, Result};
use crate::label_resolver::LabelResolver;
use crate::mapping::{self, LabelDirection, BYTES_UNIT, SMART_LABEL_FLAG};
use crate::models::{Filter, FilterEntry, PropertyValue, LABEL_PROPERTY};

/// Converts every API filter into an entry, keeping API order
pub fn api_to_filter(filters: &[ApiFilter], labels: &LabelResolver) -> Result<Filter> {
    let entries = filters
        .iter()
        .map(|filter| api_to_entry(filter, labels))
        .collect::<Result<Vec<_>>>()?;
    Ok(Filter::new(entries))
}

/// Converts one API filter into a filter entry
///
/// Criteria keys go through the criteria table (unknown keys are kept as
/// they are), a `size` criterion gets `sizeUnit = s_sb`, label IDs become
/// flags, smart labels or user label names.
pub fn api_to_entry(filter: &ApiFilter, labels: &LabelResolver) -> Result<FilterEntry> {
    let mut entry = FilterEntry::new();

    if let Some(criteria) = &filter.criteria {
        for (key, value) in object_fields(criteria)? {
            let xml_key = mapping::criteria_api_to_xml(&key);
            let mut xml_value = scalar_to_string(&key, &value)?;
            if key == "sizeComparison" {
                xml_value = mapping::size_operator_api_to_xml(&xml_value)
                    .ok_or_else(|| {
                        GfmError::SchemaError(format!("Unknown size comparison '{}'", xml_value))
                    })?
                    .to_string();
            }
            entry.set(xml_key, xml_value);
            if xml_key == "size" {
                entry.set("sizeUnit", BYTES_UNIT);
            }
        }
    }

    if let Some(action) = &filter.action {
        for (key, value) in object_fields(action)? {
            match LabelDirection::from_api_key(&key) {
                Some(direction) => {
                    for label_id in string_list(&key, &value)? {
                        apply_label_id(&mut entry, direction, &label_id, labels)?;
                    }
                }
                None => entry.set(key.clone(), scalar_to_string(&key, &value)?),
            }
        }
    }

    if entry.repair_size() {
        debug!("Dropped size comparison without size");
    }

    debug!(
        "Mapped API filter {} to {} properties",
        filter.id.as_deref().unwrap_or("<new>"),
        entry.len()
    );
    Ok(entry)
}

fn apply_label_id(
    entry: &mut FilterEntry,
    direction: LabelDirection,
    label_id: &str,
    labels: &LabelResolver,
) -> Result<()> {
    if let Some(flag) = mapping::flag_for_label(direction, label_id) {
        entry.set(flag, "true");
        return Ok(());
    }

    match direction {
        LabelDirection::Add if mapping::is_category(label_id) => {
            entry.set(SMART_LABEL_FLAG, mapping::smart_label_for_category(label_id));
        }
        LabelDirection::Add => {
            let name = labels.resolve_id(label_id)?;
            entry.push_label(name);
        }
        LabelDirection::Remove => {
            warn!(
                "Filter removes label '{}', which has no filter property; skipping",
                label_id
            );
        }
    }
    Ok(())
}

/// Converts an entry into the API filters it stands for
///
/// An entry with N user labels becomes N filters sharing criteria and
/// flags, one label each; an entry without labels becomes one filter.
pub fn entry_to_api(entry: &FilterEntry, labels: &LabelResolver) -> Result<Vec<ApiFilter>> {
    let mut criteria = FilterCriteria::default();
    let mut add_label_ids: Vec<String> = Vec::new();
    let mut remove_label_ids: Vec<String> = Vec::new();
    let mut forward: Option<String> = None;

    let size_unit = entry.get_str("sizeUnit").unwrap_or(BYTES_UNIT);

    for (name, value) in entry.iter() {
        match name {
            LABEL_PROPERTY | "sizeUnit" => {}
            "size" => {
                criteria.size = Some(size_in_bytes(single(name, value)?, size_unit)?);
            }
            "sizeOperator" => {
                let operator = single(name, value)?;
                let comparison = mapping::size_operator_xml_to_api(operator).ok_or_else(|| {
                    GfmError::SchemaError(format!("Unknown size operator '{}'", operator))
                })?;
                criteria.size_comparison = Some(comparison.to_string());
            }
            "hasAttachment" => criteria.has_attachment = Some(value.is_true()),
            "excludeChats" => criteria.exclude_chats = Some(value.is_true()),
            SMART_LABEL_FLAG => {
                let smart_label = single(name, value)?;
                match mapping::category_for_smart_label(smart_label) {
                    Some(id) => push_unique(&mut add_label_ids, id),
                    None => warn!("Unrecognized smart label '{}'; skipping", smart_label),
                }
            }
            _ => {
                if let Some((direction, label_id)) = mapping::label_for_flag(name) {
                    if !value.is_true() {
                        debug!("Flag {} is '{}', not applied", name, value);
                        continue;
                    }
                    match direction {
                        LabelDirection::Add => push_unique(&mut add_label_ids, label_id.to_string()),
                        LabelDirection::Remove => {
                            push_unique(&mut remove_label_ids, label_id.to_string())
                        }
                    }
                    continue;
                }

                let text = single(name, value)?.to_string();
                match mapping::criteria_xml_to_api(name) {
                    "from" => criteria.from = Some(text),
                    "to" => criteria.to = Some(text),
                    "subject" => criteria.subject = Some(text),
                    "query" => criteria.query = Some(text),
                    "negatedQuery" => criteria.negated_query = Some(text),
                    _ if mapping::action_xml_to_api(name) == "forward" => forward = Some(text),
                    _ => warn!("Property '{}' has no API equivalent; skipping", name),
                }
            }
        }
    }

    if !has_criteria(&criteria) {
        return Err(GfmError::SchemaError(format!(
            "Filter entry has no criteria: {}",
            serde_json::to_string(entry)?
        )));
    }

    let label_names = entry.labels();
    let label_ids = label_names
        .iter()
        .map(|name| labels.resolve_name(name).map(str::to_string))
        .collect::<Result<Vec<_>>>()?;

    let build = |extra_label: Option<&String>| {
        let mut add = add_label_ids.clone();
        if let Some(id) = extra_label {
            push_unique(&mut add, id.clone());
        }
        ApiFilter {
            id: None,
            criteria: Some(criteria.clone()),
            action: Some(FilterAction {
                add_label_ids: non_empty(add),
                remove_label_ids: non_empty(remove_label_ids.clone()),
                forward: forward.clone(),
            }),
        }
    };

    if label_ids.is_empty() {
        Ok(vec![build(None)])
    } else {
        Ok(label_ids.iter().map(|id| build(Some(id))).collect())
    }
}

/// True when two API filters express the same rule, ignoring IDs and
/// label-ID order
pub fn same_rule(a: &ApiFilter, b: &ApiFilter) -> bool {
    let criteria = |f: &ApiFilter| serde_json::to_value(f.criteria.clone().unwrap_or_default()).ok();
    if criteria(a) != criteria(b) {
        return false;
    }

    let action = |f: &ApiFilter| {
        let action = f.action.clone().unwrap_or_default();
        let mut add = action.add_label_ids.unwrap_or_default();
        let mut remove = action.remove_label_ids.unwrap_or_default();
        add.sort();
        remove.sort();
        (add, remove, action.forward)
    };
    action(a) == action(b)
}

fn has_criteria(criteria: &FilterCriteria) -> bool {
    criteria.from.is_some()
        || criteria.to.is_some()
        || criteria.subject.is_some()
        || criteria.query.is_some()
        || criteria.negated_query.is_some()
        || criteria.size.is_some()
        || criteria.has_attachment == Some(true)
}

fn size_in_bytes(size: &str, unit: &str) -> Result<i32> {
    let amount: i64 = size
        .trim()
        .parse()
        .map_err(|e| GfmError::SchemaError(format!("Invalid size '{}': {}", size, e)))?;
    let multiplier = mapping::size_unit_bytes(unit)
        .ok_or_else(|| GfmError::SchemaError(format!("Unknown size unit '{}'", unit)))?;
    amount
        .checked_mul(multiplier)
        .and_then(|bytes| i32::try_from(bytes).ok())
        .ok_or_else(|| GfmError::SchemaError(format!("Size {} {} is out of range", size, unit)))
}

fn single<'a>(name: &str, value: &'a PropertyValue) -> Result<&'a str> {
    value.as_single().ok_or_else(|| {
        GfmError::SchemaError(format!("Property '{}' must be a single value", name))
    })
}

fn push_unique(ids: &mut Vec<String>, id: String) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn non_empty(ids: Vec<String>) -> Option<Vec<String>> {
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

/// Non-null fields of a serializable API object, keyed by their JSON names
pub(crate) fn object_fields<T: serde::Serialize>(object: &T) -> Result<Vec<(String, Value)>> {
    match serde_json::to_value(object)? {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => Err(GfmError::SchemaError(format!(
            "Expected an object, got {}",
            other
        ))),
    }
}

fn scalar_to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(GfmError::SchemaError(format!(
            "Unsupported value for '{}': {}",
            key, other
        ))),
    }
}

fn string_list(key: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => items.iter().map(|item| scalar_to_string(key, item)).collect(),
        other => Err(GfmError::SchemaError(format!(
            "Expected a list for '{}', got {}",
            key, other
        ))),
    }
}
