//! Name mappings between the XML/YAML vocabulary and the Gmail REST API
//!
//! Every table is a bijection; the tests at the bottom check both
//! directions so a new row cannot silently collide with an existing one.

/// Which action list of an API filter a label ID lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelDirection {
    Add,
    Remove,
}

impl LabelDirection {
    /// Field name in the API `action` object
    pub fn api_key(self) -> &'static str {
        match self {
            LabelDirection::Add => "addLabelIds",
            LabelDirection::Remove => "removeLabelIds",
        }
    }

    pub fn from_api_key(key: &str) -> Option<Self> {
        match key {
            "addLabelIds" => Some(LabelDirection::Add),
            "removeLabelIds" => Some(LabelDirection::Remove),
            _ => None,
        }
    }
}

/// Criteria keys as `(xml, api)`; keys not listed are spelled the same
pub const CRITERIA_KEYS: &[(&str, &str)] = &[
    ("hasTheWord", "query"),
    ("doesNotHaveTheWord", "negatedQuery"),
    ("sizeOperator", "sizeComparison"),
];

/// Size comparison values as `(xml, api)`
pub const SIZE_OPERATORS: &[(&str, &str)] = &[("s_sl", "larger"), ("s_ss", "smaller")];

/// Size units as `(xml, bytes per unit)`
pub const SIZE_UNITS: &[(&str, i64)] = &[("s_sb", 1), ("s_skb", 1024), ("s_smb", 1024 * 1024)];

/// Unit the API reports sizes in
pub const BYTES_UNIT: &str = "s_sb";

/// Action flags as `(xml flag, direction, api label id)`
///
/// `smartLabelToApply` carries a category rather than `"true"`; its label
/// ID here is the category prefix and the value goes through [`SMART_LABELS`].
pub const LABEL_FLAGS: &[(&str, LabelDirection, &str)] = &[
    ("shouldArchive", LabelDirection::Remove, "INBOX"),
    ("shouldMarkAsRead", LabelDirection::Remove, "UNREAD"),
    ("shouldStar", LabelDirection::Add, "STARRED"),
    ("shouldTrash", LabelDirection::Add, "TRASH"),
    ("shouldNeverSpam", LabelDirection::Remove, "SPAM"),
    ("shouldAlwaysMarkAsImportant", LabelDirection::Add, "IMPORTANT"),
    ("shouldNeverMarkAsImportant", LabelDirection::Remove, "IMPORTANT"),
    (SMART_LABEL_FLAG, LabelDirection::Add, CATEGORY_PREFIX),
];

pub const SMART_LABEL_FLAG: &str = "smartLabelToApply";
pub const CATEGORY_PREFIX: &str = "CATEGORY_";
const SMART_LABEL_PREFIX: &str = "^smartlabel_";

/// Inbox categories as `(xml smart label, api label id)`
pub const SMART_LABELS: &[(&str, &str)] = &[
    ("^smartlabel_personal", "CATEGORY_PERSONAL"),
    ("^smartlabel_social", "CATEGORY_SOCIAL"),
    ("^smartlabel_promo", "CATEGORY_PROMOTIONS"),
    ("^smartlabel_notification", "CATEGORY_UPDATES"),
    ("^smartlabel_group", "CATEGORY_FORUMS"),
];

/// Action keys that are not label lists, as `(xml, api)`
pub const ACTION_KEYS: &[(&str, &str)] = &[("forwardTo", "forward")];

fn forward<'a>(table: &[(&'a str, &'a str)], xml: &str) -> Option<&'a str> {
    table.iter().find(|(x, _)| *x == xml).map(|(_, a)| *a)
}

fn backward<'a>(table: &[(&'a str, &'a str)], api: &str) -> Option<&'a str> {
    table.iter().find(|(_, a)| *a == api).map(|(x, _)| *x)
}

/// API criteria key for an XML key, identity for unmapped keys
pub fn criteria_xml_to_api(key: &str) -> &str {
    forward(CRITERIA_KEYS, key).unwrap_or(key)
}

/// XML criteria key for an API key, identity for unmapped keys
pub fn criteria_api_to_xml(key: &str) -> &str {
    backward(CRITERIA_KEYS, key).unwrap_or(key)
}

pub fn size_operator_xml_to_api(value: &str) -> Option<&'static str> {
    forward(SIZE_OPERATORS, value)
}

pub fn size_operator_api_to_xml(value: &str) -> Option<&'static str> {
    backward(SIZE_OPERATORS, value)
}

/// Multiplier turning a size in `unit` into bytes
pub fn size_unit_bytes(unit: &str) -> Option<i64> {
    SIZE_UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, bytes)| *bytes)
}

/// Flag property set by a label ID, excluding the smart-label category row
pub fn flag_for_label(direction: LabelDirection, label_id: &str) -> Option<&'static str> {
    LABEL_FLAGS
        .iter()
        .filter(|(flag, _, _)| *flag != SMART_LABEL_FLAG)
        .find(|(_, dir, id)| *dir == direction && *id == label_id)
        .map(|(flag, _, _)| *flag)
}

/// Label ID and direction a boolean flag stands for
pub fn label_for_flag(flag: &str) -> Option<(LabelDirection, &'static str)> {
    LABEL_FLAGS
        .iter()
        .filter(|(name, _, _)| *name != SMART_LABEL_FLAG)
        .find(|(name, _, _)| *name == flag)
        .map(|(_, dir, id)| (*dir, *id))
}

pub fn is_category(label_id: &str) -> bool {
    label_id.starts_with(CATEGORY_PREFIX)
}

/// `^smartlabel_*` value for a `CATEGORY_*` label ID
pub fn smart_label_for_category(label_id: &str) -> String {
    match backward(SMART_LABELS, label_id) {
        Some(smart) => smart.to_string(),
        None => format!(
            "{}{}",
            SMART_LABEL_PREFIX,
            label_id.trim_start_matches(CATEGORY_PREFIX).to_lowercase()
        ),
    }
}

/// `CATEGORY_*` label ID for a `^smartlabel_*` value
pub fn category_for_smart_label(value: &str) -> Option<String> {
    if let Some(id) = forward(SMART_LABELS, value) {
        return Some(id.to_string());
    }
    value
        .strip_prefix(SMART_LABEL_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(|rest| format!("{}{}", CATEGORY_PREFIX, rest.to_uppercase()))
}

pub fn action_xml_to_api(key: &str) -> &str {
    forward(ACTION_KEYS, key).unwrap_or(key)
}
