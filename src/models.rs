//! Internal canonical form of a filter set
//!
//! Both codecs and the API mapper read and write these types. An entry is a
//! flat, ordered property list mirroring the `apps:property` elements of the
//! Gmail XML export.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Atom namespace, the default namespace of the XML export
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Google Apps namespace used by `apps:property`
pub const APPS_NS: &str = "http://schemas.google.com/apps/2006";

pub const ATOM_PREFIX: &str = "atom";
pub const APPS_PREFIX: &str = "apps";

/// Property holding user label names
pub const LABEL_PROPERTY: &str = "label";

/// A set of filter entries together with the XML namespaces they came with
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    pub namespaces: Namespaces,
    pub entries: Vec<FilterEntry>,
}

impl Filter {
    pub fn new(entries: Vec<FilterEntry>) -> Self {
        Self {
            namespaces: Namespaces::default(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Namespace prefix to URI mapping
///
/// The default (unprefixed) namespace is always stored under `atom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces(BTreeMap<String, String>);

impl Default for Namespaces {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert(APPS_PREFIX.to_string(), APPS_NS.to_string());
        map.insert(ATOM_PREFIX.to_string(), ATOM_NS.to_string());
        Self(map)
    }
}

impl Namespaces {
    /// Empty mapping, for building up from parsed declarations
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Builds a mapping from declarations, renaming the empty prefix to `atom`
    pub fn from_declarations<I, K, V>(declarations: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut namespaces = Self::empty();
        for (prefix, uri) in declarations {
            namespaces.insert(prefix, uri);
        }
        namespaces
    }

    /// Inserts a declaration; the empty prefix is stored as `atom`
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let prefix = prefix.into();
        let prefix = if prefix.is_empty() {
            ATOM_PREFIX.to_string()
        } else {
            prefix
        };
        self.0.insert(prefix, uri.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    /// First prefix bound to `uri`
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, bound)| bound.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Value of a single property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Single(String),
    List(Vec<String>),
}

impl PropertyValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            PropertyValue::Single(value) => Some(value),
            PropertyValue::List(_) => None,
        }
    }

    /// All values, a single value being a list of one
    pub fn values(&self) -> Vec<&str> {
        match self {
            PropertyValue::Single(value) => vec![value.as_str()],
            PropertyValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// True for the `"true"` marker used by action flags
    pub fn is_true(&self) -> bool {
        self.as_single()
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Single(value) => write!(f, "{}", value),
            PropertyValue::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Single(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Single(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(values: Vec<String>) -> Self {
        PropertyValue::List(values)
    }
}

/// One mail rule: an ordered list of named properties
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterEntry {
    properties: Vec<(String, PropertyValue)>,
}

impl FilterEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_single)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets a property, replacing an existing value in place
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        let name = name.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        let index = self.properties.iter().position(|(key, _)| key == name)?;
        Some(self.properties.remove(index).1)
    }

    /// Appends a user label, promoting `label` to a list when needed
    pub fn push_label(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self
            .properties
            .iter_mut()
            .find(|(key, _)| key == LABEL_PROPERTY)
        {
            Some((_, slot)) => {
                let mut values = match std::mem::replace(slot, PropertyValue::List(Vec::new())) {
                    PropertyValue::Single(value) => vec![value],
                    PropertyValue::List(values) => values,
                };
                values.push(name);
                *slot = PropertyValue::List(values);
            }
            None => self
                .properties
                .push((LABEL_PROPERTY.to_string(), PropertyValue::List(vec![name]))),
        }
    }

    /// User label names, in order
    pub fn labels(&self) -> Vec<&str> {
        self.get(LABEL_PROPERTY)
            .map(PropertyValue::values)
            .unwrap_or_default()
    }

    /// Drops `sizeOperator`/`sizeUnit` from an entry without `size`
    ///
    /// Returns true when something was removed.
    pub fn repair_size(&mut self) -> bool {
        if self.contains("size") {
            return false;
        }
        let operator = self.remove("sizeOperator").is_some();
        let unit = self.remove("sizeUnit").is_some();
        operator || unit
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FilterEntry
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut entry = FilterEntry::new();
        for (name, value) in iter {
            entry.set(name, value);
        }
        entry
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Single(value) => serializer.serialize_str(value),
            PropertyValue::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for FilterEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len()))?;
        for (name, value) in &self.properties {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A YAML/JSON scalar read as a string
struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(PropertyValueVisitor).and_then(|value| match value {
            PropertyValue::Single(value) => Ok(Scalar(value)),
            PropertyValue::List(_) => Err(de::Error::custom("nested lists are not supported")),
        })
    }
}

struct PropertyValueVisitor;

impl<'de> Visitor<'de> for PropertyValueVisitor {
    type Value = PropertyValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a scalar or a list of scalars")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
        Ok(PropertyValue::Single(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Self::Value, E> {
        Ok(PropertyValue::Single(value))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Self::Value, E> {
        Ok(PropertyValue::Single(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Self::Value, E> {
        Ok(PropertyValue::Single(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Self::Value, E> {
        Ok(PropertyValue::Single(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Self::Value, E> {
        Ok(PropertyValue::Single(value.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Err(de::Error::custom("property has no value"))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Err(de::Error::custom("property has no value"))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let mut values = Vec::new();
        while let Some(Scalar(value)) = seq.next_element::<Scalar>()? {
            values.push(value);
        }
        Ok(PropertyValue::List(values))
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(PropertyValueVisitor)
    }
}

struct FilterEntryVisitor;

impl<'de> Visitor<'de> for FilterEntryVisitor {
    type Value = FilterEntry;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a mapping of property names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entry = FilterEntry::new();
        while let Some((name, value)) = map.next_entry::<String, PropertyValue>()? {
            if entry.contains(&name) {
                return Err(de::Error::custom(format!("duplicate property `{}`", name)));
            }
            entry.set(name, value);
        }
        Ok(entry)
    }
}

impl<'de> Deserialize<'de> for FilterEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(FilterEntryVisitor)
    }
}
