//! Typed key/value options.
//!
//! Plugins are configured with, and report results as, [`Options`]: an ordered
//! map from namespaced keys (`"external:command"`, `"error_stat:psnr"`) to
//! typed values. A key may hold a typed placeholder, i.e. the type is known but
//! no value has been set yet. Results use placeholders before the first
//! measurement so callers can discover the result schema up front.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Type tag of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Int32,
    UInt32,
    Double,
    String,
    Strings,
}

/// A typed option value; `None` marks a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int32(Option<i32>),
    UInt32(Option<u32>),
    Double(#[serde(serialize_with = "serialize_double")] Option<f64>),
    String(Option<String>),
    Strings(Option<Vec<String>>),
}

/// Serializes a double, writing non-finite values as `"inf"`, `"-inf"` or
/// `"NaN"`. JSON has no literal for them and `null` is reserved for
/// placeholders.
pub fn serialize_f64<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.collect_str(value)
    }
}

fn serialize_double<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_f64(v, serializer),
        None => serializer.serialize_none(),
    }
}

impl OptionValue {
    /// Creates a placeholder of the given type.
    pub fn placeholder(option_type: OptionType) -> Self {
        match option_type {
            OptionType::Int32 => OptionValue::Int32(None),
            OptionType::UInt32 => OptionValue::UInt32(None),
            OptionType::Double => OptionValue::Double(None),
            OptionType::String => OptionValue::String(None),
            OptionType::Strings => OptionValue::Strings(None),
        }
    }

    pub fn option_type(&self) -> OptionType {
        match self {
            OptionValue::Int32(_) => OptionType::Int32,
            OptionValue::UInt32(_) => OptionType::UInt32,
            OptionValue::Double(_) => OptionType::Double,
            OptionValue::String(_) => OptionType::String,
            OptionValue::Strings(_) => OptionType::Strings,
        }
    }

    /// Returns true if the value is set (not a placeholder).
    pub fn is_set(&self) -> bool {
        match self {
            OptionValue::Int32(v) => v.is_some(),
            OptionValue::UInt32(v) => v.is_some(),
            OptionValue::Double(v) => v.is_some(),
            OptionValue::String(v) => v.is_some(),
            OptionValue::Strings(v) => v.is_some(),
        }
    }
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionValue::Int32(Some(v)) => write!(f, "{}", v),
            OptionValue::UInt32(Some(v)) => write!(f, "{}", v),
            OptionValue::Double(Some(v)) => write!(f, "{}", v),
            OptionValue::String(Some(v)) => write!(f, "{}", v),
            OptionValue::Strings(Some(v)) => write!(f, "[{}]", v.join(", ")),
            _ => write!(f, "<unset>"),
        }
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int32(Some(value))
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::UInt32(Some(value))
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Double(Some(value))
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::String(Some(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(Some(value.to_string()))
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::Strings(Some(value))
    }
}

/// Conversion from a stored option value into a concrete type.
pub trait FromOptionValue: Sized {
    fn from_option_value(value: &OptionValue) -> Option<Self>;
}

impl FromOptionValue for i32 {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Int32(v) => *v,
            _ => None,
        }
    }
}

impl FromOptionValue for u32 {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::UInt32(v) => *v,
            OptionValue::Int32(Some(v)) => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromOptionValue for f64 {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Double(v) => *v,
            OptionValue::Int32(v) => v.map(f64::from),
            OptionValue::UInt32(v) => v.map(f64::from),
            _ => None,
        }
    }
}

impl FromOptionValue for String {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::String(v) => v.clone(),
            _ => None,
        }
    }
}

impl FromOptionValue for Vec<String> {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Strings(v) => v.clone(),
            _ => None,
        }
    }
}

/// Presence of a key in an [`Options`] map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// The key holds a value.
    Set,
    /// The key exists as a typed placeholder.
    Exists,
    /// The key is absent.
    DoesNotExist,
}

/// Ordered map of namespaced, typed options.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Options {
    entries: BTreeMap<String, OptionValue>,
}

impl Options {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Options::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets `key` to `value`, replacing any previous value or type.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Declares `key` as a placeholder of the given type.
    pub fn set_type(&mut self, key: impl Into<String>, option_type: OptionType) {
        self.entries
            .insert(key.into(), OptionValue::placeholder(option_type));
    }

    /// Returns the value at `key` converted to `T`, if set and convertible.
    pub fn get<T: FromOptionValue>(&self, key: &str) -> Option<T> {
        self.entries.get(key).and_then(T::from_option_value)
    }

    /// Returns the raw stored value.
    pub fn get_value(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    pub fn key_status(&self, key: &str) -> KeyStatus {
        match self.entries.get(key) {
            Some(value) if value.is_set() => KeyStatus::Set,
            Some(_) => KeyStatus::Exists,
            None => KeyStatus::DoesNotExist,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copies every entry of `other` into `self`, overwriting on conflict.
    pub fn merge(&mut self, other: &Options) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }
}
