//! Override field values
//!
//! A field is either set to a concrete JSON value (which may be the empty
//! string) or explicitly absent. The two are kept apart because the UI
//! under test renders "empty" and "omitted" differently.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Textual sentinel used in suite files for [`FieldValue::Absent`]
pub const ABSENT_SENTINEL: &str = "$absent";

/// Value of one override field within a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// The field is removed from the target when the backend sent it
    Absent,
    /// The field is injected with this value
    Set(serde_json::Value),
}

impl FieldValue {
    /// Shorthand for a string value
    pub fn text(value: impl Into<String>) -> Self {
        Self::Set(serde_json::Value::String(value.into()))
    }

    /// The explicit empty string, distinct from [`FieldValue::Absent`]
    pub fn empty() -> Self {
        Self::text("")
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The injected value, if any
    pub fn as_set(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Absent => None,
            Self::Set(v) => Some(v),
        }
    }

    /// True if this is a string value equal to `expected`
    pub fn is_text(&self, expected: &str) -> bool {
        matches!(self, Self::Set(serde_json::Value::String(s)) if s == expected)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "{}", ABSENT_SENTINEL),
            Self::Set(serde_json::Value::String(s)) if s.is_empty() => write!(f, "''"),
            Self::Set(serde_json::Value::String(s)) => write!(f, "{}", s),
            Self::Set(other) => write!(f, "{}", other),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_str(ABSENT_SENTINEL),
            Self::Set(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(ref s) if s == ABSENT_SENTINEL => Ok(Self::Absent),
            other => Ok(Self::Set(other)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}
