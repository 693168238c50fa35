//! Interception rules and the body rewrite they perform
//!
//! A rule only ever touches one JSON object inside the response body (the
//! target). Overrides are shallow-merged into that object and absent fields
//! are dropped from it; siblings inside the target keep their values and
//! order, and everything outside it keeps its exact bytes.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use crate::common::{Error, Result};
use crate::scenario::{FieldValue, Scenario};

use super::pattern::UrlPattern;

/// JSON pointer to the object a rule rewrites (`""` is the whole body)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath(String);

impl TargetPath {
    pub fn parse(pointer: &str) -> Result<Self> {
        if pointer.is_empty() || pointer.starts_with('/') {
            Ok(Self(pointer.to_string()))
        } else {
            Err(Error::InvalidTargetPath(pointer.to_string()))
        }
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Structural check deciding whether a target object is safe to rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    /// Rewrite any object found at the target
    Always,
    /// The target must carry at least this many keys
    ///
    /// The default of two separates a populated record from the one-key
    /// envelopes the backend returns for empty or failed lookups.
    MinKeys(usize),
    /// The target must already carry this key
    HasKey(String),
    /// Every inner guard must pass
    All(Vec<Guard>),
}

impl Default for Guard {
    fn default() -> Self {
        Guard::MinKeys(2)
    }
}

impl Guard {
    /// Check the target's member names
    pub fn allows<K: AsRef<str>>(&self, keys: &[K]) -> bool {
        match self {
            Guard::Always => true,
            Guard::MinKeys(n) => keys.len() >= *n,
            Guard::HasKey(key) => keys.iter().any(|k| k.as_ref() == key),
            Guard::All(guards) => guards.iter().all(|g| g.allows(keys)),
        }
    }
}

/// Why a matched response was re-emitted untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Body did not parse as JSON
    BodyNotJson,
    /// Nothing exists at the target path
    PathMissing,
    /// The target exists but is not an object
    NotAnObject,
    /// The guard refused the target's shape
    GuardFailed,
    /// The scenario changes nothing in the target
    NoOverrides,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BodyNotJson => "body is not JSON",
            Self::PathMissing => "target path missing",
            Self::NotAnObject => "target is not an object",
            Self::GuardFailed => "guard rejected target shape",
            Self::NoOverrides => "scenario changes nothing in target",
        };
        write!(f, "{}", s)
    }
}

/// Result of applying a rule to a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// New body bytes and the fields that were injected or removed
    Mutated { body: Vec<u8>, fields: Vec<String> },
    /// The original bytes must be used as-is
    Untouched(RejectReason),
}

/// Pattern, target and guard for one intercepted call
#[derive(Debug, Clone)]
pub struct InterceptionRule {
    name: String,
    pattern: UrlPattern,
    target: TargetPath,
    guard: Guard,
}

impl InterceptionRule {
    pub fn new(name: impl Into<String>, pattern: UrlPattern, target: TargetPath, guard: Guard) -> Self {
        Self {
            name: name.into(),
            pattern,
            target,
            guard,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &UrlPattern {
        &self.pattern
    }

    pub fn target(&self) -> &TargetPath {
        &self.target
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn matches(&self, method: &str, url: &str) -> bool {
        self.pattern.matches(method, url)
    }

    /// Apply the scenario to the target of `body`
    ///
    /// Set fields are merged into the target; absent fields are removed from
    /// it. Only the target object is re-emitted: every byte outside it is
    /// copied from the original body, and untouched members inside it keep
    /// their raw text.
    ///
    /// Never fails: any shape the rule cannot safely rewrite yields
    /// [`Rewrite::Untouched`] and the caller keeps the original bytes.
    pub fn rewrite(&self, body: &[u8], scenario: &Scenario) -> Rewrite {
        if scenario.fields().next().is_none() {
            return Rewrite::Untouched(RejectReason::NoOverrides);
        }

        let Ok(text) = std::str::from_utf8(body) else {
            return Rewrite::Untouched(RejectReason::BodyNotJson);
        };
        let Ok(root) = serde_json::from_str::<&RawValue>(text) else {
            return Rewrite::Untouched(RejectReason::BodyNotJson);
        };

        let Some(target) = locate(root, self.target.as_str()) else {
            return Rewrite::Untouched(RejectReason::PathMissing);
        };
        let Some(members) = object_members(target) else {
            return Rewrite::Untouched(RejectReason::NotAnObject);
        };

        let keys: Vec<&str> = members.iter().map(|(key, _)| key.as_str()).collect();
        if !self.guard.allows(&keys) {
            return Rewrite::Untouched(RejectReason::GuardFailed);
        }

        let (object, fields) = match merge(&members, scenario) {
            Ok(Some(merged)) => merged,
            Ok(None) => return Rewrite::Untouched(RejectReason::NoOverrides),
            Err(_) => return Rewrite::Untouched(RejectReason::BodyNotJson),
        };
        let Some(span) = span_within(text, target.get()) else {
            return Rewrite::Untouched(RejectReason::BodyNotJson);
        };

        let mut out = String::with_capacity(text.len() + object.len());
        out.push_str(&text[..span.start]);
        out.push_str(&object);
        out.push_str(&text[span.end..]);
        Rewrite::Mutated {
            body: out.into_bytes(),
            fields,
        }
    }
}

/// Object members in document order, values left as raw text
struct RawObject<'a>(Vec<(String, &'a RawValue)>);

impl<'de: 'a, 'a> Deserialize<'de> for RawObject<'a> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct Members<'a>(PhantomData<&'a RawValue>);

        impl<'de: 'a, 'a> Visitor<'de> for Members<'a> {
            type Value = RawObject<'a>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut members = Vec::new();
                while let Some(member) = map.next_entry::<String, &'a RawValue>()? {
                    members.push(member);
                }
                Ok(RawObject(members))
            }
        }

        deserializer.deserialize_map(Members(PhantomData))
    }
}

fn object_members(raw: &RawValue) -> Option<Vec<(String, &RawValue)>> {
    if !raw.get().starts_with('{') {
        return None;
    }
    serde_json::from_str::<RawObject<'_>>(raw.get())
        .ok()
        .map(|object| object.0)
}

/// Follow a JSON pointer without decoding the values it passes by
fn locate<'a>(root: &'a RawValue, pointer: &str) -> Option<&'a RawValue> {
    let mut current = root;
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        current = match current.get().as_bytes().first().copied()? {
            // Last duplicate wins, as with a parsed document
            b'{' => object_members(current)?
                .into_iter()
                .rev()
                .find(|(key, _)| *key == token)
                .map(|(_, value)| value)?,
            b'[' => {
                let index = array_index(&token)?;
                serde_json::from_str::<Vec<&RawValue>>(current.get())
                    .ok()?
                    .into_iter()
                    .nth(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

fn array_index(token: &str) -> Option<usize> {
    if token.starts_with('+') || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    token.parse().ok()
}

/// Rebuild the target object with the scenario applied
///
/// Returns the new object text and the fields it changed, or `None` when
/// the scenario changes nothing in this object.
fn merge(members: &[(String, &RawValue)], scenario: &Scenario) -> serde_json::Result<Option<(String, Vec<String>)>> {
    let present = |name: &str| members.iter().any(|(key, _)| key == name);

    let mut fields = Vec::new();
    let mut appended = Vec::new();
    for (name, value) in scenario.fields() {
        match value {
            FieldValue::Set(value) => {
                fields.push(name.to_string());
                if !present(name) {
                    appended.push((name, serde_json::to_string(value)?));
                }
            }
            FieldValue::Absent if present(name) => fields.push(name.to_string()),
            FieldValue::Absent => {}
        }
    }
    if fields.is_empty() {
        return Ok(None);
    }

    let mut object = String::from("{");
    let mut push = |key: &str, value: &str| -> serde_json::Result<()> {
        if object.len() > 1 {
            object.push(',');
        }
        object.push_str(&serde_json::to_string(key)?);
        object.push(':');
        object.push_str(value);
        Ok(())
    };
    for (key, raw) in members {
        match scenario.get(key) {
            Some(FieldValue::Absent) => {}
            Some(FieldValue::Set(value)) => push(key, &serde_json::to_string(value)?)?,
            None => push(key, raw.get())?,
        }
    }
    for (name, value) in &appended {
        push(name, value)?;
    }
    object.push('}');

    Ok(Some((object, fields)))
}

/// Byte range of `inner`, which must be borrowed from `outer`
fn span_within(outer: &str, inner: &str) -> Option<Range<usize>> {
    let start = (inner.as_ptr() as usize).checked_sub(outer.as_ptr() as usize)?;
    let end = start + inner.len();
    (end <= outer.len()).then_some(start..end)
}
