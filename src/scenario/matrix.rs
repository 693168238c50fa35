//! Scenario matrix construction
//!
//! A matrix is an ordered, duplicate-free list of scenarios over one field
//! set. Order is a pure function of the declaration so that pipeline names
//! and reports are stable between runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::common::{Error, Result};

use super::value::FieldValue;

/// An override field and the values it may take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears in the intercepted payload
    pub name: String,
    /// Allowed values, including [`FieldValue::Absent`] where omission is a case
    pub allowed: Vec<FieldValue>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, allowed: Vec<FieldValue>) -> Self {
        Self {
            name: name.into(),
            allowed,
        }
    }
}

/// One point in the matrix: a value for every field of the matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    index: usize,
    fields: Vec<(String, FieldValue)>,
}

impl Scenario {
    /// Build a scenario directly. Field order is preserved as given.
    pub fn new(index: usize, fields: Vec<(String, FieldValue)>) -> Self {
        Self { index, fields }
    }

    /// Position of this scenario within its matrix
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value of a field, or `None` if the field is not part of the matrix
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// All fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Fields with a value to inject (absent ones skipped)
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_set().map(|v| (name.as_str(), v)))
    }

    /// Stable human-readable identity, e.g. `CURRENCY=RD,AUTO_DATE=''`
    pub fn label(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.iter().map(|(_, value)| value)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} [{}]", self.index, self.label())
    }
}

/// Ordered, duplicate-free set of scenarios sharing one field set
#[derive(Debug, Clone)]
pub struct ScenarioMatrix {
    fields: Vec<FieldSpec>,
    scenarios: Vec<Scenario>,
}

impl ScenarioMatrix {
    /// Full cross product of the allowed values
    ///
    /// Iterates the last declared field fastest, so the first field's values
    /// form the outermost grouping.
    pub fn product(fields: Vec<FieldSpec>) -> Result<Self> {
        validate_fields(&fields)?;

        let mut rows: Vec<Vec<(String, FieldValue)>> = vec![Vec::new()];
        for spec in &fields {
            let mut next = Vec::with_capacity(rows.len() * spec.allowed.len());
            for row in &rows {
                for value in &spec.allowed {
                    let mut extended = row.clone();
                    extended.push((spec.name.clone(), value.clone()));
                    next.push(extended);
                }
            }
            rows = next;
        }

        let scenarios = rows
            .into_iter()
            .enumerate()
            .map(|(index, fields)| Scenario::new(index, fields))
            .collect();

        Self::checked(fields, scenarios)
    }

    /// Hand-picked subset of the product
    ///
    /// Every pick must name exactly the declared fields with allowed values.
    /// Picks keep the order given; field order follows the declaration.
    pub fn curated(
        fields: Vec<FieldSpec>,
        picks: Vec<BTreeMap<String, FieldValue>>,
    ) -> Result<Self> {
        validate_fields(&fields)?;

        let mut scenarios = Vec::with_capacity(picks.len());
        for (index, mut pick) in picks.into_iter().enumerate() {
            let mut row = Vec::with_capacity(fields.len());
            for spec in &fields {
                let value = pick.remove(&spec.name).ok_or_else(|| {
                    field_set_mismatch(index, &fields, &row, &pick)
                })?;
                if !spec.allowed.contains(&value) {
                    return Err(Error::ValueNotAllowed {
                        field: spec.name.clone(),
                        value: value.to_string(),
                    });
                }
                row.push((spec.name.clone(), value));
            }
            if !pick.is_empty() {
                return Err(field_set_mismatch(index, &fields, &row, &pick));
            }
            scenarios.push(Scenario::new(index, row));
        }

        Self::checked(fields, scenarios)
    }

    fn checked(fields: Vec<FieldSpec>, scenarios: Vec<Scenario>) -> Result<Self> {
        for (index, scenario) in scenarios.iter().enumerate() {
            if let Some(first) = scenarios[..index]
                .iter()
                .position(|earlier| earlier.values().eq(scenario.values()))
            {
                return Err(Error::DuplicateScenario {
                    index,
                    first,
                    label: scenario.label(),
                });
            }
        }
        tracing::debug!(
            fields = fields.len(),
            scenarios = scenarios.len(),
            "Scenario matrix built"
        );
        Ok(Self { fields, scenarios })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn get(&self, index: usize) -> Option<&Scenario> {
        self.scenarios.get(index)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scenario> {
        self.scenarios.iter()
    }
}

impl<'a> IntoIterator for &'a ScenarioMatrix {
    type Item = &'a Scenario;
    type IntoIter = std::slice::Iter<'a, Scenario>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate_fields(fields: &[FieldSpec]) -> Result<()> {
    if fields.is_empty() {
        return Err(Error::EmptyMatrix);
    }
    for (i, spec) in fields.iter().enumerate() {
        if spec.allowed.is_empty() {
            return Err(Error::Config(format!(
                "Field '{}' has no allowed values",
                spec.name
            )));
        }
        if fields[..i].iter().any(|earlier| earlier.name == spec.name) {
            return Err(Error::Config(format!(
                "Field '{}' is declared twice",
                spec.name
            )));
        }
    }
    Ok(())
}

fn field_set_mismatch(
    index: usize,
    fields: &[FieldSpec],
    seen: &[(String, FieldValue)],
    rest: &BTreeMap<String, FieldValue>,
) -> Error {
    let expected = fields
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let found = seen
        .iter()
        .map(|(name, _)| name.as_str())
        .chain(rest.keys().map(String::as_str))
        .collect::<Vec<_>>()
        .join(", ");
    Error::FieldSetMismatch {
        index,
        expected,
        found,
    }
}
