//! Suite definition types
//!
//! Defines the data structures for deserializing YAML suite files: the
//! scenario matrix and the interception rules shared by its pipelines.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::common::{Error, Result};
use crate::intercept::{Guard, InterceptionRule, TargetPath, UrlPattern};
use crate::scenario::{FieldSpec, FieldValue, ScenarioMatrix};

/// A suite file as written on disk
#[derive(Deserialize, Debug)]
pub struct SuiteFile {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite exercises
    pub description: Option<String>,
    /// Override fields and the scenarios drawn from them
    pub matrix: MatrixConfig,
    /// Calls to intercept
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Matrix section of a suite file
#[derive(Deserialize, Debug)]
pub struct MatrixConfig {
    /// Fields with their allowed values
    pub fields: Vec<FieldSpec>,
    /// Curated picks; omitted means the full product
    pub scenarios: Option<Vec<BTreeMap<String, FieldValue>>>,
}

/// One interception rule
#[derive(Deserialize, Debug)]
pub struct RuleConfig {
    /// Name used in logs and reports
    pub name: String,
    /// URL glob (`**` spans segments, `*` stays within one)
    pub pattern: String,
    /// Restrict to one HTTP method
    pub method: Option<String>,
    /// JSON pointer of the object to rewrite
    #[serde(default)]
    pub target: String,
    /// Shape check before rewriting (default: at least two keys)
    ///
    /// Written as `always` or as a one-key map such as `min_keys: 3`.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub guard: Guard,
}

impl RuleConfig {
    pub fn build(&self) -> Result<InterceptionRule> {
        Ok(InterceptionRule::new(
            self.name.clone(),
            UrlPattern::new(&self.pattern, self.method.as_deref())?,
            TargetPath::parse(&self.target)?,
            self.guard.clone(),
        ))
    }
}

/// A validated suite
#[derive(Debug)]
pub struct Suite {
    pub name: String,
    pub description: Option<String>,
    pub matrix: ScenarioMatrix,
    pub rules: Vec<InterceptionRule>,
}

impl Suite {
    pub fn rule(&self, name: &str) -> Result<&InterceptionRule> {
        self.rules
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| Error::RuleNotFound(name.to_string()))
    }
}

impl SuiteFile {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Validate and compile the suite
    pub fn into_suite(self) -> Result<Suite> {
        let matrix = match self.matrix.scenarios {
            Some(picks) => ScenarioMatrix::curated(self.matrix.fields, picks)?,
            None => ScenarioMatrix::product(self.matrix.fields)?,
        };

        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if rules.iter().any(|r: &InterceptionRule| r.name() == rule.name) {
                return Err(Error::Config(format!(
                    "Rule '{}' is declared twice",
                    rule.name
                )));
            }
            rules.push(rule.build()?);
        }

        Ok(Suite {
            name: self.name,
            description: self.description,
            matrix,
            rules,
        })
    }
}

/// Load and validate a suite file
pub fn load_suite(path: &Path) -> Result<Suite> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read suite '{}': {}",
            path.display(),
            e
        ))
    })?;
    SuiteFile::parse(&content)?.into_suite()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"
name: credit-request
description: Disbursement date handling per currency
matrix:
  fields:
    - name: CURRENCY
      allowed: [RD, US]
    - name: AUTO_DATE
      allowed: [S, N, "", "$absent"]
  scenarios:
    - { CURRENCY: RD, AUTO_DATE: S }
    - { CURRENCY: RD, AUTO_DATE: "" }
    - { CURRENCY: US, AUTO_DATE: "$absent" }
rules:
  - name: credit-parameters
    pattern: "**/api/credit/parameters*"
    method: GET
    target: /data
  - name: product
    pattern: "**/api/product/*"
    target: /result/0
    guard:
      has_key: CODE
"#;

    #[test]
    fn test_parse_curated_suite() {
        let suite = SuiteFile::parse(SUITE).unwrap().into_suite().unwrap();
        assert_eq!(suite.name, "credit-request");
        assert_eq!(suite.matrix.len(), 3);
        assert_eq!(suite.matrix.scenarios()[1].label(), "CURRENCY=RD,AUTO_DATE=''");
        assert!(suite.matrix.scenarios()[2]
            .get("AUTO_DATE")
            .unwrap()
            .is_absent());

        let params = suite.rule("credit-parameters").unwrap();
        assert_eq!(params.guard(), &Guard::MinKeys(2));
        assert_eq!(params.target().as_str(), "/data");
        assert_eq!(
            suite.rule("product").unwrap().guard(),
            &Guard::HasKey("CODE".into())
        );
        assert!(matches!(suite.rule("nope"), Err(Error::RuleNotFound(_))));
    }

    #[test]
    fn test_missing_scenarios_means_product() {
        let yaml = r#"
name: cash
matrix:
  fields:
    - name: BOX_OPEN
      allowed: ["S", "N"]
    - name: CURRENCY
      allowed: [RD, US, "$absent"]
"#;
        let suite = SuiteFile::parse(yaml).unwrap().into_suite().unwrap();
        assert_eq!(suite.matrix.len(), 6);
        assert!(suite.rules.is_empty());
    }

    #[test]
    fn test_bad_target_rejected() {
        let yaml = r#"
name: bad
matrix:
  fields:
    - name: A
      allowed: [x]
rules:
  - name: r
    pattern: "**/api/*"
    target: data
"#;
        let err = SuiteFile::parse(yaml).unwrap().into_suite().unwrap_err();
        assert!(matches!(err, Error::InvalidTargetPath(_)));
    }

    #[test]
    fn test_guard_forms_parse() {
        let yaml = r#"
name: guards
matrix:
  fields:
    - name: A
      allowed: [x]
rules:
  - name: counted
    pattern: "**/a"
    guard:
      min_keys: 3
  - name: keyed
    pattern: "**/b"
    guard:
      has_key: CODE
  - name: open
    pattern: "**/c"
    guard: always
  - name: combined
    pattern: "**/d"
    guard:
      all:
        - has_key: CODE
        - min_keys: 2
  - name: defaulted
    pattern: "**/e"
"#;
        let suite = SuiteFile::parse(yaml).unwrap().into_suite().unwrap();
        let guard = |name: &str| suite.rule(name).unwrap().guard().clone();
        assert_eq!(guard("counted"), Guard::MinKeys(3));
        assert_eq!(guard("keyed"), Guard::HasKey("CODE".into()));
        assert_eq!(guard("open"), Guard::Always);
        assert_eq!(
            guard("combined"),
            Guard::All(vec![Guard::HasKey("CODE".into()), Guard::MinKeys(2)])
        );
        assert_eq!(guard("defaulted"), Guard::default());
    }

    #[test]
    fn test_malformed_yaml_is_yaml_error() {
        let err = SuiteFile::parse("name: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
        assert_eq!(err.code(), "CONFIG");

        let err = SuiteFile::parse("name: x\nmatrix:\n  fields: []\nrules:\n  - name: r\n    pattern: p\n    guard:\n      at_most: 2\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }
}
