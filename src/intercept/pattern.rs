//! URL matching for interception rules
//!
//! Patterns are globs over the full request URL:
//! - `**` matches any run of characters, including `/`
//! - `*` matches any run of characters except `/`
//! - `?` matches exactly one character
//!
//! Everything else is literal.

use regex::Regex;
use std::fmt;

use crate::common::{Error, Result};

/// Compiled URL glob with an optional method filter
#[derive(Clone)]
pub struct UrlPattern {
    source: String,
    method: Option<String>,
    regex: Regex,
}

impl UrlPattern {
    /// Compile a glob, optionally restricted to one HTTP method
    pub fn new(glob: &str, method: Option<&str>) -> Result<Self> {
        if glob.is_empty() {
            return Err(Error::invalid_pattern(glob, "pattern is empty"));
        }
        let regex = Regex::new(&glob_to_regex(glob)).map_err(|e| Error::invalid_pattern(glob, e))?;
        Ok(Self {
            source: glob.to_string(),
            method: method.map(|m| m.to_ascii_uppercase()),
            regex,
        })
    }

    /// True if a request with this method and URL is covered
    pub fn matches(&self, method: &str, url: &str) -> bool {
        if let Some(expected) = &self.method {
            if !expected.eq_ignore_ascii_case(method) {
                return false;
            }
        }
        self.regex.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }
}

impl fmt::Debug for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlPattern")
            .field("glob", &self.source)
            .field("method", &self.method)
            .finish()
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{} {}", method, self.source),
            None => write!(f, "{}", self.source),
        }
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut chars = glob.chars().peekable();
    let mut literal = String::new();

    while let Some(c) = chars.next() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                if c == '?' {
                    out.push('.');
                } else if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            other => literal.push(other),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_star_spans_segments() {
        let p = UrlPattern::new("**/api/credit/parameters*", None).unwrap();
        assert!(p.matches("GET", "https://bank.test/core/api/credit/parameters"));
        assert!(p.matches("POST", "https://bank.test/api/credit/parameters?branch=01"));
        assert!(!p.matches("GET", "https://bank.test/api/credit/parameters/extra"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let p = UrlPattern::new("https://bank.test/*/session", None).unwrap();
        assert!(p.matches("GET", "https://bank.test/cash/session"));
        assert!(!p.matches("GET", "https://bank.test/cash/box/session"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let p = UrlPattern::new("**/person.json?id=1", None).unwrap();
        assert!(p.matches("GET", "http://h/person.json?id=1"));
        assert!(p.matches("GET", "http://h/person.json!id=1"));
        assert!(!p.matches("GET", "http://h/personXjson?id=1"));
    }

    #[test]
    fn test_method_filter_is_case_insensitive() {
        let p = UrlPattern::new("**/api/cash/*", Some("post")).unwrap();
        assert_eq!(p.method(), Some("POST"));
        assert!(p.matches("post", "http://h/api/cash/open"));
        assert!(!p.matches("GET", "http://h/api/cash/open"));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            UrlPattern::new("", None),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
