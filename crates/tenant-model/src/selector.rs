//! Equality-based label selectors in their string form.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorParseError {
    #[error("empty label key in requirement '{0}'")]
    EmptyKey(String),
    #[error("invalid label requirement '{0}'")]
    InvalidRequirement(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Equals(key, value) => labels.get(key) == Some(value),
            Self::NotEquals(key, value) => labels.get(key) != Some(value),
            Self::Exists(key) => labels.contains_key(key),
            Self::DoesNotExist(key) => !labels.contains_key(key),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(key, value) => write!(f, "{key}={value}"),
            Self::NotEquals(key, value) => write!(f, "{key}!={value}"),
            Self::Exists(key) => write!(f, "{key}"),
            Self::DoesNotExist(key) => write!(f, "!{key}"),
        }
    }
}

/// Conjunction of requirements; the empty selector matches everything.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn parse(selector: &str) -> Result<Self, SelectorParseError> {
        let mut requirements = vec![];
        for clause in selector.split(',').map(str::trim) {
            if clause.is_empty() {
                continue;
            }
            requirements.push(parse_requirement(clause)?);
        }
        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|req| req.matches(labels))
    }
}

impl FromStr for LabelSelector {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.requirements.iter().map(ToString::to_string).collect();
        f.write_str(&clauses.join(","))
    }
}

fn parse_requirement(clause: &str) -> Result<Requirement, SelectorParseError> {
    let key_value = |key: &str, value: &str| -> Result<(String, String), SelectorParseError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(SelectorParseError::EmptyKey(clause.to_owned()));
        }
        Ok((key.to_owned(), value.trim().to_owned()))
    };

    if let Some((key, value)) = clause.split_once("!=") {
        let (key, value) = key_value(key, value)?;
        return Ok(Requirement::NotEquals(key, value));
    }
    if let Some((key, value)) = clause.split_once("==") {
        let (key, value) = key_value(key, value)?;
        return Ok(Requirement::Equals(key, value));
    }
    if let Some((key, value)) = clause.split_once('=') {
        let (key, value) = key_value(key, value)?;
        return Ok(Requirement::Equals(key, value));
    }
    if let Some(key) = clause.strip_prefix('!') {
        let (key, _) = key_value(key, "")?;
        return Ok(Requirement::DoesNotExist(key));
    }
    if clause.contains(char::is_whitespace) {
        return Err(SelectorParseError::InvalidRequirement(clause.to_owned()));
    }
    Ok(Requirement::Exists(clause.to_owned()))
}
