use std::collections::BTreeMap;
use std::fmt;

use tenant_model::DynamicObject;

/// Fixed `key=value` predicate narrowing what a store ever exposes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabelScope {
    required: BTreeMap<String, String>,
}

impl LabelScope {
    pub fn new(required: BTreeMap<String, String>) -> Self {
        Self { required }
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    pub fn required(&self) -> &BTreeMap<String, String> {
        &self.required
    }

    /// AND the scope onto a caller selector so the backing store filters for us
    pub fn inject_into_selector(&self, selector: &str) -> String {
        let selector = selector.trim();
        if self.is_empty() {
            return selector.to_owned();
        }
        if selector.is_empty() {
            self.to_string()
        } else {
            format!("{selector},{self}")
        }
    }

    /// a required key that is absent never matches, even against an empty value
    pub fn matches(&self, object: &DynamicObject) -> bool {
        if self.is_empty() {
            return true;
        }
        let labels = object.labels();
        self.required
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

impl fmt::Display for LabelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.required.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for LabelScope
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(labels: &[(&str, &str)]) -> DynamicObject {
        DynamicObject::new("example.io/v1", "Widget")
            .with_name("w")
            .with_labels(labels.iter().copied())
    }

    #[test]
    fn test_inject_into_empty_selector() {
        let scope: LabelScope = [("env", "prod"), ("app", "web")].into_iter().collect();
        assert_eq!(scope.inject_into_selector(""), "app=web,env=prod");
    }

    #[test]
    fn test_inject_appends_to_caller_selector() {
        let scope: LabelScope = [("env", "prod")].into_iter().collect();
        assert_eq!(scope.inject_into_selector("tier!=db"), "tier!=db,env=prod");
    }

    #[test]
    fn test_empty_scope_leaves_selector() {
        let scope = LabelScope::default();
        assert_eq!(scope.inject_into_selector("tier=db"), "tier=db");
        assert_eq!(scope.inject_into_selector(""), "");
    }

    #[test]
    fn test_matches() {
        let scope: LabelScope = [("env", "prod")].into_iter().collect();
        assert!(scope.matches(&widget(&[("env", "prod"), ("x", "y")])));
        assert!(!scope.matches(&widget(&[("env", "dev")])));
        assert!(!scope.matches(&widget(&[])));
    }

    #[test]
    fn test_missing_key_with_empty_value() {
        let scope: LabelScope = [("flag", "")].into_iter().collect();
        assert!(!scope.matches(&widget(&[])));
        assert!(scope.matches(&widget(&[("flag", "")])));
    }

    #[test]
    fn test_empty_scope_matches_all() {
        assert!(LabelScope::default().matches(&widget(&[])));
    }
}
