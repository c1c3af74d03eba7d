use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldErrorType {
    #[serde(rename = "FieldValueRequired")]
    Required,
    #[serde(rename = "FieldValueInvalid")]
    Invalid,
    #[serde(rename = "FieldValueForbidden")]
    Forbidden,
    #[serde(rename = "FieldValueNotSupported")]
    NotSupported,
    #[serde(rename = "FieldValueDuplicate")]
    Duplicate,
}

impl fmt::Display for FieldErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Required => "Required value",
            Self::Invalid => "Invalid value",
            Self::Forbidden => "Forbidden",
            Self::NotSupported => "Unsupported value",
            Self::Duplicate => "Duplicate value",
        };
        f.write_str(text)
    }
}

/// validation failure for a single field path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "reason")]
    pub error_type: FieldErrorType,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad_value: Option<Value>,
    #[serde(default, rename = "message")]
    pub detail: String,
}

pub type FieldErrorList = Vec<FieldError>;

impl FieldError {
    fn new(error_type: FieldErrorType, field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error_type,
            field: field.into(),
            bad_value: None,
            detail: detail.into(),
        }
    }

    pub fn required(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(FieldErrorType::Required, field, detail)
    }

    pub fn invalid(field: impl Into<String>, value: Value, detail: impl Into<String>) -> Self {
        Self {
            bad_value: Some(value),
            ..Self::new(FieldErrorType::Invalid, field, detail)
        }
    }

    pub fn forbidden(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(FieldErrorType::Forbidden, field, detail)
    }

    pub fn not_supported(field: impl Into<String>, value: Value, supported: &[&str]) -> Self {
        let detail = if supported.is_empty() {
            String::new()
        } else {
            format!("supported values: \"{}\"", supported.join("\", \""))
        };
        Self {
            bad_value: Some(value),
            ..Self::new(FieldErrorType::NotSupported, field, detail)
        }
    }

    pub fn duplicate(field: impl Into<String>, value: Value) -> Self {
        Self {
            bad_value: Some(value),
            ..Self::new(FieldErrorType::Duplicate, field, "")
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error_type)?;
        if let Some(value) = &self.bad_value {
            write!(f, ": {value}")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}
