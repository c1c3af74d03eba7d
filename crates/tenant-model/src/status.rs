use serde::{Deserialize, Serialize};

use crate::coordinate::{GroupKind, GroupResource};
use crate::field::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusReason {
    NotFound,
    Conflict,
    Invalid,
    BadRequest,
    InternalError,
}

impl StatusReason {
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Invalid => 422,
            Self::BadRequest => 400,
            Self::InternalError => 500,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// resource for not-found and conflict, kind for invalid
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<FieldError>,
}

/// API status failure, shared by the backing store and the registry
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct StatusError {
    pub reason: StatusReason,
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

impl StatusError {
    pub fn not_found(resource: &GroupResource, name: &str) -> Self {
        Self {
            reason: StatusReason::NotFound,
            code: StatusReason::NotFound.code(),
            message: format!("{resource} \"{name}\" not found"),
            details: Some(StatusDetails {
                name: name.to_owned(),
                group: resource.group.clone(),
                kind: resource.resource.clone(),
                causes: vec![],
            }),
        }
    }

    pub fn conflict(resource: &GroupResource, name: &str, detail: impl AsRef<str>) -> Self {
        Self {
            reason: StatusReason::Conflict,
            code: StatusReason::Conflict.code(),
            message: format!(
                "Operation cannot be fulfilled on {resource} \"{name}\": {}",
                detail.as_ref()
            ),
            details: Some(StatusDetails {
                name: name.to_owned(),
                group: resource.group.clone(),
                kind: resource.resource.clone(),
                causes: vec![],
            }),
        }
    }

    /// aggregate field errors into one failure naming the object
    pub fn invalid(kind: &GroupKind, name: &str, causes: Vec<FieldError>) -> Self {
        let aggregate = match causes.len() {
            0 => String::new(),
            1 => causes[0].to_string(),
            _ => format!(
                "[{}]",
                causes
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        Self {
            reason: StatusReason::Invalid,
            code: StatusReason::Invalid.code(),
            message: format!("{kind} \"{name}\" is invalid: {aggregate}"),
            details: Some(StatusDetails {
                name: name.to_owned(),
                group: kind.group.clone(),
                kind: kind.kind.clone(),
                causes,
            }),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            reason: StatusReason::BadRequest,
            code: StatusReason::BadRequest.code(),
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            reason: StatusReason::InternalError,
            code: StatusReason::InternalError.code(),
            message: message.into(),
            details: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.reason == StatusReason::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.reason == StatusReason::Conflict
    }

    pub fn is_invalid(&self) -> bool {
        self.reason == StatusReason::Invalid
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = StatusError::not_found(&GroupResource::new("example.io", "widgets"), "y");
        assert!(err.is_not_found());
        assert_eq!(err.code, 404);
        assert_eq!(err.to_string(), "widgets.example.io \"y\" not found");
    }

    #[test]
    fn test_invalid_aggregates_causes() {
        let err = StatusError::invalid(
            &GroupKind::new("example.io", "Widget"),
            "x",
            vec![
                FieldError::required("spec.size", ""),
                FieldError::invalid("spec.replicas", json!(-1), "must be >= 0"),
            ],
        );
        assert!(err.is_invalid());
        assert_eq!(
            err.to_string(),
            "Widget.example.io \"x\" is invalid: [spec.size: Required value, spec.replicas: Invalid value: -1: must be >= 0]"
        );
        assert_eq!(err.details.expect("details").causes.len(), 2);
    }
}
