use tenant_client::ClientError;
use tenant_model::StatusError;

use crate::backoff::BackoffError;

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("no cluster in the request context")]
    MissingCluster,
    #[error("there should be a Namespace context in a request for a namespaced resource: {0}")]
    MissingNamespace(String),
    #[error("{0} requires a concrete cluster, got the wildcard")]
    WildcardCluster(&'static str),
    #[error("not an object of the served kind: {0}")]
    TypeMismatch(String),
    #[error(transparent)]
    Backoff(#[from] BackoffError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error("backing client: {0}")]
    Client(ClientError),
}

impl From<ClientError> for RegistryError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status(status) => Self::Status(status),
            other => Self::Client(other),
        }
    }
}

impl RegistryError {
    pub fn status(&self) -> Option<&StatusError> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status().is_some_and(StatusError::is_not_found)
    }

    pub fn is_conflict(&self) -> bool {
        self.status().is_some_and(StatusError::is_conflict)
    }

    pub fn is_invalid(&self) -> bool {
        self.status().is_some_and(StatusError::is_invalid)
    }

    /// frontend wiring problems; never retried
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingCluster
                | Self::MissingNamespace(_)
                | Self::WildcardCluster(_)
                | Self::Backoff(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use tenant_model::GroupResource;

    use super::*;

    #[test]
    fn test_backing_status_passes_through() {
        let status = StatusError::conflict(&GroupResource::new("example.io", "widgets"), "x", "stale");
        let err = RegistryError::from(ClientError::Status(status.clone()));
        assert!(err.is_conflict());
        assert_eq!(err.status(), Some(&status));
        assert_eq!(err.to_string(), status.to_string());
    }

    #[test]
    fn test_transport_stays_client() {
        let err = RegistryError::from(ClientError::Transport("reset".to_owned()));
        assert!(matches!(err, RegistryError::Client(_)));
        assert!(!err.is_not_found());
        assert!(!err.is_configuration());
    }
}
