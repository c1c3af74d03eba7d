use tenant_model::StatusError;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// failure reported by the backing store in API status form
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error("watch channel closed")]
    Closed,
    #[error("Json serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("transport: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status(status) if status.is_not_found())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Status(status) if status.is_conflict())
    }
}
