use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, PowercheckError>;

#[derive(Debug, Error)]
pub enum PowercheckError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Wire shape for failure responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl PowercheckError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Json(_) => "JSON_ERROR",
            Self::Bson(_) => "BSON_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_payload(&self, operation: impl Into<String>, resource: Option<String>) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            resource,
        }
    }
}
