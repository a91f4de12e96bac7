use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    InvalidInput,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
    #[serde(other)]
    Unknown,
}

/// Structured error body returned by the backend for a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{id:?}: {message}")]
pub struct ApiError {
    #[serde(default = "unknown_code")]
    pub id: ErrorCode,
    pub message: String,
}

fn unknown_code() -> ErrorCode {
    ErrorCode::Unknown
}

impl ApiError {
    pub fn new(id: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}
