use thiserror::Error;

pub type CrmResult<T> = Result<T, CrmError>;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CrmError {
    /// HTTP status code this error maps to at the API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            CrmError::Validation(_) => 400,
            CrmError::Unauthorized(_) => 401,
            CrmError::NotFound(_) => 404,
            CrmError::Conflict(_) => 409,
            CrmError::RateLimited(_) => 429,
            CrmError::Repository(_)
            | CrmError::Serialization(_)
            | CrmError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CrmError::Validation(_) => "validation_failed",
            CrmError::Unauthorized(_) => "unauthorized",
            CrmError::NotFound(_) => "not_found",
            CrmError::Conflict(_) => "conflict",
            CrmError::RateLimited(_) => "rate_limited",
            CrmError::Repository(_)
            | CrmError::Serialization(_)
            | CrmError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to return to API clients. Internal failures are
    /// reduced to a generic string; the detail belongs in the log.
    pub fn public_message(&self) -> String {
        match self {
            CrmError::Validation(msg)
            | CrmError::NotFound(msg)
            | CrmError::Conflict(msg)
            | CrmError::Unauthorized(msg)
            | CrmError::RateLimited(msg) => msg.clone(),
            _ => "Internal server error".to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}
