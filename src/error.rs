use thiserror::Error;

pub type Result<T> = std::result::Result<T, CartError>;
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Shopper-facing fallback used when a remote call gives no usable message.
pub const GENERIC_FAILURE: &str = "Request failed, please try again";

/// Failure taxonomy of a remote call (cart API, gateway, order service, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response reached us: connection refused, reset or timed out.
    #[error("network failure: {0}")]
    Network(String),
    #[error("unauthorized")]
    Unauthorized,
    /// A 4xx other than 401. Never retried.
    #[error("request rejected ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },
    #[error("server error ({status})")]
    Server { status: u16 },
    /// Reported by the payment provider; shown to the shopper as-is.
    #[error("payment failed: {0}")]
    Payment(String),
}

impl ApiError {
    /// Maps an HTTP-style status code to the taxonomy.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            400..=499 => ApiError::Rejected { status, message },
            _ => ApiError::Server { status },
        }
    }

    /// Only transport failures and 5xx responses are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Server { .. })
    }
}

#[derive(Error, Debug)]
pub enum CartError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Remote call failed: {0}")]
    Api(#[from] ApiError),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl CartError {
    /// True when the failure came from an expired or invalid credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CartError::Api(ApiError::Unauthorized))
    }

    /// The message the presentation layer shows for this failure.
    pub fn user_message(&self) -> String {
        match self {
            CartError::Api(ApiError::Unauthorized) => {
                "Your session has expired, please log in again".to_string()
            }
            CartError::Api(ApiError::Rejected {
                message: Some(message),
                ..
            }) if !message.trim().is_empty() => message.clone(),
            CartError::Api(ApiError::Payment(message)) => message.clone(),
            CartError::ValidationError(message) => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}
