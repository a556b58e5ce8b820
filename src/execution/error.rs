use std::time::Duration;
use thiserror::Error;

/// Pre-flight input errors. Raised before any network call and never retried.
///
/// Every variant renders with a stable per-field prefix so callers can match on
/// the message without depending on the detail that follows it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid input asset: {0}")]
    InputAsset(String),

    #[error("invalid output asset: {0}")]
    OutputAsset(String),

    #[error("invalid amount: {0}")]
    Amount(String),

    #[error("invalid slippage: {0} bps exceeds 10000")]
    Slippage(u16),

    #[error("invalid destination: {0}")]
    Destination(String),

    #[error("invalid quote: {0}")]
    Quote(String),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Timeout error after {0:?}")]
    TimeoutError(Duration),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Signing failed: {0}")]
    SigningError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Blockhash expired before {0} was confirmed")]
    BlockhashExpired(String),

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<ExecutionError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorType {
    ValidationError,
    TimeoutError,
    NetworkError,
    HttpStatus,
    MalformedResponse,
    RpcError,
    ApiError,
    TransactionError,
    SigningError,
    TransactionFailed,
    BlockhashExpired,
    RetriesExhausted,
}

impl ExecutionErrorType {
    /// Transport-level failures that a later attempt may get past.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ExecutionErrorType::TimeoutError
                | ExecutionErrorType::NetworkError
                | ExecutionErrorType::HttpStatus
                | ExecutionErrorType::MalformedResponse
        )
    }
}

impl ExecutionError {
    pub fn error_type(&self) -> ExecutionErrorType {
        match self {
            ExecutionError::Validation(_) => ExecutionErrorType::ValidationError,
            ExecutionError::TimeoutError(_) => ExecutionErrorType::TimeoutError,
            ExecutionError::NetworkError(_) => ExecutionErrorType::NetworkError,
            ExecutionError::HttpStatus { .. } => ExecutionErrorType::HttpStatus,
            ExecutionError::MalformedResponse(_) => ExecutionErrorType::MalformedResponse,
            ExecutionError::RpcError { .. } => ExecutionErrorType::RpcError,
            ExecutionError::ApiError(_) => ExecutionErrorType::ApiError,
            ExecutionError::TransactionError(_) => ExecutionErrorType::TransactionError,
            ExecutionError::SigningError(_) => ExecutionErrorType::SigningError,
            ExecutionError::TransactionFailed(_) => ExecutionErrorType::TransactionFailed,
            ExecutionError::BlockhashExpired(_) => ExecutionErrorType::BlockhashExpired,
            ExecutionError::RetriesExhausted { .. } => ExecutionErrorType::RetriesExhausted,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.error_type().is_retryable()
    }

    /// Walks through `RetriesExhausted` wrappers to the error that ended the
    /// last attempt.
    pub fn root_cause(&self) -> &ExecutionError {
        match self {
            ExecutionError::RetriesExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for ExecutionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ExecutionError::MalformedResponse(error.to_string())
        } else {
            ExecutionError::NetworkError(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ExecutionError {
    fn from(error: serde_json::Error) -> Self {
        ExecutionError::MalformedResponse(error.to_string())
    }
}
