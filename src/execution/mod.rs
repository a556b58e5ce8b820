mod clients;
mod error;
mod executor;
mod fallback;
mod retry;
mod rpc;
mod submitter;
mod types;
pub mod validation;

pub use clients::HttpClient;
pub use error::{ExecutionError, ExecutionErrorType, ValidationError};
pub use executor::{SwapExecutor, DEFAULT_FEE_RESERVE_LAMPORTS};
pub use fallback::{FallbackOrchestrator, StageFailure, SwapStage, BOTH_PROVIDERS_FAILED};
pub use retry::{
    calculate_backoff, log_operation, race, OperationEvent, RequestClock, ResilientClient, RetryConfig,
    RetryContext,
};
pub use rpc::RpcClient;
pub use submitter::TransactionSubmitter;
pub use types::{ConfirmationHandle, SwapAmount, SwapOutcome, SwapRequest};
