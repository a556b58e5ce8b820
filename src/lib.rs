pub mod dex;
pub mod execution;
mod solana_config;

pub use solana_config::{ConfigError, SolanaConfig};

// Re-export key types
pub use dex::{
    DexProtocol,
    JupiterProtocol,
    Quote,
    RaydiumProtocol,
    SwapProvider,
    UnsignedTransaction,
};

pub use execution::{
    ExecutionError,
    FallbackOrchestrator,
    SwapAmount,
    SwapExecutor,
    SwapOutcome,
    SwapRequest,
    ValidationError,
};
