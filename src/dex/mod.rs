pub mod protocols;
pub mod provider;
pub mod types;

pub use protocols::{
    JupiterProtocol,
    RaydiumProtocol,
    JUPITER_API_URL,
    RAYDIUM_API_URL,
    RAYDIUM_FEE_API_URL,
};

#[cfg(test)]
pub use provider::MockSwapProvider;
pub use provider::SwapProvider;
pub use types::{
    DexProtocol,
    ProviderPayload,
    Quote,
    SubmissionResult,
    UnsignedTransaction,
    NATIVE_MINT,
};
