use async_trait::async_trait;

use super::types::{DexProtocol, Quote, SubmissionResult, UnsignedTransaction};
use crate::execution::ExecutionError;

/// The capability set every swap integration exposes. Each operation carries
/// its own retry budget; a failure in one does not retry the others.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwapProvider: Send + Sync {
    fn protocol(&self) -> DexProtocol;

    /// Prices `amount` (smallest units of `input_mint`). Input is validated
    /// before any request goes out.
    async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ExecutionError>;

    /// Builds the unsigned swap transaction. Quotes produced by another
    /// provider are rejected without a network call.
    async fn create_transaction(&self, quote: &Quote) -> Result<UnsignedTransaction, ExecutionError>;

    /// Signs, sends and waits for confirmation.
    async fn submit(&self, transaction: UnsignedTransaction) -> SubmissionResult;
}
