use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::types::SwapOutcome;
use crate::dex::{DexProtocol, SwapProvider};

/// Returned when the primary and the secondary provider both fail. Stable
/// regardless of the underlying errors.
pub const BOTH_PROVIDERS_FAILED: &str = "both providers failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStage {
    Quoting,
    Building,
    Submitting,
}

impl fmt::Display for SwapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapStage::Quoting => write!(f, "quoting"),
            SwapStage::Building => write!(f, "building"),
            SwapStage::Submitting => write!(f, "submitting"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} failed at {stage}: {message}")]
pub struct StageFailure {
    pub provider: DexProtocol,
    pub stage: SwapStage,
    pub message: String,
}

impl StageFailure {
    fn new(provider: DexProtocol, stage: SwapStage, message: impl ToString) -> Self {
        Self {
            provider,
            stage,
            message: message.to_string(),
        }
    }
}

/// Runs quote, build and submit against the primary provider and, on the
/// first failure, the whole sequence again against the secondary.
pub struct FallbackOrchestrator {
    primary: Arc<dyn SwapProvider>,
    secondary: Option<Arc<dyn SwapProvider>>,
}

impl FallbackOrchestrator {
    pub fn new(primary: Arc<dyn SwapProvider>, secondary: Arc<dyn SwapProvider>) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }

    pub fn single(primary: Arc<dyn SwapProvider>) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub fn primary(&self) -> DexProtocol {
        self.primary.protocol()
    }

    pub fn secondary(&self) -> Option<DexProtocol> {
        self.secondary.as_ref().map(|provider| provider.protocol())
    }

    /// Never fails: every network-stage error ends up in the outcome.
    pub async fn execute(&self, input_mint: &str, output_mint: &str, amount: u64, slippage_bps: u16) -> SwapOutcome {
        let primary_failure =
            match Self::run_provider(self.primary.as_ref(), input_mint, output_mint, amount, slippage_bps).await {
                Ok(outcome) => return outcome,
                Err(failure) => failure,
            };

        let Some(secondary) = &self.secondary else {
            error!("{}", primary_failure);
            return SwapOutcome::failed(primary_failure.to_string());
        };

        warn!("{}; falling back to {}", primary_failure, secondary.protocol());

        match Self::run_provider(secondary.as_ref(), input_mint, output_mint, amount, slippage_bps).await {
            Ok(outcome) => outcome,
            Err(secondary_failure) => {
                error!("{}", secondary_failure);
                SwapOutcome::failed(BOTH_PROVIDERS_FAILED)
            }
        }
    }

    async fn run_provider(
        provider: &dyn SwapProvider,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<SwapOutcome, StageFailure> {
        let protocol = provider.protocol();

        let quote = provider
            .get_quote(input_mint, output_mint, amount, slippage_bps)
            .await
            .map_err(|e| StageFailure::new(protocol, SwapStage::Quoting, e))?;

        let transaction = provider
            .create_transaction(&quote)
            .await
            .map_err(|e| StageFailure::new(protocol, SwapStage::Building, e))?;

        let result = provider.submit(transaction).await;
        if !result.success {
            let message = result.error.unwrap_or_else(|| "submission failed".to_string());
            return Err(StageFailure::new(protocol, SwapStage::Submitting, message));
        }
        let signature = result.signature.ok_or_else(|| {
            StageFailure::new(protocol, SwapStage::Submitting, "submission succeeded without a signature")
        })?;

        info!("{} swapped {} {} -> {} ({})", protocol, amount, input_mint, output_mint, signature);
        Ok(SwapOutcome::succeeded(signature, &quote))
    }
}
