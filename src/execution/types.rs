use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;

use crate::dex::{DexProtocol, Quote};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapAmount {
    /// Smallest units of the input mint.
    Units(u64),
    /// Human amount, scaled by the mint decimals.
    Ui(Decimal),
    /// Whole balance of the input mint (minus the fee reserve for SOL).
    All,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub input_mint: String,
    pub output_mints: Vec<String>,
    pub amount: SwapAmount,
    pub slippage_bps: u16,
}

impl SwapRequest {
    pub fn new(input_mint: impl Into<String>, output_mint: impl Into<String>, amount: SwapAmount, slippage_bps: u16) -> Self {
        Self {
            input_mint: input_mint.into(),
            output_mints: vec![output_mint.into()],
            amount,
            slippage_bps,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub success: bool,
    pub signature: Option<String>,
    pub provider_used: Option<DexProtocol>,
    pub error: Option<String>,
    pub input_amount: Option<u64>,
    pub expected_output: Option<u64>,
    pub completed_at: DateTime<Utc>,
}

impl SwapOutcome {
    pub fn succeeded(signature: String, quote: &Quote) -> Self {
        Self {
            success: true,
            signature: Some(signature),
            provider_used: Some(quote.provider),
            error: None,
            input_amount: Some(quote.input_amount),
            expected_output: Some(quote.output_amount),
            completed_at: Utc::now(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            signature: None,
            provider_used: None,
            error: Some(error.into()),
            input_amount: None,
            expected_output: None,
            completed_at: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationHandle {
    pub signature: Signature,
    pub last_valid_block_height: u64,
}
