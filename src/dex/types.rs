use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_sdk::signature::Signature;
use solana_sdk::signer::signers::Signers;
use solana_sdk::transaction::VersionedTransaction;
use std::fmt;
use std::str::FromStr;

use crate::execution::ExecutionError;

/// Wrapped SOL. Providers wrap and unwrap it around the swap.
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DexProtocol {
    Jupiter,
    Raydium,
}

impl fmt::Display for DexProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DexProtocol::Jupiter => write!(f, "jupiter"),
            DexProtocol::Raydium => write!(f, "raydium"),
        }
    }
}

impl FromStr for DexProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jupiter" => Ok(DexProtocol::Jupiter),
            "raydium" => Ok(DexProtocol::Raydium),
            other => Err(format!("unknown swap provider: {other}")),
        }
    }
}

/// Provider-specific quote body, needed again at build time. Only the provider
/// that produced it can read it back.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPayload {
    provider: DexProtocol,
    body: Value,
}

impl ProviderPayload {
    pub fn new(provider: DexProtocol, body: Value) -> Self {
        Self { provider, body }
    }

    pub fn provider(&self) -> DexProtocol {
        self.provider
    }

    pub(crate) fn body_for(&self, provider: DexProtocol) -> Option<&Value> {
        (self.provider == provider).then_some(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub input_mint: String,
    pub output_mint: String,
    /// Smallest units of the input mint.
    pub input_amount: u64,
    /// Smallest units of the output mint.
    pub output_amount: u64,
    /// Percent.
    pub price_impact: Decimal,
    pub provider: DexProtocol,
    pub provider_payload: Option<ProviderPayload>,
}

impl Quote {
    /// The payload this quote carries for `provider`, or a terminal error when
    /// it is missing or was produced by another provider.
    pub(crate) fn payload_for(&self, provider: DexProtocol) -> Result<&Value, ExecutionError> {
        let payload = self.provider_payload.as_ref().ok_or_else(|| {
            crate::execution::ValidationError::Quote("missing provider payload".to_string())
        })?;

        payload.body_for(provider).ok_or_else(|| {
            crate::execution::ValidationError::Quote(format!(
                "quote from {} cannot be built by {}",
                payload.provider(),
                provider
            ))
            .into()
        })
    }
}

/// A provider-built transaction waiting for the signer.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    provider: DexProtocol,
    inner: VersionedTransaction,
    last_valid_block_height: Option<u64>,
}

impl UnsignedTransaction {
    pub fn new(provider: DexProtocol, inner: VersionedTransaction) -> Self {
        Self {
            provider,
            inner,
            last_valid_block_height: None,
        }
    }

    /// Expiry reported by the provider alongside the transaction.
    pub fn with_last_valid_block_height(mut self, height: u64) -> Self {
        self.last_valid_block_height = Some(height);
        self
    }

    pub fn last_valid_block_height(&self) -> Option<u64> {
        self.last_valid_block_height
    }

    pub fn from_base64(provider: DexProtocol, encoded: &str) -> Result<Self, ExecutionError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ExecutionError::TransactionError(format!("invalid base64: {e}")))?;
        let inner: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| ExecutionError::TransactionError(format!("undecodable transaction: {e}")))?;

        Ok(Self::new(provider, inner))
    }

    pub fn provider(&self) -> DexProtocol {
        self.provider
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ExecutionError> {
        bincode::serialize(&self.inner).map_err(|e| ExecutionError::TransactionError(e.to_string()))
    }

    pub fn to_base64(&self) -> Result<String, ExecutionError> {
        Ok(STANDARD.encode(self.serialize()?))
    }

    /// Re-signs the message in place. The signers must cover every required
    /// signature of the message.
    pub fn sign<S: Signers + ?Sized>(&mut self, signers: &S) -> Result<(), ExecutionError> {
        self.inner = VersionedTransaction::try_new(self.inner.message.clone(), signers)
            .map_err(|e| ExecutionError::SigningError(e.to_string()))?;
        Ok(())
    }

    /// Fee-payer signature; the transaction id once signed.
    pub fn signature(&self) -> Option<Signature> {
        self.inner.signatures.first().copied()
    }

    pub fn as_versioned(&self) -> &VersionedTransaction {
        &self.inner
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionResult {
    pub success: bool,
    pub signature: Option<String>,
    pub error: Option<String>,
}

impl SubmissionResult {
    pub fn confirmed(signature: Signature) -> Self {
        Self {
            success: true,
            signature: Some(signature.to_string()),
            error: None,
        }
    }

    pub fn failed(signature: Option<Signature>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            signature: signature.map(|signature| signature.to_string()),
            error: Some(error.into()),
        }
    }
}
