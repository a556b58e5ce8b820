use futures::future::join_all;
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};
use solana_client::rpc_response::Response;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use std::sync::Arc;

use super::error::{ExecutionError, ValidationError};
use super::fallback::FallbackOrchestrator;
use super::retry::{RequestClock, ResilientClient};
use super::rpc::RpcClient;
use super::submitter::TransactionSubmitter;
use super::types::{SwapAmount, SwapOutcome, SwapRequest};
use super::validation::{single_destination, ui_to_units, validate_amount, validate_pair, validate_slippage, validate_ui_amount};
use crate::dex::{DexProtocol, JupiterProtocol, RaydiumProtocol, SwapProvider, NATIVE_MINT};
use crate::SolanaConfig;

const NATIVE_DECIMALS: u8 = 9;
const TOKEN_AMOUNT_POINTER: &str = "/account/data/parsed/info/tokenAmount/amount";

/// Lamports kept back when swapping the whole SOL balance.
pub const DEFAULT_FEE_RESERVE_LAMPORTS: u64 = 10_000_000;

#[derive(Debug, Deserialize)]
struct TokenSupply {
    decimals: u8,
}

/// Entry point for swaps. Validates the request, resolves the amount and
/// hands the rest to the fallback orchestrator.
pub struct SwapExecutor {
    orchestrator: FallbackOrchestrator,
    rpc: RpcClient,
    owner: Pubkey,
    fee_reserve_lamports: u64,
}

impl SwapExecutor {
    pub fn new(orchestrator: FallbackOrchestrator, rpc: RpcClient, owner: Pubkey) -> Self {
        Self {
            orchestrator,
            rpc,
            owner,
            fee_reserve_lamports: DEFAULT_FEE_RESERVE_LAMPORTS,
        }
    }

    pub fn with_fee_reserve(mut self, lamports: u64) -> Self {
        self.fee_reserve_lamports = lamports;
        self
    }

    /// Wires both providers, the submitter and the data provider from one
    /// config. All of them share a single request clock.
    pub fn from_config(config: &SolanaConfig) -> Self {
        let clock = Arc::new(RequestClock::new());
        let retry = ResilientClient::with_clock(config.retry.clone(), clock);
        let rpc = config.create_rpc_client(retry.clone());

        let confirm = config.retry.clone().with_attempt_timeout(config.confirm_timeout);
        let submitter = Arc::new(TransactionSubmitter::new(rpc.clone(), config.keypair.clone(), confirm));

        let jupiter: Arc<dyn SwapProvider> =
            Arc::new(JupiterProtocol::new(&config.jupiter_url, retry.clone(), submitter.clone()));
        let raydium: Arc<dyn SwapProvider> = Arc::new(RaydiumProtocol::new(
            &config.raydium_url,
            &config.raydium_fee_url,
            retry,
            submitter,
        ));

        let orchestrator = match config.primary {
            DexProtocol::Jupiter => FallbackOrchestrator::new(jupiter, raydium),
            DexProtocol::Raydium => FallbackOrchestrator::new(raydium, jupiter),
        };

        Self::new(orchestrator, rpc, config.keypair.pubkey()).with_fee_reserve(config.fee_reserve_lamports)
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        &self.orchestrator
    }

    pub async fn swap(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: SwapAmount,
        slippage_bps: u16,
    ) -> Result<SwapOutcome, ValidationError> {
        self.execute(SwapRequest::new(input_mint, output_mint, amount, slippage_bps))
            .await
    }

    /// Invalid requests come back as `Err`. Everything that goes wrong on the
    /// network is reported inside the outcome.
    pub async fn execute(&self, request: SwapRequest) -> Result<SwapOutcome, ValidationError> {
        let output_mint = single_destination(&request.output_mints)?;
        validate_pair(&request.input_mint, output_mint)?;
        validate_slippage(request.slippage_bps)?;
        match &request.amount {
            SwapAmount::Units(units) => validate_amount(*units)?,
            SwapAmount::Ui(amount) => validate_ui_amount(*amount)?,
            SwapAmount::All => {}
        }

        let request_id = self.rpc.retry().next_request_id();
        info!(
            "[{}] swap {} -> {} ({:?}, {} bps)",
            request_id, request.input_mint, output_mint, request.amount, request.slippage_bps
        );

        let amount = match self.resolve_amount(&request.input_mint, &request.amount).await {
            Ok(0) => {
                let message = format!("no {} balance available to swap", request.input_mint);
                error!("[{}] {}", request_id, message);
                return Ok(SwapOutcome::failed(message));
            }
            Ok(amount) => amount,
            Err(ExecutionError::Validation(e)) => return Err(e),
            Err(e) => {
                error!("[{}] failed to resolve swap amount: {}", request_id, e);
                return Ok(SwapOutcome::failed(format!("failed to resolve swap amount: {e}")));
            }
        };

        let outcome = self
            .orchestrator
            .execute(&request.input_mint, output_mint, amount, request.slippage_bps)
            .await;

        match (&outcome.signature, &outcome.provider_used) {
            (Some(signature), Some(provider)) if outcome.success => {
                info!("[{}] swap confirmed via {}: {}", request_id, provider, signature);
            }
            _ => error!(
                "[{}] swap failed: {}",
                request_id,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        }
        Ok(outcome)
    }

    /// Independent swaps run concurrently; each gets its own result.
    pub async fn swap_batch(&self, requests: Vec<SwapRequest>) -> Vec<Result<SwapOutcome, ValidationError>> {
        join_all(requests.into_iter().map(|request| self.execute(request))).await
    }

    /// Smallest-unit amount to swap for `mint`.
    pub async fn resolve_amount(&self, mint: &str, amount: &SwapAmount) -> Result<u64, ExecutionError> {
        match amount {
            SwapAmount::Units(units) => Ok(*units),
            SwapAmount::Ui(ui) => {
                let decimals = self.decimals(mint).await?;
                Ok(ui_to_units(*ui, decimals)?)
            }
            SwapAmount::All if mint == NATIVE_MINT => {
                let balance: Response<u64> = self
                    .rpc
                    .call("getBalance", json!([self.owner.to_string(), self.commitment_param()]))
                    .await?;
                Ok(balance.value.saturating_sub(self.fee_reserve_lamports))
            }
            SwapAmount::All => self.token_balance(mint).await,
        }
    }

    async fn decimals(&self, mint: &str) -> Result<u8, ExecutionError> {
        if mint == NATIVE_MINT {
            return Ok(NATIVE_DECIMALS);
        }
        let supply: Response<TokenSupply> = self
            .rpc
            .call("getTokenSupply", json!([mint, self.commitment_param()]))
            .await?;
        Ok(supply.value.decimals)
    }

    async fn token_balance(&self, mint: &str) -> Result<u64, ExecutionError> {
        let accounts: Response<Vec<Value>> = self
            .rpc
            .call(
                "getTokenAccountsByOwner",
                json!([
                    self.owner.to_string(),
                    {"mint": mint},
                    {"encoding": "jsonParsed", "commitment": self.rpc.commitment().commitment}
                ]),
            )
            .await?;

        accounts.value.iter().try_fold(0u64, |total, account| -> Result<u64, ExecutionError> {
            let amount = account
                .pointer(TOKEN_AMOUNT_POINTER)
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse::<u64>().ok())
                .ok_or_else(|| ExecutionError::MalformedResponse(format!("token account without amount: {account}")))?;
            Ok(total.saturating_add(amount))
        })
    }

    fn commitment_param(&self) -> Value {
        json!({"commitment": self.rpc.commitment().commitment})
    }
}
