use async_trait::async_trait;
use log::debug;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solana_client::rpc_response::Response;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;

use crate::dex::provider::SwapProvider;
use crate::dex::types::{DexProtocol, ProviderPayload, Quote, SubmissionResult, UnsignedTransaction, NATIVE_MINT};
use crate::execution::validation::validate_quote_request;
use crate::execution::{ExecutionError, HttpClient, ResilientClient, TransactionSubmitter};

pub const RAYDIUM_API_URL: &str = "https://transaction-v1.raydium.io";
pub const RAYDIUM_FEE_API_URL: &str = "https://api-v3.raydium.io";

const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
const TX_VERSION: &str = "V0";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RaydiumComputeData {
    input_mint: String,
    input_amount: String,
    output_mint: String,
    output_amount: String,
    #[serde(default)]
    price_impact_pct: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RaydiumComputeResponse {
    data: RaydiumComputeData,
}

#[derive(Debug, Deserialize)]
struct RaydiumFeeLevels {
    h: u64,
}

#[derive(Debug, Deserialize)]
struct RaydiumFeeData {
    default: RaydiumFeeLevels,
}

#[derive(Debug, Deserialize)]
struct RaydiumFeeResponse {
    data: RaydiumFeeData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RaydiumSwapRequest<'a> {
    compute_unit_price_micro_lamports: String,
    swap_response: &'a Value,
    tx_version: &'a str,
    wallet: String,
    wrap_sol: bool,
    unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_account: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RaydiumTransactionData {
    transaction: String,
}

#[derive(Debug, Deserialize)]
struct RaydiumSwapResponse {
    data: Vec<RaydiumTransactionData>,
}

#[derive(Debug, Deserialize)]
struct MintAccount {
    owner: String,
}

/// Provider B: the Raydium trade API.
pub struct RaydiumProtocol {
    http: HttpClient,
    fee_http: HttpClient,
    submitter: Arc<TransactionSubmitter>,
}

impl RaydiumProtocol {
    pub fn new(
        base_url: &str,
        fee_url: &str,
        retry: ResilientClient,
        submitter: Arc<TransactionSubmitter>,
    ) -> Self {
        Self {
            http: HttpClient::new(base_url, retry.clone()),
            fee_http: HttpClient::new(fee_url, retry),
            submitter,
        }
    }

    async fn priority_fee(&self) -> Result<u64, ExecutionError> {
        let response: RaydiumFeeResponse = self.fee_http.get_json("raydium.priorityFee", "/main/auto-fee", &[]).await?;
        Ok(response.data.default.h)
    }

    /// Associated token account of the signer for `mint`, or `None` for native
    /// SOL which the API wraps itself.
    async fn token_account(&self, mint: &str) -> Result<Option<String>, ExecutionError> {
        if mint == NATIVE_MINT {
            return Ok(None);
        }

        let rpc = self.submitter.rpc();
        let account: Response<Option<MintAccount>> = rpc
            .call(
                "getAccountInfo",
                json!([mint, {"encoding": "base64", "commitment": rpc.commitment().commitment}]),
            )
            .await?;
        let owner = account
            .value
            .ok_or_else(|| ExecutionError::ApiError(format!("mint account {mint} not found")))?
            .owner;

        let mint = parse_pubkey(mint)?;
        let token_program = parse_pubkey(&owner)?;
        let wallet = self.submitter.signer_pubkey();
        let (address, _) = Pubkey::find_program_address(
            &[wallet.as_ref(), token_program.as_ref(), mint.as_ref()],
            &ASSOCIATED_TOKEN_PROGRAM_ID,
        );
        Ok(Some(address.to_string()))
    }
}

fn parse_pubkey(value: &str) -> Result<Pubkey, ExecutionError> {
    Pubkey::from_str(value).map_err(|_| ExecutionError::MalformedResponse(format!("invalid address: {value}")))
}

fn parse_amount(field: &str, value: &str) -> Result<u64, ExecutionError> {
    value
        .parse()
        .map_err(|_| ExecutionError::MalformedResponse(format!("raydium {field} is not an integer: {value}")))
}

fn quote_from_body(body: Value) -> Result<Quote, ExecutionError> {
    let response: RaydiumComputeResponse = serde_json::from_value(body.clone())?;
    let data = response.data;

    Ok(Quote {
        input_amount: parse_amount("inputAmount", &data.input_amount)?,
        output_amount: parse_amount("outputAmount", &data.output_amount)?,
        input_mint: data.input_mint,
        output_mint: data.output_mint,
        price_impact: data.price_impact_pct.and_then(Decimal::from_f64).unwrap_or_default(),
        provider: DexProtocol::Raydium,
        provider_payload: Some(ProviderPayload::new(DexProtocol::Raydium, body)),
    })
}

#[async_trait]
impl SwapProvider for RaydiumProtocol {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::Raydium
    }

    async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ExecutionError> {
        validate_quote_request(input_mint, output_mint, amount, slippage_bps)?;

        let query = [
            ("inputMint", input_mint.to_string()),
            ("outputMint", output_mint.to_string()),
            ("amount", amount.to_string()),
            ("slippageBps", slippage_bps.to_string()),
            ("txVersion", TX_VERSION.to_string()),
        ];
        let quote = self
            .http
            .get_parsed("raydium.getQuote", "/compute/swap-base-in", &query, quote_from_body)
            .await?;
        debug!(
            "raydium quote {} -> {}: {} for {}",
            quote.input_mint, quote.output_mint, quote.output_amount, quote.input_amount
        );
        Ok(quote)
    }

    async fn create_transaction(&self, quote: &Quote) -> Result<UnsignedTransaction, ExecutionError> {
        let swap_response = quote.payload_for(DexProtocol::Raydium)?;

        let compute_unit_price = self.priority_fee().await?;
        let input_account = self.token_account(&quote.input_mint).await?;
        let output_account = self.token_account(&quote.output_mint).await?;

        let request = RaydiumSwapRequest {
            compute_unit_price_micro_lamports: compute_unit_price.to_string(),
            swap_response,
            tx_version: TX_VERSION,
            wallet: self.submitter.signer_pubkey().to_string(),
            wrap_sol: quote.input_mint == NATIVE_MINT,
            unwrap_sol: quote.output_mint == NATIVE_MINT,
            input_account,
            output_account,
        };
        let response: RaydiumSwapResponse = self
            .http
            .post_json("raydium.createTransaction", "/transaction/swap-base-in", &request)
            .await?;

        match response.data.as_slice() {
            [single] => UnsignedTransaction::from_base64(DexProtocol::Raydium, &single.transaction),
            [] => Err(ExecutionError::ApiError("raydium returned no transaction".to_string())),
            many => Err(ExecutionError::ApiError(format!(
                "raydium returned {} transactions; multi-step swaps are not supported",
                many.len()
            ))),
        }
    }

    async fn submit(&self, transaction: UnsignedTransaction) -> SubmissionResult {
        self.submitter.submit(transaction).await
    }
}
