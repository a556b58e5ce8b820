use async_trait::async_trait;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use crate::dex::provider::SwapProvider;
use crate::dex::types::{DexProtocol, ProviderPayload, Quote, SubmissionResult, UnsignedTransaction};
use crate::execution::validation::validate_quote_request;
use crate::execution::{ExecutionError, HttpClient, ResilientClient, TransactionSubmitter};

pub const JUPITER_API_URL: &str = "https://lite-api.jup.ag/swap/v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterQuoteResponse {
    input_mint: String,
    in_amount: String,
    output_mint: String,
    out_amount: String,
    #[serde(default)]
    price_impact_pct: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JupiterSwapRequest<'a> {
    quote_response: &'a Value,
    user_public_key: String,
    wrap_and_unwrap_sol: bool,
    dynamic_compute_unit_limit: bool,
    prioritization_fee_lamports: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterSwapResponse {
    swap_transaction: String,
    #[serde(default)]
    last_valid_block_height: Option<u64>,
}

/// Provider A: the Jupiter swap aggregator.
pub struct JupiterProtocol {
    http: HttpClient,
    submitter: Arc<TransactionSubmitter>,
}

impl JupiterProtocol {
    pub fn new(base_url: &str, retry: ResilientClient, submitter: Arc<TransactionSubmitter>) -> Self {
        Self {
            http: HttpClient::new(base_url, retry),
            submitter,
        }
    }
}

fn parse_amount(field: &str, value: &str) -> Result<u64, ExecutionError> {
    value
        .parse()
        .map_err(|_| ExecutionError::MalformedResponse(format!("jupiter {field} is not an integer: {value}")))
}

fn parse_percent(value: &str) -> Result<Decimal, ExecutionError> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| ExecutionError::MalformedResponse(format!("jupiter priceImpactPct {value}: {e}")))
}

fn quote_from_body(body: Value) -> Result<Quote, ExecutionError> {
    let response: JupiterQuoteResponse = serde_json::from_value(body.clone())?;

    let price_impact = response
        .price_impact_pct
        .as_deref()
        .map(parse_percent)
        .transpose()?
        .unwrap_or_default();

    Ok(Quote {
        input_mint: response.input_mint,
        output_mint: response.output_mint,
        input_amount: parse_amount("inAmount", &response.in_amount)?,
        output_amount: parse_amount("outAmount", &response.out_amount)?,
        price_impact,
        provider: DexProtocol::Jupiter,
        provider_payload: Some(ProviderPayload::new(DexProtocol::Jupiter, body)),
    })
}

#[async_trait]
impl SwapProvider for JupiterProtocol {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::Jupiter
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
        ];
        let quote = self
            .http
            .get_parsed("jupiter.getQuote", "/quote", &query, quote_from_body)
            .await?;
        debug!(
            "jupiter quote {} -> {}: {} for {}",
            quote.input_mint, quote.output_mint, quote.output_amount, quote.input_amount
        );
        Ok(quote)
    }

    async fn create_transaction(&self, quote: &Quote) -> Result<UnsignedTransaction, ExecutionError> {
        let quote_response = quote.payload_for(DexProtocol::Jupiter)?;

        let request = JupiterSwapRequest {
            quote_response,
            user_public_key: self.submitter.signer_pubkey().to_string(),
            wrap_and_unwrap_sol: true,
            dynamic_compute_unit_limit: true,
            prioritization_fee_lamports: "auto",
        };
        let response: JupiterSwapResponse = self
            .http
            .post_json("jupiter.createTransaction", "/swap", &request)
            .await?;

        let transaction = UnsignedTransaction::from_base64(DexProtocol::Jupiter, &response.swap_transaction)?;
        Ok(match response.last_valid_block_height {
            Some(height) => {
                debug!("jupiter transaction valid until block height {}", height);
                transaction.with_last_valid_block_height(height)
            }
            None => transaction,
        })
    }

    async fn submit(&self, transaction: UnsignedTransaction) -> SubmissionResult {
        self.submitter.submit(transaction).await
    }
}
