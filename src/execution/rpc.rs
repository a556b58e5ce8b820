use log::debug;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Map, Value};
use solana_sdk::commitment_config::CommitmentConfig;

use super::clients::{truncate, HttpClient};
use super::error::{ExecutionError, ValidationError};
use super::retry::{ResilientClient, RetryConfig};

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Network data provider: JSON-RPC 2.0 calls plus the paginated REST history
/// endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    rpc_url: String,
    http_client: reqwest::Client,
    retry: ResilientClient,
    commitment: CommitmentConfig,
    rest: Option<HttpClient>,
    api_key: Option<String>,
}

impl RpcClient {
    pub fn new(rpc_url: impl Into<String>, retry: ResilientClient, commitment: CommitmentConfig) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            http_client: reqwest::Client::new(),
            retry,
            commitment,
            rest: None,
            api_key: None,
        }
    }

    pub fn with_rest(mut self, rest_url: impl Into<String>, api_key: Option<String>) -> Self {
        self.rest = Some(HttpClient::new(rest_url, self.retry.clone()));
        self.api_key = api_key;
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn retry(&self) -> &ResilientClient {
        &self.retry
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ExecutionError> {
        self.call_with(method, params, self.retry.config()).await
    }

    pub async fn call_with<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        config: &RetryConfig,
    ) -> Result<T, ExecutionError> {
        let id = self.retry.next_request_id();
        let params = &params;

        self.retry
            .execute_as(id, method, config, move || self.send(id, method, params))
            .await
    }

    /// One attempt, no retry and no timeout race. For use inside an operation
    /// that is already wrapped by a [`ResilientClient`].
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ExecutionError> {
        let id = self.retry.next_request_id();
        self.send(id, method, &params).await
    }

    async fn send<T: DeserializeOwned>(&self, id: u64, method: &str, params: &Value) -> Result<T, ExecutionError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self.http_client.post(&self.rpc_url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let mut envelope: Map<String, Value> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ExecutionError::HttpStatus {
                    status: status.as_u16(),
                    body: truncate(&text),
                });
            }
            Err(e) => return Err(ExecutionError::MalformedResponse(format!("{method}: {e}"))),
        };

        // an error object is terminal whatever the HTTP status says
        if let Some(error) = envelope.remove("error").filter(|error| !error.is_null()) {
            let error = serde_json::from_value::<RpcErrorObject>(error.clone()).unwrap_or(RpcErrorObject {
                code: 0,
                message: error.to_string(),
            });
            return Err(ExecutionError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        if !status.is_success() {
            return Err(ExecutionError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        match envelope.remove("result") {
            Some(result) => serde_json::from_value(result)
                .map_err(|e| ExecutionError::MalformedResponse(format!("{method}: {e}"))),
            None => Err(ExecutionError::MalformedResponse(format!("{method}: missing result"))),
        }
    }

    /// Walks the address history newest-first. A page shorter than `limit`
    /// (or empty) ends the walk; `max_pages` caps it.
    pub async fn fetch_history(
        &self,
        address: &str,
        limit: usize,
        max_pages: Option<usize>,
    ) -> Result<Vec<Value>, ExecutionError> {
        if limit == 0 {
            return Err(ValidationError::Amount("history page limit must be greater than zero".to_string()).into());
        }
        let rest = self
            .rest
            .as_ref()
            .ok_or_else(|| ExecutionError::ApiError("no REST endpoint configured".to_string()))?;
        let path = format!("/v0/addresses/{address}/transactions");

        let mut history = Vec::new();
        let mut before: Option<String> = None;
        let mut pages = 0;

        loop {
            let mut query = vec![("limit", limit.to_string())];
            if let Some(api_key) = &self.api_key {
                query.push(("api-key", api_key.clone()));
            }
            if let Some(cursor) = &before {
                query.push(("before", cursor.clone()));
            }

            let page: Vec<Value> = rest.get_json("fetchHistory", &path, &query).await?;
            pages += 1;

            let page_len = page.len();
            let cursor = page
                .last()
                .and_then(|item| item.get("signature"))
                .and_then(Value::as_str)
                .map(str::to_string);
            history.extend(page);

            debug!("fetched history page {} for {} ({} items)", pages, address, page_len);

            if page_len < limit || max_pages.is_some_and(|max| pages >= max) {
                break;
            }
            match cursor {
                Some(cursor) => before = Some(cursor),
                None => break,
            }
        }

        Ok(history)
    }
}
