use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::{read_keypair_file, Keypair},
};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::dex::{DexProtocol, JUPITER_API_URL, RAYDIUM_API_URL, RAYDIUM_FEE_API_URL};
use crate::execution::{ResilientClient, RetryConfig, RpcClient, DEFAULT_FEE_RESERVE_LAMPORTS};

const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("failed to read keypair from {path}: {message}")]
    Keypair { path: String, message: String },
}

#[derive(Debug, Clone)]
pub struct SolanaConfig {
    pub rpc_url: String,
    pub rest_url: Option<String>,
    pub api_key: Option<String>,
    pub commitment: CommitmentConfig,
    pub keypair: Arc<Keypair>,
    pub retry: RetryConfig,
    pub confirm_timeout: Duration,
    pub primary: DexProtocol,
    pub jupiter_url: String,
    pub raydium_url: String,
    pub raydium_fee_url: String,
    pub fee_reserve_lamports: u64,
}

impl SolanaConfig {
    // Default mainnet configuration
    pub fn mainnet_default(keypair: Keypair) -> Self {
        Self::custom(MAINNET_RPC_URL.to_string(), CommitmentConfig::confirmed(), keypair)
    }

    pub fn custom(rpc_url: String, commitment: CommitmentConfig, keypair: Keypair) -> Self {
        Self {
            rpc_url,
            rest_url: None,
            api_key: None,
            commitment,
            keypair: Arc::new(keypair),
            retry: RetryConfig::default(),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            primary: DexProtocol::Jupiter,
            jupiter_url: JUPITER_API_URL.to_string(),
            raydium_url: RAYDIUM_API_URL.to_string(),
            raydium_fee_url: RAYDIUM_FEE_API_URL.to_string(),
            fee_reserve_lamports: DEFAULT_FEE_RESERVE_LAMPORTS,
        }
    }

    /// Reads `SOLANA_*`, `SWAP_*` and the provider URL variables. Only
    /// `SOLANA_KEYPAIR_PATH` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var("SOLANA_KEYPAIR_PATH").map_err(|_| ConfigError::Missing("SOLANA_KEYPAIR_PATH"))?;
        let keypair = read_keypair_file(&path).map_err(|e| ConfigError::Keypair {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let rpc_url = optional("SOLANA_RPC_URL").unwrap_or_else(|| MAINNET_RPC_URL.to_string());
        let commitment = match optional("SOLANA_COMMITMENT") {
            Some(value) => CommitmentConfig::from_str(&value).map_err(|_| ConfigError::Invalid {
                name: "SOLANA_COMMITMENT",
                value,
            })?,
            None => CommitmentConfig::confirmed(),
        };

        let mut config = Self::custom(rpc_url, commitment, keypair);
        config.rest_url = optional("SOLANA_REST_URL");
        config.api_key = optional("SOLANA_API_KEY");

        if let Some(primary) = parsed::<DexProtocol>("SWAP_PRIMARY_PROVIDER")? {
            config.primary = primary;
        }
        if let Some(max_attempts) = parsed::<u32>("SWAP_MAX_ATTEMPTS")? {
            if max_attempts == 0 {
                return Err(ConfigError::Invalid {
                    name: "SWAP_MAX_ATTEMPTS",
                    value: "0".to_string(),
                });
            }
            config.retry = config.retry.with_max_attempts(max_attempts);
        }
        if let Some(timeout_ms) = parsed::<u64>("SWAP_TIMEOUT_MS")? {
            config.retry = config.retry.with_attempt_timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(base_delay_ms) = parsed::<u64>("SWAP_BASE_DELAY_MS")? {
            config.retry = config.retry.with_base_delay(Duration::from_millis(base_delay_ms));
        }

        if let Some(url) = optional("JUPITER_API_URL") {
            config.jupiter_url = url;
        }
        if let Some(url) = optional("RAYDIUM_API_URL") {
            config.raydium_url = url;
        }
        if let Some(url) = optional("RAYDIUM_FEE_URL") {
            config.raydium_fee_url = url;
        }

        Ok(config)
    }

    // Create RPC client
    pub fn create_rpc_client(&self, retry: ResilientClient) -> RpcClient {
        let client = RpcClient::new(self.rpc_url.clone(), retry, self.commitment);
        match &self.rest_url {
            Some(rest_url) => client.with_rest(rest_url.clone(), self.api_key.clone()),
            None => client,
        }
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    optional(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}
