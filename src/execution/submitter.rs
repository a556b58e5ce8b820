use log::{info, warn};
use serde_json::json;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_response::{Response, RpcBlockhash};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_transaction_status::{TransactionStatus, UiTransactionEncoding};
use std::sync::Arc;
use tokio::time::{self, Duration};

use super::error::ExecutionError;
use super::retry::RetryConfig;
use super::rpc::RpcClient;
use super::types::ConfirmationHandle;
use crate::dex::{SubmissionResult, UnsignedTransaction};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Signs, sends and confirms provider-built transactions. Shared by every
/// provider variant.
#[derive(Debug)]
pub struct TransactionSubmitter {
    rpc: RpcClient,
    signer: Arc<Keypair>,
    confirm: RetryConfig,
    poll_interval: Duration,
}

impl TransactionSubmitter {
    pub fn new(rpc: RpcClient, signer: Arc<Keypair>, confirm: RetryConfig) -> Self {
        Self {
            rpc,
            signer,
            confirm,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn signer_pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn submit(&self, mut transaction: UnsignedTransaction) -> SubmissionResult {
        let signers: &[&Keypair] = &[self.signer.as_ref()];
        if let Err(e) = transaction.sign(signers) {
            return SubmissionResult::failed(None, e.to_string());
        }
        let Some(signature) = transaction.signature() else {
            return SubmissionResult::failed(None, "signed transaction has no signature");
        };

        match self.send_and_confirm(&transaction, signature).await {
            Ok(()) => {
                info!("{} transaction {} confirmed", transaction.provider(), signature);
                SubmissionResult::confirmed(signature)
            }
            Err(e) => SubmissionResult::failed(Some(signature), e.to_string()),
        }
    }

    async fn send_and_confirm(
        &self,
        transaction: &UnsignedTransaction,
        signature: Signature,
    ) -> Result<(), ExecutionError> {
        self.send(transaction, signature).await?;
        let handle = self
            .confirmation_handle(signature, transaction.last_valid_block_height())
            .await?;
        self.confirm(&handle).await
    }

    async fn send(&self, transaction: &UnsignedTransaction, signature: Signature) -> Result<(), ExecutionError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.rpc.commitment().commitment),
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSendTransactionConfig::default()
        };
        let encoded = transaction.to_base64()?;

        match self
            .rpc
            .call::<String>("sendTransaction", json!([encoded, config]))
            .await
        {
            Ok(reported) if reported != signature.to_string() => {
                warn!("node reported signature {} for {}", reported, signature);
                Ok(())
            }
            Ok(_) => Ok(()),
            // a resend after a lost response lands here
            Err(ExecutionError::RpcError { message, .. }) if message.contains("already been processed") => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Prefers the expiry the provider reported for the transaction; falls
    /// back to the node's latest blockhash.
    async fn confirmation_handle(
        &self,
        signature: Signature,
        reported_height: Option<u64>,
    ) -> Result<ConfirmationHandle, ExecutionError> {
        if let Some(last_valid_block_height) = reported_height {
            return Ok(ConfirmationHandle {
                signature,
                last_valid_block_height,
            });
        }

        let latest: Response<RpcBlockhash> = self
            .rpc
            .call("getLatestBlockhash", json!([self.rpc.commitment()]))
            .await?;

        Ok(ConfirmationHandle {
            signature,
            last_valid_block_height: latest.value.last_valid_block_height,
        })
    }

    pub async fn confirm(&self, handle: &ConfirmationHandle) -> Result<(), ExecutionError> {
        self.rpc
            .retry()
            .execute_with("confirmTransaction", &self.confirm, move || self.poll_confirmation(handle))
            .await
    }

    async fn poll_confirmation(&self, handle: &ConfirmationHandle) -> Result<(), ExecutionError> {
        let commitment = self.rpc.commitment();
        let signature = handle.signature.to_string();

        loop {
            let statuses: Response<Vec<Option<TransactionStatus>>> = self
                .rpc
                .request("getSignatureStatuses", json!([[signature], {"searchTransactionHistory": false}]))
                .await?;

            if let Some(status) = statuses.value.into_iter().next().flatten() {
                if let Some(err) = status.err {
                    return Err(ExecutionError::TransactionFailed(format!("{signature}: {err}")));
                }
                if status.satisfies_commitment(commitment) {
                    return Ok(());
                }
            }

            let block_height: u64 = self.rpc.request("getBlockHeight", json!([commitment])).await?;
            if block_height > handle.last_valid_block_height {
                return Err(ExecutionError::BlockhashExpired(signature));
            }

            time::sleep(self.poll_interval).await;
        }
    }
}
