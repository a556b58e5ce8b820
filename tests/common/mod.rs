#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use solana_swap_executor::execution::{ResilientClient, RetryConfig, RpcClient, TransactionSubmitter};

pub const SOL: &str = "So11111111111111111111111111111111111111112";
pub const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

pub fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_base_delay(Duration::from_millis(10))
        .with_attempt_timeout(Duration::from_secs(5))
}

pub fn resilient() -> ResilientClient {
    ResilientClient::new(fast_retry())
}

pub fn rpc_client(server: &MockServer) -> RpcClient {
    RpcClient::new(server.uri(), resilient(), CommitmentConfig::confirmed())
}

pub fn submitter(server: &MockServer, signer: Arc<Keypair>) -> Arc<TransactionSubmitter> {
    let confirm = fast_retry().with_max_attempts(1);
    Arc::new(
        TransactionSubmitter::new(rpc_client(server), signer, confirm).with_poll_interval(Duration::from_millis(10)),
    )
}

/// A minimal legacy transaction paid for by `payer`, encoded the way the swap
/// APIs return it.
pub fn unsigned_transaction_base64(payer: &Pubkey) -> String {
    let transaction = VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::Legacy(Message::new(&[], Some(payer))),
    };
    STANDARD.encode(bincode::serialize(&transaction).unwrap())
}

pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
}

pub fn with_context(value: Value) -> Value {
    json!({"context": {"slot": 250_000_000u64}, "value": value})
}

/// Answers every JSON-RPC call of `rpc_method` with `result`.
pub async fn mount_rpc(server: &MockServer, rpc_method: &str, result: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": rpc_method})))
        .respond_with(rpc_result(result))
        .mount(server)
        .await;
}

/// The node side of a successful send-and-confirm.
pub async fn mount_confirmed_submission(server: &MockServer) {
    mount_rpc(server, "sendTransaction", json!(Signature::default().to_string())).await;
    mount_rpc(
        server,
        "getLatestBlockhash",
        with_context(json!({
            "blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
            "lastValidBlockHeight": 1_000u64
        })),
    )
    .await;
    mount_rpc(
        server,
        "getSignatureStatuses",
        with_context(json!([{
            "slot": 250_000_000u64,
            "confirmations": null,
            "err": null,
            "status": {"Ok": null},
            "confirmationStatus": "confirmed"
        }])),
    )
    .await;
    mount_rpc(server, "getBlockHeight", json!(900u64)).await;
}
