mod common;

use serde_json::json;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{mount_confirmed_submission, mount_rpc, submitter, unsigned_transaction_base64, with_context};
use solana_swap_executor::dex::{DexProtocol, UnsignedTransaction};

fn unsigned(signer: &Keypair) -> UnsignedTransaction {
    UnsignedTransaction::from_base64(DexProtocol::Jupiter, &unsigned_transaction_base64(&signer.pubkey())).unwrap()
}

#[tokio::test]
async fn confirmed_submission_reports_the_signature() {
    let server = MockServer::start().await;
    mount_confirmed_submission(&server).await;
    let signer = Arc::new(Keypair::new());

    let result = submitter(&server, signer.clone()).submit(unsigned(&signer)).await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    let signature = result.signature.unwrap();
    assert_ne!(signature, solana_sdk::signature::Signature::default().to_string());
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn landed_transaction_error_fails_the_submission() {
    let server = MockServer::start().await;
    let signer = Arc::new(Keypair::new());
    mount_rpc(&server, "sendTransaction", json!("ignored")).await;
    mount_rpc(
        &server,
        "getLatestBlockhash",
        with_context(json!({
            "blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
            "lastValidBlockHeight": 1_000u64
        })),
    )
    .await;
    mount_rpc(
        &server,
        "getSignatureStatuses",
        with_context(json!([{
            "slot": 250_000_000u64,
            "confirmations": 0,
            "err": {"InstructionError": [2, {"Custom": 6001}]},
            "status": {"Err": {"InstructionError": [2, {"Custom": 6001}]}},
            "confirmationStatus": "confirmed"
        }])),
    )
    .await;

    let result = submitter(&server, signer.clone()).submit(unsigned(&signer)).await;

    assert!(!result.success);
    assert!(result.signature.is_some());
    assert!(result
        .error
        .as_deref()
        .is_some_and(|error| error.starts_with("Transaction failed")));
}

#[tokio::test]
async fn expired_blockhash_stops_polling() {
    let server = MockServer::start().await;
    let signer = Arc::new(Keypair::new());
    mount_rpc(&server, "sendTransaction", json!("ignored")).await;
    mount_rpc(
        &server,
        "getLatestBlockhash",
        with_context(json!({
            "blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
            "lastValidBlockHeight": 1_000u64
        })),
    )
    .await;
    mount_rpc(&server, "getSignatureStatuses", with_context(json!([null]))).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getBlockHeight"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": 1_001u64})))
        .expect(1)
        .mount(&server)
        .await;

    let result = submitter(&server, signer.clone()).submit(unsigned(&signer)).await;

    assert!(!result.success);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|error| error.starts_with("Blockhash expired")));
}

#[tokio::test]
async fn rejected_send_is_not_retried() {
    let server = MockServer::start().await;
    let signer = Arc::new(Keypair::new());
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "sendTransaction"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32002, "message": "Transaction simulation failed: insufficient funds"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = submitter(&server, signer.clone()).submit(unsigned(&signer)).await;

    assert!(!result.success);
    assert!(result.error.as_deref().is_some_and(|error| error.contains("insufficient funds")));
}

#[tokio::test]
async fn foreign_fee_payer_cannot_be_signed() {
    let server = MockServer::start().await;
    let signer = Arc::new(Keypair::new());
    let stranger = Keypair::new();

    let result = submitter(&server, signer).submit(unsigned(&stranger)).await;

    assert!(!result.success);
    assert_eq!(result.signature, None);
    assert!(result.error.as_deref().is_some_and(|error| error.starts_with("Signing failed")));
}

#[tokio::test]
async fn provider_reported_expiry_is_used_for_confirmation() {
    let server = MockServer::start().await;
    let signer = Arc::new(Keypair::new());
    mount_rpc(&server, "sendTransaction", json!("ignored")).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getLatestBlockhash"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_rpc(&server, "getSignatureStatuses", with_context(json!([null]))).await;
    mount_rpc(&server, "getBlockHeight", json!(501u64)).await;

    let transaction = unsigned(&signer).with_last_valid_block_height(500);
    let result = submitter(&server, signer).submit(transaction).await;

    assert!(!result.success);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|error| error.starts_with("Blockhash expired")));
}
