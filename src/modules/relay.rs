use std::sync::Arc;

use alloy::hex;
use alloy::primitives::{keccak256, Bytes, B256};
use alloy::providers::{Provider, RootProvider};
use alloy::pubsub::PubSubFrontend;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::modules::bundler::SignedBundle;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("bundle simulation failed: {0}")]
    Simulation(String),
    #[error("bundle submission rejected: {0}")]
    Submission(String),
    #[error("relay transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("relay returned malformed response: {0}")]
    Response(String),
    #[error("signing relay request failed: {0}")]
    Signing(#[from] alloy::signers::Error),
    #[error("provider error: {0}")]
    Provider(String),
}

/// A bundle the relay has accepted for a specific block.
#[derive(Debug, Clone)]
pub struct PendingBundle {
    pub bundle_hash: Option<String>,
    pub target_block: u64,
    pub replacement_id: String,
    pub tx_hashes: Vec<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleStatus {
    Included,
    Cancelled,
    Expired,
}

/// Result of one submission attempt. A simulation revert is an expected
/// outcome, not an error: the opportunity was stale.
#[derive(Debug)]
pub enum SubmissionOutcome {
    SimulationReverted(String),
    Submitted(PendingBundle),
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub bundle_hash: Option<String>,
    pub gas_used: u64,
}

#[async_trait]
pub trait BundleRelay: Send + Sync {
    async fn simulate(
        &self,
        bundle: &SignedBundle,
        block_number: u64,
    ) -> Result<SimulationReport, RelayError>;

    async fn submit(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
        replacement_id: &str,
    ) -> Result<PendingBundle, RelayError>;

    async fn cancel(&self, replacement_id: &str) -> Result<(), RelayError>;

    /// Resolves once the target block has landed.
    async fn wait(&self, pending: &PendingBundle) -> Result<BundleStatus, RelayError>;
}

/// Simulates against the current head and, if the bundle holds up, submits
/// it for the next block. Simulation reverts short-circuit without a
/// submission; every other failure propagates.
pub async fn execute_bundle(
    relay: &dyn BundleRelay,
    bundle: &SignedBundle,
    current_block: u64,
) -> Result<SubmissionOutcome, RelayError> {
    match relay.simulate(bundle, current_block).await {
        Ok(report) => {
            debug!("Bundle simulation passed, gas used: {}", report.gas_used);
        }
        Err(RelayError::Simulation(reason)) => {
            return Ok(SubmissionOutcome::SimulationReverted(reason));
        }
        Err(e) => return Err(e),
    }

    let replacement_id = fresh_replacement_id();
    let pending = relay.submit(bundle, current_block + 1, &replacement_id).await?;
    info!(
        "Bundle submitted for block {} ({} txs)",
        pending.target_block,
        pending.tx_hashes.len()
    );
    Ok(SubmissionOutcome::Submitted(pending))
}

fn fresh_replacement_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[derive(Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Vec<T>,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallBundleParams {
    txs: Vec<Bytes>,
    block_number: String,
    state_block_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallBundleResult {
    bundle_hash: Option<String>,
    #[serde(default)]
    total_gas_used: u64,
    #[serde(default)]
    results: Vec<CallBundleTxResult>,
}

#[derive(Deserialize)]
struct CallBundleTxResult {
    error: Option<String>,
    revert: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleParams {
    txs: Vec<Bytes>,
    block_number: String,
    replacement_uuid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleResult {
    bundle_hash: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelBundleParams {
    replacement_uuid: String,
}

/// Flashbots-style private relay speaking signed JSON-RPC over HTTPS.
///
/// Every request body is keccak-hashed, signed with the reputation key and
/// attached as the `X-Flashbots-Signature` header.
pub struct FlashbotsRelay {
    http: reqwest::Client,
    relay_url: String,
    auth_signer: PrivateKeySigner,
    provider: Arc<RootProvider<PubSubFrontend>>,
}

impl FlashbotsRelay {
    pub fn new(
        relay_url: String,
        auth_signer: PrivateKeySigner,
        provider: Arc<RootProvider<PubSubFrontend>>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url,
            auth_signer,
            provider,
        }
    }

    async fn signed_request<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &'static str,
        params: Vec<P>,
    ) -> Result<R, RelayError> {
        let request = JsonRpcRequest { jsonrpc: "2.0", id: 1, method, params };
        let body = serde_json::to_string(&request)
            .map_err(|e| RelayError::Response(e.to_string()))?;

        let digest = format!("0x{:x}", keccak256(body.as_bytes()));
        let signature = self.auth_signer.sign_message(digest.as_bytes()).await?;
        let header = format!(
            "{:?}:0x{}",
            self.auth_signer.address(),
            hex::encode(signature.as_bytes())
        );

        let response = self
            .http
            .post(&self.relay_url)
            .header("Content-Type", "application/json")
            .header("X-Flashbots-Signature", header)
            .body(body)
            .send()
            .await?;

        let parsed: JsonRpcResponse<R> = response.json().await?;
        if let Some(error) = parsed.error {
            return Err(RelayError::Submission(error.message));
        }
        parsed
            .result
            .ok_or_else(|| RelayError::Response("missing result".to_string()))
    }
}

fn hex_block(block_number: u64) -> String {
    format!("0x{:x}", block_number)
}

#[async_trait]
impl BundleRelay for FlashbotsRelay {
    async fn simulate(
        &self,
        bundle: &SignedBundle,
        block_number: u64,
    ) -> Result<SimulationReport, RelayError> {
        let params = CallBundleParams {
            txs: bundle.txs.clone(),
            block_number: hex_block(block_number + 1),
            state_block_number: hex_block(block_number),
        };
        let result: CallBundleResult = self.signed_request("eth_callBundle", vec![params]).await?;

        for tx_result in &result.results {
            if let Some(error) = &tx_result.error {
                let detail = tx_result.revert.clone().unwrap_or_default();
                return Err(RelayError::Simulation(format!("{} {}", error, detail)));
            }
        }

        Ok(SimulationReport {
            bundle_hash: result.bundle_hash,
            gas_used: result.total_gas_used,
        })
    }

    async fn submit(
        &self,
        bundle: &SignedBundle,
        target_block: u64,
        replacement_id: &str,
    ) -> Result<PendingBundle, RelayError> {
        let params = SendBundleParams {
            txs: bundle.txs.clone(),
            block_number: hex_block(target_block),
            replacement_uuid: replacement_id.to_string(),
        };
        let result: SendBundleResult = self.signed_request("eth_sendBundle", vec![params]).await?;

        Ok(PendingBundle {
            bundle_hash: result.bundle_hash,
            target_block,
            replacement_id: replacement_id.to_string(),
            tx_hashes: bundle.tx_hashes.clone(),
        })
    }

    async fn cancel(&self, replacement_id: &str) -> Result<(), RelayError> {
        let params = CancelBundleParams { replacement_uuid: replacement_id.to_string() };
        let _: serde_json::Value = self.signed_request("eth_cancelBundle", vec![params]).await?;
        Ok(())
    }

    async fn wait(&self, pending: &PendingBundle) -> Result<BundleStatus, RelayError> {
        let subscription = self
            .provider
            .subscribe_blocks()
            .await
            .map_err(|e| RelayError::Provider(e.to_string()))?;
        let mut stream = subscription.into_stream();

        while let Some(block) = stream.next().await {
            if block.header.number >= pending.target_block {
                break;
            }
        }

        let first_hash = match pending.tx_hashes.first() {
            Some(hash) => *hash,
            None => return Ok(BundleStatus::Expired),
        };
        let receipt = self
            .provider
            .get_transaction_receipt(first_hash)
            .await
            .map_err(|e| RelayError::Provider(e.to_string()))?;

        match receipt {
            Some(_) => Ok(BundleStatus::Included),
            None => {
                warn!("Bundle for block {} was not included", pending.target_block);
                Ok(BundleStatus::Expired)
            }
        }
    }
}
