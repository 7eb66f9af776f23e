//! Alloy-based EVM gateway and receipt watcher.
//!
//! [`AlloyGateway`] signs with a local private key and broadcasts through an
//! alloy provider with the recommended fillers (nonce, gas, chain id). Signing
//! and broadcasting both happen in phase one, so the identifier feed it
//! returns is already resolved. [`AlloyReceiptWatcher`] polls
//! `eth_getTransactionReceipt` until the transaction is mined.

use crate::{GatewayError, IdentifierFeed, ReceiptWatcher, SubmissionGateway, WatchError};
use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_rpc_types::{TransactionReceipt, TransactionRequest as RpcTransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::{RpcError, TransportError};
use alloy_transport_http::Http;
use async_trait::async_trait;
use dehack_types::{
	truncate_id, LogEntry, Receipt, ReceiptStatus, SecretString, TransactionHash,
	TransactionRequest,
};
use std::sync::Arc;
use std::time::Duration;

/// Submits transactions signed by a local key.
pub struct AlloyGateway {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	chain_id: u64,
	from: Address,
}

impl AlloyGateway {
	/// Creates a gateway for one chain, signing with `signer`.
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		signer: PrivateKeySigner,
	) -> Result<Self, GatewayError> {
		let url: reqwest::Url = rpc_url.parse().map_err(|e| {
			GatewayError::ProviderUnavailable(format!("Invalid RPC URL {}: {}", rpc_url, e))
		})?;

		let signer = signer.with_chain_id(Some(chain_id));
		let from = signer.address();
		let wallet = EthereumWallet::from(signer);

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		Ok(Self {
			provider: Arc::new(provider),
			chain_id,
			from,
		})
	}

	/// Creates a gateway from a hex private key.
	pub fn from_private_key(
		rpc_url: &str,
		chain_id: u64,
		private_key: &SecretString,
	) -> Result<Self, GatewayError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse().map_err(|_| {
				GatewayError::ProviderUnavailable("Invalid wallet private key format".to_string())
			})
		})?;
		Self::new(rpc_url, chain_id, signer)
	}

	/// Address the gateway signs for.
	pub fn address(&self) -> Address {
		self.from
	}
}

/// Maps a provider error onto the gateway failure modes.
fn classify_send_error(error: TransportError) -> GatewayError {
	match &error {
		RpcError::ErrorResp(_) => GatewayError::NetworkRejected(error.to_string()),
		_ => GatewayError::ProviderUnavailable(error.to_string()),
	}
}

#[async_trait]
impl SubmissionGateway for AlloyGateway {
	async fn submit(&self, request: &TransactionRequest) -> Result<IdentifierFeed, GatewayError> {
		let mut tx = RpcTransactionRequest::default()
			.from(self.from)
			.to(request.to())
			.input(request.call_data().into());
		if let Some(value) = request.value() {
			tx = tx.value(value);
		}

		let pending = self
			.provider
			.send_transaction(tx)
			.await
			.map_err(classify_send_error)?;

		let identifier = TransactionHash::from(*pending.tx_hash());
		tracing::info!(
			tx_hash = %truncate_id(&identifier.to_string()),
			chain_id = self.chain_id,
			kind = %request.kind(),
			"Submitted transaction"
		);

		Ok(IdentifierFeed::ready(identifier))
	}
}

/// Polls the node for receipts.
pub struct AlloyReceiptWatcher {
	provider: RootProvider<Http<reqwest::Client>>,
	poll_interval: Duration,
	min_confirmations: u64,
}

impl AlloyReceiptWatcher {
	pub fn new(
		rpc_url: &str,
		poll_interval: Duration,
		min_confirmations: u64,
	) -> Result<Self, WatchError> {
		let url: reqwest::Url = rpc_url
			.parse()
			.map_err(|e| WatchError::Network(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

		Ok(Self {
			provider: RootProvider::new_http(url),
			poll_interval,
			min_confirmations: min_confirmations.max(1),
		})
	}

	/// Whether the inclusion block is buried deep enough.
	async fn is_final(&self, included_in: Option<u64>) -> bool {
		if self.min_confirmations <= 1 {
			return true;
		}
		let Some(included_in) = included_in else {
			return false;
		};
		match self.provider.get_block_number().await {
			Ok(current) => current.saturating_sub(included_in) + 1 >= self.min_confirmations,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to get block number");
				false
			},
		}
	}
}

/// Converts an RPC receipt into the lifecycle receipt.
fn to_receipt(receipt: &TransactionReceipt) -> Receipt {
	let logs = receipt
		.inner
		.logs()
		.iter()
		.map(|log| LogEntry {
			address: log.address(),
			topics: log.topics().to_vec(),
			data: log.data().data.clone(),
		})
		.collect();

	Receipt {
		identifier: TransactionHash::from(receipt.transaction_hash),
		status: if receipt.status() {
			ReceiptStatus::Success
		} else {
			ReceiptStatus::Reverted
		},
		block_number: receipt.block_number,
		logs,
	}
}

#[async_trait]
impl ReceiptWatcher for AlloyReceiptWatcher {
	async fn watch(&self, identifier: &TransactionHash) -> Result<Receipt, WatchError> {
		let tx_hash = identifier
			.as_b256()
			.ok_or_else(|| WatchError::InvalidIdentifier(identifier.to_string()))?;
		let started = tokio::time::Instant::now();

		loop {
			match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => {
					if self.is_final(receipt.block_number).await {
						return Ok(to_receipt(&receipt));
					}
					tracing::debug!(
						tx_hash = %truncate_id(&identifier.to_string()),
						"Waiting for more confirmations"
					);
				},
				Ok(None) => {
					tracing::debug!(
						tx_hash = %truncate_id(&identifier.to_string()),
						elapsed_secs = started.elapsed().as_secs(),
						"Waiting for transaction to be mined"
					);
				},
				Err(e) => {
					// Node hiccups are retried; the controller owns the deadline
					tracing::warn!(
						tx_hash = %truncate_id(&identifier.to_string()),
						error = %e,
						"Failed to get receipt"
					);
				},
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}
}
