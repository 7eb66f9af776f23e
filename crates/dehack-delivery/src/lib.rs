//! Transaction delivery for the DeHack lifecycle controllers.
//!
//! Two seams separate the controllers from the outside world:
//! - [`SubmissionGateway`] hands a request to a wallet for signing. It resolves
//!   once the wallet has accepted the request and yields an [`IdentifierFeed`]
//!   that produces the transaction identifier later, out of band.
//! - [`ReceiptWatcher`] observes the network until the receipt for an
//!   identifier is available.

use async_trait::async_trait;
use dehack_types::{Receipt, TransactionHash, TransactionRequest};
use thiserror::Error;
use tokio::sync::mpsc;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod memory;
	pub mod relay;
}

/// Errors reported by a submission gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
	/// The wallet holder declined to sign.
	#[error("Signature declined: {0}")]
	Declined(String),
	/// No wallet or RPC provider could take the request.
	#[error("Provider unavailable: {0}")]
	ProviderUnavailable(String),
	/// The network refused the signed transaction.
	#[error("Network rejected transaction: {0}")]
	NetworkRejected(String),
}

/// Errors reported by a receipt watcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
	/// The identifier cannot name a transaction on this network.
	#[error("Invalid transaction identifier: {0}")]
	InvalidIdentifier(String),
	/// The watcher gave up on the network.
	#[error("Network error: {0}")]
	Network(String),
}

/// Sending half of an [`IdentifierFeed`], held by whoever learns the identifier.
#[derive(Debug, Clone)]
pub struct IdentifierSender {
	sender: mpsc::UnboundedSender<Result<TransactionHash, GatewayError>>,
}

impl IdentifierSender {
	/// Reports an identifier. Reporting again supersedes the previous one.
	///
	/// Returns false when nobody is listening any more.
	pub fn send(&self, identifier: TransactionHash) -> bool {
		self.sender.send(Ok(identifier)).is_ok()
	}

	/// Reports that no identifier will be produced.
	pub fn fail(&self, error: GatewayError) -> bool {
		self.sender.send(Err(error)).is_ok()
	}

	pub fn is_closed(&self) -> bool {
		self.sender.is_closed()
	}
}

/// Receiving half: the identifiers a submission produces, latest last.
#[derive(Debug)]
pub struct IdentifierFeed {
	receiver: mpsc::UnboundedReceiver<Result<TransactionHash, GatewayError>>,
}

impl IdentifierFeed {
	pub fn channel() -> (IdentifierSender, IdentifierFeed) {
		let (sender, receiver) = mpsc::unbounded_channel();
		(IdentifierSender { sender }, IdentifierFeed { receiver })
	}

	/// A feed that already holds its only identifier.
	pub fn ready(identifier: TransactionHash) -> Self {
		let (sender, feed) = Self::channel();
		sender.send(identifier);
		feed
	}

	/// Waits for the next identifier. `None` once the sender is gone and
	/// everything sent has been received.
	pub async fn next(&mut self) -> Option<Result<TransactionHash, GatewayError>> {
		self.receiver.recv().await
	}
}

/// Adapter around the wallet-signing interface.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
	/// Hands the request to the wallet.
	///
	/// Resolves once the wallet has accepted (signed) the request; errors here
	/// mean nothing was submitted. The identifier arrives later on the feed.
	async fn submit(&self, request: &TransactionRequest) -> Result<IdentifierFeed, GatewayError>;
}

/// Observes the network for the receipt of a submitted transaction.
#[async_trait]
pub trait ReceiptWatcher: Send + Sync {
	/// Resolves once the transaction is mined, whether it succeeded or reverted.
	///
	/// Implementations tolerate polling latency and transient node errors;
	/// the caller bounds the wait and drops the future when it gives up.
	async fn watch(&self, identifier: &TransactionHash) -> Result<Receipt, WatchError>;
}
