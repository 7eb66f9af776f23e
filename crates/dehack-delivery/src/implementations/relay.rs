//! Relay gateway for wallets that sign out of band.
//!
//! A browser extension or hardware wallet cannot be called like a function:
//! the request is shown to the holder, who signs or declines at their own
//! pace, and the transaction hash shows up later. [`RelayGateway`] forwards
//! each request as a [`WalletPrompt`] to the [`WalletRelay`] side, where the
//! wallet integration answers it.

use crate::{GatewayError, IdentifierFeed, IdentifierSender, SubmissionGateway};
use async_trait::async_trait;
use dehack_types::TransactionRequest;
use tokio::sync::{mpsc, oneshot};

/// A request waiting for the wallet holder's decision.
#[derive(Debug)]
pub struct WalletPrompt {
	request: TransactionRequest,
	decision: oneshot::Sender<Result<(), GatewayError>>,
	identifiers: IdentifierSender,
}

impl WalletPrompt {
	pub fn request(&self) -> &TransactionRequest {
		&self.request
	}

	/// The holder signed. Returns the handle for reporting the identifier
	/// once the wallet has broadcast the transaction.
	pub fn sign(self) -> IdentifierSender {
		let _ = self.decision.send(Ok(()));
		self.identifiers
	}

	/// The holder refused to sign.
	pub fn decline(self, reason: impl Into<String>) {
		let _ = self.decision.send(Err(GatewayError::Declined(reason.into())));
	}

	/// The wallet failed before anything was signed.
	pub fn fail(self, error: GatewayError) {
		let _ = self.decision.send(Err(error));
	}
}

/// Gateway half, handed to lifecycle controllers.
#[derive(Debug, Clone)]
pub struct RelayGateway {
	prompts: mpsc::UnboundedSender<WalletPrompt>,
}

/// Wallet half, drained by the wallet integration.
#[derive(Debug)]
pub struct WalletRelay {
	prompts: mpsc::UnboundedReceiver<WalletPrompt>,
}

impl WalletRelay {
	/// Waits for the next prompt. `None` once every gateway is dropped.
	pub async fn next_prompt(&mut self) -> Option<WalletPrompt> {
		self.prompts.recv().await
	}

	/// Returns a prompt that is already queued, without waiting.
	pub fn try_next_prompt(&mut self) -> Option<WalletPrompt> {
		self.prompts.try_recv().ok()
	}
}

/// Creates a connected gateway/wallet pair.
pub fn relay() -> (RelayGateway, WalletRelay) {
	let (sender, receiver) = mpsc::unbounded_channel();
	(
		RelayGateway { prompts: sender },
		WalletRelay { prompts: receiver },
	)
}

#[async_trait]
impl SubmissionGateway for RelayGateway {
	async fn submit(&self, request: &TransactionRequest) -> Result<IdentifierFeed, GatewayError> {
		let (identifiers, feed) = IdentifierFeed::channel();
		let (decision, decided) = oneshot::channel();

		self.prompts
			.send(WalletPrompt {
				request: request.clone(),
				decision,
				identifiers,
			})
			.map_err(|_| GatewayError::ProviderUnavailable("wallet relay is closed".to_string()))?;

		tracing::debug!(kind = %request.kind(), "Prompted wallet for signature");

		match decided.await {
			Ok(Ok(())) => Ok(feed),
			Ok(Err(e)) => Err(e),
			Err(_) => Err(GatewayError::ProviderUnavailable(
				"wallet dismissed the prompt without answering".to_string(),
			)),
		}
	}
}
