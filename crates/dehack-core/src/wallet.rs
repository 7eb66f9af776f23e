//! Process-wide wallet connection.

use arc_swap::ArcSwapOption;
use dehack_types::Address;
use std::sync::Arc;

/// Currently connected wallet account, shared by every controller.
///
/// Connecting and disconnecting happen outside the lifecycle controllers;
/// they only read the account when an operation starts.
#[derive(Debug, Clone, Default)]
pub struct WalletConnector {
	account: Arc<ArcSwapOption<Address>>,
}

impl WalletConnector {
	pub fn new() -> Self {
		Self::default()
	}

	/// A connector with `account` already connected.
	pub fn connected(account: Address) -> Self {
		let connector = Self::new();
		connector.connect(account);
		connector
	}

	pub fn connect(&self, account: Address) {
		tracing::info!(account = %account, "Wallet connected");
		self.account.store(Some(Arc::new(account)));
	}

	pub fn disconnect(&self) {
		if self.account.swap(None).is_some() {
			tracing::info!("Wallet disconnected");
		}
	}

	pub fn current(&self) -> Option<Address> {
		self.account.load_full().map(|account| *account)
	}

	pub fn is_connected(&self) -> bool {
		self.account.load().is_some()
	}
}
