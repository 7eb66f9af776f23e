//! Builder for [`HackathonClient`]s.
//!
//! Assembles the request builder, delivery, wallet connection and
//! notification sink around a loaded [`Config`].

use crate::client::HackathonClient;
use crate::event_bus::EventBus;
use crate::lifecycle::ControllerContext;
use crate::notify::{NotificationSink, TracingNotifier};
use crate::request::RequestBuilder;
use crate::wallet::WalletConnector;
use dehack_config::Config;
use dehack_delivery::implementations::evm::alloy::{AlloyGateway, AlloyReceiptWatcher};
use dehack_delivery::{ReceiptWatcher, SubmissionGateway};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building a client.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for a [`HackathonClient`] with pluggable delivery.
pub struct ClientBuilder {
	config: Config,
	gateway: Option<Arc<dyn SubmissionGateway>>,
	watcher: Option<Arc<dyn ReceiptWatcher>>,
	wallet: WalletConnector,
	notifier: Arc<dyn NotificationSink>,
	event_bus: EventBus,
}

impl ClientBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			gateway: None,
			watcher: None,
			wallet: WalletConnector::new(),
			notifier: Arc::new(TracingNotifier),
			event_bus: EventBus::default(),
		}
	}

	pub fn with_gateway(mut self, gateway: Arc<dyn SubmissionGateway>) -> Self {
		self.gateway = Some(gateway);
		self
	}

	pub fn with_watcher(mut self, watcher: Arc<dyn ReceiptWatcher>) -> Self {
		self.watcher = Some(watcher);
		self
	}

	pub fn with_wallet(mut self, wallet: WalletConnector) -> Self {
		self.wallet = wallet;
		self
	}

	pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
		self.notifier = notifier;
		self
	}

	pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
		self.event_bus = event_bus;
		self
	}

	/// Uses the configured local wallet and RPC endpoint for delivery, and
	/// connects the wallet's account.
	pub fn with_alloy_delivery(mut self) -> Result<Self, BuilderError> {
		let wallet = self.config.wallet.as_ref().ok_or_else(|| {
			BuilderError::MissingComponent("wallet.private_key for local signing".to_string())
		})?;
		let network = &self.config.network;

		let gateway =
			AlloyGateway::from_private_key(&network.rpc_url, network.chain_id, &wallet.private_key)
				.map_err(|e| BuilderError::Config(e.to_string()))?;
		let watcher = AlloyReceiptWatcher::new(
			&network.rpc_url,
			self.config.lifecycle.poll_interval(),
			self.config.lifecycle.min_confirmations,
		)
		.map_err(|e| BuilderError::Config(e.to_string()))?;

		self.wallet.connect(gateway.address());
		self.gateway = Some(Arc::new(gateway));
		self.watcher = Some(Arc::new(watcher));
		Ok(self)
	}

	pub fn build(self) -> Result<HackathonClient, BuilderError> {
		let gateway = self
			.gateway
			.ok_or_else(|| BuilderError::MissingComponent("submission gateway".to_string()))?;
		let watcher = self
			.watcher
			.ok_or_else(|| BuilderError::MissingComponent("receipt watcher".to_string()))?;

		let context = ControllerContext::new(gateway, watcher, self.wallet, self.notifier)
			.with_request_builder(RequestBuilder::new(self.config.tokens.prize_decimals))
			.with_event_bus(self.event_bus)
			.with_confirmation_timeout(self.config.lifecycle.confirmation_timeout());

		tracing::info!(
			client_id = %self.config.client.id,
			chain_id = self.config.network.chain_id,
			platform = %self.config.contracts.platform,
			"Hackathon client ready"
		);
		Ok(HackathonClient::new(self.config.contracts.platform, context))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dehack_delivery::implementations::memory::ReceiptBoard;
	use dehack_delivery::implementations::relay::relay;
	use dehack_types::Address;

	const CONFIG: &str = r#"
[client]
id = "dehack-test"

[network]
chain_id = 31337
rpc_url = "http://localhost:8545"

[wallet]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[contracts]
platform = "0x5fbdb2315678afecb367f032d93f642f64180aa3"

[lifecycle]
confirmation_timeout_seconds = 60
"#;

	fn config() -> Config {
		CONFIG.parse().unwrap()
	}

	#[test]
	fn test_build_requires_delivery() {
		let result = ClientBuilder::new(config()).build();
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[test]
	fn test_build_with_relay() {
		let (gateway, _relay) = relay();
		let client = ClientBuilder::new(config())
			.with_gateway(Arc::new(gateway))
			.with_watcher(Arc::new(ReceiptBoard::new()))
			.build()
			.unwrap();
		assert_eq!(
			client.platform(),
			"0x5fbdb2315678afecb367f032d93f642f64180aa3"
				.parse::<Address>()
				.unwrap()
		);
		assert!(!client.wallet().is_connected());
	}

	#[test]
	fn test_alloy_delivery_connects_wallet() {
		let client = ClientBuilder::new(config())
			.with_alloy_delivery()
			.unwrap()
			.build()
			.unwrap();
		assert_eq!(
			client.wallet().current(),
			Some(
				"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
					.parse::<Address>()
					.unwrap()
			)
		);
	}
}
