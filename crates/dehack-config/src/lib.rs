//! Configuration for the DeHack transaction client.
//!
//! Configuration is read from TOML. Before parsing, `${VAR}` and
//! `${VAR:-default}` references are replaced with environment values so
//! secrets such as the wallet key never need to live in the file itself.

use dehack_types::{Address, SecretString};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Identity of this client instance, used in logs.
	pub client: ClientConfig,
	/// Chain the platform contracts live on.
	pub network: NetworkConfig,
	/// Local signing wallet. Absent when an external wallet relays signatures.
	pub wallet: Option<WalletConfig>,
	/// Deployed platform contracts.
	pub contracts: ContractsConfig,
	/// Confirmation deadline and receipt polling.
	#[serde(default)]
	pub lifecycle: LifecycleConfig,
	/// Token settings for prize amounts.
	#[serde(default)]
	pub tokens: TokensConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
	pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
	pub chain_id: u64,
	pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
	/// Hex private key, normally supplied as `${WALLET_PRIVATE_KEY}`.
	pub private_key: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
	/// Hackathon factory that `createHackathon` is sent to.
	pub platform: Address,
}

/// Timing of the transaction lifecycle.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
	/// Deadline for identifier plus receipt. Defaults to 300 seconds.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
	/// Interval between receipt queries. Defaults to 3 seconds.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
	/// Blocks on top of the inclusion block before a receipt counts. Defaults to 1.
	#[serde(default = "default_min_confirmations")]
	pub min_confirmations: u64,
}

impl Default for LifecycleConfig {
	fn default() -> Self {
		Self {
			confirmation_timeout_seconds: default_confirmation_timeout_seconds(),
			poll_interval_seconds: default_poll_interval_seconds(),
			min_confirmations: default_min_confirmations(),
		}
	}
}

impl LifecycleConfig {
	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.confirmation_timeout_seconds)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_seconds)
	}
}

fn default_confirmation_timeout_seconds() -> u64 {
	300 // 5 minutes
}

fn default_poll_interval_seconds() -> u64 {
	3
}

fn default_min_confirmations() -> u64 {
	1
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokensConfig {
	/// Decimals of the prize token (PYUSD uses 6).
	#[serde(default = "default_prize_decimals")]
	pub prize_decimals: u8,
}

impl Default for TokensConfig {
	fn default() -> Self {
		Self {
			prize_decimals: default_prize_decimals(),
		}
	}
}

fn default_prize_decimals() -> u8 {
	6
}

/// Replaces `${VAR_NAME}` and `${VAR_NAME:-default}` with environment values.
///
/// Input is capped at 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let name = &caps[1];
		match (std::env::var(name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Reads, resolves and validates a configuration file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client.id.trim().is_empty() {
			return Err(ConfigError::Validation("Client ID cannot be empty".into()));
		}

		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation(
				"Network chain_id must be greater than 0".into(),
			));
		}
		if !(self.network.rpc_url.starts_with("http://")
			|| self.network.rpc_url.starts_with("https://"))
		{
			return Err(ConfigError::Validation(format!(
				"Network rpc_url must be an http(s) URL, got '{}'",
				self.network.rpc_url
			)));
		}

		if let Some(wallet) = &self.wallet {
			if wallet.private_key.is_empty() {
				return Err(ConfigError::Validation(
					"Wallet private_key cannot be empty".into(),
				));
			}
		}

		if self.contracts.platform == Address::ZERO {
			return Err(ConfigError::Validation(
				"Platform contract address cannot be the zero address".into(),
			));
		}

		let lifecycle = &self.lifecycle;
		if lifecycle.confirmation_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Lifecycle confirmation_timeout_seconds must be greater than 0".into(),
			));
		}
		if lifecycle.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Lifecycle poll_interval_seconds must be greater than 0".into(),
			));
		}
		if lifecycle.poll_interval_seconds >= lifecycle.confirmation_timeout_seconds {
			return Err(ConfigError::Validation(format!(
				"Lifecycle poll_interval_seconds ({}) must be below confirmation_timeout_seconds ({})",
				lifecycle.poll_interval_seconds, lifecycle.confirmation_timeout_seconds
			)));
		}

		if self.tokens.prize_decimals > 36 {
			return Err(ConfigError::Validation(
				"Token prize_decimals cannot exceed 36".into(),
			));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
