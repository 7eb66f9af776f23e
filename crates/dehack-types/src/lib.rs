//! Common types for the DeHack transaction lifecycle.
//!
//! This crate defines the data model shared by the request builder, the
//! delivery layer and the lifecycle controllers: transaction identifiers,
//! receipts and their log entries, operation kinds with their parameters,
//! decoded results, and the lifecycle states and events.

/// Transaction identifiers, receipts and log entries.
pub mod delivery;
/// Lifecycle states and observability events.
pub mod events;
/// Operation kinds, caller parameters, built requests and decoded results.
pub mod operation;
/// Secret string wrapper for private keys.
pub mod secret_string;
/// Amount, address and hex helpers.
pub mod utils;
/// Validation errors raised before any network interaction.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use delivery::*;
pub use events::*;
pub use operation::*;
pub use secret_string::SecretString;
pub use utils::{
	format_amount, parse_address, parse_amount, topic_to_address, truncate_id, word_at,
	ETHER_DECIMALS,
};
pub use validation::ValidationError;
