//! Transaction delivery types.
//!
//! Identifiers handed out by the wallet, the pending record created once an
//! identifier is known, and the receipt the network reports for it.

use alloy_primitives::{hex, Address, Bytes, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier (transaction hash) of a submitted chain operation.
///
/// An empty identifier is the placeholder handed back by `start()` before the
/// wallet has produced the real one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	/// The empty placeholder identifier.
	pub fn placeholder() -> Self {
		Self(Vec::new())
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns the identifier as a 32-byte word when it has the EVM hash length.
	pub fn as_b256(&self) -> Option<B256> {
		(self.0.len() == 32).then(|| B256::from_slice(&self.0))
	}
}

impl From<B256> for TransactionHash {
	fn from(hash: B256) -> Self {
		Self(hash.0.to_vec())
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// A submitted transaction whose receipt has not been observed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
	pub identifier: TransactionHash,
	pub submitted_at: DateTime<Utc>,
}

impl PendingTransaction {
	pub fn new(identifier: TransactionHash) -> Self {
		Self {
			identifier,
			submitted_at: Utc::now(),
		}
	}
}

/// Final execution status reported by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
	Success,
	Reverted,
}

/// A log entry emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
	/// Contract that emitted the log.
	pub address: Address,
	/// Indexed topics; the first one is the event signature hash.
	pub topics: Vec<B256>,
	/// Non-indexed ABI-encoded payload.
	pub data: Bytes,
}

impl LogEntry {
	/// Returns the topic-zero signature hash, if the log has one.
	pub fn signature(&self) -> Option<&B256> {
		self.topics.first()
	}
}

/// On-chain outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
	/// The identifier this receipt belongs to.
	pub identifier: TransactionHash,
	pub status: ReceiptStatus,
	/// Block the transaction was included in, when the node reports it.
	pub block_number: Option<u64>,
	/// Logs in emission order.
	pub logs: Vec<LogEntry>,
}

impl Receipt {
	pub fn is_success(&self) -> bool {
		self.status == ReceiptStatus::Success
	}
}
