//! In-memory receipt watcher.
//!
//! Receipts are published onto a [`ReceiptBoard`] by whoever observes them
//! (a block subscription, a wallet callback, a test) and every watcher waiting
//! on that identifier is woken. Publishing the same receipt twice is harmless.
//! The board holds a bounded number of receipts and forgets the oldest first.

use crate::{ReceiptWatcher, WatchError};
use async_trait::async_trait;
use dehack_types::{Receipt, TransactionHash};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Receipts kept by [`ReceiptBoard::new`].
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Receipts {
	by_identifier: HashMap<TransactionHash, Receipt>,
	arrival: VecDeque<TransactionHash>,
}

#[derive(Debug, Clone)]
pub struct ReceiptBoard {
	receipts: Arc<Mutex<Receipts>>,
	published: Arc<Notify>,
	capacity: usize,
}

impl Default for ReceiptBoard {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}
}

impl ReceiptBoard {
	pub fn new() -> Self {
		Self::default()
	}

	/// A board that keeps at most `capacity` receipts (at least one).
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			receipts: Arc::new(Mutex::new(Receipts::default())),
			published: Arc::new(Notify::new()),
			capacity: capacity.max(1),
		}
	}

	/// Records the receipt for its identifier and wakes waiting watchers.
	pub fn publish(&self, receipt: Receipt) {
		if let Ok(mut receipts) = self.receipts.lock() {
			let identifier = receipt.identifier.clone();
			if receipts
				.by_identifier
				.insert(identifier.clone(), receipt)
				.is_none()
			{
				receipts.arrival.push_back(identifier);
			}
			while receipts.arrival.len() > self.capacity {
				if let Some(oldest) = receipts.arrival.pop_front() {
					receipts.by_identifier.remove(&oldest);
				}
			}
		}
		self.published.notify_waiters();
	}

	pub fn get(&self, identifier: &TransactionHash) -> Option<Receipt> {
		self.receipts
			.lock()
			.ok()
			.and_then(|receipts| receipts.by_identifier.get(identifier).cloned())
	}

	pub fn len(&self) -> usize {
		self.receipts
			.lock()
			.map(|receipts| receipts.arrival.len())
			.unwrap_or_default()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[async_trait]
impl ReceiptWatcher for ReceiptBoard {
	async fn watch(&self, identifier: &TransactionHash) -> Result<Receipt, WatchError> {
		if identifier.is_empty() {
			return Err(WatchError::InvalidIdentifier(identifier.to_string()));
		}

		loop {
			// Registered before the lookup so a publish in between is not missed
			let published = self.published.notified();
			if let Some(receipt) = self.get(identifier) {
				return Ok(receipt);
			}
			published.await;
		}
	}
}
