//! Lifecycle error taxonomy.
//!
//! Validation, NotConnected and Busy are returned synchronously from
//! `start()`. Everything else is asynchronous: it reaches the caller through
//! the notification sink and the ticket outcome, never through the success
//! callback.

use crate::decoder::DecodeError;
use dehack_delivery::{GatewayError, WatchError};
use dehack_types::{truncate_id, OperationKind, TransactionHash, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Provider error text that means the wallet holder said no. The EIP-1193
/// code only counts as a whole `code` field, never as digits inside a number.
static USER_REJECTION: Lazy<Option<Regex>> = Lazy::new(|| {
	Regex::new(
		r"(?i)user rejected|user denied|rejected by user|rejected the request|\bcode\W{0,3}4001\b",
	)
	.ok()
});

/// Errors a lifecycle controller reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
	/// Bad caller input, detected before submission.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// No wallet account is connected.
	#[error("Please connect your wallet first")]
	NotConnected,
	/// An operation of this kind is already in flight.
	#[error("{0} is already in progress")]
	Busy(OperationKind),
	/// The wallet holder declined to sign.
	#[error("Transaction rejected by user")]
	UserRejected,
	/// Any other wallet or provider failure.
	#[error("Submission failed: {0}")]
	Submission(String),
	/// No receipt arrived before the deadline.
	#[error("Transaction timed out. Please try again.")]
	ReceiptTimeout,
	/// The chain executed the transaction and reported failure.
	#[error("Transaction {0} reverted")]
	Reverted(TransactionHash),
	/// The transaction succeeded on-chain but its result could not be decoded.
	#[error("Transaction {identifier} succeeded but its result is unknown: {reason}")]
	Unreconciled {
		identifier: TransactionHash,
		reason: DecodeError,
	},
}

impl LifecycleError {
	/// Message shown to the user through the notification sink.
	pub fn user_message(&self, kind: OperationKind) -> String {
		match self {
			LifecycleError::Validation(e) => e.to_string(),
			LifecycleError::NotConnected
			| LifecycleError::Busy(_)
			| LifecycleError::UserRejected
			| LifecycleError::ReceiptTimeout => self.to_string(),
			LifecycleError::Submission(message) => {
				format!("{}: {}", kind.failure_prefix(), message)
			},
			LifecycleError::Reverted(_) => {
				format!("{}: transaction reverted", kind.failure_prefix())
			},
			LifecycleError::Unreconciled { identifier, .. } => format!(
				"{}: transaction {} was confirmed but its result could not be read",
				kind.failure_prefix(),
				truncate_id(&identifier.to_string())
			),
		}
	}
}

/// Whether provider error text describes a declined signature.
pub fn is_user_rejection(message: &str) -> bool {
	USER_REJECTION
		.as_ref()
		.is_some_and(|pattern| pattern.is_match(message))
}

impl From<GatewayError> for LifecycleError {
	fn from(error: GatewayError) -> Self {
		match error {
			GatewayError::Declined(_) => LifecycleError::UserRejected,
			GatewayError::ProviderUnavailable(message) | GatewayError::NetworkRejected(message) => {
				if is_user_rejection(&message) {
					LifecycleError::UserRejected
				} else {
					LifecycleError::Submission(message)
				}
			},
		}
	}
}

impl From<WatchError> for LifecycleError {
	fn from(error: WatchError) -> Self {
		LifecycleError::Submission(error.to_string())
	}
}
