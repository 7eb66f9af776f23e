//! Lifecycle states and events.
//!
//! Controllers publish [`LifecycleEvent`]s on an event bus as they move
//! through [`LifecycleState`]s, so observers can follow every transition
//! without polling controller internals.

use crate::{DecodedResult, OperationKind, TransactionHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a lifecycle controller.
///
/// `Idle -> Submitting -> AwaitingConfirmation -> {Confirmed | Failed | TimedOut} -> Idle`,
/// with `Submitting -> Failed` for submissions the wallet refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifecycleState {
	#[default]
	Idle,
	Submitting,
	AwaitingConfirmation,
	Confirmed,
	Failed,
	TimedOut,
}

impl LifecycleState {
	pub fn is_idle(&self) -> bool {
		matches!(self, LifecycleState::Idle)
	}

	/// Terminal states are left immediately for `Idle`.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			LifecycleState::Confirmed | LifecycleState::Failed | LifecycleState::TimedOut
		)
	}
}

impl fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			LifecycleState::Idle => "idle",
			LifecycleState::Submitting => "submitting",
			LifecycleState::AwaitingConfirmation => "awaiting_confirmation",
			LifecycleState::Confirmed => "confirmed",
			LifecycleState::Failed => "failed",
			LifecycleState::TimedOut => "timed_out",
		};
		f.write_str(name)
	}
}

/// Events published by lifecycle controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
	StateChanged {
		kind: OperationKind,
		generation: u64,
		from: LifecycleState,
		to: LifecycleState,
	},
	/// The wallet reported the identifier of the submitted transaction.
	IdentifierKnown {
		kind: OperationKind,
		generation: u64,
		identifier: TransactionHash,
	},
	/// The wallet replaced the identifier mid-flight; only `current` is watched.
	IdentifierSuperseded {
		kind: OperationKind,
		generation: u64,
		previous: TransactionHash,
		current: TransactionHash,
	},
	Confirmed {
		kind: OperationKind,
		generation: u64,
		result: DecodedResult,
	},
	Failed {
		kind: OperationKind,
		generation: u64,
		error: String,
	},
	TimedOut {
		kind: OperationKind,
		generation: u64,
	},
	/// Succeeded on-chain but the result could not be decoded.
	Unreconciled {
		kind: OperationKind,
		generation: u64,
		identifier: TransactionHash,
		reason: String,
	},
	/// A late event from a finished or superseded operation was dropped.
	StaleDiscarded {
		kind: OperationKind,
		generation: u64,
		current_generation: u64,
		source: String,
	},
}

impl LifecycleEvent {
	pub fn kind(&self) -> OperationKind {
		match self {
			LifecycleEvent::StateChanged { kind, .. }
			| LifecycleEvent::IdentifierKnown { kind, .. }
			| LifecycleEvent::IdentifierSuperseded { kind, .. }
			| LifecycleEvent::Confirmed { kind, .. }
			| LifecycleEvent::Failed { kind, .. }
			| LifecycleEvent::TimedOut { kind, .. }
			| LifecycleEvent::Unreconciled { kind, .. }
			| LifecycleEvent::StaleDiscarded { kind, .. } => *kind,
		}
	}
}
