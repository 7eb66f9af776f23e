//! Lifecycle state transitions.
//!
//! Controllers move `Idle -> Submitting -> AwaitingConfirmation -> terminal -> Idle`.
//! `Submitting` may also end directly when the wallet refuses or the
//! acceptance deadline passes.

use dehack_types::LifecycleState;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Checks if a state transition is valid
pub fn is_valid_transition(from: LifecycleState, to: LifecycleState) -> bool {
	// Static transition table - each state maps to allowed next states
	static TRANSITIONS: Lazy<HashMap<LifecycleState, HashSet<LifecycleState>>> =
		Lazy::new(|| {
			let mut m = HashMap::new();
			m.insert(
				LifecycleState::Idle,
				HashSet::from([LifecycleState::Submitting]),
			);
			m.insert(
				LifecycleState::Submitting,
				HashSet::from([
					LifecycleState::AwaitingConfirmation,
					LifecycleState::Failed,
					LifecycleState::TimedOut,
				]),
			);
			m.insert(
				LifecycleState::AwaitingConfirmation,
				HashSet::from([
					LifecycleState::Confirmed,
					LifecycleState::Failed,
					LifecycleState::TimedOut,
				]),
			);
			m.insert(LifecycleState::Confirmed, HashSet::from([LifecycleState::Idle]));
			m.insert(LifecycleState::Failed, HashSet::from([LifecycleState::Idle]));
			m.insert(LifecycleState::TimedOut, HashSet::from([LifecycleState::Idle]));
			m
		});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

/// Whether an operation is still waiting on the wallet or the network.
pub fn is_in_flight(state: LifecycleState) -> bool {
	matches!(
		state,
		LifecycleState::Submitting | LifecycleState::AwaitingConfirmation
	)
}
