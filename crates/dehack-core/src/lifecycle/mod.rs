//! Transaction lifecycle controller.
//!
//! A [`LifecycleController`] runs one kind of wallet-signed operation at a
//! time against one contract. `start()` validates synchronously, then a
//! driver task walks the operation through the wallet and the network:
//!
//! 1. the gateway resolves once the wallet accepts the request
//!    (`Submitting -> AwaitingConfirmation`);
//! 2. the confirmation timer is armed for what is left of the deadline and
//!    the identifier feed is followed, a later identifier replacing the one
//!    being watched;
//! 3. the receipt for the current identifier is decoded and the operation
//!    settles as `Confirmed`, `Failed` or `TimedOut`, then returns to `Idle`.
//!
//! The driver and the timer race. Every handler checks the generation the
//! event belongs to, the current state and the tracked identifier under the
//! controller lock, so whichever arrives second is discarded. Settling takes
//! the in-flight record out of the controller exactly once, which cancels the
//! timer, aborts the driver and hands the success callback to its single
//! caller.
//!
//! One deadline, fixed when `start()` accepts the operation, bounds the whole
//! flight. Notifications are queued under the lock and delivered after it is
//! released, in the order they were queued, so a sink may read the controller.

mod state;
mod timer;

pub use state::{is_in_flight, is_valid_transition};
pub use timer::TimeoutTimer;

use crate::decoder::{DecodeContext, EventDecoder};
use crate::error::LifecycleError;
use crate::event_bus::EventBus;
use crate::notify::{Notification, NotificationLevel, NotificationSink};
use crate::request::RequestBuilder;
use crate::wallet::WalletConnector;
use dehack_delivery::{IdentifierFeed, ReceiptWatcher, SubmissionGateway, WatchError};
use dehack_types::{
	format_amount, truncate_id, Address, DecodedResult, LifecycleEvent, LifecycleState, OperationKind,
	OperationParams, PendingTransaction, Receipt, TransactionHash, TransactionRequest, ETHER_DECIMALS,
};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::instrument;

const CONFIRM_IN_WALLET: &str = "Please confirm transaction in your wallet...";
const WAITING_FOR_CONFIRMATION: &str = "Transaction submitted, waiting for confirmation...";

/// Default time from `start()` until an unconfirmed operation times out.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Invoked with the decoded result when an operation is confirmed.
pub type SuccessCallback = Box<dyn FnOnce(DecodedResult) + Send + 'static>;

/// Final outcome of one `start()`.
pub type LifecycleOutcome = Result<DecodedResult, LifecycleError>;

/// Collaborators a controller is built from.
#[derive(Clone)]
pub struct ControllerContext {
	pub builder: RequestBuilder,
	pub decoder: EventDecoder,
	pub gateway: Arc<dyn SubmissionGateway>,
	pub watcher: Arc<dyn ReceiptWatcher>,
	pub wallet: WalletConnector,
	pub notifier: Arc<dyn NotificationSink>,
	pub event_bus: EventBus,
	pub confirmation_timeout: Duration,
}

impl ControllerContext {
	pub fn new(
		gateway: Arc<dyn SubmissionGateway>,
		watcher: Arc<dyn ReceiptWatcher>,
		wallet: WalletConnector,
		notifier: Arc<dyn NotificationSink>,
	) -> Self {
		Self {
			builder: RequestBuilder::default(),
			decoder: EventDecoder::new(),
			gateway,
			watcher,
			wallet,
			notifier,
			event_bus: EventBus::default(),
			confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
		}
	}

	pub fn with_request_builder(mut self, builder: RequestBuilder) -> Self {
		self.builder = builder;
		self
	}

	pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
		self.event_bus = event_bus;
		self
	}

	pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
		self.confirmation_timeout = timeout;
		self
	}
}

/// Handle returned by [`LifecycleController::start`].
///
/// The identifier is the empty placeholder: the real one is only known once
/// the wallet reports it. The authoritative result is the success callback
/// or [`SubmissionTicket::outcome`].
#[derive(Debug)]
pub struct SubmissionTicket {
	pub generation: u64,
	pub identifier: TransactionHash,
	outcome: oneshot::Receiver<LifecycleOutcome>,
}

impl SubmissionTicket {
	/// Waits for the operation to settle.
	pub async fn outcome(self) -> LifecycleOutcome {
		self.outcome.await.unwrap_or_else(|_| {
			Err(LifecycleError::Submission(
				"Lifecycle controller dropped the operation".to_string(),
			))
		})
	}
}

/// Everything owned by the operation currently in flight.
struct Flight {
	account: Address,
	callback: Option<SuccessCallback>,
	pending: Option<PendingTransaction>,
	timer: TimeoutTimer,
	driver: Option<AbortHandle>,
	outcome: Option<oneshot::Sender<LifecycleOutcome>>,
}

impl Flight {
	/// Cancels the timer, stops the driver and clears the tracked identifier.
	/// Returns the callback the first time it is called.
	fn release(&mut self) -> Option<SuccessCallback> {
		self.timer.cancel();
		if let Some(driver) = self.driver.take() {
			driver.abort();
		}
		self.pending = None;
		self.callback.take()
	}
}

#[derive(Default)]
struct Slot {
	state: LifecycleState,
	generation: u64,
	flight: Option<Flight>,
}

/// Notifications waiting to be delivered. Only one caller drains at a time.
#[derive(Default)]
struct Outbox {
	queue: VecDeque<Notification>,
	flushing: bool,
}

struct Shared {
	kind: OperationKind,
	target: Address,
	context: ControllerContext,
	slot: Mutex<Slot>,
	outbox: Mutex<Outbox>,
}

/// Runs one operation kind against one contract, one operation at a time.
#[derive(Clone)]
pub struct LifecycleController {
	shared: Arc<Shared>,
}

impl fmt::Debug for LifecycleController {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LifecycleController")
			.field("kind", &self.shared.kind)
			.field("target", &self.shared.target)
			.field("state", &self.state())
			.finish()
	}
}

impl LifecycleController {
	pub fn new(kind: OperationKind, target: Address, context: ControllerContext) -> Self {
		Self {
			shared: Arc::new(Shared {
				kind,
				target,
				context,
				slot: Mutex::new(Slot::default()),
				outbox: Mutex::new(Outbox::default()),
			}),
		}
	}

	pub fn kind(&self) -> OperationKind {
		self.shared.kind
	}

	/// Contract the operation is sent to.
	pub fn target(&self) -> Address {
		self.shared.target
	}

	pub fn state(&self) -> LifecycleState {
		self.shared.slot().state
	}

	/// Generation of the most recent `start()`. Zero before the first one.
	pub fn generation(&self) -> u64 {
		self.shared.slot().generation
	}

	/// The transaction currently being watched, if any.
	pub fn pending(&self) -> Option<PendingTransaction> {
		self.shared
			.slot()
			.flight
			.as_ref()
			.and_then(|flight| flight.pending.clone())
	}

	/// Account that signed the operation in flight.
	pub fn account(&self) -> Option<Address> {
		self.shared
			.slot()
			.flight
			.as_ref()
			.map(|flight| flight.account)
	}

	pub fn is_timer_armed(&self) -> bool {
		self.shared
			.slot()
			.flight
			.as_ref()
			.is_some_and(|flight| flight.timer.is_armed())
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.shared.context.event_bus
	}

	/// Idle, with no handle or task referring to it besides this one.
	pub(crate) fn is_detached(&self) -> bool {
		Arc::strong_count(&self.shared) == 1 && self.state().is_idle()
	}

	/// Starts an operation.
	///
	/// Fails synchronously with `Busy` while another operation is in flight
	/// (nothing else happens), and with `NotConnected` or `Validation` before
	/// anything reaches the wallet. Must be called within a tokio runtime.
	#[instrument(skip_all, fields(kind = %self.shared.kind, generation = tracing::field::Empty))]
	pub fn start(
		&self,
		params: OperationParams,
		on_success: Option<SuccessCallback>,
	) -> Result<SubmissionTicket, LifecycleError> {
		let shared = &self.shared;
		let kind = shared.kind;
		let mut slot = shared.slot();

		if !slot.state.is_idle() {
			tracing::debug!(state = %slot.state, "Operation already in flight");
			return Err(LifecycleError::Busy(kind));
		}

		let (runtime, account, request) = match shared.prepare(&params) {
			Ok(prepared) => prepared,
			Err(e) => {
				drop(slot);
				tracing::warn!(error = %e, "Rejected before submission");
				shared.post(NotificationLevel::Error, e.user_message(kind));
				shared.flush();
				return Err(e);
			},
		};

		slot.generation += 1;
		let generation = slot.generation;
		tracing::Span::current().record("generation", generation);

		shared.transition(&mut slot, LifecycleState::Submitting);
		shared.post(NotificationLevel::Loading, CONFIRM_IN_WALLET);

		let value = request
			.value()
			.map(|value| format_amount(value, ETHER_DECIMALS))
			.unwrap_or_else(|| "0".to_string());
		let deadline = Instant::now() + shared.context.confirmation_timeout;
		let (outcome_tx, outcome_rx) = oneshot::channel();
		let driver = runtime.spawn(drive(
			shared.clone(),
			generation,
			deadline,
			request,
			account,
		));
		slot.flight = Some(Flight {
			account,
			callback: on_success,
			pending: None,
			timer: TimeoutTimer::new(),
			driver: Some(driver.abort_handle()),
			outcome: Some(outcome_tx),
		});
		drop(slot);
		shared.flush();

		tracing::info!(
			account = %account,
			target = %shared.target,
			value_eth = %value,
			"Submitting to wallet"
		);
		Ok(SubmissionTicket {
			generation,
			identifier: TransactionHash::placeholder(),
			outcome: outcome_rx,
		})
	}
}

impl Shared {
	fn slot(&self) -> MutexGuard<'_, Slot> {
		self.slot.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn publish(&self, event: LifecycleEvent) {
		self.context.event_bus.publish(event).ok();
	}

	fn outbox(&self) -> MutexGuard<'_, Outbox> {
		self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Queues a notification for this operation kind. Delivered by `flush`.
	fn post(&self, level: NotificationLevel, message: impl Into<String>) {
		self.outbox().queue.push_back(Notification {
			id: self.kind.notification_id().to_string(),
			level,
			message: message.into(),
		});
	}

	/// Delivers queued notifications. Must not be called with the slot locked.
	///
	/// A caller that finds another flush in progress leaves its notifications
	/// to that one, which keeps delivery in queue order.
	fn flush(&self) {
		{
			let mut outbox = self.outbox();
			if outbox.flushing {
				return;
			}
			outbox.flushing = true;
		}
		loop {
			let next = {
				let mut outbox = self.outbox();
				let next = outbox.queue.pop_front();
				if next.is_none() {
					outbox.flushing = false;
				}
				next
			};
			let Some(Notification { id, level, message }) = next else {
				return;
			};
			let notifier = &self.context.notifier;
			match level {
				NotificationLevel::Loading => notifier.loading(&id, &message),
				NotificationLevel::Success => notifier.success(&id, &message),
				NotificationLevel::Error => notifier.error(&id, &message),
			}
		}
	}

	/// Checks everything `start()` needs before any side effect.
	fn prepare(
		&self,
		params: &OperationParams,
	) -> Result<(tokio::runtime::Handle, Address, TransactionRequest), LifecycleError> {
		let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
			LifecycleError::Submission(format!("No async runtime available: {}", e))
		})?;
		let account = self
			.context
			.wallet
			.current()
			.ok_or(LifecycleError::NotConnected)?;
		let request = self.context.builder.build(self.kind, self.target, params)?;
		Ok((runtime, account, request))
	}

	fn transition(&self, slot: &mut Slot, to: LifecycleState) -> bool {
		let from = slot.state;
		if !is_valid_transition(from, to) {
			tracing::error!(%from, %to, "Invalid lifecycle transition");
			return false;
		}
		slot.state = to;
		tracing::debug!(%from, %to, "State changed");
		self.publish(LifecycleEvent::StateChanged {
			kind: self.kind,
			generation: slot.generation,
			from,
			to,
		});
		true
	}

	/// Whether an event from `generation` may still act on the slot.
	///
	/// `expected` narrows the accepted state; `None` accepts any in-flight state.
	fn admits(
		&self,
		slot: &Slot,
		generation: u64,
		expected: Option<LifecycleState>,
		source: &str,
	) -> bool {
		let state_matches = match expected {
			Some(expected) => slot.state == expected,
			None => is_in_flight(slot.state),
		};
		if slot.generation == generation && state_matches {
			return true;
		}
		self.discard(slot, generation, source);
		false
	}

	fn discard(&self, slot: &Slot, generation: u64, source: &str) {
		tracing::debug!(
			generation,
			current_generation = slot.generation,
			state = %slot.state,
			source,
			"Discarded stale event"
		);
		self.publish(LifecycleEvent::StaleDiscarded {
			kind: self.kind,
			generation,
			current_generation: slot.generation,
			source: source.to_string(),
		});
	}

	/// The wallet accepted the request: wait for confirmation until `deadline`.
	fn accept(this: &Arc<Self>, generation: u64, deadline: Instant) -> bool {
		let mut slot = this.slot();
		if !this.admits(
			&slot,
			generation,
			Some(LifecycleState::Submitting),
			"wallet acceptance",
		) {
			return false;
		}
		this.transition(&mut slot, LifecycleState::AwaitingConfirmation);

		let weak = Arc::downgrade(this);
		let remaining = deadline.saturating_duration_since(Instant::now());
		if let Some(flight) = slot.flight.as_mut() {
			flight.timer.arm(remaining, move || {
				if let Some(shared) = weak.upgrade() {
					shared.finish(
						generation,
						LifecycleState::TimedOut,
						Err(LifecycleError::ReceiptTimeout),
						None,
						"confirmation timer",
					);
				}
			});
		}

		this.post(NotificationLevel::Loading, WAITING_FOR_CONFIRMATION);
		drop(slot);
		this.flush();
		true
	}

	/// Records the identifier the wallet reported, superseding any earlier one.
	fn track(&self, generation: u64, identifier: &TransactionHash) -> bool {
		let mut slot = self.slot();
		if !self.admits(
			&slot,
			generation,
			Some(LifecycleState::AwaitingConfirmation),
			"identifier feed",
		) {
			return false;
		}
		let Some(flight) = slot.flight.as_mut() else {
			return false;
		};

		let previous = flight.pending.as_ref().map(|p| p.identifier.clone());
		if previous.as_ref() == Some(identifier) {
			return true;
		}
		flight.pending = Some(PendingTransaction::new(identifier.clone()));

		let event = match previous {
			Some(previous) => {
				tracing::info!(
					previous = %truncate_id(&previous.to_string()),
					tx_hash = %truncate_id(&identifier.to_string()),
					"Transaction identifier superseded"
				);
				LifecycleEvent::IdentifierSuperseded {
					kind: self.kind,
					generation,
					previous,
					current: identifier.clone(),
				}
			},
			None => {
				tracing::info!(
					tx_hash = %truncate_id(&identifier.to_string()),
					"Transaction identifier known"
				);
				LifecycleEvent::IdentifierKnown {
					kind: self.kind,
					generation,
					identifier: identifier.clone(),
				}
			},
		};
		self.publish(event);
		true
	}

	/// Turns the receipt for `identifier` into the operation's outcome.
	///
	/// Returns false when the receipt belongs to another transaction and the
	/// watch should go on.
	fn settle(
		&self,
		generation: u64,
		identifier: &TransactionHash,
		receipt: Result<Receipt, WatchError>,
		context: &DecodeContext,
	) -> bool {
		let receipt = match receipt {
			Ok(receipt) => receipt,
			Err(e) => {
				tracing::warn!(error = %e, "Receipt watcher failed");
				self.finish(
					generation,
					LifecycleState::Failed,
					Err(e.into()),
					Some(identifier),
					"receipt watcher",
				);
				return true;
			},
		};

		if !receipt.identifier.is_empty() && receipt.identifier != *identifier {
			tracing::warn!(
				expected = %truncate_id(&identifier.to_string()),
				received = %truncate_id(&receipt.identifier.to_string()),
				"Receipt does not belong to the watched transaction"
			);
			self.discard(&self.slot(), generation, "mismatched receipt");
			return false;
		}

		let outcome = if receipt.is_success() {
			self.context
				.decoder
				.decode(self.kind, identifier, &receipt, context)
				.map_err(|reason| LifecycleError::Unreconciled {
					identifier: identifier.clone(),
					reason,
				})
		} else {
			Err(LifecycleError::Reverted(identifier.clone()))
		};
		let terminal = if outcome.is_ok() {
			LifecycleState::Confirmed
		} else {
			LifecycleState::Failed
		};
		self.finish(generation, terminal, outcome, Some(identifier), "receipt watcher");
		true
	}

	/// Settles the operation of `generation`, once.
	///
	/// When `identifier` is given the event only counts if it is still the
	/// tracked identifier.
	fn finish(
		&self,
		generation: u64,
		terminal: LifecycleState,
		outcome: LifecycleOutcome,
		identifier: Option<&TransactionHash>,
		source: &str,
	) {
		let kind = self.kind;
		let mut slot = self.slot();
		if !self.admits(&slot, generation, None, source) {
			return;
		}
		if let Some(identifier) = identifier {
			let tracked = slot
				.flight
				.as_ref()
				.and_then(|flight| flight.pending.as_ref())
				.map(|pending| &pending.identifier);
			if tracked != Some(identifier) {
				self.discard(&slot, generation, source);
				return;
			}
		}
		if !self.transition(&mut slot, terminal) {
			return;
		}

		let mut flight = slot.flight.take();
		let callback = flight.as_mut().and_then(Flight::release);

		match &outcome {
			Ok(result) => {
				tracing::info!(
					tx_hash = %truncate_id(&result.identifier().to_string()),
					"Operation confirmed"
				);
				self.publish(LifecycleEvent::Confirmed {
					kind,
					generation,
					result: result.clone(),
				});
				self.post(NotificationLevel::Success, kind.success_message());
			},
			Err(error) => {
				match error {
					LifecycleError::ReceiptTimeout => {
						tracing::warn!(source, "Operation timed out");
						self.publish(LifecycleEvent::TimedOut { kind, generation });
					},
					LifecycleError::Unreconciled { identifier, reason } => {
						tracing::error!(
							target: "dehack::reconcile",
							kind = %kind,
							generation,
							tx_hash = %identifier,
							error = %reason,
							"Transaction succeeded on-chain but its result could not be decoded"
						);
						self.publish(LifecycleEvent::Unreconciled {
							kind,
							generation,
							identifier: identifier.clone(),
							reason: reason.to_string(),
						});
					},
					other => {
						tracing::warn!(error = %other, "Operation failed");
						self.publish(LifecycleEvent::Failed {
							kind,
							generation,
							error: other.to_string(),
						});
					},
				}
				self.post(NotificationLevel::Error, error.user_message(kind));
			},
		}

		self.transition(&mut slot, LifecycleState::Idle);
		drop(slot);
		self.flush();

		if let (Ok(result), Some(callback)) = (&outcome, callback) {
			callback(result.clone());
		}
		if let Some(sender) = flight.as_mut().and_then(|flight| flight.outcome.take()) {
			sender.send(outcome).ok();
		}
	}
}

enum Step {
	Identifier(Option<Result<TransactionHash, dehack_delivery::GatewayError>>),
	Receipt(TransactionHash, Result<Receipt, WatchError>),
}

/// Drives one operation from wallet submission to receipt.
#[instrument(skip_all, fields(kind = %shared.kind, generation = generation))]
async fn drive(
	shared: Arc<Shared>,
	generation: u64,
	deadline: Instant,
	request: TransactionRequest,
	account: Address,
) {
	let feed: IdentifierFeed =
		match tokio::time::timeout_at(deadline, shared.context.gateway.submit(&request)).await {
			Ok(Ok(feed)) => feed,
			Ok(Err(e)) => {
				tracing::warn!(error = %e, "Wallet did not accept the request");
				shared.finish(
					generation,
					LifecycleState::Failed,
					Err(e.into()),
					None,
					"submission gateway",
				);
				return;
			},
			Err(_) => {
				shared.finish(
					generation,
					LifecycleState::TimedOut,
					Err(LifecycleError::ReceiptTimeout),
					None,
					"wallet acceptance deadline",
				);
				return;
			},
		};

	if !Shared::accept(&shared, generation, deadline) {
		return;
	}

	let context = DecodeContext {
		account,
		value: request.value(),
	};
	let mut feed = Some(feed);
	let mut current: Option<TransactionHash> = None;

	loop {
		let step = match (current.as_ref(), feed.as_mut()) {
			(None, Some(feed)) => Step::Identifier(feed.next().await),
			(Some(identifier), Some(feed)) => tokio::select! {
				next = feed.next() => Step::Identifier(next),
				receipt = shared.context.watcher.watch(identifier) => {
					Step::Receipt(identifier.clone(), receipt)
				}
			},
			(Some(identifier), None) => Step::Receipt(
				identifier.clone(),
				shared.context.watcher.watch(identifier).await,
			),
			(None, None) => return,
		};

		match step {
			Step::Identifier(Some(Ok(identifier))) => {
				if identifier.is_empty() {
					continue;
				}
				if !shared.track(generation, &identifier) {
					return;
				}
				current = Some(identifier);
			},
			Step::Identifier(Some(Err(e))) => {
				tracing::warn!(error = %e, "Wallet failed after accepting the request");
				shared.finish(
					generation,
					LifecycleState::Failed,
					Err(e.into()),
					None,
					"identifier feed",
				);
				return;
			},
			Step::Identifier(None) => {
				if current.is_none() {
					shared.finish(
						generation,
						LifecycleState::Failed,
						Err(LifecycleError::Submission(
							"Wallet closed without reporting a transaction identifier".to_string(),
						)),
						None,
						"identifier feed",
					);
					return;
				}
				feed = None;
			},
			Step::Receipt(identifier, receipt) => {
				if shared.settle(generation, &identifier, receipt, &context) {
					return;
				}
				tokio::task::yield_now().await;
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::decoder::{HackathonCreated, ScoreSubmitted};
	use crate::notify::NotificationBoard;
	use alloy_sol_types::{SolEvent, SolValue};
	use async_trait::async_trait;
	use dehack_delivery::implementations::memory::ReceiptBoard;
	use dehack_delivery::implementations::relay::{relay, WalletRelay};
	use dehack_delivery::GatewayError;
	use dehack_types::{
		Bytes, CreateHackathonParams, LogEntry, ReceiptStatus, SubmitScoreParams, VotingConfig,
		VotingSystem, B256, U256,
	};
	use tokio::sync::broadcast;

	/// Hands out queued receipts whatever identifier is asked for.
	struct ScriptedWatcher {
		receipts: Mutex<VecDeque<Receipt>>,
	}

	impl ScriptedWatcher {
		fn new(receipts: Vec<Receipt>) -> Self {
			Self {
				receipts: Mutex::new(receipts.into()),
			}
		}
	}

	#[async_trait]
	impl ReceiptWatcher for ScriptedWatcher {
		async fn watch(&self, _identifier: &TransactionHash) -> Result<Receipt, WatchError> {
			let next = self.receipts.lock().unwrap().pop_front();
			match next {
				Some(receipt) => Ok(receipt),
				None => std::future::pending().await,
			}
		}
	}

	/// Reads the controller every time it is notified.
	#[derive(Default)]
	struct ObservingSink {
		controller: Mutex<Option<LifecycleController>>,
		seen: Mutex<Vec<(NotificationLevel, LifecycleState)>>,
	}

	impl ObservingSink {
		fn observe(&self, level: NotificationLevel) {
			let controller = self.controller.lock().unwrap().clone();
			if let Some(controller) = controller {
				self.seen.lock().unwrap().push((level, controller.state()));
			}
		}
	}

	impl NotificationSink for ObservingSink {
		fn loading(&self, _id: &str, _message: &str) {
			self.observe(NotificationLevel::Loading);
		}

		fn success(&self, _id: &str, _message: &str) {
			self.observe(NotificationLevel::Success);
		}

		fn error(&self, _id: &str, _message: &str) {
			self.observe(NotificationLevel::Error);
		}
	}

	const ACCOUNT: Address = Address::new([0x77; 20]);
	const HACKATHON: Address = Address::new([0x42; 20]);
	const PARTICIPANT: &str = "0xabcdabcdabcdabcdabcdabcdabcdabcdabcdabcd";

	struct Harness {
		controller: LifecycleController,
		wallet: WalletConnector,
		relay: WalletRelay,
		receipts: ReceiptBoard,
		notes: NotificationBoard,
		events: broadcast::Receiver<LifecycleEvent>,
		calls: Arc<Mutex<Vec<DecodedResult>>>,
	}

	impl Harness {
		fn new(kind: OperationKind) -> Self {
			let receipts = ReceiptBoard::new();
			Self::with_watcher(kind, receipts.clone(), Arc::new(receipts))
		}

		fn with_watcher(
			kind: OperationKind,
			receipts: ReceiptBoard,
			watcher: Arc<dyn ReceiptWatcher>,
		) -> Self {
			let (gateway, relay) = relay();
			let notes = NotificationBoard::new();
			let wallet = WalletConnector::connected(ACCOUNT);
			let bus = EventBus::new(256);
			let events = bus.subscribe();
			let context = ControllerContext::new(
				Arc::new(gateway),
				watcher,
				wallet.clone(),
				Arc::new(notes.clone()),
			)
			.with_event_bus(bus);

			Self {
				controller: LifecycleController::new(kind, HACKATHON, context),
				wallet,
				relay,
				receipts,
				notes,
				events,
				calls: Arc::new(Mutex::new(Vec::new())),
			}
		}

		fn callback(&self) -> Option<SuccessCallback> {
			let calls = self.calls.clone();
			Some(Box::new(move |result| calls.lock().unwrap().push(result)))
		}

		fn calls(&self) -> Vec<DecodedResult> {
			self.calls.lock().unwrap().clone()
		}

		fn drain(&mut self) -> Vec<LifecycleEvent> {
			let mut events = Vec::new();
			while let Ok(event) = self.events.try_recv() {
				events.push(event);
			}
			events
		}

		fn states(events: &[LifecycleEvent]) -> Vec<LifecycleState> {
			events
				.iter()
				.filter_map(|event| match event {
					LifecycleEvent::StateChanged { to, .. } => Some(*to),
					_ => None,
				})
				.collect()
		}

		fn errors(&self) -> usize {
			self.notes
				.count(self.controller.kind().notification_id(), NotificationLevel::Error)
		}
	}

	fn tx(byte: u8) -> TransactionHash {
		TransactionHash::from(B256::repeat_byte(byte))
	}

	fn score_params(score: i64) -> OperationParams {
		SubmitScoreParams {
			participant: PARTICIPANT.to_string(),
			score,
		}
		.into()
	}

	fn create_params() -> OperationParams {
		CreateHackathonParams {
			hackathon_id: "1".to_string(),
			start_time: 1_700_000_000,
			end_time: 1_700_604_800,
			minimum_sponsor_contribution: "0.1".to_string(),
			stake_amount: "0.01".to_string(),
			prize_distribution: vec!["100".to_string()],
			judges: vec![format!("{}", ACCOUNT)],
			voting: VotingConfig {
				system: VotingSystem::Open,
				quadratic: false,
				voting_power_per_judge: 10,
				max_winners: 1,
			},
			value: "0.5".to_string(),
		}
		.into()
	}

	fn score_receipt(identifier: TransactionHash, score: u64) -> Receipt {
		let participant: Address = PARTICIPANT.parse().unwrap();
		Receipt {
			identifier,
			status: ReceiptStatus::Success,
			block_number: Some(100),
			logs: vec![LogEntry {
				address: HACKATHON,
				topics: vec![
					ScoreSubmitted::SIGNATURE_HASH,
					participant.into_word(),
					ACCOUNT.into_word(),
				],
				data: Bytes::from(U256::from(score).abi_encode()),
			}],
		}
	}

	#[tokio::test]
	async fn test_score_confirmed_once() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let ticket = h.controller.start(score_params(87), h.callback()).unwrap();
		assert!(ticket.identifier.is_empty());
		assert_eq!(ticket.generation, 1);
		assert_eq!(h.controller.state(), LifecycleState::Submitting);

		let prompt = h.relay.next_prompt().await.unwrap();
		assert_eq!(prompt.request().kind(), OperationKind::SubmitScore);
		assert_eq!(prompt.request().to(), HACKATHON);
		let identifiers = prompt.sign();
		assert!(identifiers.send(tx(0x01)));
		h.receipts.publish(score_receipt(tx(0x01), 87));

		let result = ticket.outcome().await.unwrap();
		let expected = DecodedResult::ScoreSubmitted {
			identifier: tx(0x01),
			participant: PARTICIPANT.parse().unwrap(),
			judge: ACCOUNT,
			score: 87,
		};
		assert_eq!(result, expected);
		assert_eq!(h.calls(), vec![expected]);

		assert_eq!(h.controller.state(), LifecycleState::Idle);
		assert!(!h.controller.is_timer_armed());
		assert!(h.controller.pending().is_none());

		let events = h.drain();
		assert_eq!(
			Harness::states(&events),
			vec![
				LifecycleState::Submitting,
				LifecycleState::AwaitingConfirmation,
				LifecycleState::Confirmed,
				LifecycleState::Idle,
			]
		);
		assert!(events
			.iter()
			.any(|e| matches!(e, LifecycleEvent::IdentifierKnown { identifier, .. } if *identifier == tx(0x01))));

		let latest = h.notes.latest("score-submission").unwrap();
		assert_eq!(latest.level, NotificationLevel::Success);
		assert_eq!(latest.message, "Score submitted successfully!");
		assert_eq!(h.errors(), 0);

		// A duplicate receipt after settling changes nothing
		h.receipts.publish(score_receipt(tx(0x01), 87));
		tokio::task::yield_now().await;
		assert_eq!(h.calls().len(), 1);
	}

	#[tokio::test]
	async fn test_busy_rejects_without_submitting() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let _ticket = h.controller.start(score_params(50), h.callback()).unwrap();
		let _prompt = h.relay.next_prompt().await.unwrap();

		let second = h.controller.start(score_params(60), None);
		assert_eq!(
			second.unwrap_err(),
			LifecycleError::Busy(OperationKind::SubmitScore)
		);
		assert_eq!(h.controller.generation(), 1);

		for _ in 0..10 {
			tokio::task::yield_now().await;
		}
		assert!(h.relay.try_next_prompt().is_none());
		assert_eq!(
			h.notes
				.count("score-submission", NotificationLevel::Error),
			0
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_identifier_never_arrives() {
		let mut h = Harness::new(OperationKind::CreateHackathon);
		let ticket = h.controller.start(create_params(), h.callback()).unwrap();

		let prompt = h.relay.next_prompt().await.unwrap();
		assert_eq!(
			prompt.request().value(),
			Some(U256::from(500_000_000_000_000_000u64))
		);
		let identifiers = prompt.sign();

		assert_eq!(ticket.outcome().await, Err(LifecycleError::ReceiptTimeout));
		assert_eq!(h.controller.state(), LifecycleState::Idle);
		assert!(h.calls().is_empty());
		assert_eq!(h.errors(), 1);
		assert_eq!(
			h.notes.latest("create-hackathon").unwrap().message,
			"Transaction timed out. Please try again."
		);

		let events = h.drain();
		assert_eq!(
			Harness::states(&events),
			vec![
				LifecycleState::Submitting,
				LifecycleState::AwaitingConfirmation,
				LifecycleState::TimedOut,
				LifecycleState::Idle,
			]
		);
		assert!(events
			.iter()
			.any(|e| matches!(e, LifecycleEvent::TimedOut { generation: 1, .. })));

		// The wallet reports late
		identifiers.send(tx(0x09));
		h.receipts.publish(score_receipt(tx(0x09), 1));
		tokio::time::sleep(Duration::from_secs(600)).await;
		assert!(h.calls().is_empty());
		assert_eq!(h.errors(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_receipt_never_arrives() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let ticket = h.controller.start(score_params(10), h.callback()).unwrap();
		let identifiers = h.relay.next_prompt().await.unwrap().sign();
		identifiers.send(tx(0x02));

		tokio::time::sleep(Duration::from_secs(299)).await;
		assert_eq!(h.controller.state(), LifecycleState::AwaitingConfirmation);
		assert_eq!(h.controller.pending().unwrap().identifier, tx(0x02));
		assert!(h.controller.is_timer_armed());

		assert_eq!(ticket.outcome().await, Err(LifecycleError::ReceiptTimeout));
		h.receipts.publish(score_receipt(tx(0x02), 10));
		tokio::time::sleep(Duration::from_secs(10)).await;
		assert!(h.calls().is_empty());
		assert_eq!(h.errors(), 1);
		let _ = h.drain();
	}

	#[tokio::test(start_paused = true)]
	async fn test_wallet_never_answers() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let ticket = h.controller.start(score_params(10), None).unwrap();
		let _prompt = h.relay.next_prompt().await.unwrap();

		assert_eq!(ticket.outcome().await, Err(LifecycleError::ReceiptTimeout));
		assert_eq!(
			Harness::states(&h.drain()),
			vec![
				LifecycleState::Submitting,
				LifecycleState::TimedOut,
				LifecycleState::Idle,
			]
		);
	}

	#[tokio::test]
	async fn test_user_rejection() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let ticket = h.controller.start(score_params(87), h.callback()).unwrap();
		h.relay
			.next_prompt()
			.await
			.unwrap()
			.fail(GatewayError::ProviderUnavailable(
				"MetaMask Tx Signature: User rejected the transaction.".to_string(),
			));

		assert_eq!(ticket.outcome().await, Err(LifecycleError::UserRejected));
		assert_eq!(h.controller.state(), LifecycleState::Idle);
		assert!(!h.controller.is_timer_armed());
		assert!(h.calls().is_empty());

		let latest = h.notes.latest("score-submission").unwrap();
		assert_eq!(latest.level, NotificationLevel::Error);
		assert_eq!(latest.message, "Transaction rejected by user");

		let states = Harness::states(&h.drain());
		assert_eq!(
			states,
			vec![
				LifecycleState::Submitting,
				LifecycleState::Failed,
				LifecycleState::Idle,
			]
		);

		// The controller is usable again
		let ticket = h.controller.start(score_params(88), None).unwrap();
		assert_eq!(ticket.generation, 2);
		h.relay.next_prompt().await.unwrap().decline("no thanks");
		assert_eq!(ticket.outcome().await, Err(LifecycleError::UserRejected));
	}

	#[tokio::test]
	async fn test_provider_failure_surfaces_message() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let ticket = h.controller.start(score_params(87), None).unwrap();
		h.relay
			.next_prompt()
			.await
			.unwrap()
			.fail(GatewayError::NetworkRejected("insufficient funds".to_string()));

		assert_eq!(
			ticket.outcome().await,
			Err(LifecycleError::Submission("insufficient funds".to_string()))
		);
		assert_eq!(
			h.notes.latest("score-submission").unwrap().message,
			"Failed to submit score: insufficient funds"
		);
	}

	#[tokio::test]
	async fn test_missing_log_is_unreconciled() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let ticket = h.controller.start(score_params(87), h.callback()).unwrap();
		let identifiers = h.relay.next_prompt().await.unwrap().sign();
		identifiers.send(tx(0x03));

		let mut receipt = score_receipt(tx(0x03), 87);
		receipt.logs[0].topics[0] = HackathonCreated::SIGNATURE_HASH;
		h.receipts.publish(receipt);

		let outcome = ticket.outcome().await;
		assert!(matches!(
			outcome,
			Err(LifecycleError::Unreconciled { ref identifier, .. }) if *identifier == tx(0x03)
		));
		assert!(h.calls().is_empty());
		assert_eq!(h.controller.state(), LifecycleState::Idle);
		assert!(h
			.drain()
			.iter()
			.any(|e| matches!(e, LifecycleEvent::Unreconciled { .. })));
		assert_eq!(h.errors(), 1);
	}

	#[tokio::test]
	async fn test_reverted_receipt() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let ticket = h.controller.start(score_params(87), h.callback()).unwrap();
		let identifiers = h.relay.next_prompt().await.unwrap().sign();
		identifiers.send(tx(0x04));

		let mut receipt = score_receipt(tx(0x04), 87);
		receipt.status = ReceiptStatus::Reverted;
		h.receipts.publish(receipt);

		assert_eq!(
			ticket.outcome().await,
			Err(LifecycleError::Reverted(tx(0x04)))
		);
		assert!(h.calls().is_empty());
		assert_eq!(
			Harness::states(&h.drain()),
			vec![
				LifecycleState::Submitting,
				LifecycleState::AwaitingConfirmation,
				LifecycleState::Failed,
				LifecycleState::Idle,
			]
		);
	}

	#[tokio::test]
	async fn test_superseded_identifier() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let ticket = h.controller.start(score_params(70), h.callback()).unwrap();
		let identifiers = h.relay.next_prompt().await.unwrap().sign();
		identifiers.send(tx(0x05));
		identifiers.send(tx(0x06));
		h.receipts.publish(score_receipt(tx(0x06), 70));

		let result = ticket.outcome().await.unwrap();
		assert_eq!(result.identifier(), &tx(0x06));

		let events = h.drain();
		assert!(events.iter().any(|e| matches!(
			e,
			LifecycleEvent::IdentifierSuperseded { previous, current, .. }
				if *previous == tx(0x05) && *current == tx(0x06)
		)));

		// The superseded transaction's receipt lands afterwards
		h.receipts.publish(score_receipt(tx(0x05), 70));
		tokio::task::yield_now().await;
		assert_eq!(h.calls().len(), 1);
	}

	#[tokio::test]
	async fn test_not_connected() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		h.wallet.disconnect();

		let result = h.controller.start(score_params(87), h.callback());
		assert_eq!(result.unwrap_err(), LifecycleError::NotConnected);
		assert_eq!(h.controller.state(), LifecycleState::Idle);
		assert_eq!(h.controller.generation(), 0);
		assert!(h.relay.try_next_prompt().is_none());
		assert_eq!(
			h.notes.latest("score-submission").unwrap().message,
			"Please connect your wallet first"
		);
		assert!(h.drain().is_empty());
	}

	#[tokio::test]
	async fn test_validation_rejected_before_wallet() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let result = h.controller.start(score_params(101), h.callback());
		assert!(matches!(
			result,
			Err(LifecycleError::Validation(
				dehack_types::ValidationError::ScoreOutOfRange(101)
			))
		));
		assert_eq!(h.controller.state(), LifecycleState::Idle);
		assert!(h.relay.try_next_prompt().is_none());
		assert_eq!(h.errors(), 1);
	}

	#[tokio::test]
	async fn test_registration_echoes_stake() {
		let mut h = Harness::new(OperationKind::RegisterParticipant);
		let params = dehack_types::RegisterParticipantParams {
			stake_amount: "0.01".to_string(),
		};
		let ticket = h.controller.start(params.into(), h.callback()).unwrap();
		let identifiers = h.relay.next_prompt().await.unwrap().sign();
		identifiers.send(tx(0x07));
		h.receipts.publish(Receipt {
			identifier: tx(0x07),
			status: ReceiptStatus::Success,
			block_number: Some(5),
			logs: vec![],
		});

		assert_eq!(
			ticket.outcome().await.unwrap(),
			DecodedResult::ParticipantRegistered {
				identifier: tx(0x07),
				participant: ACCOUNT,
				stake_amount: U256::from(10_000_000_000_000_000u64),
			}
		);
	}

	#[tokio::test]
	async fn test_stale_generation_discarded() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let first = h.controller.start(score_params(1), h.callback()).unwrap();
		h.relay
			.next_prompt()
			.await
			.unwrap()
			.decline("User denied transaction signature");
		assert_eq!(first.outcome().await, Err(LifecycleError::UserRejected));

		let _second = h.controller.start(score_params(2), h.callback()).unwrap();
		let _ = h.drain();

		// A late result for the first operation must not settle the second
		h.controller.shared.finish(
			1,
			LifecycleState::Confirmed,
			Ok(DecodedResult::ScoreSubmitted {
				identifier: tx(0x08),
				participant: Address::ZERO,
				judge: ACCOUNT,
				score: 1,
			}),
			None,
			"late receipt",
		);
		assert_eq!(h.controller.state(), LifecycleState::Submitting);
		assert!(h.calls().is_empty());
		assert!(h.drain().iter().any(|e| matches!(
			e,
			LifecycleEvent::StaleDiscarded {
				generation: 1,
				current_generation: 2,
				..
			}
		)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_deadline_counts_from_start() {
		let mut h = Harness::new(OperationKind::SubmitScore);
		let started = Instant::now();
		let ticket = h.controller.start(score_params(40), h.callback()).unwrap();

		let prompt = h.relay.next_prompt().await.unwrap();
		tokio::time::sleep(Duration::from_secs(299)).await;
		let _identifiers = prompt.sign();
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert_eq!(h.controller.state(), LifecycleState::AwaitingConfirmation);

		assert_eq!(ticket.outcome().await, Err(LifecycleError::ReceiptTimeout));
		assert!(started.elapsed() <= DEFAULT_CONFIRMATION_TIMEOUT + Duration::from_millis(1));
		assert_eq!(h.controller.state(), LifecycleState::Idle);
		assert!(h.calls().is_empty());
		assert_eq!(h.errors(), 1);
		let _ = h.drain();
	}

	#[tokio::test]
	async fn test_sink_may_read_controller() {
		let (gateway, mut relay) = relay();
		let receipts = ReceiptBoard::new();
		let sink = Arc::new(ObservingSink::default());
		let wallet = WalletConnector::connected(ACCOUNT);
		let context = ControllerContext::new(
			Arc::new(gateway),
			Arc::new(receipts.clone()),
			wallet.clone(),
			sink.clone(),
		);
		let controller = LifecycleController::new(OperationKind::SubmitScore, HACKATHON, context);
		*sink.controller.lock().unwrap() = Some(controller.clone());

		let ticket = controller.start(score_params(87), None).unwrap();
		let identifiers = relay.next_prompt().await.unwrap().sign();
		identifiers.send(tx(0x0a));
		receipts.publish(score_receipt(tx(0x0a), 87));
		assert!(ticket.outcome().await.is_ok());

		assert_eq!(
			*sink.seen.lock().unwrap(),
			vec![
				(NotificationLevel::Loading, LifecycleState::Submitting),
				(NotificationLevel::Loading, LifecycleState::AwaitingConfirmation),
				(NotificationLevel::Success, LifecycleState::Idle),
			]
		);

		// Rejections before submission notify too
		wallet.disconnect();
		assert_eq!(
			controller.start(score_params(87), None).unwrap_err(),
			LifecycleError::NotConnected
		);
		assert_eq!(
			sink.seen.lock().unwrap().last(),
			Some(&(NotificationLevel::Error, LifecycleState::Idle))
		);
		sink.controller.lock().unwrap().take();
	}

	#[tokio::test]
	async fn test_mismatched_receipt_keeps_watching() {
		let mut stray = score_receipt(tx(0x0c), 5);
		stray.status = ReceiptStatus::Reverted;
		let mut anonymous = score_receipt(tx(0x0b), 64);
		anonymous.identifier = TransactionHash::placeholder();
		let watcher = ScriptedWatcher::new(vec![stray, anonymous]);

		let mut h = Harness::with_watcher(
			OperationKind::SubmitScore,
			ReceiptBoard::new(),
			Arc::new(watcher),
		);
		let ticket = h.controller.start(score_params(64), h.callback()).unwrap();
		let identifiers = h.relay.next_prompt().await.unwrap().sign();
		identifiers.send(tx(0x0b));

		let result = ticket.outcome().await.unwrap();
		assert_eq!(result.identifier(), &tx(0x0b));
		assert_eq!(h.calls(), vec![result]);
		assert!(h.drain().iter().any(|e| matches!(
			e,
			LifecycleEvent::StaleDiscarded { source, .. } if source == "mismatched receipt"
		)));
	}
}
