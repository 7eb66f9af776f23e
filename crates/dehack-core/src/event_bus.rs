//! Event bus for lifecycle observers.
//!
//! A thin wrapper over a tokio broadcast channel. Publishing never blocks;
//! slow subscribers lag and miss events rather than stalling controllers.

use dehack_types::LifecycleEvent;
use tokio::sync::broadcast;

/// Broadcasts [`LifecycleEvent`]s to every subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
	sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: LifecycleEvent,
	) -> Result<usize, broadcast::error::SendError<LifecycleEvent>> {
		self.sender.send(event)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
