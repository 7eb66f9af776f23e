//! Cancellable one-shot timer.

use std::time::Duration;
use tokio::task::AbortHandle;

/// A deadline that runs a closure unless cancelled first.
///
/// Arming replaces any previous deadline. Dropping the timer cancels it.
#[derive(Debug, Default)]
pub struct TimeoutTimer {
	handle: Option<AbortHandle>,
}

impl TimeoutTimer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `on_fire` once `after` has elapsed. Must be called within a tokio runtime.
	pub fn arm<F>(&mut self, after: Duration, on_fire: F)
	where
		F: FnOnce() + Send + 'static,
	{
		self.cancel();
		let task = tokio::spawn(async move {
			tokio::time::sleep(after).await;
			on_fire();
		});
		self.handle = Some(task.abort_handle());
	}

	/// Cancels the pending deadline. Returns whether one was armed.
	///
	/// Cancelling from inside `on_fire` is a no-op for the running closure.
	pub fn cancel(&mut self) -> bool {
		match self.handle.take() {
			Some(handle) => {
				handle.abort();
				true
			},
			None => false,
		}
	}

	pub fn is_armed(&self) -> bool {
		self.handle
			.as_ref()
			.is_some_and(|handle| !handle.is_finished())
	}
}

impl Drop for TimeoutTimer {
	fn drop(&mut self) {
		self.cancel();
	}
}
