//! Notification sinks.
//!
//! Controllers report progress to the user through a [`NotificationSink`],
//! keyed by a stable per-operation id so a new notification replaces the
//! previous one for the same operation instead of stacking.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
	Loading,
	Success,
	Error,
}

impl fmt::Display for NotificationLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NotificationLevel::Loading => f.write_str("loading"),
			NotificationLevel::Success => f.write_str("success"),
			NotificationLevel::Error => f.write_str("error"),
		}
	}
}

/// A single user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub id: String,
	pub level: NotificationLevel,
	pub message: String,
}

/// Receives user-facing progress reports.
///
/// Sinks are called outside controller locks, so they may read the
/// controller that notified them. They must not block.
pub trait NotificationSink: Send + Sync {
	fn loading(&self, id: &str, message: &str);
	fn success(&self, id: &str, message: &str);
	fn error(&self, id: &str, message: &str);
}

/// Renders notifications as log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
	fn loading(&self, id: &str, message: &str) {
		tracing::info!(target: "dehack::notify", notification = %id, "{}", message);
	}

	fn success(&self, id: &str, message: &str) {
		tracing::info!(target: "dehack::notify", notification = %id, "{}", message);
	}

	fn error(&self, id: &str, message: &str) {
		tracing::warn!(target: "dehack::notify", notification = %id, "{}", message);
	}
}

#[derive(Debug, Default)]
struct BoardInner {
	latest: HashMap<String, Notification>,
	history: Vec<Notification>,
}

/// Keeps the latest notification per id, plus the full history.
#[derive(Debug, Clone, Default)]
pub struct NotificationBoard {
	inner: Arc<Mutex<BoardInner>>,
}

impl NotificationBoard {
	pub fn new() -> Self {
		Self::default()
	}

	/// The notification currently shown for `id`.
	pub fn latest(&self, id: &str) -> Option<Notification> {
		self.inner
			.lock()
			.ok()
			.and_then(|inner| inner.latest.get(id).cloned())
	}

	/// Every notification ever posted, oldest first.
	pub fn history(&self) -> Vec<Notification> {
		self.inner
			.lock()
			.map(|inner| inner.history.clone())
			.unwrap_or_default()
	}

	/// How many notifications of `level` were posted for `id`.
	pub fn count(&self, id: &str, level: NotificationLevel) -> usize {
		self.history()
			.iter()
			.filter(|n| n.id == id && n.level == level)
			.count()
	}

	fn post(&self, id: &str, level: NotificationLevel, message: &str) {
		let notification = Notification {
			id: id.to_string(),
			level,
			message: message.to_string(),
		};
		if let Ok(mut inner) = self.inner.lock() {
			inner.latest.insert(id.to_string(), notification.clone());
			inner.history.push(notification);
		}
	}
}

impl NotificationSink for NotificationBoard {
	fn loading(&self, id: &str, message: &str) {
		self.post(id, NotificationLevel::Loading, message);
	}

	fn success(&self, id: &str, message: &str) {
		self.post(id, NotificationLevel::Success, message);
	}

	fn error(&self, id: &str, message: &str) {
		self.post(id, NotificationLevel::Error, message);
	}
}
