//! Transaction lifecycle orchestration for the DeHack platform.
//!
//! Wallet-signed writes (creating a hackathon, registering, scoring,
//! submitting a project, sponsoring) go through the same lifecycle: the
//! [`RequestBuilder`] validates and encodes the caller's parameters, a
//! [`LifecycleController`] hands the request to the wallet, follows the
//! transaction until its receipt arrives or the deadline passes, and the
//! [`EventDecoder`] turns the receipt into a [`DecodedResult`]. The success
//! callback of an operation fires at most once, and every operation returns
//! its controller to `Idle`.
//!
//! [`DecodedResult`]: dehack_types::DecodedResult

pub mod builder;
pub mod client;
pub mod decoder;
pub mod error;
pub mod event_bus;
pub mod lifecycle;
pub mod notify;
pub mod request;
pub mod wallet;

pub use builder::{BuilderError, ClientBuilder};
pub use client::HackathonClient;
pub use decoder::{DecodeContext, DecodeError, EventDecoder, ExpectedEvent};
pub use error::{is_user_rejection, LifecycleError};
pub use event_bus::EventBus;
pub use lifecycle::{
	ControllerContext, LifecycleController, LifecycleOutcome, SubmissionTicket, SuccessCallback,
	TimeoutTimer,
};
pub use notify::{
	Notification, NotificationBoard, NotificationLevel, NotificationSink, TracingNotifier,
};
pub use request::RequestBuilder;
pub use wallet::WalletConnector;
