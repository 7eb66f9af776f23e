//! Hackathon platform client.
//!
//! Owns one [`LifecycleController`] per (contract, operation kind): hackathon
//! creation runs against the platform factory, every other operation
//! against the hackathon contract it targets. Operations on different
//! controllers run independently; a second operation on the same controller
//! is rejected as busy. Controllers that are idle and no longer handed out
//! are dropped the next time one is looked up.

use crate::error::LifecycleError;
use crate::event_bus::EventBus;
use crate::lifecycle::{ControllerContext, LifecycleController, SubmissionTicket, SuccessCallback};
use crate::wallet::WalletConnector;
use dehack_types::{
	Address, BecomeSponsorParams, CreateHackathonParams, OperationKind, OperationParams,
	RegisterParticipantParams, SubmitProjectParams, SubmitScoreParams,
};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub struct HackathonClient {
	platform: Address,
	context: ControllerContext,
	create: LifecycleController,
	controllers: Mutex<HashMap<(Address, OperationKind), LifecycleController>>,
}

impl HackathonClient {
	pub fn new(platform: Address, context: ControllerContext) -> Self {
		let create =
			LifecycleController::new(OperationKind::CreateHackathon, platform, context.clone());
		Self {
			platform,
			context,
			create,
			controllers: Mutex::new(HashMap::new()),
		}
	}

	/// Platform factory address.
	pub fn platform(&self) -> Address {
		self.platform
	}

	pub fn wallet(&self) -> &WalletConnector {
		&self.context.wallet
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.context.event_bus
	}

	/// Controller running `kind` against `hackathon`.
	///
	/// Creation always runs against the platform, whatever `hackathon` is.
	pub fn controller(&self, kind: OperationKind, hackathon: Address) -> LifecycleController {
		if kind == OperationKind::CreateHackathon {
			return self.create.clone();
		}
		let mut controllers = self
			.controllers
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		controllers.retain(|_, controller| !controller.is_detached());
		controllers
			.entry((hackathon, kind))
			.or_insert_with(|| LifecycleController::new(kind, hackathon, self.context.clone()))
			.clone()
	}

	/// Starts whatever operation `params` describes.
	pub fn start(
		&self,
		hackathon: Address,
		params: OperationParams,
		on_success: Option<SuccessCallback>,
	) -> Result<SubmissionTicket, LifecycleError> {
		self.controller(params.kind(), hackathon)
			.start(params, on_success)
	}

	pub fn create_hackathon(
		&self,
		params: CreateHackathonParams,
		on_success: Option<SuccessCallback>,
	) -> Result<SubmissionTicket, LifecycleError> {
		self.create.start(params.into(), on_success)
	}

	pub fn register(
		&self,
		hackathon: Address,
		params: RegisterParticipantParams,
		on_success: Option<SuccessCallback>,
	) -> Result<SubmissionTicket, LifecycleError> {
		self.start(hackathon, params.into(), on_success)
	}

	pub fn submit_score(
		&self,
		hackathon: Address,
		params: SubmitScoreParams,
		on_success: Option<SuccessCallback>,
	) -> Result<SubmissionTicket, LifecycleError> {
		self.start(hackathon, params.into(), on_success)
	}

	pub fn submit_project(
		&self,
		hackathon: Address,
		params: SubmitProjectParams,
		on_success: Option<SuccessCallback>,
	) -> Result<SubmissionTicket, LifecycleError> {
		self.start(hackathon, params.into(), on_success)
	}

	pub fn become_sponsor(
		&self,
		hackathon: Address,
		params: BecomeSponsorParams,
		on_success: Option<SuccessCallback>,
	) -> Result<SubmissionTicket, LifecycleError> {
		self.start(hackathon, params.into(), on_success)
	}
}
