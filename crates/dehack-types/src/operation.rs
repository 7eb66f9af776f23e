//! Operation types for the hackathon platform.
//!
//! Each wallet-signed write the platform supports is an [`OperationKind`].
//! Callers describe what they want with [`OperationParams`]; the request
//! builder turns those into an immutable [`TransactionRequest`], and once the
//! receipt is in, the event decoder produces a [`DecodedResult`].

use crate::TransactionHash;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{keccak256, Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of wallet-signed operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
	/// Deploys a new hackathon through the platform factory.
	CreateHackathon,
	/// Registers the connected wallet as a participant, staking ETH.
	RegisterParticipant,
	/// A judge scores a participant's submission.
	SubmitScore,
	/// A participant submits their project.
	SubmitProject,
	/// Adds the connected wallet as a sponsor, contributing ETH.
	BecomeSponsor,
}

impl OperationKind {
	pub const ALL: [OperationKind; 5] = [
		OperationKind::CreateHackathon,
		OperationKind::RegisterParticipant,
		OperationKind::SubmitScore,
		OperationKind::SubmitProject,
		OperationKind::BecomeSponsor,
	];

	/// Stable notification id, so repeated notifications replace each other.
	pub fn notification_id(&self) -> &'static str {
		match self {
			OperationKind::CreateHackathon => "create-hackathon",
			OperationKind::RegisterParticipant => "register-hacker",
			OperationKind::SubmitScore => "score-submission",
			OperationKind::SubmitProject => "submit-project",
			OperationKind::BecomeSponsor => "become-sponsor",
		}
	}

	/// Solidity signature of the contract function this operation calls.
	pub fn function_signature(&self) -> &'static str {
		match self {
			OperationKind::CreateHackathon => {
				"createHackathon(uint256,uint256,uint256,uint256,uint256,uint256[],address[],(uint8,bool,uint256,uint256))"
			},
			OperationKind::RegisterParticipant => "register()",
			OperationKind::SubmitScore => "scoreSubmission(address,uint256)",
			OperationKind::SubmitProject => "submitProject(string,string)",
			OperationKind::BecomeSponsor => "becomeSponsor()",
		}
	}

	/// Four-byte function selector.
	pub fn selector(&self) -> [u8; 4] {
		let hash = keccak256(self.function_signature().as_bytes());
		[hash[0], hash[1], hash[2], hash[3]]
	}

	pub fn success_message(&self) -> &'static str {
		match self {
			OperationKind::CreateHackathon => "Hackathon created successfully!",
			OperationKind::RegisterParticipant => "Successfully registered for hackathon!",
			OperationKind::SubmitScore => "Score submitted successfully!",
			OperationKind::SubmitProject => "Project submitted successfully!",
			OperationKind::BecomeSponsor => "Successfully became a sponsor!",
		}
	}

	/// Prefix for failure notifications, e.g. "Failed to submit score".
	pub fn failure_prefix(&self) -> &'static str {
		match self {
			OperationKind::CreateHackathon => "Failed to create hackathon",
			OperationKind::RegisterParticipant => "Failed to register",
			OperationKind::SubmitScore => "Failed to submit score",
			OperationKind::SubmitProject => "Failed to submit project",
			OperationKind::BecomeSponsor => "Failed to become sponsor",
		}
	}
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.notification_id())
	}
}

/// Voting system a hackathon uses for judging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum VotingSystem {
	#[default]
	Open = 0,
	Maci = 1,
	Zk = 2,
	RevealCommit = 3,
}

/// Judging configuration attached to a new hackathon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingConfig {
	pub system: VotingSystem,
	pub quadratic: bool,
	pub voting_power_per_judge: u64,
	pub max_winners: u64,
}

/// Parameters for creating a hackathon, in human units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateHackathonParams {
	/// Decimal hackathon id.
	pub hackathon_id: String,
	/// Unix seconds.
	pub start_time: u64,
	/// Unix seconds, strictly after `start_time`.
	pub end_time: u64,
	/// Decimal ETH.
	pub minimum_sponsor_contribution: String,
	/// Decimal ETH participants stake on registration.
	pub stake_amount: String,
	/// Prize per winning slot, in prize-token units.
	pub prize_distribution: Vec<String>,
	/// Judge wallet addresses.
	pub judges: Vec<String>,
	pub voting: VotingConfig,
	/// Prize pool attached to the transaction, decimal ETH.
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParticipantParams {
	/// Decimal ETH.
	pub stake_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitScoreParams {
	pub participant: String,
	/// Accepted range is 0 to 100 inclusive.
	pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProjectParams {
	pub project_name: String,
	pub project_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BecomeSponsorParams {
	/// Decimal ETH.
	pub contribution: String,
}

/// Caller-supplied parameters for any operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationParams {
	CreateHackathon(CreateHackathonParams),
	RegisterParticipant(RegisterParticipantParams),
	SubmitScore(SubmitScoreParams),
	SubmitProject(SubmitProjectParams),
	BecomeSponsor(BecomeSponsorParams),
}

impl OperationParams {
	pub fn kind(&self) -> OperationKind {
		match self {
			OperationParams::CreateHackathon(_) => OperationKind::CreateHackathon,
			OperationParams::RegisterParticipant(_) => OperationKind::RegisterParticipant,
			OperationParams::SubmitScore(_) => OperationKind::SubmitScore,
			OperationParams::SubmitProject(_) => OperationKind::SubmitProject,
			OperationParams::BecomeSponsor(_) => OperationKind::BecomeSponsor,
		}
	}
}

impl From<CreateHackathonParams> for OperationParams {
	fn from(params: CreateHackathonParams) -> Self {
		OperationParams::CreateHackathon(params)
	}
}

impl From<RegisterParticipantParams> for OperationParams {
	fn from(params: RegisterParticipantParams) -> Self {
		OperationParams::RegisterParticipant(params)
	}
}

impl From<SubmitScoreParams> for OperationParams {
	fn from(params: SubmitScoreParams) -> Self {
		OperationParams::SubmitScore(params)
	}
}

impl From<SubmitProjectParams> for OperationParams {
	fn from(params: SubmitProjectParams) -> Self {
		OperationParams::SubmitProject(params)
	}
}

impl From<BecomeSponsorParams> for OperationParams {
	fn from(params: BecomeSponsorParams) -> Self {
		OperationParams::BecomeSponsor(params)
	}
}

/// A validated, chain-encoded write request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
	kind: OperationKind,
	to: Address,
	arguments: Vec<DynSolValue>,
	value: Option<U256>,
}

impl TransactionRequest {
	pub fn new(
		kind: OperationKind,
		to: Address,
		arguments: Vec<DynSolValue>,
		value: Option<U256>,
	) -> Self {
		Self {
			kind,
			to,
			arguments,
			value,
		}
	}

	pub fn kind(&self) -> OperationKind {
		self.kind
	}

	/// Contract the call is addressed to.
	pub fn to(&self) -> Address {
		self.to
	}

	/// Ordered call arguments.
	pub fn arguments(&self) -> &[DynSolValue] {
		&self.arguments
	}

	/// Native value to attach, in wei.
	pub fn value(&self) -> Option<U256> {
		self.value
	}

	/// ABI-encoded calldata: selector followed by the encoded arguments.
	pub fn call_data(&self) -> Bytes {
		let mut data = self.kind.selector().to_vec();
		if !self.arguments.is_empty() {
			data.extend(DynSolValue::Tuple(self.arguments.clone()).abi_encode_params());
		}
		data.into()
	}
}

/// Structured outcome of a confirmed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DecodedResult {
	HackathonCreated {
		identifier: TransactionHash,
		hackathon_address: Address,
		organizer: Address,
		hackathon_id: U256,
		prize_pool: U256,
	},
	ParticipantRegistered {
		identifier: TransactionHash,
		participant: Address,
		/// Echoed from the request, not read back from the chain.
		stake_amount: U256,
	},
	ScoreSubmitted {
		identifier: TransactionHash,
		participant: Address,
		judge: Address,
		score: u64,
	},
	ProjectSubmitted {
		identifier: TransactionHash,
		participant: Address,
		project_name: String,
		project_url: String,
	},
	SponsorAdded {
		identifier: TransactionHash,
		sponsor: Address,
		contribution: U256,
	},
}

impl DecodedResult {
	pub fn kind(&self) -> OperationKind {
		match self {
			DecodedResult::HackathonCreated { .. } => OperationKind::CreateHackathon,
			DecodedResult::ParticipantRegistered { .. } => OperationKind::RegisterParticipant,
			DecodedResult::ScoreSubmitted { .. } => OperationKind::SubmitScore,
			DecodedResult::ProjectSubmitted { .. } => OperationKind::SubmitProject,
			DecodedResult::SponsorAdded { .. } => OperationKind::BecomeSponsor,
		}
	}

	pub fn identifier(&self) -> &TransactionHash {
		match self {
			DecodedResult::HackathonCreated { identifier, .. }
			| DecodedResult::ParticipantRegistered { identifier, .. }
			| DecodedResult::ScoreSubmitted { identifier, .. }
			| DecodedResult::ProjectSubmitted { identifier, .. }
			| DecodedResult::SponsorAdded { identifier, .. } => identifier,
		}
	}
}
