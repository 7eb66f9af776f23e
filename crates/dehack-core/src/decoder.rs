//! Event log decoding.
//!
//! Each operation kind that reports its result through a contract event has
//! an [`ExpectedEvent`] carrying the topic-zero signature and a pure decode
//! function. Registration emits nothing the client needs, so its result is
//! assembled from the request itself.

use alloy_sol_types::{sol, SolEvent};
use dehack_types::{
	topic_to_address, word_at, Address, DecodedResult, LogEntry, OperationKind, Receipt,
	TransactionHash, B256, U256,
};
use thiserror::Error;

// Events emitted by the hackathon platform contracts.
sol! {
	/// Emitted by the factory when a hackathon contract is deployed.
	event HackathonCreated(
		address indexed hackathonAddress,
		address indexed organizer,
		uint256 hackathonId,
		uint256 prizePool
	);

	/// Emitted by a hackathon when a judge scores a participant.
	event ScoreSubmitted(address indexed participant, address indexed judge, uint256 score);

	/// Emitted by a hackathon when a participant submits a project.
	event ProjectSubmitted(address indexed participant, string projectName, string projectUrl);

	/// Emitted by a hackathon when a sponsor contributes.
	event SponsorAdded(address indexed sponsor, uint256 contribution);
}

/// Errors raised while reading a result out of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
	/// The receipt did not report success.
	#[error("Receipt for {0} is not successful")]
	NotSuccessful(TransactionHash),
	/// No log carried the expected signature.
	#[error("Expected {0} log not found in receipt")]
	MissingLog(&'static str),
	/// The log was there but its layout was not what the event declares.
	#[error("Malformed {event} log: {reason}")]
	MalformedLog { event: &'static str, reason: String },
}

/// What the decoder knows besides the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
	/// Account that signed the transaction.
	pub account: Address,
	/// Value attached to the request.
	pub value: Option<U256>,
}

/// Event expected for an operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedEvent {
	HackathonCreated,
	ScoreSubmitted,
	ProjectSubmitted,
	SponsorAdded,
}

impl ExpectedEvent {
	/// Returns the event for `kind`, or `None` when the kind parses no log.
	pub fn for_kind(kind: OperationKind) -> Option<Self> {
		match kind {
			OperationKind::CreateHackathon => Some(ExpectedEvent::HackathonCreated),
			OperationKind::RegisterParticipant => None,
			OperationKind::SubmitScore => Some(ExpectedEvent::ScoreSubmitted),
			OperationKind::SubmitProject => Some(ExpectedEvent::ProjectSubmitted),
			OperationKind::BecomeSponsor => Some(ExpectedEvent::SponsorAdded),
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			ExpectedEvent::HackathonCreated => "HackathonCreated",
			ExpectedEvent::ScoreSubmitted => "ScoreSubmitted",
			ExpectedEvent::ProjectSubmitted => "ProjectSubmitted",
			ExpectedEvent::SponsorAdded => "SponsorAdded",
		}
	}

	/// Topic-zero signature hash.
	pub fn signature(&self) -> B256 {
		match self {
			ExpectedEvent::HackathonCreated => HackathonCreated::SIGNATURE_HASH,
			ExpectedEvent::ScoreSubmitted => ScoreSubmitted::SIGNATURE_HASH,
			ExpectedEvent::ProjectSubmitted => ProjectSubmitted::SIGNATURE_HASH,
			ExpectedEvent::SponsorAdded => SponsorAdded::SIGNATURE_HASH,
		}
	}

	/// Decodes a log already known to carry this event's signature.
	fn decode(
		&self,
		identifier: TransactionHash,
		log: &LogEntry,
	) -> Result<DecodedResult, DecodeError> {
		let event = self.name();
		let malformed = |reason: &str| DecodeError::MalformedLog {
			event,
			reason: reason.to_string(),
		};
		let topic = |index: usize| {
			log.topics
				.get(index)
				.map(topic_to_address)
				.ok_or_else(|| malformed(&format!("missing topic {}", index)))
		};
		let word = |index: usize| {
			word_at(&log.data, index).ok_or_else(|| malformed(&format!("missing data word {}", index)))
		};

		match self {
			ExpectedEvent::HackathonCreated => Ok(DecodedResult::HackathonCreated {
				identifier,
				hackathon_address: topic(1)?,
				organizer: topic(2)?,
				hackathon_id: word(0)?,
				prize_pool: word(1)?,
			}),
			ExpectedEvent::ScoreSubmitted => {
				let score = u64::try_from(word(0)?).map_err(|_| malformed("score overflows u64"))?;
				Ok(DecodedResult::ScoreSubmitted {
					identifier,
					participant: topic(1)?,
					judge: topic(2)?,
					score,
				})
			},
			ExpectedEvent::ProjectSubmitted => {
				let decoded =
					ProjectSubmitted::decode_raw_log(log.topics.iter().copied(), &log.data, true)
						.map_err(|e| malformed(&e.to_string()))?;
				Ok(DecodedResult::ProjectSubmitted {
					identifier,
					participant: decoded.participant,
					project_name: decoded.projectName,
					project_url: decoded.projectUrl,
				})
			},
			ExpectedEvent::SponsorAdded => Ok(DecodedResult::SponsorAdded {
				identifier,
				sponsor: topic(1)?,
				contribution: word(0)?,
			}),
		}
	}
}

/// Reads structured results out of confirmed receipts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDecoder;

impl EventDecoder {
	pub fn new() -> Self {
		Self
	}

	/// Decodes the result of a `kind` operation from the receipt of `identifier`.
	///
	/// The result carries `identifier`, whatever the receipt itself reports.
	/// A successful receipt without the expected log is an error: the chain
	/// changed state but the result cannot be learned.
	pub fn decode(
		&self,
		kind: OperationKind,
		identifier: &TransactionHash,
		receipt: &Receipt,
		context: &DecodeContext,
	) -> Result<DecodedResult, DecodeError> {
		if !receipt.is_success() {
			return Err(DecodeError::NotSuccessful(identifier.clone()));
		}

		let Some(expected) = ExpectedEvent::for_kind(kind) else {
			return Ok(DecodedResult::ParticipantRegistered {
				identifier: identifier.clone(),
				participant: context.account,
				stake_amount: context.value.unwrap_or_default(),
			});
		};

		let signature = expected.signature();
		let log = receipt
			.logs
			.iter()
			.find(|log| log.signature() == Some(&signature))
			.ok_or(DecodeError::MissingLog(expected.name()))?;

		expected.decode(identifier.clone(), log)
	}
}
