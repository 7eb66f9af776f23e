//! Request building.
//!
//! Turns caller parameters in human units into an immutable
//! [`TransactionRequest`]. Everything here is synchronous and side-effect
//! free; any failure happens before the wallet is involved.

use alloy_dyn_abi::DynSolValue;
use dehack_types::{
	parse_address, parse_amount, Address, BecomeSponsorParams, CreateHackathonParams,
	OperationKind, OperationParams, RegisterParticipantParams, SubmitProjectParams,
	SubmitScoreParams, TransactionRequest, ValidationError, ETHER_DECIMALS, U256,
};

/// Inclusive score bounds.
pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

/// Validates and encodes operation parameters.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder {
	/// Decimals of the prize token used for prize distribution amounts.
	prize_decimals: u8,
}

impl Default for RequestBuilder {
	fn default() -> Self {
		Self::new(6)
	}
}

impl RequestBuilder {
	pub fn new(prize_decimals: u8) -> Self {
		Self { prize_decimals }
	}

	/// Builds the request for `kind`, addressed to `target`.
	pub fn build(
		&self,
		kind: OperationKind,
		target: Address,
		params: &OperationParams,
	) -> Result<TransactionRequest, ValidationError> {
		if params.kind() != kind {
			return Err(ValidationError::WrongOperation {
				expected: kind,
				actual: params.kind(),
			});
		}

		match params {
			OperationParams::CreateHackathon(p) => self.create_hackathon(target, p),
			OperationParams::RegisterParticipant(p) => register_participant(target, p),
			OperationParams::SubmitScore(p) => submit_score(target, p),
			OperationParams::SubmitProject(p) => submit_project(target, p),
			OperationParams::BecomeSponsor(p) => become_sponsor(target, p),
		}
	}

	fn create_hackathon(
		&self,
		target: Address,
		params: &CreateHackathonParams,
	) -> Result<TransactionRequest, ValidationError> {
		let hackathon_id = params.hackathon_id.trim();
		if hackathon_id.is_empty() {
			return Err(ValidationError::MissingField("hackathon_id"));
		}
		let hackathon_id =
			U256::from_str_radix(hackathon_id, 10).map_err(|e| ValidationError::InvalidValue {
				field: "hackathon_id".to_string(),
				message: e.to_string(),
			})?;

		if params.end_time <= params.start_time {
			return Err(ValidationError::InvalidValue {
				field: "end_time".to_string(),
				message: "must be after start_time".to_string(),
			});
		}

		let minimum_sponsor_contribution = parse_amount(
			"minimum_sponsor_contribution",
			&params.minimum_sponsor_contribution,
			ETHER_DECIMALS,
		)?;
		let stake_amount = parse_amount("stake_amount", &params.stake_amount, ETHER_DECIMALS)?;

		if params.prize_distribution.is_empty() {
			return Err(ValidationError::MissingField("prize_distribution"));
		}
		let prizes = params
			.prize_distribution
			.iter()
			.map(|prize| positive_amount("prize_distribution", prize, self.prize_decimals))
			.collect::<Result<Vec<_>, _>>()?;

		if params.judges.is_empty() {
			return Err(ValidationError::MissingField("judges"));
		}
		let judges = params
			.judges
			.iter()
			.map(|judge| parse_address("judges", judge))
			.collect::<Result<Vec<_>, _>>()?;

		let voting = &params.voting;
		if voting.max_winners == 0 || voting.max_winners > prizes.len() as u64 {
			return Err(ValidationError::InvalidValue {
				field: "voting.max_winners".to_string(),
				message: format!("must be between 1 and {} prize slots", prizes.len()),
			});
		}

		let value = positive_amount("value", &params.value, ETHER_DECIMALS)?;

		let arguments = vec![
			uint(hackathon_id),
			uint(U256::from(params.start_time)),
			uint(U256::from(params.end_time)),
			uint(minimum_sponsor_contribution),
			uint(stake_amount),
			DynSolValue::Array(prizes.into_iter().map(uint).collect()),
			DynSolValue::Array(judges.into_iter().map(DynSolValue::Address).collect()),
			DynSolValue::Tuple(vec![
				DynSolValue::Uint(U256::from(voting.system as u8), 8),
				DynSolValue::Bool(voting.quadratic),
				uint(U256::from(voting.voting_power_per_judge)),
				uint(U256::from(voting.max_winners)),
			]),
		];

		Ok(TransactionRequest::new(
			OperationKind::CreateHackathon,
			target,
			arguments,
			Some(value),
		))
	}
}

fn register_participant(
	target: Address,
	params: &RegisterParticipantParams,
) -> Result<TransactionRequest, ValidationError> {
	let stake = positive_amount("stake_amount", &params.stake_amount, ETHER_DECIMALS)?;
	Ok(TransactionRequest::new(
		OperationKind::RegisterParticipant,
		target,
		vec![],
		Some(stake),
	))
}

fn submit_score(
	target: Address,
	params: &SubmitScoreParams,
) -> Result<TransactionRequest, ValidationError> {
	let participant = parse_address("participant", &params.participant)?;
	if !(MIN_SCORE..=MAX_SCORE).contains(&params.score) {
		return Err(ValidationError::ScoreOutOfRange(params.score));
	}
	Ok(TransactionRequest::new(
		OperationKind::SubmitScore,
		target,
		vec![
			DynSolValue::Address(participant),
			uint(U256::from(params.score as u64)),
		],
		None,
	))
}

fn submit_project(
	target: Address,
	params: &SubmitProjectParams,
) -> Result<TransactionRequest, ValidationError> {
	let name = params.project_name.trim();
	if name.is_empty() {
		return Err(ValidationError::MissingField("project_name"));
	}
	let url = params.project_url.trim();
	if url.is_empty() {
		return Err(ValidationError::MissingField("project_url"));
	}
	Ok(TransactionRequest::new(
		OperationKind::SubmitProject,
		target,
		vec![
			DynSolValue::String(name.to_string()),
			DynSolValue::String(url.to_string()),
		],
		None,
	))
}

fn become_sponsor(
	target: Address,
	params: &BecomeSponsorParams,
) -> Result<TransactionRequest, ValidationError> {
	let contribution = positive_amount("contribution", &params.contribution, ETHER_DECIMALS)?;
	Ok(TransactionRequest::new(
		OperationKind::BecomeSponsor,
		target,
		vec![],
		Some(contribution),
	))
}

fn uint(value: U256) -> DynSolValue {
	DynSolValue::Uint(value, 256)
}

/// Parses an amount that must be strictly positive.
fn positive_amount(field: &str, amount: &str, decimals: u8) -> Result<U256, ValidationError> {
	let parsed = parse_amount(field, amount, decimals)?;
	if parsed.is_zero() {
		return Err(ValidationError::InvalidAmount {
			field: field.to_string(),
			reason: "must be greater than zero".to_string(),
		});
	}
	Ok(parsed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use dehack_types::{VotingConfig, VotingSystem};

	const PARTICIPANT: &str = "0xabcdabcdabcdabcdabcdabcdabcdabcdabcdabcd";
	const JUDGE: &str = "0x1111111111111111111111111111111111111111";

	fn score(score: i64) -> OperationParams {
		SubmitScoreParams {
			participant: PARTICIPANT.to_string(),
			score,
		}
		.into()
	}

	fn hackathon() -> CreateHackathonParams {
		CreateHackathonParams {
			hackathon_id: "42".to_string(),
			start_time: 1_700_000_000,
			end_time: 1_700_086_400,
			minimum_sponsor_contribution: "0".to_string(),
			stake_amount: "0.01".to_string(),
			prize_distribution: vec!["500".to_string(), "250.5".to_string()],
			judges: vec![JUDGE.to_string()],
			voting: VotingConfig {
				system: VotingSystem::Open,
				quadratic: false,
				voting_power_per_judge: 100,
				max_winners: 2,
			},
			value: "0.5".to_string(),
		}
	}

	fn build(params: OperationParams) -> Result<TransactionRequest, ValidationError> {
		RequestBuilder::default().build(params.kind(), Address::ZERO, &params)
	}

	#[test]
	fn test_score_bounds() {
		assert_eq!(build(score(-1)), Err(ValidationError::ScoreOutOfRange(-1)));
		assert_eq!(build(score(101)), Err(ValidationError::ScoreOutOfRange(101)));
		assert!(build(score(0)).is_ok());
		assert!(build(score(100)).is_ok());
	}

	#[test]
	fn test_score_arguments() {
		let request = build(score(87)).unwrap();
		assert_eq!(request.value(), None);
		assert_eq!(
			request.arguments()[0],
			DynSolValue::Address(PARTICIPANT.parse().unwrap())
		);
		assert_eq!(request.arguments()[1], uint(U256::from(87u64)));
	}

	#[test]
	fn test_score_requires_participant() {
		let params = OperationParams::from(SubmitScoreParams {
			participant: " ".to_string(),
			score: 50,
		});
		assert_eq!(build(params), Err(ValidationError::MissingField("participant")));
	}

	#[test]
	fn test_wrong_operation() {
		let result =
			RequestBuilder::default().build(OperationKind::SubmitProject, Address::ZERO, &score(1));
		assert!(matches!(result, Err(ValidationError::WrongOperation { .. })));
	}

	#[test]
	fn test_register_stake_in_wei() {
		let params = OperationParams::from(RegisterParticipantParams {
			stake_amount: "0.01".to_string(),
		});
		let request = build(params).unwrap();
		assert_eq!(request.value(), Some(U256::from(10_000_000_000_000_000u64)));
		assert!(request.arguments().is_empty());
	}

	#[test]
	fn test_register_rejects_zero_stake() {
		let params = OperationParams::from(RegisterParticipantParams {
			stake_amount: "0".to_string(),
		});
		assert!(matches!(
			build(params),
			Err(ValidationError::InvalidAmount { .. })
		));
	}

	#[test]
	fn test_create_hackathon_encoding() {
		let request = build(hackathon().into()).unwrap();
		assert_eq!(request.value(), Some(U256::from(500_000_000_000_000_000u64)));

		let arguments = request.arguments();
		assert_eq!(arguments.len(), 8);
		assert_eq!(arguments[0], uint(U256::from(42u64)));
		assert_eq!(
			arguments[5],
			DynSolValue::Array(vec![
				uint(U256::from(500_000_000u64)),
				uint(U256::from(250_500_000u64)),
			])
		);
		assert_eq!(
			arguments[6],
			DynSolValue::Array(vec![DynSolValue::Address(JUDGE.parse().unwrap())])
		);
	}

	#[test]
	fn test_create_hackathon_validation() {
		let mut params = hackathon();
		params.end_time = params.start_time;
		assert!(matches!(
			build(params.into()),
			Err(ValidationError::InvalidValue { .. })
		));

		let mut params = hackathon();
		params.judges.clear();
		assert_eq!(build(params.into()), Err(ValidationError::MissingField("judges")));

		let mut params = hackathon();
		params.judges.push("0x1234".to_string());
		assert!(matches!(
			build(params.into()),
			Err(ValidationError::InvalidAddress { .. })
		));

		let mut params = hackathon();
		params.voting.max_winners = 3;
		assert!(matches!(
			build(params.into()),
			Err(ValidationError::InvalidValue { .. })
		));

		let mut params = hackathon();
		params.value = "0".to_string();
		assert!(matches!(
			build(params.into()),
			Err(ValidationError::InvalidAmount { .. })
		));

		let mut params = hackathon();
		params.prize_distribution = vec!["1.1234567".to_string()];
		params.voting.max_winners = 1;
		assert!(matches!(
			build(params.into()),
			Err(ValidationError::InvalidAmount { .. })
		));
	}

	#[test]
	fn test_submit_project_requires_fields() {
		let params = OperationParams::from(SubmitProjectParams {
			project_name: "DeHack".to_string(),
			project_url: "".to_string(),
		});
		assert_eq!(build(params), Err(ValidationError::MissingField("project_url")));
	}
}
