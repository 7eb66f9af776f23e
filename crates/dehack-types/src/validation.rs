//! Validation errors for caller-supplied parameters.

use crate::OperationKind;
use thiserror::Error;

/// Errors raised by the request builder before anything is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	/// A required identifier or field was empty.
	#[error("{0} is required")]
	MissingField(&'static str),
	/// A monetary string could not be converted to base units.
	#[error("Invalid amount for '{field}': {reason}")]
	InvalidAmount { field: String, reason: String },
	/// An address string did not parse.
	#[error("Invalid address for '{field}': {value}")]
	InvalidAddress { field: String, value: String },
	/// Scores are bounded to 0..=100.
	#[error("Score must be between 0 and 100, got {0}")]
	ScoreOutOfRange(i64),
	/// Any other domain constraint.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// The parameters belong to a different operation than the controller runs.
	#[error("Cannot start {expected} with {actual} parameters")]
	WrongOperation {
		expected: OperationKind,
		actual: OperationKind,
	},
}
