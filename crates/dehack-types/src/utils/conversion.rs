//! Conversions between human input and chain encodings.

use crate::ValidationError;
use alloy_primitives::{utils::parse_units, Address, B256, U256};
use std::str::FromStr;

/// Decimals of the native currency.
pub const ETHER_DECIMALS: u8 = 18;

/// Converts a decimal string (e.g. "0.5") into base units scaled by `decimals`.
///
/// Only plain unsigned decimals are accepted, and at most `decimals`
/// fractional digits, so the conversion is always exact.
pub fn parse_amount(field: &str, amount: &str, decimals: u8) -> Result<U256, ValidationError> {
	let invalid = |reason: &str| ValidationError::InvalidAmount {
		field: field.to_string(),
		reason: reason.to_string(),
	};

	let amount = amount.trim();
	if amount.is_empty() {
		return Err(invalid("amount is empty"));
	}

	let (integer, fraction) = amount.split_once('.').unwrap_or((amount, ""));
	if integer.is_empty() && fraction.is_empty() {
		return Err(invalid("amount has no digits"));
	}
	if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
		return Err(invalid("expected an unsigned decimal number"));
	}
	if fraction.len() > decimals as usize {
		return Err(invalid(&format!(
			"at most {} decimal places are allowed",
			decimals
		)));
	}

	parse_units(amount, decimals)
		.map(|parsed| parsed.get_absolute())
		.map_err(|e| invalid(&e.to_string()))
}

/// Parses a 20-byte hex address, with or without "0x".
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ValidationError> {
	let value = value.trim();
	if value.is_empty() {
		return Err(ValidationError::MissingField(field));
	}
	Address::from_str(value).map_err(|_| ValidationError::InvalidAddress {
		field: field.to_string(),
		value: value.to_string(),
	})
}

/// Reads the address stored in the low-order 20 bytes of a topic.
pub fn topic_to_address(topic: &B256) -> Address {
	Address::from_word(*topic)
}

/// Reads the `index`-th 32-byte word of ABI data as a big-endian integer.
pub fn word_at(data: &[u8], index: usize) -> Option<U256> {
	let start = index.checked_mul(32)?;
	let end = start.checked_add(32)?;
	data.get(start..end).map(U256::from_be_slice)
}
