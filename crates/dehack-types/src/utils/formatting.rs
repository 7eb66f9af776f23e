//! String formatting utilities.

use alloy_primitives::{utils::format_units, U256};

/// Shortens an identifier for log fields: the first 10 characters followed by "..".
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Renders a base-unit amount in human units, without trailing zeros.
///
/// Falls back to the raw integer when `decimals` is out of range.
pub fn format_amount(amount: U256, decimals: u8) -> String {
	match format_units(amount, decimals) {
		Ok(formatted) if formatted.contains('.') => {
			let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
			trimmed.to_string()
		},
		Ok(formatted) => formatted,
		Err(_) => amount.to_string(),
	}
}
