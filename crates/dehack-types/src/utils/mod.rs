//! Utility functions for amounts, addresses and hex strings.

pub mod conversion;
pub mod formatting;

pub use conversion::{parse_address, parse_amount, topic_to_address, word_at, ETHER_DECIMALS};
pub use formatting::{format_amount, truncate_id};
