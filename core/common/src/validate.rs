//! Validation of numeric user input.
//!
//! These are pure functions: the shell reads a line, hands it here, and
//! re-prompts on `Err`. Nothing is ever coerced to a default.

use crate::{Error, Result};

/// Parse a whole integer.
///
/// Surrounding whitespace is ignored. Decimals (`2.5`), words (`test`) and
/// empty input are rejected.
pub fn parse_integer(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| Error::InvalidInput(format!("'{}' is not a valid integer", trimmed)))
}

/// Parse an integer that must be at least 1.
pub fn parse_positive(input: &str) -> Result<u64> {
    let value = parse_integer(input)?;
    if value < 1 {
        return Err(Error::InvalidInput(format!(
            "{} must be a positive integer",
            value
        )));
    }
    Ok(value as u64)
}

/// Parse an integer that must not be negative.
pub fn parse_non_negative(input: &str) -> Result<u64> {
    let value = parse_integer(input)?;
    if value < 0 {
        return Err(Error::InvalidInput(format!("{} must not be negative", value)));
    }
    Ok(value as u64)
}
