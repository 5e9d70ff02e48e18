use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Money is represented as integer cents to avoid floating-point drift.
/// 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Accounts whose balance is strictly below this are flagged as low balance.
pub const LOW_BALANCE_THRESHOLD: Cents = 100_000;

/// Read-time low-balance predicate. Never stored.
pub fn is_low_balance(balance: Cents) -> bool {
    balance < LOW_BALANCE_THRESHOLD
}

/// Format cents as a human-readable amount.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string such as "50", "12.5" or "0.01" into cents.
/// More than two fractional digits is rejected rather than truncated.
pub fn parse_cents(input: &str) -> Result<Cents, MoneyError> {
    let value: Decimal = input
        .trim()
        .parse()
        .map_err(|_| MoneyError::InvalidFormat(input.trim().to_string()))?;
    decimal_to_cents(value)
}

/// Convert a decimal amount into cents, refusing sub-cent precision.
pub fn decimal_to_cents(value: Decimal) -> Result<Cents, MoneyError> {
    let normalized = value.normalize();
    if normalized.scale() > 2 {
        return Err(MoneyError::TooPrecise(normalized));
    }
    (normalized * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or(MoneyError::OutOfRange(normalized))
}

/// Round an arbitrary decimal to the nearest cent, half away from zero.
pub fn round_to_cents(value: Decimal) -> Result<Cents, MoneyError> {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or(MoneyError::OutOfRange(rounded))
}

pub fn cents_to_decimal(cents: Cents) -> Decimal {
    Decimal::new(cents, 2)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    InvalidFormat(String),
    TooPrecise(Decimal),
    OutOfRange(Decimal),
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::InvalidFormat(input) => write!(f, "invalid money format: '{}'", input),
            MoneyError::TooPrecise(value) => {
                write!(f, "{} has more than two decimal places", value)
            }
            MoneyError::OutOfRange(value) => write!(f, "{} is out of range", value),
        }
    }
}

impl std::error::Error for MoneyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("0.01"), Ok(1));
        assert_eq!(parse_cents(" 100.10 "), Ok(10010));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(matches!(parse_cents("abc"), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_cents("12.34.56"), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_cents("100.999"), Err(MoneyError::TooPrecise(_))));
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_precision() {
        assert_eq!(decimal_to_cents(Decimal::new(12_3400, 4)), Ok(1234));
    }

    #[test]
    fn test_round_to_cents_half_away_from_zero() {
        assert_eq!(round_to_cents(Decimal::new(888_4885, 4)), Ok(88849));
        assert_eq!(round_to_cents(Decimal::new(1_005, 3)), Ok(101));
    }

    #[test]
    fn test_low_balance_threshold_is_strict() {
        assert!(is_low_balance(99_999));
        assert!(!is_low_balance(100_000));
        assert!(is_low_balance(0));
    }

    #[test]
    fn test_cents_to_decimal() {
        assert_eq!(cents_to_decimal(88849).to_string(), "888.49");
        assert_eq!(cents_to_decimal(5).to_string(), "0.05");
    }
}
