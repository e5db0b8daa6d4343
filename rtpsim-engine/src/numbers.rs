//! Numeric conversion helpers centralizing safe numeric casts.

use std::str::FromStr;

use num_traits::ToPrimitive;
use num_traits::cast::cast;
use rust_decimal::Decimal;

use crate::rules::ConfigurationError;

/// Convert a configuration float into an exact decimal.
///
/// The float's shortest round-trip text is parsed, so `0.15` becomes exactly
/// `0.15` rather than its binary approximation. Returns `None` for non-finite
/// values or magnitudes outside the decimal range.
#[must_use]
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// Lossy decimal to f64 conversion for reporting, returning 0.0 when out of range.
#[must_use]
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// `numerator / denominator` as f64, or 0.0 when the denominator is zero.
#[must_use]
pub fn fraction(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    count_to_f64(numerator) / count_to_f64(denominator)
}

/// Decimal ratio guarded against a zero denominator.
#[must_use]
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// Lift a checked decimal operation into the engine's configuration error.
///
/// # Errors
///
/// Returns `ConfigurationError::Overflow` when the operation produced `None`.
pub fn checked(value: Option<Decimal>, operation: &'static str) -> Result<Decimal, ConfigurationError> {
    value.ok_or(ConfigurationError::Overflow { operation })
}

/// Checked decimal division that names the zero-denominator case.
///
/// # Errors
///
/// Returns `ConfigurationError::ZeroDivision` for a zero denominator and
/// `ConfigurationError::Overflow` when the quotient is out of range.
pub fn checked_div(
    numerator: Decimal,
    denominator: Decimal,
    operation: &'static str,
) -> Result<Decimal, ConfigurationError> {
    if denominator.is_zero() {
        return Err(ConfigurationError::ZeroDivision { operation });
    }
    checked(numerator.checked_div(denominator), operation)
}
