//! Shared helpers for Decimal ↔ f64 conversions.
//!
//! Two f64→Decimal strategies exist because money and weather values have
//! different precision requirements:
//!
//! - `f64_to_decimal_2dp`: rounds to 2 decimal places (money: costs in dollars)
//! - `f64_to_decimal_1dp`: rounds to 1 decimal place (weather: temperature)
//!
//! Both return `Decimal::ZERO` for non-finite inputs (NaN, ±Inf).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Convert an f64 to Decimal, rounded to 2 decimal places.
///
/// Used for money values (daily cost, predicted totals) where cent precision
/// is what the bill itself carries.
pub(crate) fn f64_to_decimal_2dp(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_2dp received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_str_exact(&format!("{:.2}", v)).unwrap_or_default()
}

/// Convert an f64 to Decimal, rounded to 1 decimal place.
///
/// Used for temperatures, where 0.1°C matches the resolution Open-Meteo
/// reports.
pub(crate) fn f64_to_decimal_1dp(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_1dp received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_str_exact(&format!("{:.1}", v)).unwrap_or_default()
}

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
///
/// Replaces the repeated pattern `some_decimal.to_f64().unwrap_or(0.0)`.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
