//! Inverse-temperature daily disaggregation.
//!
//! A bill only reports period totals. To build a daily training table, the
//! total usage and cost are spread across the billing days, weighted by
//! inverse temperature: colder days account for proportionally more of an
//! electric-heating bill.

use chrono::NaiveDate;

use crate::services::open_meteo::DailyTemperature;

/// Offset added to the mean temperature before inversion, so a 0°C day does
/// not divide by zero.
const TEMP_SHIFT_C: f64 = 0.01;

/// Floor for the shifted temperature. Below freezing the raw inverse would go
/// negative and the weighting would invert its own assumption; clamping pins
/// all sub-freezing days at the maximum weight instead.
const MIN_SHIFTED_TEMP_C: f64 = 0.01;

/// One day's share of a bill.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAllocation {
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub kwh: f64,
    pub cost: f64,
}

/// Compute normalized inverse-temperature weights for a billing period.
///
/// Returns a `Vec<f64>` of the same length as `temperatures` that sums to 1:
/// weight_d ∝ 1 / max(temp_d + TEMP_SHIFT_C, MIN_SHIFTED_TEMP_C).
///
/// Falls back to uniform weights if the weighting degenerates (non-finite
/// input or a non-positive weight sum).
pub fn inverse_temperature_weights(temperatures: &[f64]) -> Vec<f64> {
    let n = temperatures.len();
    if n == 0 {
        return vec![];
    }

    // f64::max would silently swallow a NaN input, so check finiteness first.
    if temperatures.iter().any(|t| !t.is_finite()) {
        tracing::warn!("Non-finite temperature in billing period, using uniform weights");
        return vec![1.0 / n as f64; n];
    }

    let raw: Vec<f64> = temperatures
        .iter()
        .map(|&t| 1.0 / (t + TEMP_SHIFT_C).max(MIN_SHIFTED_TEMP_C))
        .collect();

    let total: f64 = raw.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        // Degenerate case — fall back to uniform weighting
        tracing::warn!(
            "Inverse-temperature weighting degenerated (sum = {}), using uniform weights",
            total
        );
        return vec![1.0 / n as f64; n];
    }

    raw.iter().map(|w| w / total).collect()
}

/// Spread a bill's totals across its billing days by inverse-temperature
/// weight.
///
/// `daily_temperatures` carries the retained (non-null) days of the billing
/// period; days the archive dropped receive no share.
pub fn allocate_bill(
    total_kwh: f64,
    total_cost: f64,
    daily_temperatures: &[DailyTemperature],
) -> Vec<DailyAllocation> {
    let temps: Vec<f64> = daily_temperatures.iter().map(|d| d.temperature_c).collect();
    let weights = inverse_temperature_weights(&temps);

    daily_temperatures
        .iter()
        .zip(weights.iter())
        .map(|(day, &weight)| DailyAllocation {
            date: day.date,
            temperature_c: day.temperature_c,
            kwh: weight * total_kwh,
            cost: weight * total_cost,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(temps: &[f64]) -> Vec<DailyTemperature> {
        temps
            .iter()
            .enumerate()
            .map(|(i, &t)| DailyTemperature {
                date: NaiveDate::from_ymd_opt(2025, 1, 10)
                    .unwrap()
                    .checked_add_days(chrono::Days::new(i as u64))
                    .unwrap(),
                temperature_c: t,
            })
            .collect()
    }

    #[test]
    fn test_weights_sum_to_one() {
        let weights = inverse_temperature_weights(&[2.0, 5.0, 10.0, 7.5]);
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "Weights sum to {}", total);
    }

    #[test]
    fn test_colder_day_weighs_more() {
        let weights = inverse_temperature_weights(&[2.0, 10.0]);
        assert!(
            weights[0] > weights[1],
            "Colder day should weigh more: {:?}",
            weights
        );
    }

    #[test]
    fn test_equal_temperatures_equal_weights() {
        let weights = inverse_temperature_weights(&[5.0, 5.0, 5.0]);
        for w in &weights {
            assert!((w - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_subfreezing_days_clamped_to_max_weight() {
        // -8°C and -15°C would both invert to negative weights without the
        // clamp; with it they share the maximum weight.
        let weights = inverse_temperature_weights(&[-8.0, -15.0, 10.0]);
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(weights.iter().all(|&w| w > 0.0), "Weights: {:?}", weights);
        assert!((weights[0] - weights[1]).abs() < 1e-9);
        assert!(weights[0] > weights[2]);
    }

    #[test]
    fn test_zero_degree_day_does_not_divide_by_zero() {
        let weights = inverse_temperature_weights(&[0.0, 10.0]);
        assert!(weights.iter().all(|w| w.is_finite()));
        assert!(weights[0] > weights[1]);
    }

    #[test]
    fn test_non_finite_input_falls_back_to_uniform() {
        let weights = inverse_temperature_weights(&[f64::NAN, 5.0]);
        assert_eq!(weights, vec![0.5, 0.5]);
    }

    #[test]
    fn test_empty_input() {
        assert!(inverse_temperature_weights(&[]).is_empty());
    }

    #[test]
    fn test_allocation_preserves_totals() {
        let allocations = allocate_bill(523.0, 184.30, &days(&[2.0, 5.0, -3.0, 8.5]));
        let kwh_total: f64 = allocations.iter().map(|a| a.kwh).sum();
        let cost_total: f64 = allocations.iter().map(|a| a.cost).sum();
        assert!((kwh_total - 523.0).abs() < 1e-6, "kWh total {}", kwh_total);
        assert!(
            (cost_total - 184.30).abs() < 1e-6,
            "Cost total {}",
            cost_total
        );
    }

    #[test]
    fn test_allocation_keeps_dates_and_temperatures() {
        let input = days(&[2.0, 5.0]);
        let allocations = allocate_bill(100.0, 50.0, &input);
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].date, input[0].date);
        assert!((allocations[0].temperature_c - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_allocation_empty_period() {
        assert!(allocate_bill(100.0, 50.0, &[]).is_empty());
    }
}
