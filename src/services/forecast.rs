//! Bill forecast pipeline.
//!
//! Training: every stored bill is disaggregated into daily (temperature,
//! month, cost) rows using archive weather for its billing period. Forecast:
//! the fitted model predicts a cost for each day of the next calendar month,
//! using the same month of the previous year as the temperature proxy, and
//! the per-day predictions are summed into the period total.

use chrono::{Datelike, NaiveDate};
use futures::future::join_all;

use crate::errors::AppError;
use crate::services::allocation::{allocate_bill, DailyAllocation};
use crate::services::model::{CostModel, FEATURE_COUNT};
use crate::services::open_meteo::OpenMeteoClient;
use crate::store::BillRecord;

/// Minimum number of parsed bills before a forecast is attempted.
pub const MIN_BILLS_FOR_FORECAST: usize = 6;

/// A bill together with its daily disaggregation.
pub struct BillAllocations {
    pub bill: BillRecord,
    pub days: Vec<DailyAllocation>,
}

/// One forecast day: proxy temperature and predicted cost.
#[derive(Debug, Clone)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub predicted_cost: f64,
}

/// Result of the next-month forecast pipeline.
pub struct NextMonthForecast {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub predicted_total_cost: f64,
    pub days: Vec<ForecastDay>,
    pub training_samples: usize,
    pub training_mse: f64,
}

/// Fetch archive weather for every bill's period in parallel and allocate
/// each bill across its days.
///
/// Any failed fetch fails the whole resolution; there is no cache layer to
/// fall back to.
pub async fn resolve_bill_allocations(
    client: &OpenMeteoClient,
    bills: &[BillRecord],
) -> Result<Vec<BillAllocations>, AppError> {
    let fetches = bills.iter().map(|bill| async move {
        let temps = client
            .fetch_daily_mean_temperatures(bill.billing_start, bill.billing_end)
            .await?;
        let days = allocate_bill(
            bill.kwh_used as f64,
            crate::helpers::dec_to_f64(bill.total_cost),
            &temps,
        );
        Ok::<BillAllocations, AppError>(BillAllocations {
            bill: bill.clone(),
            days,
        })
    });

    let mut results = Vec::with_capacity(bills.len());
    for result in join_all(fetches).await {
        results.push(result?);
    }
    Ok(results)
}

/// Flatten per-bill allocations into model rows:
/// features [temperature, month-of-year], target daily cost.
pub fn build_training_rows(
    allocations: &[BillAllocations],
) -> (Vec<[f64; FEATURE_COUNT]>, Vec<f64>) {
    let mut features = Vec::new();
    let mut targets = Vec::new();
    for ba in allocations {
        for day in &ba.days {
            features.push([day.temperature_c, day.date.month() as f64]);
            targets.push(day.cost);
        }
    }
    (features, targets)
}

/// First and last day of the calendar month after `today`.
pub fn next_month_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    (first_day_of_month(year, month), last_day_of_month(year, month))
}

/// The same calendar month as `start`, one year earlier.
///
/// Used as the temperature proxy for a future month: the archive has no data
/// for dates that haven't happened yet.
pub fn previous_year_month_range(start: NaiveDate) -> (NaiveDate, NaiveDate) {
    let year = start.year() - 1;
    let month = start.month();
    (first_day_of_month(year, month), last_day_of_month(year, month))
}

/// Map a previous-year proxy date onto the forecast month.
///
/// Returns `None` for days that don't exist one year later (Feb 29).
pub fn shift_year_forward(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year() + 1, date.month(), date.day())
}

fn first_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is always valid")
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_first = if month == 12 {
        first_day_of_month(year + 1, 1)
    } else {
        first_day_of_month(year, month + 1)
    };
    next_first.pred_opt().expect("day before first of month")
}

/// Run the full pipeline: disaggregate all bills, fit the model, and predict
/// next month's total.
pub async fn predict_next_month(
    client: &OpenMeteoClient,
    bills: &[BillRecord],
    today: NaiveDate,
) -> Result<NextMonthForecast, AppError> {
    if bills.len() < MIN_BILLS_FOR_FORECAST {
        return Err(AppError::BadRequest(format!(
            "At least {} parsed bills are required for a forecast, got {}",
            MIN_BILLS_FOR_FORECAST,
            bills.len()
        )));
    }

    let allocations = resolve_bill_allocations(client, bills).await?;
    for ba in &allocations {
        tracing::debug!(
            "Bill {} ({} – {}) disaggregated into {} days",
            ba.bill.source_file,
            ba.bill.billing_start,
            ba.bill.billing_end,
            ba.days.len()
        );
    }
    let (features, targets) = build_training_rows(&allocations);

    let model = CostModel::train(&features, &targets)?;

    let (period_start, period_end) = next_month_range(today);
    let (proxy_start, proxy_end) = previous_year_month_range(period_start);

    let proxy_temps = client
        .fetch_daily_mean_temperatures(proxy_start, proxy_end)
        .await?;

    let mut days: Vec<(NaiveDate, f64)> = Vec::with_capacity(proxy_temps.len());
    for record in &proxy_temps {
        if let Some(date) = shift_year_forward(record.date) {
            days.push((date, record.temperature_c));
        }
    }
    if days.is_empty() {
        return Err(AppError::ExternalServiceError(format!(
            "No proxy temperatures available for {} – {}",
            proxy_start, proxy_end
        )));
    }

    let forecast_features: Vec<[f64; FEATURE_COUNT]> = days
        .iter()
        .map(|(date, temp)| [*temp, date.month() as f64])
        .collect();
    let predictions = model.predict(&forecast_features)?;

    let days: Vec<ForecastDay> = days
        .into_iter()
        .zip(predictions.iter())
        .map(|((date, temperature_c), &predicted_cost)| ForecastDay {
            date,
            temperature_c,
            predicted_cost,
        })
        .collect();

    let predicted_total_cost = days.iter().map(|d| d.predicted_cost).sum();

    tracing::info!(
        "Forecast for {} – {}: ${:.2} over {} days ({} training rows)",
        period_start,
        period_end,
        predicted_total_cost,
        days.len(),
        model.training_samples
    );

    Ok(NextMonthForecast {
        period_start,
        period_end,
        predicted_total_cost,
        days,
        training_samples: model.training_samples,
        training_mse: model.training_mse,
    })
}
