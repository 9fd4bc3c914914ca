//! Forecast HTTP endpoint.
//!
//! - GET /api/v1/forecast/next-month — predict next calendar month's bill

use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{f64_to_decimal_1dp, f64_to_decimal_2dp};
use crate::services::forecast::{predict_next_month, NextMonthForecast};
use crate::services::open_meteo::OpenMeteoClient;
use crate::store::BillStore;

/// Shared application state for bill and forecast endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: BillStore,
    pub(crate) weather: OpenMeteoClient,
}

/// One forecast day.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastDayResponse {
    pub date: NaiveDate,
    /// Proxy mean temperature for the day in Celsius (same month, previous year)
    pub temperature_c: Decimal,
    /// Predicted cost for the day in dollars
    pub predicted_cost: Decimal,
}

/// Next-month bill forecast.
#[derive(Debug, Serialize, ToSchema)]
pub struct NextMonthForecastResponse {
    /// First day of the forecast month
    pub period_start: NaiveDate,
    /// Last day of the forecast month
    pub period_end: NaiveDate,
    /// Predicted total bill for the month in dollars
    pub predicted_total_cost: Decimal,
    /// Number of daily rows the model was trained on
    pub training_samples: usize,
    /// Mean squared error over the training rows
    pub training_mse: f64,
    /// Per-day predictions
    pub days: Vec<ForecastDayResponse>,
}

impl From<NextMonthForecast> for NextMonthForecastResponse {
    fn from(f: NextMonthForecast) -> Self {
        Self {
            period_start: f.period_start,
            period_end: f.period_end,
            predicted_total_cost: f64_to_decimal_2dp(f.predicted_total_cost),
            training_samples: f.training_samples,
            training_mse: f.training_mse,
            days: f
                .days
                .iter()
                .map(|d| ForecastDayResponse {
                    date: d.date,
                    temperature_c: f64_to_decimal_1dp(d.temperature_c),
                    predicted_cost: f64_to_decimal_2dp(d.predicted_cost),
                })
                .collect(),
        }
    }
}

/// Predict next month's electricity bill.
///
/// Disaggregates every stored bill into daily costs weighted by inverse
/// temperature, fits a regression on (temperature, month), and sums the
/// per-day predictions for next month using previous-year temperatures as
/// the proxy. Requires at least 6 parsed bills.
#[utoipa::path(
    get,
    path = "/api/v1/forecast/next-month",
    tag = "Forecast",
    responses(
        (status = 200, description = "Predicted bill for next month", body = NextMonthForecastResponse),
        (status = 400, description = "Fewer than 6 bills stored", body = ErrorResponse),
        (status = 502, description = "Weather archive unreachable", body = ErrorResponse),
    )
)]
pub async fn get_next_month_forecast(
    State(state): State<AppState>,
) -> Result<Json<NextMonthForecastResponse>, AppError> {
    let bills = state.store.list().await;
    let today = Utc::now().date_naive();

    let forecast = predict_next_month(&state.weather, &bills, today).await?;
    Ok(Json(NextMonthForecastResponse::from(forecast)))
}
