//! Bill HTTP endpoints.
//!
//! - POST   /api/v1/bills — upload bill PDFs (multipart)
//! - GET    /api/v1/bills — list parsed bills
//! - DELETE /api/v1/bills/:id — remove a bill
//! - GET    /api/v1/bills/:id/daily — daily disaggregation for one bill

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{f64_to_decimal_1dp, f64_to_decimal_2dp};
use crate::routes::forecast::AppState;
use crate::services::allocation::allocate_bill;
use crate::services::bill::parse_bill_pdf;
use crate::store::{BillRecord, InsertOutcome};

/// A parsed bill as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct BillResponse {
    /// Unique bill identifier
    pub id: Uuid,
    /// First day of the billing period
    pub billing_start: NaiveDate,
    /// Last day of the billing period (inclusive)
    pub billing_end: NaiveDate,
    /// Number of days in the billing period
    pub period_days: i64,
    /// Total energy used over the period in kWh
    pub kwh_used: i64,
    /// Total amount due in dollars
    pub total_cost: Decimal,
    /// Filename the bill was extracted from
    pub source_file: String,
    /// Upload time in ISO 8601 / RFC 3339 format
    pub uploaded_at: String,
}

impl From<BillRecord> for BillResponse {
    fn from(b: BillRecord) -> Self {
        Self {
            id: b.id,
            billing_start: b.billing_start,
            billing_end: b.billing_end,
            period_days: b.period_days(),
            kwh_used: b.kwh_used,
            total_cost: b.total_cost,
            source_file: b.source_file.clone(),
            uploaded_at: b.uploaded_at.to_rfc3339(),
        }
    }
}

/// A file that could not be turned into a bill record, with the reason.
#[derive(Debug, Serialize, ToSchema)]
pub struct RejectedFile {
    /// Uploaded filename
    pub filename: String,
    /// Why the document was rejected
    pub reason: String,
}

/// Result of a bill upload: accepted records and per-file rejections.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub accepted: Vec<BillResponse>,
    pub rejected: Vec<RejectedFile>,
}

/// One day's share of a bill.
#[derive(Debug, Serialize, ToSchema)]
pub struct DailyAllocationRow {
    pub date: NaiveDate,
    /// Mean temperature for the day in Celsius
    pub temperature_c: Decimal,
    /// Apportioned energy for the day in kWh
    pub kwh: f64,
    /// Apportioned cost for the day in dollars
    pub cost: Decimal,
}

/// Daily disaggregation of one bill.
#[derive(Debug, Serialize, ToSchema)]
pub struct BillDailyResponse {
    pub bill_id: Uuid,
    pub billing_start: NaiveDate,
    pub billing_end: NaiveDate,
    pub kwh_used: i64,
    pub total_cost: Decimal,
    /// One row per billing day the weather archive has data for
    pub days: Vec<DailyAllocationRow>,
}

/// Upload one or more bill PDFs.
///
/// Each file is parsed independently; documents where any required field
/// fails to match are rejected with the reason and do not abort the rest of
/// the upload. A bill whose billing period is already stored is rejected as
/// a duplicate.
#[utoipa::path(
    post,
    path = "/api/v1/bills",
    tag = "Bills",
    responses(
        (status = 200, description = "Upload processed; see accepted/rejected lists", body = UploadResponse),
        (status = 400, description = "Malformed multipart request or no files", body = ErrorResponse),
    )
)]
pub async fn upload_bills(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    let mut saw_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart request: {}", e)))?
    {
        let filename = field
            .file_name()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unnamed.pdf".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        saw_file = true;

        match parse_bill_pdf(&bytes) {
            Ok(parsed) => {
                let record = BillRecord {
                    id: Uuid::new_v4(),
                    billing_start: parsed.billing_start,
                    billing_end: parsed.billing_end,
                    kwh_used: parsed.kwh_used,
                    total_cost: parsed.total_cost,
                    source_file: filename.clone(),
                    uploaded_at: Utc::now(),
                };
                match state.store.insert(record.clone()).await {
                    InsertOutcome::Inserted => {
                        tracing::info!(
                            "Accepted bill {} ({} – {})",
                            filename,
                            record.billing_start,
                            record.billing_end
                        );
                        accepted.push(BillResponse::from(record));
                    }
                    InsertOutcome::DuplicatePeriod => {
                        rejected.push(RejectedFile {
                            filename,
                            reason: format!(
                                "a bill for {} – {} is already stored",
                                record.billing_start, record.billing_end
                            ),
                        });
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Could not parse {}: {}", filename, e);
                rejected.push(RejectedFile {
                    filename,
                    reason: e.to_string(),
                });
            }
        }
    }

    if !saw_file {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    Ok(Json(UploadResponse { accepted, rejected }))
}

/// List all parsed bills, ordered by billing start date.
#[utoipa::path(
    get,
    path = "/api/v1/bills",
    tag = "Bills",
    responses(
        (status = 200, description = "List of parsed bills", body = Vec<BillResponse>),
    )
)]
pub async fn list_bills(State(state): State<AppState>) -> Json<Vec<BillResponse>> {
    let bills = state.store.list().await;
    Json(bills.into_iter().map(BillResponse::from).collect())
}

/// Remove a bill.
#[utoipa::path(
    delete,
    path = "/api/v1/bills/{id}",
    tag = "Bills",
    params(
        ("id" = Uuid, Path, description = "Bill UUID"),
    ),
    responses(
        (status = 204, description = "Bill removed"),
        (status = 404, description = "Bill not found", body = ErrorResponse),
    )
)]
pub async fn delete_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.store.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Bill {} not found", id)))
    }
}

/// Get the daily disaggregation for one bill.
///
/// Fetches the billing period's daily mean temperatures from the weather
/// archive and spreads the bill's totals across the days by inverse
/// temperature.
#[utoipa::path(
    get,
    path = "/api/v1/bills/{id}/daily",
    tag = "Bills",
    params(
        ("id" = Uuid, Path, description = "Bill UUID"),
    ),
    responses(
        (status = 200, description = "Daily allocation for the bill", body = BillDailyResponse),
        (status = 404, description = "Bill not found", body = ErrorResponse),
        (status = 502, description = "Weather archive unreachable", body = ErrorResponse),
    )
)]
pub async fn get_bill_daily(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillDailyResponse>, AppError> {
    let bill = state
        .store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Bill {} not found", id)))?;

    let temps = state
        .weather
        .fetch_daily_mean_temperatures(bill.billing_start, bill.billing_end)
        .await?;

    let allocations = allocate_bill(
        bill.kwh_used as f64,
        crate::helpers::dec_to_f64(bill.total_cost),
        &temps,
    );

    let days = allocations
        .iter()
        .map(|a| DailyAllocationRow {
            date: a.date,
            temperature_c: f64_to_decimal_1dp(a.temperature_c),
            kwh: a.kwh,
            cost: f64_to_decimal_2dp(a.cost),
        })
        .collect();

    Ok(Json(BillDailyResponse {
        bill_id: bill.id,
        billing_start: bill.billing_start,
        billing_end: bill.billing_end,
        kwh_used: bill.kwh_used,
        total_cost: bill.total_cost,
        days,
    }))
}
