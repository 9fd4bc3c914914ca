//! Open-Meteo archive API client.
//!
//! Fetches daily mean temperature series for a billing period.
//! See: https://open-meteo.com/en/docs/historical-weather-api

use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;

/// Client for the Open-Meteo archive API, bound to one location.
///
/// The base URL is injected from config so tests can point it at a mock
/// server.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
}

/// One day of weather: date and mean temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTemperature {
    pub date: NaiveDate,
    pub temperature_c: f64,
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    daily: OpenMeteoDaily,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoDaily {
    time: Vec<String>,
    /// Mean temperatures; entries are null for days the archive has no data.
    temperature_2m_mean: Vec<Option<f64>>,
}

impl OpenMeteoClient {
    pub fn new(base_url: &str, latitude: f64, longitude: f64, timezone: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.to_string(),
            latitude,
            longitude,
            timezone: timezone.to_string(),
        }
    }

    /// Fetch the daily mean temperature for each day in `[start, end]`
    /// (inclusive, local days in the configured timezone).
    ///
    /// Days the archive reports as null are dropped from the result.
    pub async fn fetch_daily_mean_temperatures(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyTemperature>, AppError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", format!("{:.4}", self.latitude)),
                ("longitude", format!("{:.4}", self.longitude)),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("daily", "temperature_2m_mean".to_string()),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Open-Meteo request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Open-Meteo returned HTTP {}",
                response.status()
            )));
        }

        let parsed: OpenMeteoResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Open-Meteo JSON parse error: {}", e))
        })?;

        extract_daily_temperatures(parsed)
    }
}

/// Convert an Open-Meteo daily response into dated temperature records.
///
/// Pure function (no I/O) — zips the `time` and `temperature_2m_mean` arrays,
/// dropping days with null temperatures or malformed dates.
fn extract_daily_temperatures(
    response: OpenMeteoResponse,
) -> Result<Vec<DailyTemperature>, AppError> {
    let daily = response.daily;
    let mut records = Vec::with_capacity(daily.time.len());

    for (time, temp) in daily.time.iter().zip(daily.temperature_2m_mean.iter()) {
        let date = match NaiveDate::parse_from_str(time, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Malformed date '{}' in Open-Meteo response: {}", time, e);
                continue;
            }
        };
        match temp {
            Some(t) if t.is_finite() => records.push(DailyTemperature {
                date,
                temperature_c: *t,
            }),
            Some(t) => {
                tracing::warn!("Non-finite temperature {} for {}, dropping day", t, date);
            }
            None => {
                tracing::debug!("No archive temperature for {}, dropping day", date);
            }
        }
    }

    if records.is_empty() {
        return Err(AppError::ExternalServiceError(
            "Open-Meteo returned an empty daily series".to_string(),
        ));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn response_from_json(value: serde_json::Value) -> OpenMeteoResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_daily_temperatures() {
        let response = response_from_json(serde_json::json!({
            "daily": {
                "time": ["2025-01-10", "2025-01-11", "2025-01-12"],
                "temperature_2m_mean": [-3.1, 0.4, 5.2]
            }
        }));

        let records = extract_daily_temperatures(response).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].date,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
        assert!((records[0].temperature_c + 3.1).abs() < 1e-9);
        assert!((records[2].temperature_c - 5.2).abs() < 1e-9);
    }

    #[test]
    fn test_extract_drops_null_days() {
        let response = response_from_json(serde_json::json!({
            "daily": {
                "time": ["2025-01-10", "2025-01-11", "2025-01-12"],
                "temperature_2m_mean": [-3.1, null, 5.2]
            }
        }));

        let records = extract_daily_temperatures(response).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1].date,
            NaiveDate::from_ymd_opt(2025, 1, 12).unwrap()
        );
    }

    #[test]
    fn test_extract_drops_malformed_dates() {
        let response = response_from_json(serde_json::json!({
            "daily": {
                "time": ["not-a-date", "2025-01-11"],
                "temperature_2m_mean": [1.0, 2.0]
            }
        }));

        let records = extract_daily_temperatures(response).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].date,
            NaiveDate::from_ymd_opt(2025, 1, 11).unwrap()
        );
    }

    #[test]
    fn test_extract_empty_series_errors() {
        let response = response_from_json(serde_json::json!({
            "daily": {
                "time": ["2025-01-10"],
                "temperature_2m_mean": [null]
            }
        }));

        let result = extract_daily_temperatures(response);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("empty daily series"));
    }

    #[tokio::test]
    async fn test_fetch_daily_mean_temperatures() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("daily", "temperature_2m_mean"))
            .and(query_param("start_date", "2025-01-10"))
            .and(query_param("end_date", "2025-01-12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "time": ["2025-01-10", "2025-01-11", "2025-01-12"],
                    "temperature_2m_mean": [-3.1, 0.4, 5.2]
                }
            })))
            .mount(&server)
            .await;

        let client = OpenMeteoClient::new(&server.uri(), 42.3601, -71.0589, "America/New_York");
        let records = client
            .fetch_daily_mean_temperatures(
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert!((records[1].temperature_c - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fetch_http_error_maps_to_external_service_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OpenMeteoClient::new(&server.uri(), 42.3601, -71.0589, "America/New_York");
        let result = client
            .fetch_daily_mean_temperatures(
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            )
            .await;

        match result {
            Err(AppError::ExternalServiceError(msg)) => assert!(msg.contains("500")),
            other => panic!("Expected ExternalServiceError, got {:?}", other),
        }
    }
}
