// Billcast API v0.1
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;
mod store;

use config::AppConfig;
use routes::forecast::AppState;
use services::open_meteo::OpenMeteoClient;
use store::{BillRecord, BillStore, InsertOutcome};

/// Maximum accepted size of a bill upload request (all files together).
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Billcast API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Billcast API",
        version = "0.1.0",
        description = "Electricity bill forecasting API. Parses utility bill PDFs, \
            disaggregates each bill into daily usage and cost weighted by inverse \
            temperature (colder days cost more), fits a regression on temperature and \
            month, and predicts next month's bill from previous-year temperatures.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Bills", description = "Bill upload and daily disaggregation"),
        (name = "Forecast", description = "Next-month bill prediction"),
    ),
    paths(
        routes::health::health_check,
        routes::bills::upload_bills,
        routes::bills::list_bills,
        routes::bills::delete_bill,
        routes::bills::get_bill_daily,
        routes::forecast::get_next_month_forecast,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::bills::BillResponse,
            routes::bills::RejectedFile,
            routes::bills::UploadResponse,
            routes::bills::DailyAllocationRow,
            routes::bills::BillDailyResponse,
            routes::forecast::ForecastDayResponse,
            routes::forecast::NextMonthForecastResponse,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billcast_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Create the in-memory bill store and seed it from the bills directory
    let store = BillStore::new();
    let bills_dir = std::path::Path::new(&config.bills_dir);
    match services::bill::load_bills_from_dir(bills_dir) {
        Ok(bills) => {
            if bills.is_empty() {
                tracing::warn!("No bill PDFs found in {}", bills_dir.display());
            }
            for (filename, parsed) in bills {
                let record = BillRecord {
                    id: Uuid::new_v4(),
                    billing_start: parsed.billing_start,
                    billing_end: parsed.billing_end,
                    kwh_used: parsed.kwh_used,
                    total_cost: parsed.total_cost,
                    source_file: filename.clone(),
                    uploaded_at: Utc::now(),
                };
                match store.insert(record).await {
                    InsertOutcome::Inserted => {
                        tracing::info!("Seeded bill from {}", filename);
                    }
                    InsertOutcome::DuplicatePeriod => {
                        tracing::warn!("Skipping {}: duplicate billing period", filename);
                    }
                }
            }
        }
        Err(e) => {
            tracing::error!(
                "Failed to load bill PDFs from {}: {}",
                bills_dir.display(),
                e
            );
        }
    }
    tracing::info!("{} bills loaded", store.count().await);

    // Create Open-Meteo client bound to the configured location
    let weather = OpenMeteoClient::new(
        &config.archive_api_url,
        config.latitude,
        config.longitude,
        &config.timezone,
    );

    // Build shared application state
    let app_state = AppState {
        store: store.clone(),
        weather,
    };

    // CORS — browser clients upload bills and read forecasts
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    // Build router
    // Bill and forecast routes share AppState; health uses the store directly.
    let bill_routes = Router::new()
        .route(
            "/api/v1/bills",
            post(routes::bills::upload_bills).get(routes::bills::list_bills),
        )
        .route("/api/v1/bills/:id", delete(routes::bills::delete_bill))
        .route("/api/v1/bills/:id/daily", get(routes::bills::get_bill_daily))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state.clone());

    let forecast_routes = Router::new()
        .route(
            "/api/v1/forecast/next-month",
            get(routes::forecast::get_next_month_forecast),
        )
        .with_state(app_state);

    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(store);

    let app = Router::new()
        .merge(health_routes)
        .merge(bill_routes)
        .merge(forecast_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
