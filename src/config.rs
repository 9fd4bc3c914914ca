/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Latitude of the metered property (bills are tied to one location).
    pub latitude: f64,
    /// Longitude of the metered property.
    pub longitude: f64,
    /// IANA timezone passed to Open-Meteo so daily series align with local days.
    pub timezone: String,
    /// Base URL of the Open-Meteo archive API (overridable for tests).
    pub archive_api_url: String,
    /// Directory containing bill PDFs to load at startup.
    pub bills_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            latitude: std::env::var("LATITUDE")
                .unwrap_or_else(|_| "42.3601".to_string())
                .parse()
                .expect("LATITUDE must be a valid number"),
            longitude: std::env::var("LONGITUDE")
                .unwrap_or_else(|_| "-71.0589".to_string())
                .parse()
                .expect("LONGITUDE must be a valid number"),
            timezone: std::env::var("TIMEZONE").unwrap_or_else(|_| "America/New_York".to_string()),
            archive_api_url: std::env::var("ARCHIVE_API_URL")
                .unwrap_or_else(|_| "https://archive-api.open-meteo.com/v1/archive".to_string()),
            bills_dir: std::env::var("BILLS_DIR").unwrap_or_else(|_| "./bills".to_string()),
        }
    }
}
