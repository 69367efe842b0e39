//! Configuration management

use anyhow::{Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Google Maps Distance Matrix API key. Without one, travel times fall
    /// back to the haversine estimate.
    pub google_maps_api_key: Option<String>,

    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Directory for the rolling daily log file.
    pub logs_dir: String,

    /// Max solves allowed to run concurrently (the solver is CPU-bound).
    pub solve_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let google_maps_api_key = std::env::var("GOOGLE_MAPS_API_KEY").ok().filter(|s| !s.is_empty());

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "../logs".to_string());

        let solve_concurrency = std::env::var("SOLVE_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        Ok(Self { database_url, google_maps_api_key, bind_addr, logs_dir, solve_concurrency })
    }
}
