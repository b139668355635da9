use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub cors_origins: Vec<String>,
    pub public_url: String,
    /// Business metadata files loaded once at startup, in order.
    pub seed_files: Vec<String>,
    pub duckdb_memory_limit: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let port: u16 = std::env::var("LEADPULSE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| format!("invalid port: {e}"))?;

        Ok(Self {
            port,
            data_dir: std::env::var("LEADPULSE_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            cors_origins: std::env::var("LEADPULSE_CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            public_url: std::env::var("LEADPULSE_PUBLIC_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            seed_files: std::env::var("LEADPULSE_SEED_FILE")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            duckdb_memory_limit: std::env::var("LEADPULSE_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
        })
    }

    /// Path of the DuckDB file holding businesses and visits.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("leadpulse.db")
    }

    /// Directory holding one JSON file per recorded session.
    pub fn analytics_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("analytics")
    }
}

/// Comma-separated list with blanks dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
