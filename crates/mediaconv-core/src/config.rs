//! Configuration module
//!
//! Settings for the converter: database connection, the media library's
//! upload root and batch behaviour. Values come from the environment (a `.env`
//! file is loaded first when present).

use std::env;
use std::path::PathBuf;

use regex::Regex;

use crate::models::UploadRoot;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: u32 = 100;
const TABLE_PREFIX: &str = "wp_";
const QUALITY_PRESET: &str = "normal";

/// Converter configuration
#[derive(Clone, Debug)]
pub struct ConverterConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Prefix of the host's tables, e.g. `wp_` for `wp_posts`
    pub table_prefix: String,
    pub upload_base_url: String,
    pub upload_base_dir: PathBuf,
    pub page_size: u32,
    /// Quality preset name used when encoding (see the processing crate)
    pub quality: String,
    pub environment: String,
}

impl ConverterConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let upload_base_url = env::var("UPLOAD_BASE_URL").unwrap_or_default();
        let upload_base_dir = PathBuf::from(env::var("UPLOAD_BASE_DIR").unwrap_or_default());

        let config = ConverterConfig {
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            table_prefix: env::var("TABLE_PREFIX").unwrap_or_else(|_| TABLE_PREFIX.to_string()),
            upload_base_url,
            upload_base_dir,
            page_size: env::var("PAGE_SIZE")
                .unwrap_or_else(|_| PAGE_SIZE.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PAGE_SIZE must be a valid number"))?,
            quality: env::var("CONVERT_QUALITY")
                .unwrap_or_else(|_| QUALITY_PRESET.to_string())
                .trim()
                .to_lowercase(),
            environment,
        };

        Ok(config)
    }

    /// Check if the converter is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn upload_root(&self) -> UploadRoot {
        UploadRoot::new(self.upload_base_url.clone(), self.upload_base_dir.clone())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("mysql://") && !self.database_url.starts_with("mariadb://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid MySQL connection string"
            ));
        }

        // Interpolated into SQL, so keep it to identifier characters.
        let prefix_pattern = Regex::new(r"^[A-Za-z0-9_]+$")
            .map_err(|e| anyhow::anyhow!("Failed to compile table prefix regex: {}", e))?;
        if !prefix_pattern.is_match(&self.table_prefix) {
            return Err(anyhow::anyhow!(
                "TABLE_PREFIX may only contain letters, digits and underscores"
            ));
        }

        if !(self.upload_base_url.starts_with("http://")
            || self.upload_base_url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "UPLOAD_BASE_URL must be set to an http(s) URL"
            ));
        }

        if !self.upload_base_dir.is_absolute() {
            return Err(anyhow::anyhow!(
                "UPLOAD_BASE_DIR must be set to an absolute path"
            ));
        }

        if self.page_size == 0 {
            return Err(anyhow::anyhow!("PAGE_SIZE must be greater than zero"));
        }

        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!(
                "DB_MAX_CONNECTIONS must be greater than zero"
            ));
        }

        Ok(())
    }
}
