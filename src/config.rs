use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_cron_per_min: u32,

    pub api_prefix: String,

    /// Shared secret expected in `X-Cron-Token`; unset disables the check.
    pub cron_token: Option<String>,
    /// Offset of the portal's local calendar from UTC.
    pub utc_offset_minutes: i32,
    pub log_level: String,
    pub notification_limit: u32,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "cih-backend".to_string()),

            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,
            rate_cron_per_min: parsed_or("RATE_CRON_PER_MIN", 6)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            cron_token: env::var("CRON_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            // America/Tegucigalpa, no daylight saving
            utc_offset_minutes: parsed_or("UTC_OFFSET_MINUTES", -360)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
            notification_limit: parsed_or("NOTIFICATION_LIMIT", 50)?,
        })
    }

    /// Falls back to UTC when the configured offset is out of range.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}
