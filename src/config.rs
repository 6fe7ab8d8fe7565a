//! Runtime configuration read from the environment (and `.env` when present).

use crate::errors::AppError;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_STORAGE_DIR: &str = "data/uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 300;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const MIN_SESSION_KEY_LEN: usize = 64;
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// `None` means a random key is generated at start-up.
    pub session_key: Option<String>,
    pub storage_dir: String,
    /// `None` means a random signing key is generated at start-up.
    pub storage_signing_key: Option<String>,
    pub max_upload_bytes: usize,
    pub expiry_sweep_secs: u64,
    pub db_max_connections: u32,
    pub admin_username: String,
    pub admin_password: String,
    pub admin_email: String,
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Failed to read .env file: {e}");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL is required".to_string()))?;

        let session_key = match get("SESSION_KEY") {
            Some(key) if key.len() >= MIN_SESSION_KEY_LEN => Some(key),
            Some(key) => {
                log::warn!(
                    "SESSION_KEY too short ({} bytes, need {}+), generating random key",
                    key.len(),
                    MIN_SESSION_KEY_LEN
                );
                None
            }
            None => {
                log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
                None
            }
        };

        let storage_signing_key = get("STORAGE_SIGNING_KEY");
        if storage_signing_key.is_none() {
            log::warn!("No STORAGE_SIGNING_KEY set, signed file URLs will not survive a restart");
        }

        Ok(Self {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            session_key,
            storage_dir: get("STORAGE_DIR").unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string()),
            storage_signing_key,
            max_upload_bytes: parse_or(
                get("MAX_UPLOAD_BYTES"),
                "MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            expiry_sweep_secs: parse_or(
                get("EXPIRY_SWEEP_SECS"),
                "EXPIRY_SWEEP_SECS",
                DEFAULT_EXPIRY_SWEEP_SECS,
            )?,
            db_max_connections: parse_or(
                get("DB_MAX_CONNECTIONS"),
                "DB_MAX_CONNECTIONS",
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
            admin_username: get("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password: get("ADMIN_PASSWORD")
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            admin_email: get("ADMIN_EMAIL").unwrap_or_else(|| "admin@localhost".to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} must be a positive number, got '{raw}'"))),
        None => Ok(default),
    }
}
