//! Server configuration loaded from environment variables.
//!
//! Database connection settings live in `db_infra::db`; this struct carries
//! what the HTTP process adds on top: bind address, worker count, which
//! database kind to open, whether to migrate at startup, and the per-call
//! timeout and retry budget.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::config::db::DbKind;
use crate::db::retry::{CallPolicy, RetryPolicy};
use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_OP_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_MS: u64 = 50;
const MAX_RETRY_DELAY_MS: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub db_kind: DbKind,
    pub run_migrations: bool,
    pub op_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: num_cpus::get(),
            db_kind: DbKind::Postgres,
            run_migrations: false,
            op_timeout: Duration::from_millis(DEFAULT_OP_TIMEOUT_MS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
        }
    }
}

impl AppConfig {
    /// Load and validate server configuration. Unset variables take defaults;
    /// set-but-malformed variables are a configuration error.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let host = env::var("APP_HOST").unwrap_or(defaults.host);
        let port = parse_var("APP_PORT")?.unwrap_or(defaults.port);
        let workers = parse_var::<usize>("APP_WORKERS")?.unwrap_or(defaults.workers);
        if workers == 0 {
            return Err(AppError::config("APP_WORKERS must be at least 1"));
        }

        let db_kind = match env::var("APP_DB_KIND") {
            Ok(raw) => DbKind::from_str(&raw)?,
            Err(_) => defaults.db_kind,
        };
        let run_migrations = parse_bool("APP_RUN_MIGRATIONS")?.unwrap_or(defaults.run_migrations);

        let op_timeout = parse_var::<u64>("APP_DB_OP_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.op_timeout);
        if op_timeout.is_zero() {
            return Err(AppError::config("APP_DB_OP_TIMEOUT_MS must be greater than 0"));
        }

        let retry_attempts =
            parse_var::<u32>("APP_DB_RETRY_ATTEMPTS")?.unwrap_or(defaults.retry_attempts);
        if retry_attempts == 0 {
            return Err(AppError::config("APP_DB_RETRY_ATTEMPTS must be at least 1"));
        }
        let retry_base_delay = parse_var::<u64>("APP_DB_RETRY_BASE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_base_delay);

        Ok(Self {
            host,
            port,
            workers,
            db_kind,
            run_migrations,
            op_timeout,
            retry_attempts,
            retry_base_delay,
        })
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(
            self.op_timeout,
            RetryPolicy::new(
                self.retry_attempts,
                self.retry_base_delay,
                Duration::from_millis(MAX_RETRY_DELAY_MS),
            ),
        )
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::config(format!("{name} has an invalid value: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(name: &str) -> Result<Option<bool>, AppError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(AppError::config(format!("{name} must be a boolean, got '{raw}'"))),
        },
        Err(_) => Ok(None),
    }
}
