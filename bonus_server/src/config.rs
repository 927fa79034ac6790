use std::{env, fmt::Display, str::FromStr, time::Duration};

use bonus_engine::accrual::PollerConfig;
use bpl_common::helpers::parse_boolean_flag;
use log::*;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/bonus_ledger.db";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_BATCH_SIZE: i64 = 10;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub max_db_connections: u32,
    /// If true, the embedded schema migrations are applied before anything else touches the database.
    pub run_migrations: bool,
    pub accrual: AccrualConfig,
}

#[derive(Clone, Debug)]
pub struct AccrualConfig {
    /// The base URL of the accrual system. When this is `None`, the accrual poller is not started and orders stay
    /// unresolved.
    pub system_address: Option<String>,
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            run_migrations: true,
            accrual: AccrualConfig::default(),
        }
    }
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            system_address: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl AccrualConfig {
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: self.poll_interval,
            batch_size: self.batch_size,
            request_timeout: self.request_timeout,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any source of `BPL_*` values. Invalid values are logged and replaced with the
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("BPL_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URI").filter(|uri| is_sqlite_url(uri)))
            .unwrap_or_else(|| {
                info!("🪛️ BPL_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
                DEFAULT_DATABASE_URL.to_string()
            });
        let max_db_connections =
            parse_positive(&lookup, "BPL_MAX_DB_CONNECTIONS", DEFAULT_MAX_DB_CONNECTIONS, |v: &u32| *v > 0);
        let run_migrations = parse_boolean_flag(lookup("BPL_RUN_MIGRATIONS"), true);
        let accrual = AccrualConfig::from_lookup(&lookup);
        Self { database_url, max_db_connections, run_migrations, accrual }
    }
}

impl AccrualConfig {
    fn from_lookup<F>(lookup: &F) -> Self
    where F: Fn(&str) -> Option<String> {
        let system_address = lookup("BPL_ACCRUAL_SYSTEM_ADDRESS")
            .or_else(|| lookup("ACCRUAL_SYSTEM_ADDRESS"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(with_scheme);
        if system_address.is_none() {
            warn!(
                "🪛️ BPL_ACCRUAL_SYSTEM_ADDRESS is not set. Orders will not be reconciled with the accrual system, and \
                 no points will be accrued."
            );
        }
        let poll_interval = parse_positive(&lookup, "BPL_ACCRUAL_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS, |v| *v > 0);
        let batch_size = parse_positive(&lookup, "BPL_ACCRUAL_BATCH_SIZE", DEFAULT_BATCH_SIZE, |v| *v > 0);
        let request_timeout =
            parse_positive(&lookup, "BPL_ACCRUAL_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS, |v| *v > 0);
        Self {
            system_address,
            poll_interval: Duration::from_millis(poll_interval),
            batch_size,
            request_timeout: Duration::from_millis(request_timeout),
        }
    }
}

/// `DATABASE_URI` is shared with other deployments of the loyalty system, which may point it at a different kind of
/// database. Only SQLite URLs are usable here.
fn is_sqlite_url(uri: &str) -> bool {
    let usable = uri.starts_with("sqlite:");
    if !usable {
        warn!("🪛️ Ignoring DATABASE_URI, since it is not an SQLite URL. Set BPL_DATABASE_URL instead.");
    }
    usable
}

/// Accrual system addresses are often given as bare `host:port`.
fn with_scheme(address: String) -> String {
    if address.contains("://") {
        address
    } else {
        format!("http://{address}")
    }
}

fn parse_positive<T, F, V>(lookup: &F, name: &str, default: T, valid: V) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
    V: Fn(&T) -> bool,
{
    let Some(s) = lookup(name) else {
        debug!("🪛️ {name} is not set. Using the default value of {default}.");
        return default;
    };
    match s.trim().parse::<T>() {
        Ok(v) if valid(&v) => v,
        Ok(v) => {
            warn!("🪛️ {v} is not a valid value for {name}. It must be greater than zero. Using the default, {default}.");
            default
        },
        Err(e) => {
            warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default, {default}.");
            default
        },
    }
}
