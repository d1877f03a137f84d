//! Configuration management for the leasehold CLI
//!
//! Sources, lowest precedence first: built-in defaults, the YAML config file,
//! `LEASEHOLD_*` environment variables (`__` separates nested keys, e.g.
//! `LEASEHOLD_DB__POOL__MAX_CONNECTIONS`), then command line flags.

use std::time::Duration;

use anyhow::Context;
use config::{Config, Environment, File};
use leasehold_core::{DEFAULT_TTL_SECONDS, LockSettings};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::cli::Cli;

/// Config file picked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "conf/leasehold.yml";

const DB_URL: &str = "db.url";
const DB_MAX_CONNECTIONS: &str = "db.pool.max_connections";
const DB_MIN_CONNECTIONS: &str = "db.pool.min_connections";
const DB_CONNECT_TIMEOUT: &str = "db.pool.connect_timeout_secs";
const DB_IDLE_TIMEOUT: &str = "db.pool.idle_timeout_secs";
const DB_SQLX_LOGGING: &str = "db.pool.sqlx_logging";
const LOCK_SECTION: &str = "lock";
const LOCK_DEFAULT_TTL: &str = "lock.default_ttl_seconds";
const LOG_LEVEL: &str = "log.level";

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .set_default(DB_MAX_CONNECTIONS, 10_i64)?
            .set_default(DB_MIN_CONNECTIONS, 1_i64)?
            .set_default(DB_CONNECT_TIMEOUT, 30_i64)?
            .set_default(DB_IDLE_TIMEOUT, 600_i64)?
            .set_default(DB_SQLX_LOGGING, false)?
            .set_default(LOCK_DEFAULT_TTL, DEFAULT_TTL_SECONDS)?
            .set_default(LOG_LEVEL, "info")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(path.as_path())),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("LEASEHOLD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = &cli.database_url {
            builder = builder.set_override(DB_URL, url.as_str())?;
        }
        if let Some(level) = &cli.log_level {
            builder = builder.set_override(LOG_LEVEL, level.as_str())?;
        }

        let config = builder.build().context("failed to load configuration")?;

        Ok(Configuration { config })
    }

    pub fn database_url(&self) -> anyhow::Result<String> {
        self.config
            .get_string(DB_URL)
            .context("db.url is not set; pass --db-url or set DATABASE_URL")
    }

    pub fn lock_settings(&self) -> LockSettings {
        self.config
            .get::<LockSettings>(LOCK_SECTION)
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> String {
        self.config
            .get_string(LOG_LEVEL)
            .unwrap_or("info".to_string())
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let max_connections = self.config.get_int(DB_MAX_CONNECTIONS).unwrap_or(10) as u32;
        let min_connections = self.config.get_int(DB_MIN_CONNECTIONS).unwrap_or(1) as u32;
        let connect_timeout = self.config.get_int(DB_CONNECT_TIMEOUT).unwrap_or(30) as u64;
        let idle_timeout = self.config.get_int(DB_IDLE_TIMEOUT).unwrap_or(600) as u64;
        let sqlx_logging = self.config.get_bool(DB_SQLX_LOGGING).unwrap_or(false);

        let url = self.database_url()?;

        let mut opt = ConnectOptions::new(url);

        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .sqlx_logging(sqlx_logging);

        tracing::debug!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            idle_timeout = idle_timeout,
            sqlx_logging = sqlx_logging,
            "Database connection pool configured"
        );

        let connection = Database::connect(opt)
            .await
            .context("failed to connect to database")?;

        Ok(connection)
    }
}

/// Owner identity used when `--owner` is omitted: this host's name.
pub fn default_owner() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
