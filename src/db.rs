use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts};
use tokio_postgres::types::FromSql;
use tokio_postgres::{NoTls, Row};
use tokio_postgres::error::SqlState;
use crate::error::{AppError, Result};
use std::time::Duration;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Creates a new database connection pool.
///
/// # Arguments
///
/// * `database_url` - The URL of the PostgreSQL database.
///
/// # Returns
///
/// A `Result` containing the `Pool`.
pub fn create_pool(database_url: &str) -> Result<Pool> {
    let mut cfg = Config::new();
    let pg_config: tokio_postgres::Config = database_url.parse()?;

    if let Some(host) = pg_config.get_hosts().first() {
        match host {
            tokio_postgres::config::Host::Tcp(hostname) => cfg.host = Some(hostname.clone()),
            #[cfg(unix)]
            tokio_postgres::config::Host::Unix(path) => {
                cfg.host = Some(path.to_string_lossy().to_string())
            }
        }
    }

    if let Some(port) = pg_config.get_ports().first() {
        cfg.port = Some(*port);
    }

    if let Some(dbname) = pg_config.get_dbname() {
        cfg.dbname = Some(dbname.to_string());
    }

    if let Some(user) = pg_config.get_user() {
        cfg.user = Some(user.to_string());
    }

    if let Some(password) = pg_config.get_password() {
        cfg.password = Some(String::from_utf8_lossy(password).to_string());
    }

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let mut pool_cfg = PoolConfig::new(32);
    pool_cfg.timeouts = Timeouts {
        wait: Some(Duration::from_secs(5)),
        create: Some(Duration::from_secs(2)),
        recycle: Some(Duration::from_secs(1)),
    };
    cfg.pool = Some(pool_cfg);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| AppError::Internal(format!("Failed to create pool: {}", e)))
}

/// Applies the schema. Every statement is idempotent.
pub async fn migrate(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("✅ Database schema is up to date");
    Ok(())
}

/// PostgreSQL-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-index violation onto `Conflict`, everything else onto `Database`.
pub(crate) fn map_unique_violation(e: tokio_postgres::Error, what: &str) -> AppError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        AppError::Conflict(format!("{} already exists", what))
    } else {
        AppError::Database(e)
    }
}

/// Reads `name` from `row`, reporting a missing or mistyped column as `MissingData`.
pub(crate) fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| AppError::MissingData(format!("{}: {}", name, e)))
}
