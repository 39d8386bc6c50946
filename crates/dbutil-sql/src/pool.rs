//! # Database Pool Management
//!
//! The connection holder shared by every repository.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Process Startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_env() / DbConfig::new(url) ← pool tuning + naming      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::must_connect(config).await ← fatal on failure               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.must_migrate(&schema).await ← create / extend tables               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Repository::<Account>::new(&db)  Repository::<Entry>::new(&db) ...    │
//! │  (each clones the handle; the pool itself is shared)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.close().await ← process shutdown                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The handle is explicitly constructed and injected; there is no global.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dbutil_core::{Entity, NamingStrategy};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, Schema};
use crate::repository::{Record, Repository};

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("./data/app.db")
///     .max_connections(20)
///     .min_connections(5)
///     .max_lifetime(Some(Duration::from_secs(3600)));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// sqlx connection URL (`sqlite://path?mode=rwc`, `sqlite::memory:`).
    pub database_url: String,

    /// Maximum number of open connections.
    /// Default: 10
    pub max_connections: u32,

    /// Connections kept open while idle.
    /// Default: 1
    pub min_connections: u32,

    /// Maximum lifetime of a connection before it is recycled.
    /// Default: 30 minutes
    pub max_lifetime: Option<Duration>,

    /// How long to wait for a free connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Idle timeout before closing a connection above `min_connections`.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Table naming strategy.
    /// Default: singular table names
    pub naming: NamingStrategy,
}

impl DbConfig {
    /// Creates a configuration for a database URL or file path.
    ///
    /// A bare path is turned into `sqlite://<path>?mode=rwc`, which creates
    /// the file if it doesn't exist.
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let database_url = if target.starts_with("sqlite:") {
            target
        } else {
            format!("sqlite://{target}?mode=rwc")
        };

        DbConfig {
            database_url,
            max_connections: 10,
            min_connections: 1,
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            naming: NamingStrategy::default(),
        }
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// A private in-memory database lives as long as its connection, so the
    /// pool holds exactly one connection that is never recycled.
    pub fn in_memory() -> Self {
        DbConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            max_lifetime: None,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: None,
            naming: NamingStrategy::default(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// | Variable                         | Default                      |
    /// |----------------------------------|------------------------------|
    /// | `DBUTIL_DATABASE_URL`            | `sqlite://dbutil.db?mode=rwc`|
    /// | `DBUTIL_MAX_OPEN_CONNS`          | 10                           |
    /// | `DBUTIL_MIN_CONNS`               | 1                            |
    /// | `DBUTIL_CONN_MAX_LIFETIME_SECS`  | 1800 (0 disables)            |
    /// | `DBUTIL_SINGULAR_TABLE`          | true                         |
    ///
    /// `DBUTIL_MIN_CONNS` is a floor: the pool opens that many connections
    /// up front and keeps them open while idle.
    pub fn from_env() -> DbResult<Self> {
        let url = env::var("DBUTIL_DATABASE_URL").unwrap_or_else(|_| "dbutil.db".to_string());
        let mut config = DbConfig::new(url);

        config.max_connections = env_or("DBUTIL_MAX_OPEN_CONNS", config.max_connections)?;
        config.min_connections = env_or("DBUTIL_MIN_CONNS", config.min_connections)?;

        let lifetime_secs: u64 = env_or("DBUTIL_CONN_MAX_LIFETIME_SECS", 30 * 60)?;
        config.max_lifetime = (lifetime_secs > 0).then(|| Duration::from_secs(lifetime_secs));

        config.naming.singular_table = env_or("DBUTIL_SINGULAR_TABLE", true)?;

        Ok(config)
    }

    /// Sets the maximum number of open connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the number of connections kept while idle.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the maximum connection lifetime.
    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Sets the acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the table naming strategy.
    pub fn naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> DbResult<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| DbError::Config(key.to_string())),
        Err(_) => Ok(default),
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared database handle.
///
/// Cloning is cheap: clones share the same pool. Repositories borrow the
/// pool on every operation and never own it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    naming: NamingStrategy,
}

impl Database {
    /// Creates the connection pool.
    ///
    /// ## What This Does
    /// 1. Parses the URL and enables foreign keys
    /// 2. Uses WAL journaling for file databases
    /// 3. Builds the pool with the configured limits
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use handle
    /// * `Err(DbError::ConnectionFailed)` - URL or connection problem
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        info!(url = %config.database_url, "Initializing database connection");

        let mut connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .foreign_keys(true)
            .create_if_missing(true);

        if !config.is_in_memory() {
            connect_options = connect_options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database pool created"
        );

        Ok(Database {
            pool,
            naming: config.naming,
        })
    }

    /// Connects or terminates the process.
    ///
    /// Startup can't continue without a database, so connection errors are
    /// logged and the process exits with status 1.
    pub async fn must_connect(config: DbConfig) -> Self {
        match Database::connect(config).await {
            Ok(db) => db,
            Err(e) => {
                error!(error = %e, "Database connection failed");
                std::process::exit(1);
            }
        }
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool, naming: NamingStrategy) -> Self {
        Database { pool, naming }
    }

    /// Synchronizes the schema of every registered entity.
    ///
    /// Missing tables are created; existing tables get missing columns
    /// added. Columns are never dropped.
    pub async fn migrate(&self, schema: &Schema) -> DbResult<()> {
        info!(tables = schema.len(), "Synchronizing schema");
        migrations::sync_schema(&self.pool, &self.naming, schema).await?;
        info!("Schema synchronized");
        Ok(())
    }

    /// Synchronizes the schema or terminates the process.
    pub async fn must_migrate(&self, schema: &Schema) {
        if let Err(e) = self.migrate(schema).await {
            error!(error = %e, "Schema synchronization failed");
            std::process::exit(1);
        }
    }

    /// Returns a reference to the connection pool.
    ///
    /// For queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the table naming strategy.
    pub fn naming(&self) -> &NamingStrategy {
        &self.naming
    }

    /// Resolves the table name of an entity type.
    pub fn table_name<T: Entity>(&self) -> String {
        T::table_name(&self.naming)
    }

    /// Starts a transaction for the `tx_*` repository operations.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Returns a repository for an entity type.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let active = db.repository::<Account>()
    ///     .with_option("active", true)
    ///     .find()
    ///     .await?;
    /// ```
    pub fn repository<T: Record>(&self) -> Repository<T> {
        Repository::new(self)
    }

    /// Closes the connection pool.
    ///
    /// ## Note
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
