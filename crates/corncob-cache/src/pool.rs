//! Database connection pool management
//!
//! Wraps SQLx's `SqlitePool` with:
//! - automatic directory creation for database files
//! - WAL journal mode for concurrent reads
//! - automatic schema migration on first connection
//! - in-memory mode for testing

use std::path::Path;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Manages a pool of SQLite connections for CornCob's local remote bookkeeping.
///
/// Configured with WAL journal mode for concurrent read access, 5 max
/// connections for file-based databases, 1 connection for in-memory
/// databases (required for data persistence), and a 5-second busy timeout
/// to handle write contention.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Connects to (creating if absent) the SQLite database at `db_path` and
    /// runs schema migrations.
    pub async fn new(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create database directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("connect to database at {}", db_path.display()))?;

        Self::run_migrations(&pool).await?;

        tracing::info!(path = %db_path.display(), "database pool initialized");

        Ok(Self { pool })
    }

    /// Creates an in-memory database pool, for tests.
    ///
    /// Uses a single connection to ensure data persistence across queries
    /// (SQLite in-memory databases are per-connection).
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("create in-memory database")?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("in-memory database pool initialized");

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
        let migration_sql = include_str!("migrations/20260203_initial.sql");
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .context("run initial migration")?;

        tracing::debug!("database migrations completed");
        Ok(())
    }
}
