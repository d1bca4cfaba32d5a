//! SQLite backend for tabula-db
//!
//! Opens the database file named by [`EngineParams::Sqlite`]. Feature tables
//! live in the same file as the host's own data, so the file is created when
//! missing.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection as NativeConnection};
use sqlx::Connection as _;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::connection::{Connection, DatabaseType};
use crate::error::{Error, Result};
use crate::params::{ConnectionParams, EngineParams};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite connection implementation.
///
/// The file is not opened until the first call that needs it.
pub struct SqliteConnection {
    params: ConnectionParams,
    file_path: PathBuf,
    conn: Mutex<Option<NativeConnection>>,
}

impl SqliteConnection {
    /// Create an unopened connection.
    ///
    /// Fails when `params` carry no database file path.
    pub fn new(params: ConnectionParams) -> Result<Self> {
        let file_path = match &params.engine {
            EngineParams::Sqlite { file_path } => file_path.clone(),
            _ => {
                return Err(Error::config(
                    "sqlite connection parameters carry no database file path",
                ))
            }
        };

        Ok(Self {
            params,
            file_path,
            conn: Mutex::new(None),
        })
    }

    /// Whether the database file has been opened
    pub async fn is_open(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Close the database file, if open
    pub async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close()
                .await
                .map_err(|e| Error::connection_with_source("failed to close SQLite database", e))?;
        }
        Ok(())
    }

    fn options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.file_path)
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true)
    }

    async fn open(&self) -> Result<MutexGuard<'_, Option<NativeConnection>>> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            let conn = NativeConnection::connect_with(&self.options())
                .await
                .map_err(|e| {
                    Error::connection_with_source(
                        format!("failed to open SQLite database {}", self.file_path.display()),
                        e,
                    )
                })?;
            debug!(path = %self.file_path.display(), "Opened SQLite database");
            *guard = Some(conn);
        }
        Ok(guard)
    }
}

fn not_available() -> Error {
    Error::connection("SQLite database not available")
}

#[async_trait]
impl Connection for SqliteConnection {
    fn server(&self) -> &str {
        &self.params.host
    }

    fn database_name(&self) -> &str {
        &self.params.database_name
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn file_path(&self) -> Result<PathBuf> {
        Ok(self.file_path.clone())
    }

    async fn ping(&self) -> Result<()> {
        let mut guard = self.open().await?;
        let conn = guard.as_mut().ok_or_else(not_available)?;
        conn.ping()
            .await
            .map_err(|e| Error::connection_with_source("SQLite ping failed", e))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let mut guard = self.open().await?;
        let conn = guard.as_mut().ok_or_else(not_available)?;
        let result = sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::query_with_source("failed to execute statement", e))?;
        Ok(result.rows_affected())
    }
}
