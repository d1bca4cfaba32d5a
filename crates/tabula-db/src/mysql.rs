//! MySQL backend for tabula-db
//!
//! Provides a lazily opened MySQL connection built from resolved
//! [`ConnectionParams`]. It is the only built-in handle exposing
//! [`ClientCharsetOverride`], since MySQL clients may default to a
//! `binary` client character set.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::connection::{ClientCharsetOverride, Connection, DatabaseType};
use crate::error::{Error, Result};
use crate::params::ConnectionParams;

const DEFAULT_PORT: u16 = 3306;

/// MySQL connection implementation.
///
/// No network connection is made until the first call that needs one.
pub struct MySqlConnection {
    params: ConnectionParams,
    conn: Mutex<Option<Conn>>,
}

impl MySqlConnection {
    /// Create an unopened connection
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            conn: Mutex::new(None),
        }
    }

    /// Whether the native connection has been opened
    pub async fn is_open(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Disconnect the native connection, if open
    pub async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.disconnect()
                .await
                .map_err(|e| Error::connection_with_source("failed to close MySQL connection", e))?;
        }
        Ok(())
    }

    fn opts(&self) -> OptsBuilder {
        let (host, port) = self.params.host_and_port();
        OptsBuilder::default()
            .ip_or_hostname(host)
            .tcp_port(port.unwrap_or(DEFAULT_PORT))
            .user(Some(self.params.user.as_str()))
            .pass(Some(self.params.password.expose_secret()))
            .db_name(Some(self.params.database_name.as_str()))
    }

    /// Lock the native connection, opening it first if needed
    async fn open(&self) -> Result<MutexGuard<'_, Option<Conn>>> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            let conn = Conn::new(self.opts()).await.map_err(|e| {
                Error::connection_with_source(
                    format!("failed to connect to MySQL at {}", self.params.host),
                    e,
                )
            })?;
            debug!(
                host = %self.params.host,
                database = %self.params.database_name,
                "Opened MySQL connection"
            );
            *guard = Some(conn);
        }
        Ok(guard)
    }
}

fn not_available() -> Error {
    Error::connection("MySQL connection not available")
}

#[async_trait]
impl Connection for MySqlConnection {
    fn server(&self) -> &str {
        &self.params.host
    }

    fn database_name(&self) -> &str {
        &self.params.database_name
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    async fn ping(&self) -> Result<()> {
        let mut guard = self.open().await?;
        let conn = guard.as_mut().ok_or_else(not_available)?;
        conn.ping()
            .await
            .map_err(|e| Error::connection_with_source("MySQL ping failed", e))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let mut guard = self.open().await?;
        let conn = guard.as_mut().ok_or_else(not_available)?;
        conn.query_drop(sql)
            .await
            .map_err(|e| Error::query_with_source("failed to execute statement", e))?;
        Ok(conn.affected_rows())
    }

    fn charset_override(&self) -> Option<&dyn ClientCharsetOverride> {
        Some(self)
    }
}

#[async_trait]
impl ClientCharsetOverride for MySqlConnection {
    async fn client_charset(&self) -> Result<String> {
        let mut guard = self.open().await?;
        let conn = guard.as_mut().ok_or_else(not_available)?;
        let charset: Option<String> = conn
            .query_first("SELECT @@character_set_client")
            .await
            .map_err(|e| Error::query_with_source("failed to read client character set", e))?;
        Ok(charset.unwrap_or_default())
    }

    async fn set_client_charset(&self, charset: &str) -> Result<()> {
        // SET NAMES takes an identifier, not a bind parameter
        if charset.is_empty() || !charset.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::config(format!("invalid character set name '{}'", charset)));
        }

        let mut guard = self.open().await?;
        let conn = guard.as_mut().ok_or_else(not_available)?;
        conn.query_drop(format!("SET NAMES {}", charset))
            .await
            .map_err(|e| Error::query_with_source("failed to set client character set", e))
    }
}
