//! PostgreSQL backend for tabula-db
//!
//! A lazily opened tokio-postgres client built from resolved
//! [`ConnectionParams`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::connection::{Connection, DatabaseType};
use crate::error::{Error, Result};
use crate::params::ConnectionParams;

/// PostgreSQL connection implementation
pub struct PgConnection {
    params: ConnectionParams,
    client: OnceCell<tokio_postgres::Client>,
}

impl PgConnection {
    /// Create an unopened connection
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            client: OnceCell::new(),
        }
    }

    /// Whether the client has been opened
    pub fn is_open(&self) -> bool {
        self.client.initialized()
    }

    fn config(&self) -> tokio_postgres::Config {
        let (host, port) = self.params.host_and_port();
        let mut config = tokio_postgres::Config::new();
        config
            .host(host)
            .user(self.params.user.as_str())
            .password(self.params.password.expose_secret())
            .dbname(self.params.database_name.as_str())
            .application_name("tabula-db");
        if let Some(port) = self.params.port().filter(|p| *p != 0).or(port) {
            config.port(port);
        }
        config
    }

    async fn client(&self) -> Result<&tokio_postgres::Client> {
        self.client
            .get_or_try_init(|| async {
                let (client, connection) = self
                    .config()
                    .connect(tokio_postgres::NoTls)
                    .await
                    .map_err(|e| {
                        Error::connection_with_source(
                            format!("failed to connect to PostgreSQL at {}", self.params.host),
                            e,
                        )
                    })?;

                // Spawn the connection handler
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection error: {}", e);
                    }
                });

                debug!(
                    host = %self.params.host,
                    database = %self.params.database_name,
                    "Opened PostgreSQL connection"
                );
                Ok::<_, Error>(client)
            })
            .await
    }
}

#[async_trait]
impl Connection for PgConnection {
    fn server(&self) -> &str {
        &self.params.host
    }

    fn database_name(&self) -> &str {
        &self.params.database_name
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn ping(&self) -> Result<()> {
        self.client()
            .await?
            .simple_query("SELECT 1")
            .await
            .map_err(|e| Error::connection_with_source("PostgreSQL ping failed", e))?;
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        self.client()
            .await?
            .execute(sql, &[])
            .await
            .map_err(|e| Error::query_with_source("failed to execute statement", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EngineParams;

    fn connection(host: &str, port: u16) -> PgConnection {
        PgConnection::new(ConnectionParams {
            host: host.into(),
            user: "wiki".into(),
            password: "wikipass".into(),
            database_name: "wikidb".into(),
            table_prefix: "tabula__".into(),
            database_type: DatabaseType::Postgres,
            engine: EngineParams::Postgres { port },
        })
    }

    #[test]
    fn test_new_does_not_connect() {
        let conn = connection("pg1", 5433);

        assert!(!conn.is_open());
        assert_eq!(conn.server(), "pg1");
        assert_eq!(conn.database_type(), DatabaseType::Postgres);
        assert!(conn.charset_override().is_none());
        assert_eq!(conn.config().get_ports(), &[5433]);
    }

    #[test]
    fn test_zero_port_falls_back_to_host_port() {
        let conn = connection("pg1:5433", 0);
        assert_eq!(conn.config().get_ports(), &[5433]);
    }

    #[test]
    fn test_configured_port_wins_over_host_port() {
        let conn = connection("pg1:5433", 6432);
        assert_eq!(conn.config().get_ports(), &[6432]);
    }

    #[test]
    fn test_zero_port_without_host_port_uses_driver_default() {
        let conn = connection("pg1", 0);
        assert!(conn.config().get_ports().is_empty());
    }
}
