//! Connection factories
//!
//! A [`ConnectionFactory`] materializes an unmanaged connection from fully
//! resolved [`ConnectionParams`]. Hosts usually supply their own; when they
//! don't, [`DriverConnectionFactory`] builds one from the drivers compiled
//! into this crate.

use async_trait::async_trait;

use crate::connection::{ConnectionHandle, DatabaseType};
use crate::error::{Error, Result};
use crate::params::ConnectionParams;

/// Factory for creating connections
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Create a new connection of the given engine type
    async fn create(
        &self,
        database_type: &DatabaseType,
        params: ConnectionParams,
    ) -> Result<ConnectionHandle>;
}

/// Factory backed by the built-in drivers.
///
/// Connections it creates are opened lazily on first use.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnectionFactory;

#[async_trait]
impl ConnectionFactory for DriverConnectionFactory {
    #[cfg_attr(
        not(any(feature = "mysql", feature = "postgres", feature = "sqlite")),
        allow(unused_variables)
    )]
    async fn create(
        &self,
        database_type: &DatabaseType,
        params: ConnectionParams,
    ) -> Result<ConnectionHandle> {
        match database_type {
            #[cfg(feature = "mysql")]
            DatabaseType::MySql => Ok(std::sync::Arc::new(
                crate::mysql::MySqlConnection::new(params),
            )),
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Ok(std::sync::Arc::new(
                crate::postgres::PgConnection::new(params),
            )),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Ok(std::sync::Arc::new(
                crate::sqlite::SqliteConnection::new(params)?,
            )),
            other => Err(Error::unsupported(format!(
                "no built-in driver for database type '{}'",
                other
            ))),
        }
    }
}
