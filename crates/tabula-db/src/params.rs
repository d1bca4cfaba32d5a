//! Connection parameters handed to a [`ConnectionFactory`](crate::factory::ConnectionFactory).

use std::path::{Path, PathBuf};

use crate::connection::DatabaseType;
use crate::secret::SensitiveString;

/// Engine-specific connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineParams {
    /// No extra parameters
    Standard,
    /// Client/server engine that needs an explicit port
    Postgres {
        /// Server port
        port: u16,
    },
    /// File-based engine
    Sqlite {
        /// Database file path
        file_path: PathBuf,
    },
}

/// Fully resolved parameters for one local connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Server host
    pub host: String,
    /// User name
    pub user: String,
    /// Password (redacted in `Debug`)
    pub password: SensitiveString,
    /// Database name
    pub database_name: String,
    /// Prefix prepended to every table name
    pub table_prefix: String,
    /// Engine type
    pub database_type: DatabaseType,
    /// Engine-specific extras
    pub engine: EngineParams,
}

impl ConnectionParams {
    /// Port, for engines that take one
    pub fn port(&self) -> Option<u16> {
        match &self.engine {
            EngineParams::Postgres { port } => Some(*port),
            _ => None,
        }
    }

    /// Database file path, for file-based engines
    pub fn file_path(&self) -> Option<&Path> {
        match &self.engine {
            EngineParams::Sqlite { file_path } => Some(file_path),
            _ => None,
        }
    }

    /// Split a `host:port` server string.
    ///
    /// Hosts without a numeric port suffix (including bare IPv6 literals) are
    /// returned unchanged.
    pub fn host_and_port(&self) -> (&str, Option<u16>) {
        if let Some((host, port)) = self.host.rsplit_once(':') {
            if !host.contains(':') {
                if let Ok(port) = port.parse() {
                    return (host, Some(port));
                }
            }
        }
        (&self.host, None)
    }
}
