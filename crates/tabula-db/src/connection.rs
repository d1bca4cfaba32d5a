//! Connection traits for tabula-db
//!
//! Core abstractions shared by the resolver and its collaborators:
//! - Connection: a live (possibly lazily opened) database handle
//! - ClientCharsetOverride: optional capability to read and change the
//!   client character set of the native driver connection
//! - AccessMode / ServerIndex: what a caller asks for vs. what a balancer is asked for
//! - DatabaseType: engine type tag

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Shared handle to a live connection.
///
/// Two handles refer to the same connection when they point at the same allocation.
pub type ConnectionHandle = Arc<dyn Connection>;

/// A connection to a database
#[async_trait]
pub trait Connection: Send + Sync {
    /// Server (host) this connection targets
    fn server(&self) -> &str;

    /// Database name this connection targets
    fn database_name(&self) -> &str;

    /// Engine type of this connection
    fn database_type(&self) -> DatabaseType;

    /// Path of the database file, for file-based engines
    fn file_path(&self) -> Result<PathBuf> {
        Err(Error::introspection(format!(
            "{} connections are not file-based",
            self.database_type()
        )))
    }

    /// Force the connection open and check that it is alive
    async fn ping(&self) -> Result<()>;

    /// Execute a statement, returns the affected row count
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Check if connection is valid/alive
    async fn is_valid(&self) -> bool {
        self.ping().await.is_ok()
    }

    /// Client character set capability, for engines whose client defaults to
    /// a byte-oriented character set.
    ///
    /// Wrapping connections forward this to the connection they wrap.
    fn charset_override(&self) -> Option<&dyn ClientCharsetOverride> {
        None
    }
}

/// Read and change the client character set of the native driver connection.
///
/// Callers must `ping()` the owning connection first so that the native
/// connection exists.
#[async_trait]
pub trait ClientCharsetOverride: Send + Sync {
    /// Current client character set name (e.g. `binary`, `utf8mb4`)
    async fn client_charset(&self) -> Result<String>;

    /// Switch the client character set
    async fn set_client_charset(&self, charset: &str) -> Result<()>;
}

/// Access mode requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Writable primary server
    Primary,
    /// Any read replica
    Replica,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Replica => write!(f, "replica"),
        }
    }
}

/// Server selector handed to a load balancer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ServerIndex {
    /// Writable primary server
    #[default]
    Primary,
    /// Any read replica
    Replica,
    /// Explicit position in the host's server list
    Index(usize),
}

impl From<AccessMode> for ServerIndex {
    fn from(mode: AccessMode) -> Self {
        match mode {
            AccessMode::Primary => Self::Primary,
            AccessMode::Replica => Self::Replica,
        }
    }
}

/// Accepts `"primary"`, `"replica"` or a non-negative server position
impl<'de> Deserialize<'de> for ServerIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Position(usize),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Position(i) => Ok(Self::Index(i)),
            Repr::Name(name) => match name.as_str() {
                "primary" => Ok(Self::Primary),
                "replica" => Ok(Self::Replica),
                other => Err(serde::de::Error::custom(format!(
                    "unknown server index '{}', expected 'primary', 'replica' or a number",
                    other
                ))),
            },
        }
    }
}

impl std::fmt::Display for ServerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Replica => write!(f, "replica"),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Database engine type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    /// MySQL/MariaDB
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite (file-based)
    Sqlite,
    /// Any other engine, tag kept verbatim
    Other(String),
}

impl DatabaseType {
    /// Parse a type tag. Unknown tags are preserved in `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "mysql" => Self::MySql,
            "postgres" => Self::Postgres,
            "sqlite" => Self::Sqlite,
            other => Self::Other(other.to_string()),
        }
    }

    /// The type tag as used by host configuration
    pub fn as_str(&self) -> &str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DatabaseType {
    fn from(tag: &str) -> Self {
        Self::from_tag(tag)
    }
}

impl Serialize for DatabaseType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DatabaseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}
