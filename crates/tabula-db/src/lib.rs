//! # tabula-db
//!
//! Database connection resolution for Tabula feature storage.
//!
//! Tabula stores its tables next to the host application's own data. This
//! crate decides, for every request, which connection to hand back:
//!
//! - **External cluster**: when `tabula_db_cluster` is configured, connections
//!   come from the host's balancer for that cluster, upgraded to the primary
//!   after recent writes so callers read their own writes
//! - **Local connection**: otherwise a single connection is built once from
//!   feature overrides, host defaults and the host's own connection, then
//!   cached for the lifetime of the resolver
//! - **Client character set**: every returned MySQL-family connection uses
//!   `utf8mb4`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tabula_db::prelude::*;
//!
//! let resolver = ConnectionResolver::from_config(lb_factory, None, &host_config)?;
//!
//! let conn = resolver.resolve(AccessMode::Replica).await?;
//! conn.execute("DELETE FROM tabula__pages WHERE stale = 1").await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `mysql` - MySQL/MariaDB driver via mysql_async
//! - `postgres` - PostgreSQL driver via tokio-postgres
//! - `sqlite` - SQLite driver via sqlx
//! - `full` - All features enabled

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod balancer;
pub mod charset;
pub mod connection;
pub mod error;
pub mod factory;
pub mod options;
pub mod params;
pub mod resolver;
pub mod secret;

// Driver implementations (conditionally compiled)
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorCategory, Result};

    pub use crate::connection::{
        AccessMode, ClientCharsetOverride, Connection, ConnectionHandle, DatabaseType,
        ServerIndex,
    };

    pub use crate::balancer::{LoadBalancer, LoadBalancerFactory};
    pub use crate::charset::{enforce_client_charset, CLIENT_CHARSET};
    pub use crate::factory::{ConnectionFactory, DriverConnectionFactory};
    pub use crate::options::{
        ResolverOptions, ServerCredentials, REQUIRED_OPTIONS, TABLE_PREFIX_SUFFIX,
    };
    pub use crate::params::{ConnectionParams, EngineParams};
    pub use crate::resolver::ConnectionResolver;
    pub use crate::secret::SensitiveString;
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use resolver::ConnectionResolver;
