//! Connection resolution for feature storage
//!
//! [`ConnectionResolver`] decides which physical connection a request gets:
//!
//! ```text
//! resolve(mode)
//!   ├─ external cluster set → external balancer
//!   │     → upgrade to primary after recent writes
//!   │     → enforce charset → return (balancer owns lifecycle)
//!   └─ local → cached handle, or on first use:
//!         inspect main balancer connection → derive params
//!         → factory.create → enforce charset → cache
//! ```

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::balancer::LoadBalancerFactory;
use crate::charset::enforce_client_charset;
use crate::connection::{AccessMode, ConnectionHandle, DatabaseType, ServerIndex};
use crate::error::{Error, Result};
use crate::factory::{ConnectionFactory, DriverConnectionFactory};
use crate::options::ResolverOptions;
use crate::params::{ConnectionParams, EngineParams};

/// Hands out connections for feature storage.
///
/// Without an external cluster, a single local connection is created on first
/// use and shared by every later call regardless of the requested mode. First
/// use is single-flight: concurrent callers wait for one initialization. The
/// resolver never closes that connection.
pub struct ConnectionResolver {
    lb_factory: Arc<dyn LoadBalancerFactory>,
    connection_factory: Arc<dyn ConnectionFactory>,
    options: ResolverOptions,
    connection: OnceCell<ConnectionHandle>,
}

impl ConnectionResolver {
    /// Create a resolver.
    ///
    /// When `connection_factory` is `None`, local connections are built by
    /// [`DriverConnectionFactory`].
    pub fn new(
        lb_factory: Arc<dyn LoadBalancerFactory>,
        connection_factory: Option<Arc<dyn ConnectionFactory>>,
        options: ResolverOptions,
    ) -> Self {
        if let (Some(cluster), Some(index)) = (&options.external_cluster, &options.connection_index)
        {
            warn!(
                cluster = %cluster,
                index = %index,
                "tabula_db_index is ignored when tabula_db_cluster is set"
            );
        }

        Self {
            lb_factory,
            connection_factory: connection_factory
                .unwrap_or_else(|| Arc::new(DriverConnectionFactory)),
            options,
            connection: OnceCell::new(),
        }
    }

    /// Create a resolver from the host configuration map.
    ///
    /// Fails before any connection is attempted if a required key is missing.
    pub fn from_config(
        lb_factory: Arc<dyn LoadBalancerFactory>,
        connection_factory: Option<Arc<dyn ConnectionFactory>>,
        config: &Map<String, Value>,
    ) -> Result<Self> {
        let options = ResolverOptions::from_config(config)?;
        Ok(Self::new(lb_factory, connection_factory, options))
    }

    /// Options this resolver was built with
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Whether the local connection has been established
    pub fn is_cached(&self) -> bool {
        self.connection.initialized()
    }

    /// Get a connection for accessing feature data.
    ///
    /// With an external cluster, `mode` is honored unless the cluster saw
    /// recent primary writes, in which case the primary is used so the caller
    /// observes its own writes. Locally, `mode` is ignored.
    pub async fn resolve(&self, mode: AccessMode) -> Result<ConnectionHandle> {
        if let Some(cluster) = &self.options.external_cluster {
            let lb = self.lb_factory.external_balancer(cluster).await?;

            let mode = if lb.has_or_made_recent_primary_changes().await {
                AccessMode::Primary
            } else {
                mode
            };
            debug!(cluster = %cluster, mode = %mode, "Resolving cluster connection");

            let conn = lb.get_connection(mode.into()).await?;
            enforce_client_charset(conn.as_ref()).await?;
            return Ok(conn);
        }

        let conn = self
            .connection
            .get_or_try_init(|| async {
                let conn = self.init_connection().await?;
                enforce_client_charset(conn.as_ref()).await?;
                Ok::<_, Error>(conn)
            })
            .await?;

        Ok(Arc::clone(conn))
    }

    /// Engine type of the feature database.
    ///
    /// Uses the configured type when set; otherwise resolves a replica
    /// connection and asks it.
    pub async fn database_type(&self) -> Result<DatabaseType> {
        if let Some(database_type) = &self.options.override_database_type {
            return Ok(database_type.clone());
        }

        Ok(self.resolve(AccessMode::Replica).await?.database_type())
    }

    async fn init_connection(&self) -> Result<ConnectionHandle> {
        let params = self.derive_params().await?;
        let database_type = params.database_type.clone();

        info!(
            host = %params.host,
            database = %params.database_name,
            db_type = %database_type,
            table_prefix = %params.table_prefix,
            "Creating local feature storage connection"
        );

        self.connection_factory.create(&database_type, params).await
    }

    /// Resolve every connection parameter through the override chain,
    /// inspecting the host's own connection for what the options don't say.
    async fn derive_params(&self) -> Result<ConnectionParams> {
        let options = &self.options;
        let index = options.connection_index.unwrap_or(ServerIndex::Primary);
        let host_conn = self
            .lb_factory
            .main_balancer()
            .get_connection(index)
            .await?;

        let host = options
            .override_server
            .clone()
            .unwrap_or_else(|| host_conn.server().to_string());
        let database_name = options
            .override_database_name
            .clone()
            .unwrap_or_else(|| host_conn.database_name().to_string());
        let database_type = options
            .override_database_type
            .clone()
            .unwrap_or_else(|| host_conn.database_type());

        let engine = match &database_type {
            DatabaseType::Sqlite => EngineParams::Sqlite {
                file_path: host_conn.file_path()?,
            },
            DatabaseType::Postgres => EngineParams::Postgres {
                port: options.default_port,
            },
            _ => EngineParams::Standard,
        };

        debug!(
            index = %index,
            host = %host,
            db_type = %database_type,
            "Derived connection parameters"
        );

        Ok(ConnectionParams {
            host,
            user: options.user().to_string(),
            password: options.password().clone(),
            database_name,
            table_prefix: options.table_prefix(),
            database_type,
            engine,
        })
    }
}

impl std::fmt::Debug for ConnectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionResolver")
            .field("options", &self.options)
            .field("cached", &self.connection.initialized())
            .finish()
    }
}
