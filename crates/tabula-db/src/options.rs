//! Resolver options read from host application configuration
//!
//! The host hands over its whole configuration as a JSON map. Every key in
//! [`REQUIRED_OPTIONS`] must be declared, but any of them may be `null`:
//! a null override falls back to the next layer of the override chain,
//! while an undeclared key is a configuration-schema error.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::connection::{DatabaseType, ServerIndex};
use crate::error::{Error, Result};
use crate::secret::SensitiveString;

/// Suffix appended to the host table prefix to namespace feature tables
pub const TABLE_PREFIX_SUFFIX: &str = "tabula__";

/// Keys that must be present in the host configuration
pub const REQUIRED_OPTIONS: &[&str] = &[
    // Host database setup
    "db_user",
    "db_password",
    "db_port",
    "db_prefix",
    "db_servers",
    // Feature overrides
    "tabula_db_server",
    "tabula_db_name",
    "tabula_db_user",
    "tabula_db_password",
    "tabula_db_prefix",
    "tabula_db_type",
    // Host server to inspect for defaults
    "tabula_db_index",
    // External cluster, supersedes everything above
    "tabula_db_cluster",
];

/// Credentials of one entry in the host server list
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerCredentials {
    /// User name, if the entry declares one
    #[serde(default)]
    pub user: Option<String>,
    /// Password, if the entry declares one
    #[serde(default)]
    pub password: Option<SensitiveString>,
}

impl ServerCredentials {
    /// Credentials with both user and password set
    pub fn new(user: impl Into<String>, password: impl Into<SensitiveString>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }
}

/// Options controlling connection resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Host default user
    pub default_user: String,
    /// Host default password
    pub default_password: SensitiveString,
    /// Host default port (used for postgres)
    pub default_port: u16,
    /// Host table prefix
    pub default_table_prefix: String,
    /// Host server list, first entry is the primary
    pub default_servers: Vec<ServerCredentials>,

    /// Feature host override
    pub override_server: Option<String>,
    /// Feature database name override
    pub override_database_name: Option<String>,
    /// Feature user override
    pub override_user: Option<String>,
    /// Feature password override
    pub override_password: Option<SensitiveString>,
    /// Feature table prefix override, used verbatim
    pub override_table_prefix: Option<String>,
    /// Feature engine type override
    pub override_database_type: Option<DatabaseType>,

    /// Host server to inspect for defaults (primary when unset)
    pub connection_index: Option<ServerIndex>,

    /// External cluster; when set, no local connection is ever built
    pub external_cluster: Option<String>,
}

/// Wire shape of the required keys. `null` deserializes to `None`.
#[derive(Deserialize)]
struct RawOptions {
    db_user: Option<String>,
    db_password: Option<SensitiveString>,
    db_port: Option<u16>,
    db_prefix: Option<String>,
    db_servers: Option<Vec<ServerCredentials>>,
    tabula_db_server: Option<String>,
    tabula_db_name: Option<String>,
    tabula_db_user: Option<String>,
    tabula_db_password: Option<SensitiveString>,
    tabula_db_prefix: Option<String>,
    tabula_db_type: Option<DatabaseType>,
    tabula_db_index: Option<ServerIndex>,
    tabula_db_cluster: Option<String>,
}

impl From<RawOptions> for ResolverOptions {
    fn from(raw: RawOptions) -> Self {
        Self {
            default_user: raw.db_user.unwrap_or_default(),
            default_password: raw.db_password.unwrap_or_default(),
            default_port: raw.db_port.unwrap_or_default(),
            default_table_prefix: raw.db_prefix.unwrap_or_default(),
            default_servers: raw.db_servers.unwrap_or_default(),
            override_server: raw.tabula_db_server,
            override_database_name: raw.tabula_db_name,
            override_user: raw.tabula_db_user,
            override_password: raw.tabula_db_password,
            override_table_prefix: raw.tabula_db_prefix,
            override_database_type: raw.tabula_db_type,
            connection_index: raw.tabula_db_index,
            external_cluster: raw.tabula_db_cluster,
        }
    }
}

impl ResolverOptions {
    /// Read options from the host configuration map.
    ///
    /// Fails if any key in [`REQUIRED_OPTIONS`] is absent, or if a declared
    /// value has the wrong shape. Keys outside the required set are ignored.
    pub fn from_config(config: &Map<String, Value>) -> Result<Self> {
        let mut declared = Map::with_capacity(REQUIRED_OPTIONS.len());
        for key in REQUIRED_OPTIONS {
            let value = config.get(*key).ok_or_else(|| Error::missing_option(key))?;
            declared.insert((*key).to_string(), value.clone());
        }

        let raw: RawOptions = serde_json::from_value(Value::Object(declared))
            .map_err(|e| Error::config(format!("invalid option value: {}", e)))?;
        Ok(raw.into())
    }

    /// Set host default credentials
    pub fn with_default_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<SensitiveString>,
    ) -> Self {
        self.default_user = user.into();
        self.default_password = password.into();
        self
    }

    /// Set host default port
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Set host table prefix
    pub fn with_default_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_table_prefix = prefix.into();
        self
    }

    /// Append an entry to the host server list
    pub fn with_default_server(mut self, server: ServerCredentials) -> Self {
        self.default_servers.push(server);
        self
    }

    /// Override the feature host
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.override_server = Some(server.into());
        self
    }

    /// Override the feature database name
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.override_database_name = Some(name.into());
        self
    }

    /// Override the feature credentials
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<SensitiveString>,
    ) -> Self {
        self.override_user = Some(user.into());
        self.override_password = Some(password.into());
        self
    }

    /// Override the feature table prefix
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.override_table_prefix = Some(prefix.into());
        self
    }

    /// Override the feature engine type
    pub fn with_database_type(mut self, database_type: impl Into<DatabaseType>) -> Self {
        self.override_database_type = Some(database_type.into());
        self
    }

    /// Inspect a specific host server for defaults
    pub fn with_connection_index(mut self, index: ServerIndex) -> Self {
        self.connection_index = Some(index);
        self
    }

    /// Delegate all connections to an external cluster
    pub fn with_external_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.external_cluster = Some(cluster.into());
        self
    }

    /// Table prefix for feature tables: the override verbatim, or the host
    /// prefix followed by [`TABLE_PREFIX_SUFFIX`]
    pub fn table_prefix(&self) -> String {
        match &self.override_table_prefix {
            Some(prefix) => prefix.clone(),
            None => format!("{}{}", self.default_table_prefix, TABLE_PREFIX_SUFFIX),
        }
    }

    /// User name: override, else first host server entry, else host default
    pub fn user(&self) -> &str {
        self.override_user
            .as_deref()
            .or_else(|| self.default_servers.first().and_then(|s| s.user.as_deref()))
            .unwrap_or(self.default_user.as_str())
    }

    /// Password: override, else first host server entry, else host default
    pub fn password(&self) -> &SensitiveString {
        self.override_password
            .as_ref()
            .or_else(|| {
                self.default_servers
                    .first()
                    .and_then(|s| s.password.as_ref())
            })
            .unwrap_or(&self.default_password)
    }
}
