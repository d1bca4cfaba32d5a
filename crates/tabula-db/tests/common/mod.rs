//! In-memory collaborators recording every call made by the resolver
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tabula_db::prelude::*;

/// Host configuration with every required key declared as null
pub fn null_config() -> Map<String, Value> {
    REQUIRED_OPTIONS
        .iter()
        .map(|k| (k.to_string(), Value::Null))
        .collect()
}

/// Host configuration with the usual host defaults filled in
pub fn host_config() -> Map<String, Value> {
    let mut config = null_config();
    config.insert("db_user".into(), "db_user".into());
    config.insert("db_password".into(), "db_password".into());
    config.insert("db_port".into(), 0.into());
    config.insert("db_prefix".into(), "".into());
    config.insert("db_servers".into(), Value::Array(vec![]));
    config
}

pub struct FakeConnection {
    server: String,
    database_name: String,
    database_type: DatabaseType,
    file_path: Option<PathBuf>,
    charset: Option<Mutex<String>>,
    fail_ping: bool,
    pub pings: AtomicUsize,
    pub charset_sets: AtomicUsize,
}

impl FakeConnection {
    pub fn new(server: &str, database_name: &str, database_type: &str) -> Self {
        Self {
            server: server.into(),
            database_name: database_name.into(),
            database_type: DatabaseType::from_tag(database_type),
            file_path: None,
            charset: None,
            fail_ping: false,
            pings: AtomicUsize::new(0),
            charset_sets: AtomicUsize::new(0),
        }
    }

    /// The host's main connection used throughout the tests
    pub fn host() -> Self {
        Self::new("localhost", "test_wiki_db", "mysql")
    }

    pub fn with_file_path(mut self, path: &str) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Expose a client character set override starting at `charset`
    pub fn with_charset(mut self, charset: &str) -> Self {
        self.charset = Some(Mutex::new(charset.into()));
        self
    }

    pub fn failing_ping(mut self) -> Self {
        self.fail_ping = true;
        self
    }

    pub fn current_charset(&self) -> Option<String> {
        self.charset.as_ref().map(|c| c.lock().unwrap().clone())
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn server(&self) -> &str {
        &self.server
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    fn database_type(&self) -> DatabaseType {
        self.database_type.clone()
    }

    fn file_path(&self) -> Result<PathBuf> {
        self.file_path
            .clone()
            .ok_or_else(|| Error::introspection("not a file-based connection"))
    }

    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.fail_ping {
            return Err(Error::connection("server has gone away"));
        }
        Ok(())
    }

    async fn execute(&self, _sql: &str) -> Result<u64> {
        Ok(0)
    }

    fn charset_override(&self) -> Option<&dyn ClientCharsetOverride> {
        self.charset.as_ref().map(|_| self as &dyn ClientCharsetOverride)
    }
}

#[async_trait]
impl ClientCharsetOverride for FakeConnection {
    async fn client_charset(&self) -> Result<String> {
        self.current_charset()
            .ok_or_else(|| Error::unsupported("no charset"))
    }

    async fn set_client_charset(&self, charset: &str) -> Result<()> {
        let slot = self
            .charset
            .as_ref()
            .ok_or_else(|| Error::unsupported("no charset"))?;
        *slot.lock().unwrap() = charset.to_string();
        self.charset_sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeBalancer {
    connection: Arc<FakeConnection>,
    recent_writes: bool,
    pub requests: Mutex<Vec<ServerIndex>>,
}

impl FakeBalancer {
    pub fn new(connection: Arc<FakeConnection>) -> Self {
        Self {
            connection,
            recent_writes: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_recent_writes(mut self) -> Self {
        self.recent_writes = true;
        self
    }

    pub fn requests(&self) -> Vec<ServerIndex> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoadBalancer for FakeBalancer {
    async fn get_connection(&self, index: ServerIndex) -> Result<ConnectionHandle> {
        self.requests.lock().unwrap().push(index);
        Ok(self.connection.clone())
    }

    async fn has_or_made_recent_primary_changes(&self) -> bool {
        self.recent_writes
    }
}

pub struct FakeLbFactory {
    pub main: Arc<FakeBalancer>,
    pub external: Option<Arc<FakeBalancer>>,
    pub main_requests: AtomicUsize,
    pub external_requests: Mutex<Vec<String>>,
}

impl FakeLbFactory {
    pub fn new(main: FakeBalancer) -> Self {
        Self {
            main: Arc::new(main),
            external: None,
            main_requests: AtomicUsize::new(0),
            external_requests: Mutex::new(Vec::new()),
        }
    }

    /// Factory whose main balancer hands out [`FakeConnection::host`]
    pub fn with_host() -> Self {
        Self::new(FakeBalancer::new(Arc::new(FakeConnection::host())))
    }

    pub fn with_external(mut self, external: FakeBalancer) -> Self {
        self.external = Some(Arc::new(external));
        self
    }

    pub fn external_requests(&self) -> Vec<String> {
        self.external_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoadBalancerFactory for FakeLbFactory {
    fn main_balancer(&self) -> Arc<dyn LoadBalancer> {
        self.main_requests.fetch_add(1, Ordering::SeqCst);
        self.main.clone()
    }

    async fn external_balancer(&self, cluster: &str) -> Result<Arc<dyn LoadBalancer>> {
        self.external_requests
            .lock()
            .unwrap()
            .push(cluster.to_string());
        match &self.external {
            Some(lb) => Ok(lb.clone()),
            None => Err(Error::connection(format!("unknown cluster '{}'", cluster))),
        }
    }
}

pub struct RecordingFactory {
    connection: Arc<FakeConnection>,
    failures_left: AtomicUsize,
    pub calls: Mutex<Vec<(DatabaseType, ConnectionParams)>>,
}

impl RecordingFactory {
    pub fn new(connection: Arc<FakeConnection>) -> Self {
        Self {
            connection,
            failures_left: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first `n` calls with a connection error
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<(DatabaseType, ConnectionParams)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ConnectionFactory for RecordingFactory {
    async fn create(
        &self,
        database_type: &DatabaseType,
        params: ConnectionParams,
    ) -> Result<ConnectionHandle> {
        self.calls
            .lock()
            .unwrap()
            .push((database_type.clone(), params));

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::connection("access denied"));
        }
        Ok(self.connection.clone())
    }
}

/// Whether a handle points at the given fake
pub fn same_connection(handle: &ConnectionHandle, fake: &Arc<FakeConnection>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(handle) as *const (),
        Arc::as_ptr(fake) as *const (),
    )
}

/// Log sink for a scoped `tracing` subscriber
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Run `f` with every event it emits written into this sink
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(self.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
