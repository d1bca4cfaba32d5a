//! Load balancer contracts supplied by the host application
//!
//! The host owns connection pooling, server selection and consistency
//! tracking; the resolver only asks for connections through these traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::connection::{ConnectionHandle, ServerIndex};
use crate::error::Result;

/// A host-managed load balancer over one database cluster
#[async_trait]
pub trait LoadBalancer: Send + Sync {
    /// Get a connection to the selected server.
    ///
    /// The balancer keeps ownership of the connection's lifecycle.
    async fn get_connection(&self, index: ServerIndex) -> Result<ConnectionHandle>;

    /// Whether the primary of this cluster has seen (or this unit of work has
    /// made) writes recent enough that replicas may not reflect them yet
    async fn has_or_made_recent_primary_changes(&self) -> bool;
}

/// Source of host load balancers
#[async_trait]
pub trait LoadBalancerFactory: Send + Sync {
    /// Balancer over the host application's own database
    fn main_balancer(&self) -> Arc<dyn LoadBalancer>;

    /// Balancer over a named external cluster
    async fn external_balancer(&self, cluster: &str) -> Result<Arc<dyn LoadBalancer>>;
}
