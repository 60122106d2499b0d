//! Client-facing operations the adapter needs from a registry backend

use crate::{Result, ServiceEntry, ServiceRegistration};
use async_trait::async_trait;
use std::collections::HashMap;

/// A distributed service registry with a key/value store and an agent-local
/// service catalog.
///
/// Implementations must be safe to share across tasks; the adapter holds one
/// handle and never wraps it in a lock.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Address of the current cluster leader
    async fn leader(&self) -> Result<String>;

    async fn put_key(&self, path: &str, value: &[u8]) -> Result<()>;

    /// Recursively delete every key under `prefix`
    async fn delete_tree(&self, prefix: &str) -> Result<()>;

    async fn register_service(&self, registration: &ServiceRegistration) -> Result<()>;

    async fn deregister_service(&self, id: &str) -> Result<()>;

    /// Every service registered with the local agent, keyed by entry ID
    async fn list_services(&self) -> Result<HashMap<String, ServiceEntry>>;
}
