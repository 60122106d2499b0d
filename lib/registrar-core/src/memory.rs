//! In-memory registry backend

use crate::{RegistryBackend, RegistrarError, Result, ServiceEntry, ServiceRegistration};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const MEMORY_LEADER: &str = "127.0.0.1:8300";

/// InMemoryBackend keeps registry entries and key/value pairs in process memory.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    services: Arc<RwLock<HashMap<String, ServiceRegistration>>>,
    kv: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a registered entry by its namespaced ID
    pub async fn service(&self, id: &str) -> Option<ServiceRegistration> {
        self.services.read().await.get(id).cloned()
    }

    /// Get the raw value stored at a key
    pub async fn key(&self, path: &str) -> Option<Vec<u8>> {
        self.kv.read().await.get(path).cloned()
    }

    /// List all keys under a prefix, in order
    pub async fn keys(&self, prefix: &str) -> Vec<String> {
        let kv = self.kv.read().await;
        kv.keys().filter(|k| k.starts_with(prefix)).cloned().collect()
    }

    pub async fn service_count(&self) -> usize {
        self.services.read().await.len()
    }
}

#[async_trait]
impl RegistryBackend for InMemoryBackend {
    async fn leader(&self) -> Result<String> {
        Ok(MEMORY_LEADER.to_string())
    }

    async fn put_key(&self, path: &str, value: &[u8]) -> Result<()> {
        self.kv.write().await.insert(path.to_string(), value.to_vec());
        debug!("Stored key: {}", path);
        Ok(())
    }

    async fn delete_tree(&self, prefix: &str) -> Result<()> {
        let mut kv = self.kv.write().await;
        kv.retain(|k, _| !k.starts_with(prefix));
        debug!("Deleted tree: {}", prefix);
        Ok(())
    }

    async fn register_service(&self, registration: &ServiceRegistration) -> Result<()> {
        if registration.id.is_empty() {
            return Err(RegistrarError::backend(
                "register service",
                "service ID must not be empty",
            ));
        }
        let mut services = self.services.write().await;
        services.insert(registration.id.clone(), registration.clone());
        debug!("Registered service: {}", registration.id);
        Ok(())
    }

    async fn deregister_service(&self, id: &str) -> Result<()> {
        let mut services = self.services.write().await;
        match services.remove(id) {
            Some(_) => {
                debug!("Deregistered service: {}", id);
                Ok(())
            }
            None => Err(RegistrarError::backend(
                "deregister service",
                format!("unknown service ID {:?}", id),
            )),
        }
    }

    async fn list_services(&self) -> Result<HashMap<String, ServiceEntry>> {
        let services = self.services.read().await;
        Ok(services
            .iter()
            .map(|(id, registration)| (id.clone(), ServiceEntry::from(registration)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(id: &str) -> ServiceRegistration {
        ServiceRegistration {
            id: id.to_string(),
            name: "web".to_string(),
            address: "10.0.0.5".to_string(),
            port: 8080,
            tags: vec!["http".to_string()],
            check: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let backend = InMemoryBackend::new();
        backend.register_service(&registration("ns/web-1")).await.unwrap();

        let listed = backend.list_services().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed["ns/web-1"].tags, vec!["http".to_string()]);
    }

    #[tokio::test]
    async fn test_deregister_unknown_fails() {
        let backend = InMemoryBackend::new();
        assert!(backend.deregister_service("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_tree_is_prefix_scoped() {
        let backend = InMemoryBackend::new();
        backend.put_key("ns/web/web-1/a", b"1").await.unwrap();
        backend.put_key("ns/web/web-1/b", b"2").await.unwrap();
        backend.put_key("ns/web/web-2/a", b"3").await.unwrap();

        backend.delete_tree("ns/web/web-1").await.unwrap();

        assert_eq!(backend.keys("ns/").await, vec!["ns/web/web-2/a".to_string()]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let backend = InMemoryBackend::new();
        let clone = backend.clone();
        clone.register_service(&registration("ns/web-1")).await.unwrap();
        assert_eq!(backend.service_count().await, 1);
        assert_eq!(backend.leader().await.unwrap(), MEMORY_LEADER);
    }
}
