//! Registration adapter mirroring host services into a registry backend

use crate::check::{build_check, matched_rule};
use crate::reconcile::{CleanupReport, Reconciler};
use crate::{
    Namespace, RegistrarError, RegistryBackend, Result, Service, ServiceRegistration,
    ValidServices,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Lifecycle operations a host drives against a registry.
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Check connectivity with the registry
    async fn ping(&self) -> Result<()>;

    async fn register(&self, service: &Service) -> Result<()>;

    async fn deregister(&self, service: &Service) -> Result<()>;

    /// Renew a service's registration
    async fn refresh(&self, service: &Service) -> Result<()>;

    /// Remove registry entries with no counterpart in `valid`
    async fn cleanup(&self, valid: &ValidServices) -> Result<()>;
}

/// MetaAdapter registers services with a health check and mirrors their
/// attributes into the key/value store under a namespace prefix.
pub struct MetaAdapter<B> {
    backend: B,
    namespace: Namespace,
}

impl<B: RegistryBackend> MetaAdapter<B> {
    pub fn new(backend: B, namespace: Namespace) -> Self {
        Self { backend, namespace }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Build the registry entry for a service
    pub fn registration(&self, service: &Service) -> ServiceRegistration {
        ServiceRegistration {
            id: self.namespace.with_prefix(&service.id),
            name: service.name.clone(),
            address: service.ip.clone(),
            port: service.port,
            tags: service.tags.clone(),
            check: build_check(service),
        }
    }

    /// Deregister every owned entry missing from `valid` and report what happened.
    pub async fn reconcile(&self, valid: &ValidServices) -> Result<CleanupReport> {
        let listing = self.backend.list_services().await?;
        Ok(Reconciler::new(&self.backend, &self.namespace)
            .run(listing.keys(), valid)
            .await)
    }

    /// Write one key per attribute; failures are logged and skipped.
    async fn write_attributes(&self, service: &Service) {
        for (key, value) in &service.attrs {
            let path = self
                .namespace
                .attribute_path(&service.name, &service.id, key);
            if let Err(e) = self.backend.put_key(&path, value.as_bytes()).await {
                warn!("Failed to write attribute [{}]: {}", path, e);
            }
        }
    }
}

#[async_trait]
impl<B: RegistryBackend> RegistryAdapter for MetaAdapter<B> {
    async fn ping(&self) -> Result<()> {
        let leader = self.backend.leader().await?;
        if leader.is_empty() {
            return Err(RegistrarError::NoLeader);
        }
        info!("Current registry leader: {}", leader);
        Ok(())
    }

    async fn register(&self, service: &Service) -> Result<()> {
        let registration = self.registration(service);

        self.write_attributes(service).await;

        self.backend.register_service(&registration).await?;
        debug!(
            "Registered {} with check {}",
            registration.id,
            matched_rule(service).unwrap_or("none")
        );
        Ok(())
    }

    async fn deregister(&self, service: &Service) -> Result<()> {
        let tree = self.namespace.attribute_tree(&service.name, &service.id);
        if let Err(e) = self.backend.delete_tree(&tree).await {
            warn!("Failed to delete attributes for [{}]: {}", tree, e);
        }

        let id = self.namespace.with_prefix(&service.id);
        self.backend.deregister_service(&id).await?;
        debug!("Deregistered {}", id);
        Ok(())
    }

    async fn refresh(&self, _service: &Service) -> Result<()> {
        // Checks are evaluated by the backend itself.
        Ok(())
    }

    async fn cleanup(&self, valid: &ValidServices) -> Result<()> {
        let report = self.reconcile(valid).await?;
        if report.failed.is_empty() {
            debug!("Cleanup removed {} orphaned entries", report.removed.len());
        } else {
            warn!(
                "Cleanup removed {} orphaned entries, {} failed: {:?}",
                report.removed.len(),
                report.failed.len(),
                report.failed
            );
        }
        Ok(())
    }
}
