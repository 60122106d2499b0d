//! Cleanup of registry entries that no longer match a live service

use crate::{Namespace, RegistryBackend, ValidServices};
use tracing::{debug, info, warn};

/// Outcome of one cleanup pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Namespaced IDs that were deregistered
    pub removed: Vec<String>,
    /// Namespaced IDs whose deregistration failed
    pub failed: Vec<String>,
}

/// Select the namespaced IDs that are owned by `namespace` but have no live
/// service in `valid`.
///
/// IDs outside the namespace are never returned.
pub fn find_orphans<'a, I>(ids: I, namespace: &Namespace, valid: &ValidServices) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut orphans: Vec<String> = ids
        .into_iter()
        .filter(|id| match namespace.strip_prefix(id) {
            Some(bare) => !matches!(valid.get(bare), Some(Some(_))),
            None => false,
        })
        .cloned()
        .collect();
    orphans.sort();
    orphans
}

/// Reconciler deregisters orphaned entries one at a time.
pub struct Reconciler<'a, B: ?Sized> {
    backend: &'a B,
    namespace: &'a Namespace,
}

impl<'a, B: RegistryBackend + ?Sized> Reconciler<'a, B> {
    pub fn new(backend: &'a B, namespace: &'a Namespace) -> Self {
        Self { backend, namespace }
    }

    /// Deregister every orphan among `ids`.
    ///
    /// A failed deregistration is logged and does not stop the pass.
    pub async fn run<'i, I>(&self, ids: I, valid: &ValidServices) -> CleanupReport
    where
        I: IntoIterator<Item = &'i String>,
    {
        let mut report = CleanupReport::default();

        for id in find_orphans(ids, self.namespace, valid) {
            let bare = self.namespace.strip_prefix(&id).unwrap_or(&id);
            info!("Cleanup: {}", bare);
            match self.backend.deregister_service(&id).await {
                Ok(()) => report.removed.push(id),
                Err(e) => {
                    warn!("Deregister during cleanup failed for {}: {}", id, e);
                    report.failed.push(id);
                }
            }
        }

        debug!(
            "Cleanup removed {} entries, {} failures",
            report.removed.len(),
            report.failed.len()
        );
        report
    }
}
