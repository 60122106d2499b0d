//! Service manifest loading and change detection

use anyhow::{Context, Result};
use registrar_core::Service;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Services keyed by ID
pub type ServiceSet = BTreeMap<String, Service>;

#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub services: Vec<Service>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading service manifest {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing service manifest {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Index services by ID; a later duplicate replaces an earlier one
    pub fn into_set(self) -> ServiceSet {
        let mut set = ServiceSet::new();
        for service in self.services {
            if let Some(previous) = set.insert(service.id.clone(), service) {
                warn!("Duplicate service ID in manifest: {}", previous.id);
            }
        }
        set
    }
}

/// Differences between two service sets
#[derive(Debug, Default, PartialEq)]
pub struct ManifestDiff {
    pub added: Vec<Service>,
    pub removed: Vec<Service>,
    /// Old and new description of services whose ID stayed the same
    pub changed: Vec<(Service, Service)>,
    pub unchanged: Vec<Service>,
}

impl ManifestDiff {
    pub fn between(old: &ServiceSet, new: &ServiceSet) -> Self {
        let mut diff = Self::default();

        for (id, service) in new {
            match old.get(id) {
                None => diff.added.push(service.clone()),
                Some(previous) if previous != service => {
                    diff.changed.push((previous.clone(), service.clone()))
                }
                Some(_) => diff.unchanged.push(service.clone()),
            }
        }
        diff.removed = old
            .iter()
            .filter(|(id, _)| !new.contains_key(*id))
            .map(|(_, service)| service.clone())
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}
