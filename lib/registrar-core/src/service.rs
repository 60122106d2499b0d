//! Service descriptions handed to the adapter by the host, and the registry
//! records derived from them.

use crate::check::HealthCheck;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A locally discovered service as described by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Logical service name, shared by every instance
    pub name: String,
    /// Unique instance identifier, without any namespace prefix
    pub id: String,
    /// Address the service is reachable on
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Where the service came from on the local machine
    #[serde(default)]
    pub origin: ServiceOrigin,
    /// Operator-supplied metadata, mirrored into the key/value store
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl Service {
    /// Look up an attribute, treating an empty value as absent.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Origin of a service on the host machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrigin {
    #[serde(default)]
    pub container_id: String,
    #[serde(default)]
    pub host_ip: String,
    #[serde(default)]
    pub host_port: String,
    #[serde(default)]
    pub exposed_port: String,
}

/// A registry entry as submitted to the backend's local agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRegistration {
    /// Namespaced entry ID
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub check: Option<HealthCheck>,
}

/// Summary of a registry entry as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEntry {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
}

impl From<&ServiceRegistration> for ServiceEntry {
    fn from(registration: &ServiceRegistration) -> Self {
        Self {
            id: registration.id.clone(),
            name: registration.name.clone(),
            address: registration.address.clone(),
            port: registration.port,
            tags: registration.tags.clone(),
        }
    }
}

/// Services the host currently believes should exist, keyed by bare ID.
///
/// A `None` value marks an ID the host knows about but no longer considers
/// live; cleanup treats it the same as a missing key.
pub type ValidServices = HashMap<String, Option<Service>>;

/// Build a [`ValidServices`] map from live services.
pub fn valid_services<I>(services: I) -> ValidServices
where
    I: IntoIterator<Item = Service>,
{
    services
        .into_iter()
        .map(|service| (service.id.clone(), Some(service)))
        .collect()
}
