//! `consulmeta://` adapter factory

use crate::{ConsulClient, ConsulConfig};
use registrar_core::factory::uri_address;
use registrar_core::{AdapterFactory, MetaAdapter, Namespace, RegistrarError, RegistryAdapter, Result};
use tracing::info;
use url::Url;

/// Adapter registering services with Consul and their attributes in its KV store
pub type ConsulMetaAdapter = MetaAdapter<ConsulClient>;

/// Builds [`ConsulMetaAdapter`]s from `consulmeta://host:port/prefix` URIs.
///
/// The URI host overrides the configured agent address; the path becomes the
/// namespace prefix.
#[derive(Clone, Debug, Default)]
pub struct ConsulMetaFactory {
    config: ConsulConfig,
}

impl ConsulMetaFactory {
    pub fn new(config: ConsulConfig) -> Self {
        Self { config }
    }

    /// Factory configured from `CONSUL_*` environment variables
    pub fn from_env() -> Self {
        Self::new(ConsulConfig::from_env())
    }

    /// Build the concrete adapter for a URI
    pub fn adapter(&self, uri: &Url) -> Result<ConsulMetaAdapter> {
        let mut config = self.config.clone();
        if let Some(address) = uri_address(uri) {
            config.address = address;
        }

        let namespace = Namespace::from_uri_path(uri.path())?;
        let client = ConsulClient::new(&config).map_err(|e| {
            RegistrarError::InvalidConfiguration(format!("consul client: {}", e))
        })?;

        info!(
            "Consul adapter for {} with prefix {:?}",
            client.base_url(),
            namespace.prefix()
        );
        Ok(MetaAdapter::new(client, namespace))
    }
}

impl AdapterFactory for ConsulMetaFactory {
    fn scheme(&self) -> &'static str {
        "consulmeta"
    }

    fn build(&self, uri: &Url) -> Result<Box<dyn RegistryAdapter>> {
        Ok(Box::new(self.adapter(uri)?))
    }
}
