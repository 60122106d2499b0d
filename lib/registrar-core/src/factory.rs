//! Adapter construction from configuration URIs

use crate::{InMemoryBackend, MetaAdapter, Namespace, RegistrarError, RegistryAdapter, Result};
use url::Url;

/// Builds adapters for one URI scheme.
pub trait AdapterFactory: Send + Sync {
    /// URI scheme this factory handles, e.g. `consulmeta`
    fn scheme(&self) -> &'static str;

    /// Build an adapter. Errors are configuration errors and are not retried.
    fn build(&self, uri: &Url) -> Result<Box<dyn RegistryAdapter>>;
}

/// Parse `uri` and build an adapter with the factory matching its scheme.
pub fn build_adapter(
    factories: &[&dyn AdapterFactory],
    uri: &str,
) -> Result<Box<dyn RegistryAdapter>> {
    let parsed = Url::parse(uri).map_err(|e| {
        RegistrarError::InvalidConfiguration(format!("invalid registry URI {:?}: {}", uri, e))
    })?;

    let factory = factories
        .iter()
        .find(|f| f.scheme() == parsed.scheme())
        .ok_or_else(|| {
            RegistrarError::InvalidConfiguration(format!(
                "unrecognized registry scheme {:?}",
                parsed.scheme()
            ))
        })?;

    factory.build(&parsed)
}

/// `host[:port]` from a URI authority, or `None` if the URI has no host.
pub fn uri_address(uri: &Url) -> Option<String> {
    let host = uri.host_str().filter(|h| !h.is_empty())?;
    Some(match uri.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Factory for `memory://` adapters backed by an [`InMemoryBackend`]
pub struct MemoryFactory;

impl AdapterFactory for MemoryFactory {
    fn scheme(&self) -> &'static str {
        "memory"
    }

    fn build(&self, uri: &Url) -> Result<Box<dyn RegistryAdapter>> {
        let namespace = Namespace::from_uri_path(uri.path())?;
        Ok(Box::new(MetaAdapter::new(InMemoryBackend::new(), namespace)))
    }
}
