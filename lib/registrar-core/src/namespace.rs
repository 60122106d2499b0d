//! Namespace prefix scoping every entry the adapter writes

use crate::{RegistrarError, Result};
use std::fmt;
use tracing::warn;

/// The prefix under which an adapter owns registry entries and key/value paths.
///
/// The prefix is used verbatim: IDs are `{prefix}{id}` and attribute paths are
/// `{prefix}{name}/{id}/{key}`. A separator between the prefix and the rest is
/// only present if the prefix itself ends with one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Build a namespace from a URI path such as `/registrator/`.
    ///
    /// The path must start with `/`; exactly one leading separator is removed.
    /// An empty prefix owns every entry in the registry, so cleanup under it
    /// may deregister services this adapter never registered.
    pub fn from_uri_path(path: &str) -> Result<Self> {
        match path.strip_prefix('/') {
            Some("") => {
                warn!(
                    "Empty namespace prefix owns every registry entry; \
                     cleanup may deregister foreign services"
                );
                Ok(Self::default())
            }
            Some(prefix) => Ok(Self::new(prefix)),
            None => Err(RegistrarError::InvalidConfiguration(format!(
                "namespace path must start with '/', got {:?}",
                path
            ))),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Prepend the prefix to a bare ID.
    pub fn with_prefix(&self, bare: &str) -> String {
        format!("{}{}", self.prefix, bare)
    }

    /// Remove the prefix from a namespaced ID.
    ///
    /// Returns `None` when `id` is not owned by this namespace.
    pub fn strip_prefix<'a>(&self, id: &'a str) -> Option<&'a str> {
        id.strip_prefix(self.prefix.as_str())
    }

    pub fn owns(&self, id: &str) -> bool {
        id.starts_with(self.prefix.as_str())
    }

    /// Root of a service instance's attribute subtree.
    pub fn attribute_tree(&self, name: &str, id: &str) -> String {
        format!("{}{}/{}", self.prefix, name, id)
    }

    /// Key/value path of a single attribute.
    pub fn attribute_path(&self, name: &str, id: &str, key: &str) -> String {
        format!("{}/{}", self.attribute_tree(name, id), key)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}
