//! Core registration protocol for mirroring local services into a registry
//!
//! This library provides:
//! - Service descriptions and namespaced registry entry types
//! - Health check selection from service attributes
//! - The registration adapter and its cleanup reconciler
//! - Backend and factory traits, with an in-memory backend

pub mod adapter;
pub mod backend;
pub mod check;
pub mod error;
pub mod factory;
pub mod memory;
pub mod namespace;
pub mod reconcile;
pub mod service;

pub use adapter::{MetaAdapter, RegistryAdapter};
pub use backend::RegistryBackend;
pub use check::{build_check, HealthCheck, DEFAULT_INTERVAL};
pub use error::{RegistrarError, Result};
pub use factory::{build_adapter, AdapterFactory, MemoryFactory};
pub use memory::InMemoryBackend;
pub use namespace::Namespace;
pub use reconcile::{CleanupReport, Reconciler};
pub use service::{
    valid_services, Service, ServiceEntry, ServiceOrigin, ServiceRegistration, ValidServices,
};
