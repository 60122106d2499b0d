//! Consul backend for the registration adapter
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod factory;

pub use client::ConsulClient;
pub use config::ConsulConfig;
pub use error::ConsulError;
pub use factory::{ConsulMetaAdapter, ConsulMetaFactory};
