use anyhow::{Context, Result};
use registrar_consul::ConsulMetaFactory;
use registrar_core::{build_adapter, valid_services, AdapterFactory, MemoryFactory, RegistryAdapter};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod manifest;

use config::{DaemonConfig, LogFormat};
use manifest::{Manifest, ManifestDiff, ServiceSet};

#[tokio::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::from_env()?;
    init_tracing(config.log_format);

    info!("Starting registrar...");

    let consul = ConsulMetaFactory::from_env();
    let factories: [&dyn AdapterFactory; 2] = [&consul, &MemoryFactory];
    let adapter = build_adapter(&factories, &config.uri)
        .with_context(|| format!("building registry adapter for {}", config.uri))?;
    info!("Registry adapter initialized for {}", config.uri);

    connect(adapter.as_ref(), &config).await?;

    let mut known = Manifest::load(&config.services_path)?.into_set();
    let registered = register_all(adapter.as_ref(), &known).await;
    info!("Registered {} of {} services", registered, known.len());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    match config.cleanup_interval {
        Some(period) => {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        known = sync(adapter.as_ref(), &config, known).await;
                    }
                    result = &mut shutdown => {
                        result?;
                        break;
                    }
                }
            }
        }
        None => {
            info!("Periodic cleanup disabled");
            shutdown.await?;
        }
    }

    info!("Shutdown signal received, exiting...");
    if config.deregister_on_exit {
        for service in known.values() {
            if let Err(e) = adapter.deregister(service).await {
                warn!("Failed to deregister {}: {}", service.id, e);
            }
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Plain => builder.init(),
    }
}

/// Ping the registry, retrying the configured number of times
async fn connect(adapter: &dyn RegistryAdapter, config: &DaemonConfig) -> Result<()> {
    let mut attempt = 0;
    loop {
        match adapter.ping().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < config.retry_attempts => {
                attempt += 1;
                warn!(
                    "Registry not reachable ({}), retry {}/{} in {:?}",
                    e, attempt, config.retry_attempts, config.retry_interval
                );
                time::sleep(config.retry_interval).await;
            }
            Err(e) => return Err(e).context("registry is not reachable"),
        }
    }
}

async fn register_all(adapter: &dyn RegistryAdapter, services: &ServiceSet) -> usize {
    let mut registered = 0;
    for service in services.values() {
        match adapter.register(service).await {
            Ok(()) => registered += 1,
            Err(e) => error!("Failed to register {}: {}", service.id, e),
        }
    }
    registered
}

/// Apply manifest changes, then remove orphaned registry entries.
///
/// Returns the service set that is now considered live.
async fn sync(adapter: &dyn RegistryAdapter, config: &DaemonConfig, known: ServiceSet) -> ServiceSet {
    let current = match Manifest::load(&config.services_path) {
        Ok(manifest) => manifest.into_set(),
        Err(e) => {
            warn!("Keeping previous services, manifest reload failed: {:#}", e);
            known.clone()
        }
    };

    let diff = ManifestDiff::between(&known, &current);
    if !diff.is_empty() {
        info!(
            "Service changes: {} added, {} removed, {} changed",
            diff.added.len(),
            diff.removed.len(),
            diff.changed.len()
        );
    }

    for service in &diff.removed {
        if let Err(e) = adapter.deregister(service).await {
            warn!("Failed to deregister {}: {}", service.id, e);
        }
    }
    for (previous, service) in &diff.changed {
        if let Err(e) = adapter.deregister(previous).await {
            warn!("Failed to deregister {}: {}", previous.id, e);
        }
        if let Err(e) = adapter.register(service).await {
            error!("Failed to register {}: {}", service.id, e);
        }
    }
    for service in &diff.added {
        if let Err(e) = adapter.register(service).await {
            error!("Failed to register {}: {}", service.id, e);
        }
    }
    for service in &diff.unchanged {
        if let Err(e) = adapter.refresh(service).await {
            warn!("Failed to refresh {}: {}", service.id, e);
        }
    }

    match adapter.cleanup(&valid_services(current.values().cloned())).await {
        Ok(()) => debug!("Cleanup pass complete"),
        Err(e) => error!("Cleanup failed: {}", e),
    }

    current
}
