//! Daemon settings read from `REGISTRAR_*` environment variables

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_URI: &str = "consulmeta://127.0.0.1:8500/registrator/";
pub const DEFAULT_SERVICES_PATH: &str = "services.yaml";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DaemonConfig {
    /// Registry URI, e.g. `consulmeta://127.0.0.1:8500/registrator/`
    pub uri: String,
    /// YAML manifest of the services to register
    pub services_path: PathBuf,
    /// Time between sync and cleanup passes; `None` disables them
    pub cleanup_interval: Option<Duration>,
    /// Extra ping attempts before giving up on the registry
    pub retry_attempts: u32,
    pub retry_interval: Duration,
    /// Deregister every known service on shutdown
    pub deregister_on_exit: bool,
    pub log_format: LogFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            services_path: PathBuf::from(DEFAULT_SERVICES_PATH),
            cleanup_interval: Some(Duration::from_secs(30)),
            retry_attempts: 0,
            retry_interval: Duration::from_millis(2000),
            deregister_on_exit: true,
            log_format: LogFormat::Plain,
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(uri) = get("REGISTRAR_URI") {
            config.uri = uri;
        }
        if let Some(path) = get("REGISTRAR_SERVICES") {
            config.services_path = PathBuf::from(path);
        }
        if let Some(secs) = get("REGISTRAR_CLEANUP_INTERVAL") {
            let secs: u64 = parse("REGISTRAR_CLEANUP_INTERVAL", &secs)?;
            config.cleanup_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(attempts) = get("REGISTRAR_RETRY_ATTEMPTS") {
            config.retry_attempts = parse("REGISTRAR_RETRY_ATTEMPTS", &attempts)?;
        }
        if let Some(ms) = get("REGISTRAR_RETRY_INTERVAL") {
            config.retry_interval = Duration::from_millis(parse("REGISTRAR_RETRY_INTERVAL", &ms)?);
        }
        if let Some(flag) = get("REGISTRAR_DEREGISTER_ON_EXIT") {
            config.deregister_on_exit = parse("REGISTRAR_DEREGISTER_ON_EXIT", &flag)?;
        }
        if let Some(format) = get("REGISTRAR_LOG_FORMAT") {
            config.log_format = match format.as_str() {
                "json" => LogFormat::Json,
                "plain" | "text" => LogFormat::Plain,
                other => bail!("REGISTRAR_LOG_FORMAT must be plain or json, got {:?}", other),
            };
        }

        Ok(config)
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value {:?} for {}", value, name))
}
