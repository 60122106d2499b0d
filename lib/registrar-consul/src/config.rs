//! Consul client configuration

use crate::ConsulError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a Consul agent
#[derive(Clone, Debug, PartialEq)]
pub struct ConsulConfig {
    /// Agent address as `host[:port]`
    pub address: String,
    /// `http` or `https`
    pub scheme: String,
    /// ACL token sent as `X-Consul-Token`
    pub token: Option<String>,
    /// Datacenter for key/value requests; the agent's own when unset
    pub datacenter: Option<String>,
    /// Timeout for every request made to the agent
    pub timeout: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            scheme: "http".to_string(),
            token: None,
            datacenter: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ConsulConfig {
    /// Load settings from the standard `CONSUL_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(addr) = get("CONSUL_HTTP_ADDR") {
            // The address may carry its own scheme
            if let Some(rest) = addr.strip_prefix("https://") {
                config.scheme = "https".to_string();
                config.address = rest.to_string();
            } else if let Some(rest) = addr.strip_prefix("http://") {
                config.address = rest.to_string();
            } else {
                config.address = addr;
            }
        }
        if let Some(ssl) = get("CONSUL_HTTP_SSL") {
            if ssl.eq_ignore_ascii_case("true") || ssl == "1" {
                config.scheme = "https".to_string();
            }
        }
        config.token = get("CONSUL_HTTP_TOKEN");
        config.datacenter = get("CONSUL_DATACENTER");
        config
    }

    /// Base URL of the agent's HTTP API
    pub fn base_url(&self) -> Result<Url, ConsulError> {
        let raw = format!("{}://{}", self.scheme, self.address);
        let url = Url::parse(&raw).map_err(|e| ConsulError::InvalidAddress(format!("{}: {}", raw, e)))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConsulError::InvalidAddress(raw));
        }
        Ok(url)
    }
}
