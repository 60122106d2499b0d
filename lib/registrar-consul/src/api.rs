//! Consul agent API payloads

use registrar_core::{HealthCheck, ServiceEntry, ServiceRegistration};
use serde::{Deserialize, Serialize};

/// Shell used to run command and script checks
const CHECK_SHELL: [&str; 2] = ["/bin/sh", "-c"];

/// Body of `PUT /v1/agent/service/register`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub port: u16,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<AgentServiceCheck>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentServiceCheck {
    #[serde(rename = "HTTP", skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(rename = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

impl From<&HealthCheck> for AgentServiceCheck {
    fn from(check: &HealthCheck) -> Self {
        match check {
            HealthCheck::Http {
                url,
                timeout,
                interval,
            } => Self {
                http: Some(url.clone()),
                timeout: timeout.clone(),
                interval: Some(interval.clone()),
                ..Default::default()
            },
            HealthCheck::Command { script, interval } | HealthCheck::Script { script, interval } => {
                Self {
                    args: Some(shell_args(script)),
                    interval: Some(interval.clone()),
                    ..Default::default()
                }
            }
            HealthCheck::Ttl { ttl } => Self {
                ttl: Some(ttl.clone()),
                ..Default::default()
            },
        }
    }
}

fn shell_args(script: &str) -> Vec<String> {
    CHECK_SHELL
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(script.to_string()))
        .collect()
}

impl From<&ServiceRegistration> for AgentServiceRegistration {
    fn from(registration: &ServiceRegistration) -> Self {
        Self {
            id: registration.id.clone(),
            name: registration.name.clone(),
            tags: registration.tags.clone(),
            port: registration.port,
            address: registration.address.clone(),
            check: registration.check.as_ref().map(AgentServiceCheck::from),
        }
    }
}

/// One value of `GET /v1/agent/services`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
}

impl From<AgentService> for ServiceEntry {
    fn from(service: AgentService) -> Self {
        Self {
            id: service.id,
            name: service.service,
            address: service.address,
            port: service.port,
            tags: service.tags.unwrap_or_default(),
        }
    }
}
