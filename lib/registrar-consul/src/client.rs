//! HTTP client for the Consul agent API

use crate::api::{AgentService, AgentServiceRegistration};
use crate::{ConsulConfig, ConsulError};
use async_trait::async_trait;
use registrar_core::{RegistryBackend, Result, ServiceEntry, ServiceRegistration};
use reqwest::{Method, RequestBuilder, Response};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// ConsulClient talks to a single Consul agent over HTTP.
///
/// The underlying `reqwest::Client` pools connections and is safe to share;
/// cloning a ConsulClient is cheap.
#[derive(Clone, Debug)]
pub struct ConsulClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
    datacenter: Option<String>,
}

impl ConsulClient {
    /// Create a new Consul client
    pub fn new(config: &ConsulConfig) -> std::result::Result<Self, ConsulError> {
        let base = config.base_url()?;
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base,
            token: config.token.clone(),
            datacenter: config.datacenter.clone(),
        })
    }

    /// Base URL of the agent
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build an API URL from fixed segments followed by a `/`-separated path.
    ///
    /// The path is appended segment by segment, so empty segments from leading
    /// or doubled separators stay part of the key.
    fn endpoint(&self, segments: &[&str], path: &str) -> std::result::Result<Url, ConsulError> {
        let mut url = self.base.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| ConsulError::InvalidAddress(self.base.to_string()))?;
            parts.pop_if_empty().push("v1").extend(segments);
            if !path.is_empty() {
                parts.extend(path.split('/'));
            }
        }
        Ok(url)
    }

    /// URL of a key/value path, scoped to the configured datacenter
    fn kv_endpoint(&self, path: &str) -> std::result::Result<Url, ConsulError> {
        let mut url = self.endpoint(&["kv"], path)?;
        if let Some(dc) = &self.datacenter {
            url.query_pairs_mut().append_pair("dc", dc);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("Consul request: {} {}", method, url);
        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.header("X-Consul-Token", token),
            None => request,
        }
    }

    /// Send a request and reject non-success statuses
    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, ConsulError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ConsulError::Status {
            status,
            body: body.trim().to_string(),
        })
    }

    async fn leader_address(&self) -> std::result::Result<String, ConsulError> {
        let url = self.endpoint(&["status", "leader"], "")?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json::<String>().await?)
    }

    async fn put(&self, path: &str, value: &[u8]) -> std::result::Result<(), ConsulError> {
        let url = self.kv_endpoint(path)?;
        self.send(self.request(Method::PUT, url).body(value.to_vec()))
            .await?;
        Ok(())
    }

    async fn delete_recursive(&self, prefix: &str) -> std::result::Result<(), ConsulError> {
        let mut url = self.kv_endpoint(prefix)?;
        url.query_pairs_mut().append_key_only("recurse");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn agent_register(
        &self,
        registration: &ServiceRegistration,
    ) -> std::result::Result<(), ConsulError> {
        let url = self.endpoint(&["agent", "service", "register"], "")?;
        let body = AgentServiceRegistration::from(registration);
        self.send(self.request(Method::PUT, url).json(&body)).await?;
        Ok(())
    }

    async fn agent_deregister(&self, id: &str) -> std::result::Result<(), ConsulError> {
        let url = self.endpoint(&["agent", "service", "deregister"], id)?;
        self.send(self.request(Method::PUT, url)).await?;
        Ok(())
    }

    async fn agent_services(
        &self,
    ) -> std::result::Result<HashMap<String, ServiceEntry>, ConsulError> {
        let url = self.endpoint(&["agent", "services"], "")?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let services: HashMap<String, AgentService> = response.json().await?;
        Ok(services
            .into_iter()
            .map(|(id, service)| (id, ServiceEntry::from(service)))
            .collect())
    }
}

#[async_trait]
impl RegistryBackend for ConsulClient {
    async fn leader(&self) -> Result<String> {
        self.leader_address().await.map_err(|e| e.during("leader query"))
    }

    async fn put_key(&self, path: &str, value: &[u8]) -> Result<()> {
        self.put(path, value).await.map_err(|e| e.during("put key"))
    }

    async fn delete_tree(&self, prefix: &str) -> Result<()> {
        self.delete_recursive(prefix)
            .await
            .map_err(|e| e.during("delete tree"))
    }

    async fn register_service(&self, registration: &ServiceRegistration) -> Result<()> {
        self.agent_register(registration)
            .await
            .map_err(|e| e.during("register service"))
    }

    async fn deregister_service(&self, id: &str) -> Result<()> {
        self.agent_deregister(id)
            .await
            .map_err(|e| e.during("deregister service"))
    }

    async fn list_services(&self) -> Result<HashMap<String, ServiceEntry>> {
        self.agent_services()
            .await
            .map_err(|e| e.during("list services"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registrar_core::{HealthCheck, RegistrarError};
    use serde_json::json;
    use wiremock::matchers::{
        body_json, body_partial_json, body_string, header, method, path, query_param,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>, dc: Option<&str>) -> ConsulClient {
        let address = server.uri().trim_start_matches("http://").to_string();
        ConsulClient::new(&ConsulConfig {
            address,
            token: token.map(str::to_string),
            datacenter: dc.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_keeps_path_separators() {
        let client = ConsulClient::new(&ConsulConfig::default()).unwrap();
        let url = client
            .endpoint(&["agent", "service", "deregister"], "registrator/web-1")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8500/v1/agent/service/deregister/registrator/web-1"
        );
    }

    #[test]
    fn test_endpoint_keeps_empty_segments() {
        let client = ConsulClient::new(&ConsulConfig::default()).unwrap();

        let url = client.kv_endpoint("/svcweb/web-1/owner").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8500/v1/kv//svcweb/web-1/owner");

        let url = client
            .endpoint(&["agent", "service", "deregister"], "reg/a//b")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8500/v1/agent/service/deregister/reg/a//b"
        );

        let url = client.endpoint(&["status", "leader"], "").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8500/v1/status/leader");
    }

    #[tokio::test]
    async fn test_leading_separator_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .and(body_partial_json(json!({ "ID": "/svcweb-1" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/deregister//svcweb-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        let registration = ServiceRegistration {
            id: "/svcweb-1".to_string(),
            name: "web".to_string(),
            address: "10.0.0.5".to_string(),
            port: 80,
            tags: vec![],
            check: None,
        };
        client.register_service(&registration).await.unwrap();
        client.deregister_service(&registration.id).await.unwrap();
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = ConsulClient::new(&ConsulConfig::default()).unwrap();
        let url = client.kv_endpoint("reg/web/web 1/key?").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8500/v1/kv/reg/web/web%201/key%3F");
    }

    #[tokio::test]
    async fn test_leader() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/status/leader"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("10.0.0.1:8300")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        assert_eq!(client.leader().await.unwrap(), "10.0.0.1:8300");
    }

    #[tokio::test]
    async fn test_put_key_sends_token_and_raw_value() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/kv/registrator/web/web-1/owner"))
            .and(header("X-Consul-Token", "secret"))
            .and(query_param("dc", "dc2"))
            .and(body_string("team-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"), Some("dc2"));
        client
            .put_key("registrator/web/web-1/owner", b"team-a")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_tree_is_recursive() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/kv/registrator/web/web-1"))
            .and(query_param("recurse", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        client.delete_tree("registrator/web/web-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_register_service_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .and(body_json(json!({
                "ID": "registrator/web-1",
                "Name": "web",
                "Tags": [],
                "Port": 8080,
                "Address": "10.0.0.5",
                "Check": { "TTL": "30s" }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        client
            .register_service(&ServiceRegistration {
                id: "registrator/web-1".to_string(),
                name: "web".to_string(),
                address: "10.0.0.5".to_string(),
                port: 8080,
                tags: vec![],
                check: Some(HealthCheck::Ttl { ttl: "30s".to_string() }),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_rejection_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid check\n"))
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        let err = client
            .register_service(&ServiceRegistration {
                id: "web-1".to_string(),
                name: "web".to_string(),
                address: String::new(),
                port: 80,
                tags: vec![],
                check: None,
            })
            .await
            .unwrap_err();

        match err {
            RegistrarError::Backend { operation, message } => {
                assert_eq!(operation, "register service");
                assert!(message.contains("400"));
                assert!(message.contains("Invalid check"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_deregister_service() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/deregister/registrator/web-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        client.deregister_service("registrator/web-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_services() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agent/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "registrator/web-1": {
                    "ID": "registrator/web-1",
                    "Service": "web",
                    "Tags": ["http"],
                    "Address": "10.0.0.5",
                    "Port": 8080,
                    "Meta": {}
                },
                "consul": {
                    "ID": "consul",
                    "Service": "consul",
                    "Tags": null,
                    "Address": "",
                    "Port": 8300
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None, None);
        let services = client.list_services().await.unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services["registrator/web-1"].name, "web");
        assert_eq!(services["registrator/web-1"].tags, vec!["http".to_string()]);
        assert!(services["consul"].tags.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_agent() {
        let client = ConsulClient::new(&ConsulConfig {
            address: "127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            client.leader().await,
            Err(RegistrarError::Backend { operation: "leader query", .. })
        ));
    }
}
