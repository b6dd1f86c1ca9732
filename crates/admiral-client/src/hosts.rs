//! Container host operations.

use std::collections::HashMap;

use admiral_core::{
    operation, CoreError, DocumentList, Host, RequestBrokerState, ResourceKind, ResourceType,
    TaskHandle,
};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::containers::contains_filter;
use crate::error::ClientError;
use crate::lookup::{full_id, full_ids};
use crate::requests::RequestClient;
use crate::track::TrackMode;

/// Factory accepting new hosts.
pub const HOSTS_PATH: &str = "/resources/hosts";

/// Factory of trusted certificates.
pub const TRUST_CERTS_PATH: &str = "/config/trust-certs";

/// Hosts that can run containers, excluding parent compute descriptions.
const CONTAINER_HOST_FILTER: &str = "descriptionLink ne '/resources/compute-descriptions/*-parent-compute-desc' \
     and customProperties/__computeContainerHost eq '*'";

/// Parameters of a host to add.
#[derive(Debug, Clone, Default)]
pub struct NewHost {
    /// Docker API address, e.g. `https://10.0.0.5:2376`.
    pub address: String,
    /// Placement zone (resource pool) ID.
    pub placement_zone: Option<String>,
    /// Credentials ID used to reach the host.
    pub credentials: Option<String>,
    /// Trust the host's certificate if the server asks.
    pub accept_certificate: bool,
}

impl NewHost {
    fn state(&self) -> Host {
        let mut custom_properties = HashMap::new();
        custom_properties.insert("__adapterDockerType".to_string(), Some("API".to_string()));
        custom_properties.insert("__containerHostType".to_string(), Some("DOCKER".to_string()));
        if let Some(credentials) = self.credentials.as_deref().filter(|c| !c.is_empty()) {
            custom_properties.insert(
                "__authCredentialsLink".to_string(),
                Some(format!("/core/auth/credentials/{}", credentials)),
            );
        }

        Host {
            id: Some(self.address.clone()),
            address: self.address.clone(),
            resource_pool_link: self
                .placement_zone
                .as_deref()
                .filter(|z| !z.is_empty())
                .map(|z| format!("/resources/pools/{}", z)),
            custom_properties,
            ..Host::default()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HostSpec {
    host_state: Host,
    is_update_operation: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PowerStatePatch<'a> {
    power_state: &'a str,
}

/// Client for host operations.
#[derive(Clone, Debug)]
pub struct HostClient {
    requests: RequestClient,
}

impl HostClient {
    /// Create a host client.
    pub fn new(requests: RequestClient) -> Self {
        Self { requests }
    }

    /// List container hosts, optionally filtered by free text.
    pub async fn list(&self, query: Option<&str>) -> Result<Vec<Host>, ClientError> {
        let filter = match query.filter(|q| !q.trim().is_empty()) {
            Some(q) => format!("{} and {}", CONTAINER_HOST_FILTER, contains_filter(q)),
            None => CONTAINER_HOST_FILTER.to_string(),
        };
        let list: DocumentList<Host> = self
            .requests
            .http()
            .get_json_query(
                ResourceKind::Host.base_path(),
                &[
                    ("expand", "true"),
                    ("documentType", "true"),
                    ("$filter", filter.as_str()),
                ],
            )
            .await?;
        Ok(list.iter().cloned().collect())
    }

    /// Register a new host and return its ID.
    ///
    /// The host is validated first. The server then answers 204 with a
    /// `Location` header once the host is added, or 200 with the host's
    /// certificate when it is not trusted yet.
    pub async fn add(&self, host: &NewHost) -> Result<String, ClientError> {
        if host.address.trim().is_empty() {
            return Err(CoreError::InvalidInput("host address not provided".to_string()).into());
        }
        let spec = HostSpec {
            host_state: host.state(),
            is_update_operation: false,
        };
        let http = self.requests.http();

        http.send(Method::PUT, HOSTS_PATH, &[("validate", "true")], Some(&spec))
            .await?;
        debug!(address = %host.address, "Host validated");

        let mut raw = http.put(HOSTS_PATH, &spec).await?;
        if raw.status == 200 {
            if !host.accept_certificate {
                return Err(ClientError::CertificateNotTrusted);
            }
            let certificate: serde_json::Value = raw.json()?;
            let common_name = certificate
                .get("commonName")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("");
            info!(
                address = %host.address,
                common_name = %common_name,
                "Trusting host certificate"
            );
            http.post(TRUST_CERTS_PATH, &certificate).await?;
            raw = http.put(HOSTS_PATH, &spec).await?;
        }

        let handle = TaskHandle::resolve(raw.status, &raw.body, raw.location.as_deref());
        if !matches!(handle, TaskHandle::FromHeader(_)) {
            warn!(status = raw.status, "Host added without a location");
            return Err(ClientError::Api {
                status: raw.status,
                message: format!("host {} was not added", host.address),
            });
        }
        let ids = self
            .requests
            .tracking()
            .track(http, &handle, TrackMode::Wait)
            .await?;
        ids.into_iter().next().ok_or_else(|| {
            CoreError::NotFound {
                kind: ResourceKind::Host.name().to_string(),
                id: host.address.clone(),
            }
            .into()
        })
    }

    /// Remove a host.
    pub async fn remove(&self, id: &str, mode: TrackMode) -> Result<Vec<String>, ClientError> {
        let full = full_ids(self.requests.http(), ResourceKind::Host, &[id.to_string()]).await?;
        let request = RequestBrokerState::operation(
            operation::REMOVE_RESOURCE,
            ResourceType::ContainerHost,
            ResourceKind::Host.links(&full),
        );
        self.requests.submit(&request, mode).await
    }

    /// Stop scheduling containers on a host.
    pub async fn disable(&self, id: &str) -> Result<String, ClientError> {
        self.set_power_state(id, "SUSPEND").await
    }

    /// Resume scheduling containers on a host.
    pub async fn enable(&self, id: &str) -> Result<String, ClientError> {
        self.set_power_state(id, "ON").await
    }

    async fn set_power_state(&self, id: &str, power_state: &str) -> Result<String, ClientError> {
        let http = self.requests.http();
        let id = full_id(http, ResourceKind::Host, id).await?;
        http.patch(&ResourceKind::Host.link(&id), &PowerStatePatch { power_state })
            .await?;
        info!(host = %id, power_state = %power_state, "Updated host power state");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_host_state() {
        let host = NewHost {
            address: "https://10.0.0.5:2376".to_string(),
            placement_zone: Some("pz1".to_string()),
            credentials: Some("cred1".to_string()),
            accept_certificate: false,
        };
        let spec = HostSpec {
            host_state: host.state(),
            is_update_operation: false,
        };
        let value = serde_json::to_value(&spec).unwrap();

        assert_eq!(value["isUpdateOperation"], false);
        assert_eq!(value["hostState"]["address"], "https://10.0.0.5:2376");
        assert_eq!(value["hostState"]["resourcePoolLink"], "/resources/pools/pz1");
        assert_eq!(
            value["hostState"]["customProperties"]["__authCredentialsLink"],
            "/core/auth/credentials/cred1"
        );
        assert!(value["hostState"].get("documentSelfLink").is_none());
    }

    #[test]
    fn test_new_host_without_optionals() {
        let host = NewHost {
            address: "tcp://docker:2375".to_string(),
            ..NewHost::default()
        };
        let state = host.state();
        assert!(state.resource_pool_link.is_none());
        assert!(!state.custom_properties.contains_key("__authCredentialsLink"));
    }

    #[test]
    fn test_power_state_patch_shape() {
        let patch = PowerStatePatch {
            power_state: "SUSPEND",
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"powerState": "SUSPEND"})
        );
    }

    fn client_for(server: &crate::test_server::ScriptedServer) -> HostClient {
        let http = crate::HttpClient::new(server.url());
        HostClient::new(RequestClient::new(
            http,
            crate::test_server::quiet_tracking(),
        ))
    }

    #[tokio::test]
    async fn test_add_validates_before_adding() {
        use crate::test_server::{Reply, ScriptedServer};

        let server = ScriptedServer::start(vec![(
            "PUT",
            HOSTS_PATH,
            vec![
                Reply::json(204, ""),
                Reply::json(204, "").with_location("/resources/compute/h1"),
            ],
        )])
        .await;
        let host = NewHost {
            address: "https://10.0.0.5:2376".to_string(),
            ..NewHost::default()
        };

        let id = client_for(&server).add(&host).await.unwrap();

        assert_eq!(id, "h1");
        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].target, "/resources/hosts?validate=true");
        assert_eq!(requests[1].target, HOSTS_PATH);
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["hostState"]["address"], "https://10.0.0.5:2376");
    }

    #[tokio::test]
    async fn test_add_trusts_certificate_when_accepted() {
        use crate::test_server::{Reply, ScriptedServer};

        let certificate = r#"{"commonName":"docker-host","certificate":"PEM"}"#;
        let server = ScriptedServer::start(vec![
            (
                "PUT",
                HOSTS_PATH,
                vec![
                    Reply::json(204, ""),
                    Reply::json(200, certificate),
                    Reply::json(204, "").with_location("/resources/compute/h2"),
                ],
            ),
            ("POST", TRUST_CERTS_PATH, vec![Reply::json(200, "{}")]),
        ])
        .await;
        let host = NewHost {
            address: "https://10.0.0.6:2376".to_string(),
            accept_certificate: true,
            ..NewHost::default()
        };

        let id = client_for(&server).add(&host).await.unwrap();

        assert_eq!(id, "h2");
        assert_eq!(server.count("PUT", HOSTS_PATH), 3);
        let trusted = server
            .requests()
            .into_iter()
            .find(|r| r.method == "POST")
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&trusted.body).unwrap();
        assert_eq!(body, json!({"commonName": "docker-host", "certificate": "PEM"}));
    }

    #[tokio::test]
    async fn test_add_refuses_untrusted_certificate() {
        use crate::test_server::{Reply, ScriptedServer};

        let server = ScriptedServer::start(vec![(
            "PUT",
            HOSTS_PATH,
            vec![
                Reply::json(204, ""),
                Reply::json(200, r#"{"commonName":"docker-host"}"#),
            ],
        )])
        .await;
        let host = NewHost {
            address: "https://10.0.0.7:2376".to_string(),
            ..NewHost::default()
        };

        let err = client_for(&server).add(&host).await.unwrap_err();

        assert!(matches!(err, ClientError::CertificateNotTrusted));
        assert_eq!(server.count("POST", TRUST_CERTS_PATH), 0);
    }

    #[tokio::test]
    async fn test_add_stops_when_validation_fails() {
        use crate::test_server::{Reply, ScriptedServer};

        let server = ScriptedServer::start(vec![(
            "PUT",
            HOSTS_PATH,
            vec![Reply::json(400, r#"{"message":"Unable to connect to host"}"#)],
        )])
        .await;
        let host = NewHost {
            address: "https://10.0.0.8:2376".to_string(),
            ..NewHost::default()
        };

        let err = client_for(&server).add(&host).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Api { status: 400, ref message } if message == "Unable to connect to host"
        ));
        assert_eq!(server.count("PUT", HOSTS_PATH), 1);
    }
}
