//! Container operations.

use admiral_core::{
    operation, Container, CoreError, DocumentList, RequestBrokerState, ResourceKind, ResourceType,
};
use serde::Serialize;
use tracing::debug;

use crate::error::ClientError;
use crate::lookup::{full_id, full_ids};
use crate::requests::RequestClient;
use crate::track::TrackMode;

/// Query selecting documents whose fields contain `text`.
pub(crate) fn contains_filter(text: &str) -> String {
    format!("ALL_FIELDS eq '*{}*'", text.trim())
}

#[derive(Serialize)]
struct ExecRequest<'a> {
    command: Vec<&'a str>,
}

/// Client for container operations.
#[derive(Clone, Debug)]
pub struct ContainerClient {
    requests: RequestClient,
}

impl ContainerClient {
    /// Create a container client.
    pub fn new(requests: RequestClient) -> Self {
        Self { requests }
    }

    /// List containers, optionally filtered by free text. System
    /// containers are skipped unless `include_system` is set.
    pub async fn list(
        &self,
        query: Option<&str>,
        include_system: bool,
    ) -> Result<Vec<Container>, ClientError> {
        let filter = query.filter(|q| !q.trim().is_empty()).map(contains_filter);
        let mut params = vec![("expand", "true"), ("documentType", "true")];
        if let Some(filter) = filter.as_deref() {
            params.push(("$filter", filter));
        }

        let list: DocumentList<Container> = self
            .requests
            .http()
            .get_json_query(ResourceKind::Container.base_path(), &params)
            .await?;
        debug!(count = list.len(), "Fetched containers");

        Ok(list
            .iter()
            .filter(|c| include_system || !c.is_system())
            .cloned()
            .collect())
    }

    /// Fetch one container.
    pub async fn inspect(&self, id: &str) -> Result<Container, ClientError> {
        let id = full_id(self.requests.http(), ResourceKind::Container, id).await?;
        self.requests
            .http()
            .get_json(&ResourceKind::Container.link(&id))
            .await
    }

    /// Start containers.
    pub async fn start(
        &self,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        self.run_operation(operation::CONTAINER_START, ids, mode).await
    }

    /// Stop containers.
    pub async fn stop(
        &self,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        self.run_operation(operation::CONTAINER_STOP, ids, mode).await
    }

    /// Remove containers.
    pub async fn remove(
        &self,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        self.run_operation(operation::CONTAINER_DELETE, ids, mode).await
    }

    /// Remove every container matching a free-text query.
    pub async fn remove_matching(
        &self,
        query: &str,
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        let matching = self.list(Some(query), false).await?;
        if matching.is_empty() {
            return Err(CoreError::NotFound {
                kind: ResourceKind::Container.name().to_string(),
                id: query.to_string(),
            }
            .into());
        }

        let links: Vec<String> = matching
            .iter()
            .map(|c| c.document_self_link.clone())
            .collect();
        let ids: Vec<String> = matching.iter().map(|c| c.id().to_string()).collect();
        self.submit(operation::CONTAINER_DELETE, links, ids, mode)
            .await
    }

    /// Scale the cluster a container belongs to to `count` instances.
    pub async fn scale(
        &self,
        id: &str,
        count: u32,
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        if count == 0 {
            return Err(CoreError::InvalidInput("scale count must be positive".to_string()).into());
        }
        let container = self.inspect(id).await?;
        let description = container.description_link.clone().ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "container {} has no description to scale from",
                container.id()
            ))
        })?;

        let request = RequestBrokerState::cluster(ResourceType::Container, description, count);
        let ids = self.requests.submit(&request, mode).await?;
        if ids.is_empty() {
            return Ok(vec![container.id().to_string()]);
        }
        Ok(ids)
    }

    /// Run a command inside a container and return its output.
    pub async fn exec(&self, id: &str, command: &str) -> Result<String, ClientError> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.is_empty() {
            return Err(CoreError::InvalidInput("empty command".to_string()).into());
        }
        let id = full_id(self.requests.http(), ResourceKind::Container, id).await?;
        let link = ResourceKind::Container.link(&id);

        let raw = self
            .requests
            .http()
            .post_query(
                "/exec",
                &[("containerLink", link.as_str())],
                &ExecRequest { command: parts },
            )
            .await?;
        Ok(String::from_utf8_lossy(&raw.body).into_owned())
    }

    async fn run_operation(
        &self,
        operation: &str,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        let full = full_ids(self.requests.http(), ResourceKind::Container, ids).await?;
        let links = ResourceKind::Container.links(&full);
        self.submit(operation, links, full, mode).await
    }

    /// Submit an operation. Detached callers whose task has not reported
    /// any links yet get the requested IDs echoed back.
    async fn submit(
        &self,
        operation: &str,
        links: Vec<String>,
        requested: Vec<String>,
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        let request = RequestBrokerState::operation(operation, ResourceType::Container, links);
        let ids = self.requests.submit(&request, mode).await?;
        if ids.is_empty() && mode == TrackMode::Detach {
            return Ok(requested);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_filter() {
        assert_eq!(contains_filter(" web "), "ALL_FIELDS eq '*web*'");
    }

    #[test]
    fn test_exec_request_shape() {
        let body = ExecRequest {
            command: "ls -la /tmp".split_whitespace().collect(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"command": ["ls", "-la", "/tmp"]})
        );
    }

    const CONTAINERS: &str = r#"{"documentLinks":["/resources/containers/c1abc","/resources/containers/d2ef"],"documents":{}}"#;
    const TRACKER: &str = r#"{"requestTrackerLink":"/request-status/t1"}"#;

    async fn client_for(status: &str) -> (crate::test_server::ScriptedServer, ContainerClient) {
        use crate::test_server::{quiet_tracking, Reply, ScriptedServer};

        let server = ScriptedServer::start(vec![
            ("GET", "/resources/containers", vec![Reply::json(200, CONTAINERS)]),
            ("POST", "/requests", vec![Reply::json(200, TRACKER)]),
            ("GET", "/request-status/t1", vec![Reply::json(200, status)]),
        ])
        .await;
        let http = crate::HttpClient::new(server.url());
        let client = ContainerClient::new(RequestClient::new(http, quiet_tracking()));
        (server, client)
    }

    #[tokio::test]
    async fn test_detached_start_echoes_requested_ids() {
        let (server, client) = client_for(r#"{"taskInfo":{"stage":"STARTED"}}"#).await;

        let ids = client
            .start(&["c1".to_string()], TrackMode::Detach)
            .await
            .unwrap();

        assert_eq!(ids, vec!["c1abc"]);
        assert_eq!(server.count("GET", "/request-status/t1"), 1);

        let submitted = server
            .requests()
            .into_iter()
            .find(|r| r.method == "POST")
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&submitted.body).unwrap();
        assert_eq!(body["operation"], "Container.Start");
        assert_eq!(body["resourceLinks"], serde_json::json!(["/resources/containers/c1abc"]));
    }

    #[tokio::test]
    async fn test_detached_stop_prefers_reported_links() {
        let (_server, client) = client_for(
            r#"{"taskInfo":{"stage":"STARTED"},"resourceLinks":["/resources/containers/d2ef"]}"#,
        )
        .await;

        let ids = client
            .stop(&["d2".to_string()], TrackMode::Detach)
            .await
            .unwrap();

        assert_eq!(ids, vec!["d2ef"]);
    }

    #[tokio::test]
    async fn test_unknown_prefix_is_not_submitted() {
        let (server, client) = client_for(r#"{"taskInfo":{"stage":"STARTED"}}"#).await;

        let err = client
            .remove(&["zz".to_string()], TrackMode::Wait)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Core(CoreError::NotFound { .. })));
        assert_eq!(server.count("POST", "/requests"), 0);
    }
}
