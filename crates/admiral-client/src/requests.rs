//! Submission of operations to the request broker and direct task queries.

use admiral_core::{RequestBrokerState, TaskHandle, TaskStatus};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::http::HttpClient;
use crate::track::{StatusSource, TaskWaiter, TrackMode, Tracking};

/// Path of the request broker factory.
pub const REQUESTS_PATH: &str = "/requests";

/// Client for the request broker and request-status documents.
///
/// Every resource client submits its mutating operations through this one,
/// so they all share the same wait/detach behaviour.
#[derive(Clone, Debug)]
pub struct RequestClient {
    http: HttpClient,
    tracking: Tracking,
}

impl RequestClient {
    /// Create a request client.
    pub fn new(http: HttpClient, tracking: Tracking) -> Self {
        Self { http, tracking }
    }

    /// Underlying HTTP client.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Tracking settings.
    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    /// Submit an operation and track it according to `mode`.
    ///
    /// Returns the short IDs of the resources the task reports.
    pub async fn submit(
        &self,
        request: &RequestBrokerState,
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        info!(
            operation = request.operation.as_deref().unwrap_or("PROVISION"),
            resource_type = ?request.resource_type,
            resources = request.resource_links.len(),
            "Submitting request"
        );
        let raw = self.http.post(REQUESTS_PATH, request).await?;
        let handle = TaskHandle::resolve(raw.status, &raw.body, raw.location.as_deref());
        debug!(
            handle = %handle,
            tracked = handle.needs_tracking(),
            "Resolved task handle"
        );

        self.tracking.track(&self.http, &handle, mode).await
    }

    /// Block until an already submitted task settles.
    pub async fn wait(&self, task: &str) -> Result<Vec<String>, ClientError> {
        let handle = TaskHandle::for_task(task);
        let path = handle.path().unwrap_or(task);
        TaskWaiter::new(&self.http, self.tracking.policy)
            .wait(path, &self.tracking.cancel)
            .await
    }

    /// Read the current status document of a task.
    pub async fn status(&self, task: &str) -> Result<TaskStatus, ClientError> {
        let handle = TaskHandle::for_task(task);
        self.http.fetch_status(handle.path().unwrap_or(task)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{quiet_tracking, Reply, ScriptedServer};
    use admiral_core::{operation, ResourceType};

    const TRACKER: &str = r#"{"requestTrackerLink":"/request-status/abc"}"#;

    fn start_request() -> RequestBrokerState {
        RequestBrokerState::operation(
            operation::CONTAINER_START,
            ResourceType::Container,
            vec!["/resources/containers/xyz".to_string()],
        )
    }

    #[tokio::test]
    async fn test_submit_waits_for_task_over_http() {
        let server = ScriptedServer::start(vec![
            ("POST", "/requests", vec![Reply::json(200, TRACKER)]),
            (
                "GET",
                "/request-status/abc",
                vec![
                    Reply::json(200, r#"{"taskInfo":{"stage":"STARTED"}}"#),
                    Reply::json(
                        200,
                        r#"{"taskInfo":{"stage":"FINISHED"},"resourceLinks":["/resources/containers/xyz"]}"#,
                    ),
                ],
            ),
        ])
        .await;
        let client = RequestClient::new(HttpClient::new(server.url()), quiet_tracking());

        let ids = client
            .submit(&start_request(), TrackMode::Wait)
            .await
            .unwrap();

        assert_eq!(ids, vec!["xyz"]);
        assert_eq!(server.count("POST", "/requests"), 1);
        assert_eq!(server.count("GET", "/request-status/abc"), 2);

        let submitted: serde_json::Value =
            serde_json::from_str(&server.requests()[0].body).unwrap();
        assert_eq!(submitted["operation"], "Container.Start");
        assert_eq!(submitted["resourceLinks"][0], "/resources/containers/xyz");
    }

    #[tokio::test]
    async fn test_submit_reports_failed_task_over_http() {
        let server = ScriptedServer::start(vec![
            ("POST", "/requests", vec![Reply::json(200, TRACKER)]),
            (
                "GET",
                "/request-status/abc",
                vec![Reply::json(
                    200,
                    r#"{"taskInfo":{"stage":"FAILED","failure":{"message":"host unreachable"}}}"#,
                )],
            ),
        ])
        .await;
        let client = RequestClient::new(HttpClient::new(server.url()), quiet_tracking());

        let err = client
            .submit(&start_request(), TrackMode::Wait)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::TaskFailed { ref message, .. } if message.contains("host unreachable")
        ));
    }

    #[tokio::test]
    async fn test_status_by_short_id_over_http() {
        let server = ScriptedServer::start(vec![(
            "GET",
            "/request-status/abc",
            vec![Reply::json(
                200,
                r#"{"documentSelfLink":"/request-status/abc","taskInfo":{"stage":"STARTED"},"progress":40}"#,
            )],
        )])
        .await;
        let client = RequestClient::new(HttpClient::new(server.url()), quiet_tracking());

        let status = client.status("abc").await.unwrap();

        assert_eq!(status.progress, Some(40));
        assert_eq!(server.requests()[0].target, "/request-status/abc");
    }
}
