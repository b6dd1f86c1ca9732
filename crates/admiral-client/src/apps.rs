//! Application (composite component) operations.

use admiral_core::{
    operation, Application, DocumentList, RequestBrokerState, ResourceKind, ResourceType,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::lookup::{full_id, full_ids};
use crate::requests::RequestClient;
use crate::track::TrackMode;

/// Factory cloning a template before provisioning it.
pub const TEMPLATE_CLONE_PATH: &str = "/resources/composite-descriptions-clone";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptionRef {
    document_self_link: String,
}

/// Client for application operations.
#[derive(Clone, Debug)]
pub struct AppClient {
    requests: RequestClient,
}

impl AppClient {
    /// Create an application client.
    pub fn new(requests: RequestClient) -> Self {
        Self { requests }
    }

    /// List applications.
    pub async fn list(&self) -> Result<Vec<Application>, ClientError> {
        let list: DocumentList<Application> = self
            .requests
            .http()
            .get_json_query(
                ResourceKind::Application.base_path(),
                &[("expand", "true"), ("documentType", "true")],
            )
            .await?;
        Ok(list.iter().cloned().collect())
    }

    /// Fetch one application.
    pub async fn inspect(&self, id: &str) -> Result<Application, ClientError> {
        let id = full_id(self.requests.http(), ResourceKind::Application, id).await?;
        self.requests
            .http()
            .get_json(&ResourceKind::Application.link(&id))
            .await
    }

    /// Start applications.
    pub async fn start(
        &self,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        self.run_operation(operation::CONTAINER_START, ids, mode).await
    }

    /// Stop applications.
    pub async fn stop(
        &self,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        self.run_operation(operation::CONTAINER_STOP, ids, mode).await
    }

    /// Remove applications.
    pub async fn remove(
        &self,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        self.run_operation(operation::CONTAINER_DELETE, ids, mode).await
    }

    /// Provision an application from a template.
    ///
    /// The template is cloned first so the provisioned application owns its
    /// description. `project` scopes the new application to a project.
    pub async fn run(
        &self,
        template_id: &str,
        project: Option<&str>,
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        let http = self.requests.http();
        let template = full_id(http, ResourceKind::Template, template_id).await?;
        let source = DescriptionRef {
            document_self_link: ResourceKind::Template.link(&template),
        };
        let clone: DescriptionRef = http.post_json(TEMPLATE_CLONE_PATH, &source).await?;
        info!(template = %template, clone = %clone.document_self_link, "Cloned template");

        let tenant_links = project
            .filter(|p| !p.trim().is_empty())
            .map(|p| vec![project_link(p)])
            .unwrap_or_default();
        let request = RequestBrokerState::provision(
            ResourceType::CompositeComponent,
            clone.document_self_link,
        )
        .with_tenant_links(tenant_links);

        self.requests.submit(&request, mode).await
    }

    async fn run_operation(
        &self,
        operation: &str,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        let full = full_ids(self.requests.http(), ResourceKind::Application, ids).await?;
        debug!(operation = %operation, apps = ?full, "Resolved applications");
        let request = RequestBrokerState::operation(
            operation,
            ResourceType::CompositeComponent,
            ResourceKind::Application.links(&full),
        );
        self.requests.submit(&request, mode).await
    }
}

/// Link of a project given its ID or link.
pub fn project_link(project: &str) -> String {
    if project.starts_with("/projects/") {
        project.to_string()
    } else {
        format!("/projects/{}", project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_link() {
        assert_eq!(project_link("default"), "/projects/default");
        assert_eq!(project_link("/projects/p1"), "/projects/p1");
    }

    #[test]
    fn test_description_ref_shape() {
        let body = DescriptionRef {
            document_self_link: "/resources/composite-descriptions/t1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"documentSelfLink": "/resources/composite-descriptions/t1"})
        );
    }
}
