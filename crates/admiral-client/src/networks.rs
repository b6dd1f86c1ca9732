//! Container network operations.

use admiral_core::{
    operation, CoreError, DocumentList, Network, RequestBrokerState, ResourceKind, ResourceType,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ClientError;
use crate::lookup::full_ids;
use crate::requests::RequestClient;
use crate::track::TrackMode;

/// Description of a network to provision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkDescription<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    driver: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDescription {
    document_self_link: String,
}

/// Client for network operations.
#[derive(Clone, Debug)]
pub struct NetworkClient {
    requests: RequestClient,
}

impl NetworkClient {
    /// Create a network client.
    pub fn new(requests: RequestClient) -> Self {
        Self { requests }
    }

    /// List networks.
    pub async fn list(&self) -> Result<Vec<Network>, ClientError> {
        let list: DocumentList<Network> = self
            .requests
            .http()
            .get_json_query(
                ResourceKind::Network.base_path(),
                &[("expand", "true"), ("documentType", "true")],
            )
            .await?;
        Ok(list.iter().cloned().collect())
    }

    /// Create a network: store its description, then provision it.
    pub async fn create(
        &self,
        name: &str,
        driver: Option<&str>,
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("network name not provided".to_string()).into());
        }
        let description = NetworkDescription {
            name,
            driver: driver.filter(|d| !d.trim().is_empty()),
        };
        let created: CreatedDescription = self
            .requests
            .http()
            .post_json(ResourceKind::NetworkDescription.base_path(), &description)
            .await?;
        info!(
            network = %name,
            description = %created.document_self_link,
            "Created network description"
        );

        let request =
            RequestBrokerState::provision(ResourceType::Network, created.document_self_link);
        self.requests.submit(&request, mode).await
    }

    /// Remove networks.
    pub async fn remove(
        &self,
        ids: &[String],
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        let full = full_ids(self.requests.http(), ResourceKind::Network, ids).await?;
        let request = RequestBrokerState::operation(
            operation::NETWORK_DELETE,
            ResourceType::Network,
            ResourceKind::Network.links(&full),
        );
        self.requests.submit(&request, mode).await
    }
}
