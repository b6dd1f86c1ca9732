//! Request bodies submitted to the request broker (`POST /requests`).

use serde::{Deserialize, Serialize};

/// Operation names understood by the request broker.
pub mod operation {
    pub const CONTAINER_START: &str = "Container.Start";
    pub const CONTAINER_STOP: &str = "Container.Stop";
    pub const CONTAINER_DELETE: &str = "Container.Delete";
    pub const NETWORK_DELETE: &str = "Network.Delete";
    pub const CLUSTER_RESOURCE: &str = "CLUSTER_RESOURCE";
    pub const REMOVE_RESOURCE: &str = "REMOVE_RESOURCE";
}

/// Type tag of the resources an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "DOCKER_CONTAINER")]
    Container,
    #[serde(rename = "COMPOSITE_COMPONENT")]
    CompositeComponent,
    #[serde(rename = "CONTAINER_HOST")]
    ContainerHost,
    #[serde(rename = "NETWORK")]
    Network,
}

/// A request for the broker to run an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBrokerState {
    /// Operation name. Omitted for provisioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Resources the operation acts on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_links: Vec<String>,

    pub resource_type: ResourceType,

    /// Description to provision or scale from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_description_link: Option<String>,

    /// Desired instance count for clustering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_count: Option<u32>,

    /// Project or business-group links the new resources belong to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tenant_links: Vec<String>,
}

impl RequestBrokerState {
    /// Run a day-2 operation against existing resources.
    pub fn operation(
        operation: &str,
        resource_type: ResourceType,
        resource_links: Vec<String>,
    ) -> Self {
        Self {
            operation: Some(operation.to_string()),
            resource_links,
            resource_type,
            resource_description_link: None,
            resource_count: None,
            tenant_links: Vec::new(),
        }
    }

    /// Provision new resources from a description.
    pub fn provision(resource_type: ResourceType, description_link: impl Into<String>) -> Self {
        Self {
            operation: None,
            resource_links: Vec::new(),
            resource_type,
            resource_description_link: Some(description_link.into()),
            resource_count: None,
            tenant_links: Vec::new(),
        }
    }

    /// Scale the resources built from a description to `count` instances.
    pub fn cluster(
        resource_type: ResourceType,
        description_link: impl Into<String>,
        count: u32,
    ) -> Self {
        Self {
            operation: Some(operation::CLUSTER_RESOURCE.to_string()),
            resource_links: Vec::new(),
            resource_type,
            resource_description_link: Some(description_link.into()),
            resource_count: Some(count),
            tenant_links: Vec::new(),
        }
    }

    /// Builder method to set tenant links.
    pub fn with_tenant_links(mut self, links: Vec<String>) -> Self {
        self.tenant_links = links;
        self
    }
}
