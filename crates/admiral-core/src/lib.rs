//! Admiral Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Runtime specifics
//!
//! It models the asynchronous task protocol of the Admiral control plane
//! (task handles, request-status documents, resource links) and the
//! resource documents the CLI renders.

pub mod error;
pub mod link;
pub mod request;
pub mod resource;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use error::CoreError;
pub use link::{resolve_full_id, short_id, short_ids, ResourceKind};
pub use request::{operation, RequestBrokerState, ResourceType};
pub use resource::{Application, Container, DocumentList, Host, Network, PortBinding};
pub use status::{TaskStage, TaskStatus};
pub use task::TaskHandle;
