//! REST client library for the Admiral control plane.
//!
//! Provides an HTTP client, per-resource clients, and the task tracking
//! used by every mutating operation: submissions return a task handle that
//! is either waited on until it settles or reported back immediately.

pub mod apps;
pub mod containers;
pub mod error;
pub mod hosts;
pub mod http;
pub mod lookup;
pub mod networks;
pub mod requests;
pub mod track;

#[cfg(test)]
mod test_server;

pub use apps::AppClient;
pub use containers::ContainerClient;
pub use error::ClientError;
pub use hosts::{HostClient, NewHost};
pub use http::HttpClient;
pub use networks::NetworkClient;
pub use requests::RequestClient;
pub use track::{PollPolicy, StatusSource, TaskWaiter, TrackMode, Tracking};

/// Combined client with access to all resource clients.
#[derive(Clone, Debug)]
pub struct AdmiralClient {
    /// Container operations.
    pub containers: ContainerClient,
    /// Application operations.
    pub apps: AppClient,
    /// Host operations.
    pub hosts: HostClient,
    /// Network operations.
    pub networks: NetworkClient,
    /// Request broker and task queries.
    pub requests: RequestClient,
}

impl AdmiralClient {
    /// Create a client sharing one HTTP connection pool and tracking setup.
    pub fn new(http: HttpClient, tracking: Tracking) -> Self {
        let requests = RequestClient::new(http, tracking);
        Self {
            containers: ContainerClient::new(requests.clone()),
            apps: AppClient::new(requests.clone()),
            hosts: HostClient::new(requests.clone()),
            networks: NetworkClient::new(requests.clone()),
            requests,
        }
    }

    /// Underlying HTTP client.
    pub fn http(&self) -> &HttpClient {
        self.requests.http()
    }
}
