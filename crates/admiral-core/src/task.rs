//! Task handles returned by mutating requests.

use serde::Deserialize;
use std::fmt;

use crate::link::{short_id, ResourceKind};

/// Where, if anywhere, the outcome of a submitted operation can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskHandle {
    /// The response body named a request-status document to track.
    FromBody(String),
    /// The server completed synchronously and pointed at the resulting
    /// resource with a `Location` header.
    FromHeader(String),
    /// Nothing to track; the operation is already complete.
    None,
}

/// Subset of the request broker document echoed back on submission.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmittedRequest {
    #[serde(default)]
    request_tracker_link: Option<String>,
}

impl TaskHandle {
    /// Resolve the handle of a submitted operation from its response.
    ///
    /// A 200 whose body names a `requestTrackerLink` must be tracked. Bodies
    /// that fail to decode are not an error here: some operations answer
    /// with an empty body and a `Location` header instead.
    pub fn resolve(status: u16, body: &[u8], location: Option<&str>) -> Self {
        if status == 200 {
            let tracker = serde_json::from_slice::<SubmittedRequest>(body)
                .ok()
                .and_then(|r| r.request_tracker_link)
                .filter(|link| !link.trim().is_empty());
            if let Some(link) = tracker {
                return Self::FromBody(link);
            }
        }

        match location.map(str::trim) {
            Some(link) if !link.is_empty() => Self::FromHeader(link.to_string()),
            _ => Self::None,
        }
    }

    /// Build a handle for an existing task from a user supplied ID or path.
    pub fn for_task(id_or_path: &str) -> Self {
        if id_or_path.starts_with('/') {
            Self::FromBody(id_or_path.to_string())
        } else {
            Self::FromBody(ResourceKind::RequestStatus.link(id_or_path))
        }
    }

    /// The linked path, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::FromBody(path) | Self::FromHeader(path) => Some(path.as_str()),
            Self::None => None,
        }
    }

    /// Short task ID shown to the user, only for handles that need tracking.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::FromBody(path) => Some(short_id(path)),
            _ => None,
        }
    }

    /// Returns true if the operation still has to be polled.
    pub fn needs_tracking(&self) -> bool {
        matches!(self, Self::FromBody(_))
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromBody(path) => write!(f, "task {}", path),
            Self::FromHeader(path) => write!(f, "resource {}", path),
            Self::None => write!(f, "no task"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_body() {
        let body = br#"{"documentSelfLink": "/requests/r1", "requestTrackerLink": "/request-status/abc"}"#;
        let handle = TaskHandle::resolve(200, body, None);
        assert_eq!(handle, TaskHandle::FromBody("/request-status/abc".to_string()));
        assert_eq!(handle.task_id(), Some("abc"));
        assert!(handle.needs_tracking());
    }

    #[test]
    fn test_body_wins_over_header() {
        let body = br#"{"requestTrackerLink": "/request-status/abc"}"#;
        let handle = TaskHandle::resolve(200, body, Some("/resources/compute/h1"));
        assert_eq!(handle, TaskHandle::FromBody("/request-status/abc".to_string()));
    }

    #[test]
    fn test_malformed_body_falls_back_to_header() {
        let handle = TaskHandle::resolve(200, b"not json", Some("/resources/compute/h1"));
        assert_eq!(handle, TaskHandle::FromHeader("/resources/compute/h1".to_string()));
        assert_eq!(handle.task_id(), None);
        assert!(!handle.needs_tracking());
    }

    #[test]
    fn test_no_content_with_location() {
        let handle = TaskHandle::resolve(204, b"", Some("/resources/compute/h1"));
        assert_eq!(handle.path(), Some("/resources/compute/h1"));
    }

    #[test]
    fn test_resolve_nothing() {
        assert_eq!(TaskHandle::resolve(200, b"{}", None), TaskHandle::None);
        assert_eq!(
            TaskHandle::resolve(200, br#"{"requestTrackerLink": ""}"#, Some("  ")),
            TaskHandle::None
        );
    }

    #[test]
    fn test_tracker_in_non_200_body_is_ignored() {
        let body = br#"{"requestTrackerLink": "/request-status/abc"}"#;
        assert_eq!(TaskHandle::resolve(202, body, None), TaskHandle::None);
    }

    #[test]
    fn test_for_task() {
        assert_eq!(
            TaskHandle::for_task("abc"),
            TaskHandle::FromBody("/request-status/abc".to_string())
        );
        assert_eq!(
            TaskHandle::for_task("/request-status/abc"),
            TaskHandle::FromBody("/request-status/abc".to_string())
        );
    }
}
