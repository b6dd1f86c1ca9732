//! Task stages and the request-status document polled by the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::link::short_ids;

/// Stage of an asynchronous task on the control plane.
///
/// Decoded from the `taskInfo.stage` string. Any value outside the known set
/// maps to [`TaskStage::Unknown`], which is treated as still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStage {
    /// Task document created, work not yet started.
    Created,
    /// Task is in progress.
    Started,
    /// Task completed successfully.
    Finished,
    /// Task failed.
    Failed,
    /// Task was cancelled on the server.
    Cancelled,
    /// Unrecognised stage.
    #[default]
    Unknown,
}

impl TaskStage {
    /// Returns true if the task will not change stage again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }

    /// Wire representation of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Started => "STARTED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for TaskStage {
    fn from(s: String) -> Self {
        match s.as_str() {
            "CREATED" => Self::Created,
            "STARTED" => Self::Started,
            "FINISHED" => Self::Finished,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }
}

impl From<TaskStage> for String {
    fn from(stage: TaskStage) -> Self {
        stage.as_str().to_string()
    }
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure details attached to a failed task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Stage information of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub stage: TaskStage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TaskFailure>,
}

/// Snapshot of a task's progress, as served under `/request-status/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// Self link of the status document.
    #[serde(default)]
    pub document_self_link: String,

    /// Display name of the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Stage information. A document without it is not a task status.
    pub task_info: TaskInfo,

    /// Finer grained progress marker reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Progress percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,

    /// Links of the resources produced or affected by the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_links: Option<Vec<String>>,

    /// Flat failure message; some server versions report it here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl TaskStatus {
    /// Create a status document in the given stage.
    pub fn new(stage: TaskStage) -> Self {
        Self {
            document_self_link: String::new(),
            name: None,
            task_info: TaskInfo {
                stage,
                failure: None,
            },
            sub_stage: None,
            progress: None,
            resource_links: None,
            failure_message: None,
        }
    }

    /// Builder method to set the resource links.
    pub fn with_resource_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_links = Some(links.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to set the failure message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.task_info.failure = Some(TaskFailure {
            message: Some(message.into()),
        });
        self
    }

    /// Decode a status document from a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Current stage.
    pub fn phase(&self) -> TaskStage {
        self.task_info.stage
    }

    /// Returns true if the task reached a terminal stage.
    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Failure message, if the server supplied a non-empty one.
    pub fn failure_message(&self) -> Option<&str> {
        let flat = self.failure_message.as_deref();
        let nested = self
            .task_info
            .failure
            .as_ref()
            .and_then(|f| f.message.as_deref());

        flat.into_iter()
            .chain(nested)
            .map(str::trim)
            .find(|m| !m.is_empty())
    }

    /// Resource links reported so far. Empty when absent or null.
    pub fn resource_links(&self) -> &[String] {
        self.resource_links.as_deref().unwrap_or(&[])
    }

    /// Short IDs of the reported resource links, in order.
    pub fn resource_ids(&self) -> Vec<String> {
        short_ids(self.resource_links())
    }
}
