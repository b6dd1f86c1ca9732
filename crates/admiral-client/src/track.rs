//! Tracking of asynchronous tasks.
//!
//! Mutating requests are answered with a [`TaskHandle`]. When the handle
//! points at a request-status document the waiter polls it until the task
//! settles, then maps the task's resource links to short IDs. In detach mode
//! the document is read exactly once and whatever links are known at that
//! point are returned.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use admiral_core::{short_id, TaskHandle, TaskStage, TaskStatus};
use async_trait::async_trait;
use reqwest::Method;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::http::HttpClient;

/// Delay between two polls of a running task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Message used when a failed task carries no explanation.
pub const GENERIC_FAILURE_MESSAGE: &str = "task failed";

/// Source of task status snapshots.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status document at `task_path`.
    ///
    /// A body that is not a status document is an error.
    async fn fetch_status(&self, task_path: &str) -> Result<TaskStatus, ClientError>;
}

#[async_trait]
impl StatusSource for HttpClient {
    async fn fetch_status(&self, task_path: &str) -> Result<TaskStatus, ClientError> {
        let raw = self.send::<()>(Method::GET, task_path, &[], None).await?;
        TaskStatus::from_slice(&raw.body).map_err(|e| {
            ClientError::Serialization(format!("malformed status of {}: {}", task_path, e))
        })
    }
}

/// How long and how often to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between polls.
    pub interval: Duration,
    /// Give up after this many polls without a terminal stage.
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since the first poll.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            deadline: None,
        }
    }
}

impl PollPolicy {
    /// Builder method to set the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder method to bound the number of polls.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Builder method to bound the total wait.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Whether the caller blocks until the task settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    /// Poll until a terminal stage.
    Wait,
    /// Read the status once and return.
    Detach,
}

impl TrackMode {
    /// Map the `--async` flag to a mode.
    pub fn from_async(async_task: bool) -> Self {
        if async_task {
            Self::Detach
        } else {
            Self::Wait
        }
    }
}

/// Callback told the task ID as soon as a submission returns one.
pub type TaskNotifier = Arc<dyn Fn(&str) + Send + Sync>;

/// Notifier that prints the task ID so detached users can query it later.
pub fn print_task_id() -> TaskNotifier {
    Arc::new(|id: &str| println!("Task ID: {}", id))
}

/// Everything a resource client needs to track the tasks it submits.
#[derive(Clone)]
pub struct Tracking {
    /// Poll policy for blocking waits.
    pub policy: PollPolicy,
    /// Cancelled to abandon an in-progress wait.
    pub cancel: CancellationToken,
    notifier: TaskNotifier,
}

impl Tracking {
    /// Create tracking settings that print task IDs to stdout.
    pub fn new(policy: PollPolicy, cancel: CancellationToken) -> Self {
        Self {
            policy,
            cancel,
            notifier: print_task_id(),
        }
    }

    /// Builder method to replace the task ID notifier.
    pub fn with_notifier(mut self, notifier: TaskNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Build a waiter polling `source`.
    pub fn waiter<'a, S: StatusSource + ?Sized>(&self, source: &'a S) -> TaskWaiter<'a, S> {
        TaskWaiter::new(source, self.policy).with_notifier(self.notifier.clone())
    }

    /// Track `handle` according to `mode`.
    pub async fn track<S: StatusSource + ?Sized>(
        &self,
        source: &S,
        handle: &TaskHandle,
        mode: TrackMode,
    ) -> Result<Vec<String>, ClientError> {
        self.waiter(source).track(handle, mode, &self.cancel).await
    }
}

impl fmt::Debug for Tracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracking")
            .field("policy", &self.policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Polls one task to completion.
pub struct TaskWaiter<'a, S: ?Sized> {
    source: &'a S,
    policy: PollPolicy,
    notifier: Option<TaskNotifier>,
}

impl<'a, S: StatusSource + ?Sized> TaskWaiter<'a, S> {
    /// Create a waiter reading statuses from `source`.
    pub fn new(source: &'a S, policy: PollPolicy) -> Self {
        Self {
            source,
            policy,
            notifier: None,
        }
    }

    /// Builder method to be told the task ID before tracking starts.
    pub fn with_notifier(mut self, notifier: TaskNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Resolve a submission handle into short resource IDs.
    ///
    /// Handles pointing at a resource (synchronous completion) resolve to
    /// that resource's ID without any request; empty handles resolve to no
    /// IDs.
    pub async fn track(
        &self,
        handle: &TaskHandle,
        mode: TrackMode,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ClientError> {
        if let Some(task) = handle.task_id() {
            if let Some(notify) = &self.notifier {
                notify(task);
            }
            info!(task = %task, mode = ?mode, "Tracking task");
        }

        match handle {
            TaskHandle::FromBody(path) => match mode {
                TrackMode::Wait => self.wait(path, cancel).await,
                TrackMode::Detach => self.peek(path).await,
            },
            TaskHandle::FromHeader(path) => {
                debug!(location = %path, "Operation completed synchronously");
                Ok(vec![short_id(path).to_string()])
            }
            TaskHandle::None => Ok(Vec::new()),
        }
    }

    /// Poll `task_path` until the task reaches a terminal stage.
    ///
    /// Fetch errors abort the wait immediately. A terminal stage is never
    /// polled again.
    pub async fn wait(
        &self,
        task_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ClientError> {
        let task = short_id(task_path);
        let abandoned = || ClientError::WaitAbandoned {
            task: task.to_string(),
        };
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(abandoned()),
                status = self.source.fetch_status(task_path) => status?,
            };
            attempts = attempts.saturating_add(1);
            debug!(
                task = %task,
                stage = %status.phase(),
                progress = ?status.progress,
                attempt = attempts,
                "Polled task status"
            );

            if let Some(outcome) = settle(task, &status) {
                return outcome;
            }

            let elapsed = started.elapsed();
            let out_of_attempts = self.policy.max_attempts.is_some_and(|max| attempts >= max);
            let out_of_time = self.policy.deadline.is_some_and(|d| elapsed >= d);
            if out_of_attempts || out_of_time {
                warn!(
                    task = %task,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Giving up on task"
                );
                return Err(ClientError::WaitTimeout {
                    task: task.to_string(),
                });
            }

            let delay = match self.policy.deadline {
                Some(deadline) => self.policy.interval.min(deadline.saturating_sub(elapsed)),
                None => self.policy.interval,
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(abandoned()),
                _ = sleep(delay) => {}
            }
        }
    }

    /// Read the status of `task_path` once and return the IDs known so far.
    ///
    /// A running task is not an error; an empty list is a valid answer.
    pub async fn peek(&self, task_path: &str) -> Result<Vec<String>, ClientError> {
        let status = self.source.fetch_status(task_path).await?;
        let task = short_id(task_path);
        debug!(task = %task, stage = %status.phase(), "Read task status once");

        match settle(task, &status) {
            Some(outcome) => outcome,
            None => Ok(status.resource_ids()),
        }
    }
}

/// Outcome of a status in a terminal stage, `None` while still running.
fn settle(task: &str, status: &TaskStatus) -> Option<Result<Vec<String>, ClientError>> {
    match status.phase() {
        TaskStage::Finished => Some(Ok(status.resource_ids())),
        TaskStage::Failed => Some(Err(ClientError::TaskFailed {
            task: task.to_string(),
            message: status
                .failure_message()
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
        })),
        TaskStage::Cancelled => Some(Err(ClientError::TaskCancelled {
            task: task.to_string(),
        })),
        TaskStage::Created | TaskStage::Started | TaskStage::Unknown => None,
    }
}
