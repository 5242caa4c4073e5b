//! Jobs: one cancellable asynchronous execution of a command.
//!
//! A [`Job`] is created `Pending` by a command and started by the dispatcher.
//! Starting emits `Start`, spawns the [`JobBody`] on the tokio runtime and,
//! once the body is over, emits `Finish` exactly once, whatever happened
//! inside: success, error, panic or cancellation.
//!
//! ```text
//! Pending --> Running --> Completed
//!    |           |------> Cancelled
//!    +-----------+------> Error
//! ```
//!
//! Cancellation is cooperative. `JobHandle::cancel` trips the job's
//! `CancellationToken`; the body notices at its next suspension point and
//! returns, at which point the job settles as `Cancelled`.

pub mod id;
pub mod registry;
mod view;

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ShellError};
use crate::events::{Screen, Severity, ShellEvent};
use crate::runtime::EventSink;

pub use registry::{JobRegistry, JobSummary};
pub use view::ViewHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Cancelled,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Cancelled | JobStatus::Completed | JobStatus::Error
        )
    }

    /// Legal moves of the state machine. Terminal states are final.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => next != JobStatus::Pending,
            JobStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Completed => "Completed",
            JobStatus::Error => "Error",
        };
        f.write_str(label)
    }
}

/// The work a job performs.
///
/// Implementations move the job to `Running` before long-lived work and to a
/// terminal status before returning. Returning `Err` settles the job as
/// `Error` with the error logged.
#[async_trait]
pub trait JobBody: Send + 'static {
    async fn execute(&mut self, ctx: &JobContext) -> anyhow::Result<()>;
}

struct JobShared {
    id: String,
    command: String,
    status: Mutex<JobStatus>,
    cancel: CancellationToken,
    view: Mutex<Option<ViewHandle>>,
    created_at: DateTime<Utc>,
}

/// Shared, cloneable reference to a job. Held by the registry, carried by the
/// `Start` event and used to request cancellation.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<JobShared>,
}

impl JobHandle {
    fn new(id: String, command: String) -> Self {
        Self {
            inner: Arc::new(JobShared {
                id,
                command,
                status: Mutex::new(JobStatus::Pending),
                cancel: CancellationToken::new(),
                view: Mutex::new(None),
                created_at: Utc::now(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Name of the command that created the job.
    pub fn command(&self) -> &str {
        &self.inner.command
    }

    pub fn status(&self) -> JobStatus {
        *self.inner.status.lock()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Request cancellation. The body decides when to honour it.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// The view the job currently exposes, if any.
    pub fn view(&self) -> Option<ViewHandle> {
        self.inner.view.lock().clone()
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.inner.id)
            .field("command", &self.inner.command)
            .field("status", &self.status())
            .field("is_cancelled", &self.is_cancel_requested())
            .finish_non_exhaustive()
    }
}

impl Serialize for JobHandle {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("JobHandle", 4)?;
        state.serialize_field("id", self.id())?;
        state.serialize_field("command", self.command())?;
        state.serialize_field("status", &self.status())?;
        state.serialize_field("created_at", &self.created_at())?;
        state.end()
    }
}

/// A pending job: its identity plus the body to run.
pub struct Job {
    handle: JobHandle,
    body: Box<dyn JobBody>,
}

impl Job {
    pub fn new(id: impl Into<String>, command: impl Into<String>, body: impl JobBody) -> Self {
        Self {
            handle: JobHandle::new(id.into(), command.into()),
            body: Box::new(body),
        }
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }

    pub fn status(&self) -> JobStatus {
        self.handle.status()
    }

    pub fn handle(&self) -> JobHandle {
        self.handle.clone()
    }

    /// Emit `Start`, run the body on `runtime` and emit `Finish` when it is
    /// over. Returns the task handle; dropping it does not cancel the job.
    pub fn start(self, sink: Arc<dyn EventSink>, runtime: &Handle) -> JoinHandle<()> {
        let Job { handle, mut body } = self;
        let ctx = JobContext {
            handle: handle.clone(),
            sink,
        };

        tracing::debug!(job_id = %handle.id(), "starting job");
        ctx.emit(ShellEvent::Start { job: handle });

        runtime.spawn(async move {
            let outcome = AssertUnwindSafe(body.execute(&ctx)).catch_unwind().await;
            ctx.settle(outcome);
            drop(body);
            tracing::debug!(job_id = %ctx.id(), status = %ctx.status(), "job finished");
            ctx.emit(ShellEvent::Finish {
                job_id: ctx.id().to_string(),
            });
        })
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("handle", &self.handle).finish()
    }
}

/// What a running body sees: its identity, the event sink and its
/// cancellation signal.
pub struct JobContext {
    handle: JobHandle,
    sink: Arc<dyn EventSink>,
}

impl JobContext {
    pub fn id(&self) -> &str {
        self.handle.id()
    }

    pub fn command(&self) -> &str {
        self.handle.command()
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    pub fn status(&self) -> JobStatus {
        self.handle.status()
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Forward an event to the host. A closed host is not the job's problem.
    pub fn emit(&self, event: ShellEvent) {
        if let Err(e) = self.sink.emit(event) {
            tracing::debug!(job_id = %self.id(), "dropping event: {}", e);
        }
    }

    /// Move to `next` and announce it.
    pub fn set_status(&self, next: JobStatus) -> Result<()> {
        let mut status = self.handle.inner.status.lock();
        let from = *status;
        if !from.can_transition_to(next) {
            tracing::warn!(job_id = %self.id(), %from, to = %next, "illegal status transition");
            return Err(ShellError::InvalidTransition {
                job_id: self.id().to_string(),
                from,
                to: next,
            });
        }
        *status = next;
        // Emitted under the lock so status events keep their order
        self.emit(ShellEvent::StatusChange {
            job_id: self.id().to_string(),
            status: next,
        });
        Ok(())
    }

    pub fn running(&self) -> Result<()> {
        self.set_status(JobStatus::Running)
    }

    pub fn completed(&self) -> Result<()> {
        self.set_status(JobStatus::Completed)
    }

    pub fn cancelled(&self) -> Result<()> {
        self.set_status(JobStatus::Cancelled)
    }

    /// Log `message` as an error and settle the job as `Error`.
    pub fn fail(&self, message: impl Into<String>) -> Result<()> {
        self.log(message, Severity::Error);
        self.set_status(JobStatus::Error)
    }

    pub fn log(&self, message: impl Into<String>, severity: Severity) {
        self.emit(ShellEvent::log(self.command(), message, severity));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(message, Severity::Debug);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(message, Severity::Info);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(message, Severity::Warning);
    }

    pub fn push_screen(&self, screen: Screen) {
        self.emit(ShellEvent::PushScreen { screen });
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.handle.inner.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancel_requested()
    }

    /// Suspend until cancellation is requested.
    pub async fn wait_for_cancel(&self) {
        self.handle.inner.cancel.cancelled().await;
    }

    /// Expose `view` through the job's handle.
    pub fn attach_view(&self, view: ViewHandle) {
        *self.handle.inner.view.lock() = Some(view);
    }

    /// Withdraw the job's view. Must happen before a cancelled job settles.
    pub fn release_view(&self) -> Option<ViewHandle> {
        self.handle.inner.view.lock().take()
    }

    /// Bring the job to a terminal status after its body returned.
    fn settle(&self, outcome: std::thread::Result<anyhow::Result<()>>) {
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{:#}", e)),
            Err(panic) => Some(format!("job panicked: {}", panic_message(&*panic))),
        };

        // A body never outlives its view
        self.release_view();

        if let Some(message) = failure {
            tracing::error!(job_id = %self.id(), "{}", message);
            self.log(message, Severity::Error);
            if !self.status().is_terminal() {
                let _ = self.set_status(JobStatus::Error);
            }
            return;
        }

        if self.status().is_terminal() {
            return;
        }

        if self.is_cancelled() {
            let _ = self.set_status(JobStatus::Cancelled);
        } else {
            let _ = self.fail(format!(
                "job {} returned without reaching a terminal status",
                self.id()
            ));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
