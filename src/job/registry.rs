//! Registry of live jobs.
//!
//! The registry is the only mutable structure shared between jobs and the
//! host. Every operation takes the same lock, and operations on unknown ids
//! are silent no-ops: a job may be removed between the moment an event is
//! emitted and the moment it is applied.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

use super::{JobHandle, JobStatus, ViewHandle};
use crate::error::{Result, ShellError};
use crate::events::ShellEvent;
use crate::runtime::EventSink;

/// Snapshot of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub command: String,
    pub status: JobStatus,
    pub has_view: bool,
}

struct Entry {
    handle: JobHandle,
    /// Last status the host acknowledged.
    status: JobStatus,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

#[derive(Default)]
pub struct JobRegistry {
    inner: Mutex<Inner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `handle` under its id.
    pub fn add(&self, handle: JobHandle) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.entries.contains_key(handle.id()) {
            return Err(ShellError::DuplicateJobId(handle.id().to_string()));
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let status = handle.status();
        inner.entries.insert(
            handle.id().to_string(),
            Entry {
                handle,
                status,
                seq,
            },
        );
        Ok(())
    }

    /// Stop tracking `job_id`. Idempotent.
    pub fn remove(&self, job_id: &str) -> Option<JobHandle> {
        let removed = self.inner.lock().entries.remove(job_id);
        if removed.is_some() {
            tracing::debug!(%job_id, "job removed from registry");
        }
        removed.map(|entry| entry.handle)
    }

    /// Record a status reported by the job. Returns whether the job was known.
    pub fn update_status(&self, job_id: &str, status: JobStatus) -> bool {
        match self.inner.lock().entries.get_mut(job_id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => {
                tracing::debug!(%job_id, %status, "status update for unknown job ignored");
                false
            }
        }
    }

    /// Surface the live view of `job_id` to the host. No-op when the job is
    /// unknown or has no view.
    pub fn attach_view(&self, job_id: &str, sink: &dyn EventSink) -> Option<ViewHandle> {
        let view = self.get(job_id)?.view()?;
        if let Err(e) = sink.emit(ShellEvent::AttachView {
            job_id: job_id.to_string(),
            view: view.clone(),
        }) {
            tracing::warn!(%job_id, "failed to surface view: {}", e);
        }
        Some(view)
    }

    /// Request cancellation of `job_id`. Returns whether a job was signalled.
    pub fn kill(&self, job_id: &str) -> bool {
        match self.get(job_id) {
            Some(handle) => {
                tracing::debug!(%job_id, "cancellation requested");
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Forward input to the interactive view of `job_id`.
    pub fn send_input(&self, job_id: &str, data: Vec<u8>) -> Result<()> {
        let view = self
            .get(job_id)
            .and_then(|handle| handle.view())
            .ok_or_else(|| ShellError::InvalidArgument(format!("job {} has no view", job_id)))?;
        view.send_input(data)?;
        Ok(())
    }

    pub fn get(&self, job_id: &str) -> Option<JobHandle> {
        self.inner
            .lock()
            .entries
            .get(job_id)
            .map(|entry| entry.handle.clone())
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.inner.lock().entries.contains_key(job_id)
    }

    /// Last acknowledged status of `job_id`.
    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.inner.lock().entries.get(job_id).map(|entry| entry.status)
    }

    /// Live ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.list().into_iter().map(|summary| summary.id).collect()
    }

    /// Live jobs in insertion order.
    pub fn list(&self) -> Vec<JobSummary> {
        let inner = self.inner.lock();
        let mut entries: Vec<&Entry> = inner.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
            .into_iter()
            .map(|entry| JobSummary {
                id: entry.handle.id().to_string(),
                command: entry.handle.command().to_string(),
                status: entry.status,
                has_view: entry.handle.view().is_some(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Host acknowledgement of a job event: status changes are recorded and
    /// `Finish` removes the job.
    pub fn apply(&self, event: &ShellEvent) {
        match event {
            ShellEvent::StatusChange { job_id, status } => {
                self.update_status(job_id, *status);
            }
            ShellEvent::Finish { job_id } => {
                self.remove(job_id);
            }
            _ => {}
        }
    }
}
