//! The shared queue handle: one critical section around the job collection,
//! the active id and the live process slot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::admission::{AdmissionError, PlanTier, TierLimits};
use crate::job::{Job, JobId, JobOptions, QueueSnapshot};
use crate::progress::ProgressEvent;
use crate::supervisor::{self, ExitReport, ExtractorPaths, JobSink, RunningProcess};

use super::state::{CancelOutcome, QueueState};

/// Receives a full snapshot after every mutation, synchronously and in order.
///
/// Called with the queue lock held: it must not block and must not call
/// back into the queue.
pub type QueueListener = Box<dyn Fn(&QueueSnapshot) + Send + Sync>;

/// Single-slot download queue. Cheap to clone; all clones share one queue.
///
/// None of the operations wait for a process. Progress and completion are
/// observed through the listener.
#[derive(Clone)]
pub struct DownloadQueue {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    listener: QueueListener,
    paths: ExtractorPaths,
    runtime: Handle,
    changed: Notify,
}

struct Inner {
    state: QueueState,
    /// Occupied from spawn until the exit is reported, even after a cancel
    /// has released the active id.
    running: Option<RunningProcess>,
}

impl DownloadQueue {
    /// Create an empty queue. Must be called from within a Tokio runtime;
    /// extractor processes are supervised on that runtime.
    pub fn new(
        paths: ExtractorPaths,
        plan: PlanTier,
        limits: TierLimits,
        listener: impl Fn(&QueueSnapshot) + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: QueueState::new(plan, limits),
                    running: None,
                }),
                listener: Box::new(listener),
                paths,
                runtime: Handle::current(),
                changed: Notify::new(),
            }),
        }
    }

    /// Admit a new job and start it if the slot is free.
    /// On denial the queue is left unmodified.
    pub fn add(&self, url: &str, options: JobOptions) -> Result<Job, AdmissionError> {
        let mut inner = self.shared.lock();
        let job = match inner.state.admit(url, options) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(limit = e.limit, current = e.current, url = %url.trim(), "admission denied");
                return Err(e);
            }
        };
        tracing::debug!(job_id = %job.id, url = %job.url, "job added");
        self.shared.publish(&inner);
        if inner.state.active_id().is_none() {
            self.shared.start_next(&mut inner);
        }
        Ok(job)
    }

    /// Cancel a pending or downloading job. The active job is marked
    /// canceled first, then its process is asked to terminate.
    pub fn cancel(&self, id: &JobId) {
        let mut inner = self.shared.lock();
        self.shared.cancel_locked(&mut inner, id);
    }

    /// Remove a job, canceling it first if it is the active one.
    pub fn remove(&self, id: &JobId) {
        let mut inner = self.shared.lock();
        if inner.state.job(id).is_none() {
            return;
        }
        if inner.state.active_id().as_ref() == Some(id) {
            self.shared.cancel_locked(&mut inner, id);
        }
        inner.state.delete(id);
        tracing::debug!(job_id = %id, "job removed");
        self.shared.publish(&inner);
    }

    /// Put a finished job back in the queue at its original position.
    /// Jobs that are pending or downloading and unknown ids are ignored.
    pub fn retry(&self, id: &JobId) -> Result<(), AdmissionError> {
        let mut inner = self.shared.lock();
        match inner.state.retry(id) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                tracing::warn!(job_id = %id, limit = e.limit, current = e.current, "retry denied");
                return Err(e);
            }
        }
        tracing::debug!(job_id = %id, "job requeued");
        self.shared.publish(&inner);
        if inner.state.active_id().is_none() {
            self.shared.start_next(&mut inner);
        }
        Ok(())
    }

    /// Drop all completed, failed and canceled jobs. Notifies once.
    pub fn clear_finished(&self) {
        let mut inner = self.shared.lock();
        let cleared = inner.state.clear_finished();
        tracing::debug!(cleared, "cleared finished jobs");
        self.shared.publish(&inner);
    }

    /// Switch plan tier for future admissions; queued jobs are kept.
    pub fn set_plan(&self, plan: PlanTier) {
        let mut inner = self.shared.lock();
        inner.state.set_plan(plan);
        tracing::info!(plan = %plan, "plan tier changed");
        self.shared.publish(&inner);
    }

    pub fn plan(&self) -> PlanTier {
        self.shared.lock().state.plan()
    }

    pub fn get_state(&self) -> QueueSnapshot {
        self.shared.lock().state.snapshot()
    }

    /// True when nothing is running and nothing is waiting to run.
    pub fn is_idle(&self) -> bool {
        let inner = self.shared.lock();
        inner.running.is_none() && !inner.state.has_pending()
    }

    /// Resolve once the backlog is drained and no extractor is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        (self.listener)(&inner.state.snapshot());
        self.changed.notify_waiters();
    }

    fn cancel_locked(&self, inner: &mut Inner, id: &JobId) {
        match inner.state.cancel(id) {
            CancelOutcome::Ignored => {}
            CancelOutcome::Pending => {
                tracing::info!(job_id = %id, "pending job canceled");
                self.publish(inner);
            }
            CancelOutcome::Active => {
                tracing::info!(job_id = %id, "active job canceled");
                self.publish(inner);
                if let Some(proc) = inner.running.as_mut().filter(|p| &p.job_id() == id) {
                    proc.terminate();
                }
            }
        }
    }

    /// Move the first pending job into the slot and launch it. A launch
    /// failure fails that job and moves on to the next one.
    fn start_next(self: &Arc<Self>, inner: &mut Inner) {
        let _rt = self.runtime.enter();
        loop {
            if inner.running.is_some() {
                return;
            }
            let Some(job) = inner.state.claim_next() else {
                return;
            };
            self.publish(inner);

            match supervisor::spawn_job(&self.paths, &job, Arc::clone(self)) {
                Ok(proc) => {
                    inner.running = Some(proc);
                    return;
                }
                Err(e) => {
                    tracing::warn!(job_id = %job.id, "{}", e);
                    inner.state.fail_spawn(&job.id, e.to_string());
                    self.publish(inner);
                }
            }
        }
    }
}

impl JobSink for Shared {
    fn on_progress(&self, id: JobId, event: ProgressEvent) {
        let mut inner = self.lock();
        if inner.state.record_progress(&id, &event) {
            self.publish(&inner);
        }
    }

    fn on_exit(self: Arc<Self>, id: JobId, report: ExitReport) {
        let mut inner = self.lock();
        if inner.running.as_ref().is_some_and(|p| p.job_id() == id) {
            inner.running = None;
        }
        let status = inner.state.finish(&id, &report);
        tracing::info!(job_id = %id, code = ?report.code, status = ?status, "job finished");
        self.publish(&inner);
        self.start_next(&mut inner);
    }
}
