//! Queue state and its transitions, free of locking and processes.
//!
//! [`super::DownloadQueue`] wraps this in its critical section and adds
//! notification and process control around each transition.

use crate::admission::{AdmissionError, PlanTier, TierLimits};
use crate::job::{now_unix_ms, Job, JobId, JobOptions, JobStatus, QueueSnapshot};
use crate::progress::ProgressEvent;
use crate::supervisor::ExitReport;

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Unknown id, or the job was already finished.
    Ignored,
    /// A pending job was canceled; no process involved.
    Pending,
    /// The active job was canceled; its process must be terminated.
    Active,
}

#[derive(Debug, Clone, Default)]
pub struct QueueState {
    jobs: Vec<Job>,
    active_id: Option<JobId>,
    plan: PlanTier,
    limits: TierLimits,
}

impl QueueState {
    pub fn new(plan: PlanTier, limits: TierLimits) -> Self {
        Self {
            jobs: Vec::new(),
            active_id: None,
            plan,
            limits,
        }
    }

    pub fn plan(&self) -> PlanTier {
        self.plan
    }

    pub fn set_plan(&mut self, plan: PlanTier) {
        self.plan = plan;
    }

    pub fn active_id(&self) -> Option<JobId> {
        self.active_id
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    fn job_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| &j.id == id)
    }

    pub fn queued_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.status.is_queued()).count()
    }

    pub fn has_pending(&self) -> bool {
        self.jobs.iter().any(|j| j.status == JobStatus::Pending)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            jobs: self.jobs.clone(),
            active_id: self.active_id,
        }
    }

    /// Check admission against the current queued count, then append a pending job.
    pub fn admit(&mut self, url: &str, options: JobOptions) -> Result<Job, AdmissionError> {
        self.limits.check(self.plan, self.queued_count())?;
        let job = Job::new(url, options);
        self.jobs.push(job.clone());
        Ok(job)
    }

    /// Claim the first pending job (collection order) for the active slot.
    pub fn claim_next(&mut self) -> Option<Job> {
        if self.active_id.is_some() {
            return None;
        }
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.status == JobStatus::Pending)?;
        job.status = JobStatus::Downloading;
        job.started_at = Some(now_unix_ms());
        self.active_id = Some(job.id);
        Some(job.clone())
    }

    /// Mark a queued job canceled. The active id is released at once so the
    /// snapshot never shows an active job that is not downloading.
    pub fn cancel(&mut self, id: &JobId) -> CancelOutcome {
        let is_active = self.active_id.as_ref() == Some(id);
        let Some(job) = self.job_mut(id) else {
            return CancelOutcome::Ignored;
        };
        if job.status.is_terminal() {
            return CancelOutcome::Ignored;
        }
        job.status = JobStatus::Canceled;
        job.finished_at = Some(now_unix_ms());
        if is_active {
            self.active_id = None;
            CancelOutcome::Active
        } else {
            CancelOutcome::Pending
        }
    }

    /// Delete a record. Returns false for an unknown id.
    pub fn delete(&mut self, id: &JobId) -> bool {
        let Some(idx) = self.jobs.iter().position(|j| &j.id == id) else {
            return false;
        };
        self.jobs.remove(idx);
        if self.active_id.as_ref() == Some(id) {
            self.active_id = None;
        }
        true
    }

    /// Reset a finished job to pending in place. `Ok(false)` for unknown ids
    /// and for jobs that are still queued; the job is untouched on denial.
    pub fn retry(&mut self, id: &JobId) -> Result<bool, AdmissionError> {
        match self.job(id) {
            Some(job) if job.status.is_terminal() => {}
            _ => return Ok(false),
        }
        self.limits.check(self.plan, self.queued_count())?;
        if let Some(job) = self.job_mut(id) {
            job.reset_for_retry();
        }
        Ok(true)
    }

    /// Drop every finished record, keeping queued ones in order. Returns how many went.
    pub fn clear_finished(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.status.is_queued());
        before - self.jobs.len()
    }

    /// Apply a parsed output event to a downloading job.
    pub fn record_progress(&mut self, id: &JobId, event: &ProgressEvent) -> bool {
        self.job_mut(id).is_some_and(|job| event.apply(job))
    }

    /// Finalize a run. Only a job still downloading is changed; a canceled
    /// job stays canceled whatever the exit code. Returns the new status.
    pub fn finish(&mut self, id: &JobId, report: &ExitReport) -> Option<JobStatus> {
        if self.active_id.as_ref() == Some(id) {
            self.active_id = None;
        }
        let job = self.job_mut(id)?;
        if job.status != JobStatus::Downloading {
            return None;
        }
        if report.success() {
            job.status = JobStatus::Completed;
        } else {
            job.status = JobStatus::Failed;
            job.error = report.stderr.trim().to_string();
        }
        job.finished_at = Some(now_unix_ms());
        Some(job.status)
    }

    /// The extractor could not be started for the claimed job.
    pub fn fail_spawn(&mut self, id: &JobId, message: String) {
        if self.active_id.as_ref() == Some(id) {
            self.active_id = None;
        }
        if let Some(job) = self.job_mut(id) {
            job.status = JobStatus::Failed;
            job.error = message;
            job.finished_at = Some(now_unix_ms());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::AudioFormat;
    use std::path::PathBuf;

    fn options() -> JobOptions {
        JobOptions {
            output_dir: PathBuf::from("/out"),
            audio_format: AudioFormat::Mp3,
            embed_metadata: true,
            embed_thumbnail: true,
            allow_playlists: false,
        }
    }

    fn state(free: usize) -> QueueState {
        QueueState::new(PlanTier::Free, TierLimits { free, pro: 100 })
    }

    fn exit(code: Option<i32>, stderr: &str) -> ExitReport {
        ExitReport {
            code,
            stderr: stderr.to_string(),
        }
    }

    fn status_of(s: &QueueState, id: &JobId) -> JobStatus {
        s.job(id).unwrap().status
    }

    #[test]
    fn admission_limit_counts_only_queued_jobs() {
        let mut s = state(2);
        let a = s.admit("https://a", options()).unwrap();
        s.admit("https://b", options()).unwrap();
        let err = s.admit("https://c", options()).unwrap_err();
        assert_eq!((err.limit, err.current), (2, 2));
        assert_eq!(s.jobs().len(), 2);

        assert_eq!(s.cancel(&a.id), CancelOutcome::Pending);
        s.admit("https://c", options()).unwrap();
        assert_eq!(s.jobs().len(), 3);
    }

    #[test]
    fn claim_next_is_fifo_and_sets_active() {
        let mut s = state(10);
        let a = s.admit("https://a", options()).unwrap();
        let b = s.admit("https://b", options()).unwrap();

        let claimed = s.claim_next().unwrap();
        assert_eq!(claimed.id, a.id);
        assert_eq!(claimed.status, JobStatus::Downloading);
        assert!(claimed.started_at.is_some());
        assert_eq!(s.active_id(), Some(a.id));

        s.finish(&a.id, &exit(Some(0), ""));
        assert_eq!(s.active_id(), None);
        assert_eq!(s.claim_next().unwrap().id, b.id);
        s.finish(&b.id, &exit(Some(0), ""));
        assert!(s.claim_next().is_none());
    }

    #[test]
    fn failure_captures_trimmed_stderr() {
        let mut s = state(10);
        let a = s.admit("https://a", options()).unwrap();
        s.claim_next();
        assert_eq!(
            s.finish(&a.id, &exit(Some(1), "\nERROR: unsupported URL\n")),
            Some(JobStatus::Failed)
        );
        let job = s.job(&a.id).unwrap();
        assert_eq!(job.error, "ERROR: unsupported URL");
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn canceled_active_job_survives_any_exit_code() {
        for code in [Some(0), Some(1), None] {
            let mut s = state(10);
            let a = s.admit("https://a", options()).unwrap();
            s.claim_next();
            assert_eq!(s.cancel(&a.id), CancelOutcome::Active);
            assert_eq!(s.active_id(), None);
            let finished_at = s.job(&a.id).unwrap().finished_at;

            assert_eq!(s.finish(&a.id, &exit(code, "killed")), None);
            let job = s.job(&a.id).unwrap();
            assert_eq!(job.status, JobStatus::Canceled);
            assert!(job.error.is_empty());
            assert_eq!(job.finished_at, finished_at);
        }
    }

    #[test]
    fn cancel_terminal_or_unknown_is_ignored() {
        let mut s = state(10);
        let a = s.admit("https://a", options()).unwrap();
        s.claim_next();
        s.finish(&a.id, &exit(Some(0), ""));
        assert_eq!(s.cancel(&a.id), CancelOutcome::Ignored);
        assert_eq!(status_of(&s, &a.id), JobStatus::Completed);
        assert_eq!(s.cancel(&JobId::new()), CancelOutcome::Ignored);
    }

    #[test]
    fn retry_resets_in_place_and_rechecks_limit() {
        let mut s = state(1);
        let a = s.admit("https://a", options()).unwrap();
        s.claim_next();
        s.record_progress(&a.id, &ProgressEvent::Percent(40.0));
        s.finish(&a.id, &exit(Some(2), "boom"));
        let b = s.admit("https://b", options()).unwrap();

        // b occupies the only slot.
        let err = s.retry(&a.id).unwrap_err();
        assert_eq!((err.limit, err.current), (1, 1));
        assert_eq!(status_of(&s, &a.id), JobStatus::Failed);
        assert_eq!(s.job(&a.id).unwrap().error, "boom");

        s.cancel(&b.id);
        assert_eq!(s.retry(&a.id), Ok(true));
        let job = s.job(&a.id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress.percent, 0.0);
        assert!(job.error.is_empty());
        assert!(job.started_at.is_none() && job.finished_at.is_none());
        // Original position, ahead of b.
        assert_eq!(s.jobs()[0].id, a.id);
    }

    #[test]
    fn retry_of_queued_or_unknown_is_noop() {
        let mut s = state(10);
        let a = s.admit("https://a", options()).unwrap();
        assert_eq!(s.retry(&a.id), Ok(false));
        s.claim_next();
        assert_eq!(s.retry(&a.id), Ok(false));
        assert_eq!(s.retry(&JobId::new()), Ok(false));
        assert_eq!(status_of(&s, &a.id), JobStatus::Downloading);
    }

    #[test]
    fn retried_job_waiting_for_dying_process_stays_pending() {
        let mut s = state(10);
        let a = s.admit("https://a", options()).unwrap();
        s.claim_next();
        s.cancel(&a.id);
        assert_eq!(s.retry(&a.id), Ok(true));
        assert_eq!(s.finish(&a.id, &exit(Some(1), "terminated")), None);
        assert_eq!(status_of(&s, &a.id), JobStatus::Pending);
    }

    #[test]
    fn clear_finished_keeps_queued_in_order() {
        let mut s = state(10);
        let ids: Vec<JobId> = (0..5)
            .map(|i| s.admit(&format!("https://{i}"), options()).unwrap().id)
            .collect();
        s.claim_next();
        s.finish(&ids[0], &exit(Some(0), ""));
        s.claim_next();
        s.cancel(&ids[2]);

        assert_eq!(s.clear_finished(), 2);
        let left: Vec<JobId> = s.jobs().iter().map(|j| j.id).collect();
        assert_eq!(left, vec![ids[1], ids[3], ids[4]]);
        assert_eq!(s.clear_finished(), 0);
    }

    #[test]
    fn delete_unknown_is_false() {
        let mut s = state(10);
        let a = s.admit("https://a", options()).unwrap();
        assert!(!s.delete(&JobId::new()));
        assert!(s.delete(&a.id));
        assert!(s.jobs().is_empty());
    }

    #[test]
    fn spawn_failure_marks_failed_and_frees_slot() {
        let mut s = state(10);
        let a = s.admit("https://a", options()).unwrap();
        s.claim_next();
        s.fail_spawn(&a.id, "failed to launch extractor yt-dlp: not found".to_string());
        assert_eq!(s.active_id(), None);
        let job = s.job(&a.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.contains("not found"));
    }
}
