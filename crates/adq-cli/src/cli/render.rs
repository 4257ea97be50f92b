//! Turns queue snapshots into stdout lines: one line per status change and
//! throttled progress lines for the downloading job.

use adq_core::job::{Job, JobId, JobStatus, QueueSnapshot};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// First eight characters of the id; enough to address a job in the shell.
pub fn short_id(id: &JobId) -> String {
    id.to_string().chars().take(8).collect()
}

pub struct Renderer {
    json: bool,
    seen: HashMap<JobId, (JobStatus, String)>,
    last_progress: HashMap<JobId, (Instant, f64)>,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            seen: HashMap::new(),
            last_progress: HashMap::new(),
        }
    }

    /// Lines to print for this snapshot.
    pub fn lines(&mut self, snap: &QueueSnapshot, now: Instant) -> Vec<String> {
        if self.json {
            return match serde_json::to_string(snap) {
                Ok(line) => vec![line],
                Err(e) => {
                    tracing::warn!("serialize snapshot: {}", e);
                    Vec::new()
                }
            };
        }

        let mut out = Vec::new();
        for job in &snap.jobs {
            let prev = self.seen.insert(job.id, (job.status, job.url.clone()));
            if prev.as_ref().map(|(s, _)| *s) != Some(job.status) {
                out.push(status_line(job));
            }
            if job.status == JobStatus::Downloading {
                if let Some(line) = self.progress(job, now) {
                    out.push(line);
                }
            } else {
                self.last_progress.remove(&job.id);
            }
        }

        let gone: Vec<JobId> = self
            .seen
            .keys()
            .filter(|id| snap.job(id).is_none())
            .copied()
            .collect();
        for id in gone {
            if let Some((_, url)) = self.seen.remove(&id) {
                out.push(format!("removed   {} {}", short_id(&id), url));
            }
            self.last_progress.remove(&id);
        }
        out
    }

    fn progress(&mut self, job: &Job, now: Instant) -> Option<String> {
        let pct = job.progress.percent;
        let due = match self.last_progress.get(&job.id) {
            None => pct > 0.0,
            Some((at, last)) => {
                pct != *last && (now.duration_since(*at) >= PROGRESS_INTERVAL || pct >= 100.0)
            }
        };
        if !due {
            return None;
        }
        self.last_progress.insert(job.id, (now, pct));
        Some(progress_line(job))
    }
}

pub fn status_line(job: &Job) -> String {
    let id = short_id(&job.id);
    match job.status {
        JobStatus::Pending => format!("queued    {} {}", id, job.url),
        JobStatus::Downloading => format!("started   {} {}", id, job.url),
        JobStatus::Completed => format!("done      {} {}", id, job.output_path.display()),
        JobStatus::Failed => {
            let reason = job.error.lines().last().unwrap_or("unknown error");
            format!("failed    {} {}: {}", id, job.url, reason)
        }
        JobStatus::Canceled => format!("canceled  {} {}", id, job.url),
        JobStatus::Skipped => format!("skipped   {} {}", id, job.url),
    }
}

pub fn progress_line(job: &Job) -> String {
    let p = &job.progress;
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "?".to_string());
    format!(
        "  {} {:5.1}%  of {}  at {}  ETA {}",
        short_id(&job.id),
        p.percent,
        field(&p.total),
        field(&p.speed),
        field(&p.eta)
    )
}

/// Table for the shell's `status` command.
pub fn status_table(snap: &QueueSnapshot) -> Vec<String> {
    if snap.jobs.is_empty() {
        return vec!["No jobs in queue.".to_string()];
    }
    let mut out = vec![format!(
        "{:<8} {:<12} {:>6} {}",
        "ID", "STATUS", "PCT", "URL"
    )];
    for j in &snap.jobs {
        let marker = if snap.active_id == Some(j.id) { "*" } else { "" };
        out.push(format!(
            "{:<8} {:<12} {:>5.1}% {}",
            short_id(&j.id),
            format!("{}{}", j.status, marker),
            j.progress.percent,
            j.url
        ));
    }
    out
}
