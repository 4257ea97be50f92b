//! Types describing a job and the externally observable queue state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Opaque job identifier, generated at admission and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub uuid::Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim()).map(JobId)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Canceled,
    /// Reserved; the queue never produces it.
    Skipped,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
            JobStatus::Skipped => "skipped",
        }
    }

    /// Pending and downloading jobs count against the plan limit.
    pub fn is_queued(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Downloading)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_queued()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target audio encoding passed to the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    Flac,
}

impl AudioFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "opus" => Ok(AudioFormat::Opus),
            "flac" => Ok(AudioFormat::Flac),
            other => Err(format!("unsupported audio format: {other} (expected mp3, opus or flac)")),
        }
    }
}

/// Per-job options supplied by the caller (usually resolved from config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub output_dir: PathBuf,
    pub audio_format: AudioFormat,
    pub embed_metadata: bool,
    pub embed_thumbnail: bool,
    /// Let the extractor expand playlist URLs into multiple items.
    pub allow_playlists: bool,
}

/// Last observed progress values. Each optional field keeps its previous
/// value until a new one is parsed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobProgress {
    /// 0–100, non-decreasing while downloading.
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

/// One download request and its evolving state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub status: JobStatus,
    pub progress: JobProgress,
    /// Starts as the output directory; replaced by the extractor's final file path.
    pub output_path: PathBuf,
    /// Empty unless the job failed.
    pub error: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub options: JobOptions,
}

impl Job {
    /// New pending job; the URL is trimmed of surrounding whitespace.
    pub fn new(url: &str, options: JobOptions) -> Self {
        Self {
            id: JobId::new(),
            url: url.trim().to_string(),
            status: JobStatus::Pending,
            progress: JobProgress::default(),
            output_path: options.output_dir.clone(),
            error: String::new(),
            created_at: super::now_unix_ms(),
            started_at: None,
            finished_at: None,
            options,
        }
    }

    /// Back to pending with progress, error and run timestamps cleared.
    pub(crate) fn reset_for_retry(&mut self) {
        self.status = JobStatus::Pending;
        self.progress = JobProgress::default();
        self.error.clear();
        self.started_at = None;
        self.finished_at = None;
    }
}

/// Full ordered job collection plus the active job, pushed to listeners on every mutation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub jobs: Vec<Job>,
    pub active_id: Option<JobId>,
}

impl QueueSnapshot {
    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    /// Number of jobs that count against the plan limit.
    pub fn queued_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.status.is_queued()).count()
    }
}
