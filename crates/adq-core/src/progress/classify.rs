//! Line classification for extractor output.
//!
//! Priority: bare absolute path (final file) > `[download]` status line >
//! any bare percentage. Fields that fail to match are left as `None`;
//! partial lines are normal.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::job::{Job, JobStatus};

const DOWNLOAD_TAG: &str = "[download]";

/// Fields parsed from one `[download]` status line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DownloadLine {
    pub percent: Option<f64>,
    pub total: Option<String>,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

/// What a single output line tells us about the job.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Final resolved file path printed after post-processing.
    OutputPath(PathBuf),
    Download(DownloadLine),
    /// Untagged line carrying a percentage.
    Percent(f64),
}

struct Patterns {
    percent: Regex,
    total: Regex,
    speed: Regex,
    eta: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        percent: Regex::new(r"(\d+(?:\.\d+)?)%").expect("percent regex"),
        total: Regex::new(r"(?i)\bof\s+~?\s*(\S+)\s+at\b").expect("total regex"),
        speed: Regex::new(r"(?i)\bat\s+(\S+)\s+ETA\b").expect("speed regex"),
        eta: Regex::new(r"(?i)\bETA\s+([0-9:]+)").expect("eta regex"),
    })
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn percent_in(line: &str) -> Option<f64> {
    capture(&patterns().percent, line).and_then(|s| s.parse::<f64>().ok())
}

/// Classify one complete line. Returns `None` for lines that carry nothing.
pub fn classify_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if Path::new(line).is_absolute() {
        return Some(ProgressEvent::OutputPath(PathBuf::from(line)));
    }

    if line.starts_with(DOWNLOAD_TAG) {
        let p = patterns();
        return Some(ProgressEvent::Download(DownloadLine {
            percent: percent_in(line),
            total: capture(&p.total, line),
            speed: capture(&p.speed, line),
            eta: capture(&p.eta, line),
        }));
    }

    percent_in(line).map(ProgressEvent::Percent)
}

impl ProgressEvent {
    /// Apply to a downloading job. Returns true if any field was written.
    /// Jobs in any other state are left untouched.
    pub fn apply(&self, job: &mut Job) -> bool {
        if job.status != JobStatus::Downloading {
            return false;
        }
        match self {
            ProgressEvent::OutputPath(path) => {
                job.output_path = path.clone();
                true
            }
            ProgressEvent::Download(d) => {
                let mut changed = d.percent.is_some_and(|p| set_percent(job, p));
                if let Some(total) = &d.total {
                    job.progress.total = Some(total.clone());
                    changed = true;
                }
                if let Some(speed) = &d.speed {
                    job.progress.speed = Some(speed.clone());
                    changed = true;
                }
                if let Some(eta) = &d.eta {
                    job.progress.eta = Some(eta.clone());
                    changed = true;
                }
                changed
            }
            ProgressEvent::Percent(p) => set_percent(job, *p),
        }
    }
}

// Percent never moves backwards within a run.
fn set_percent(job: &mut Job, percent: f64) -> bool {
    let percent = percent.clamp(0.0, 100.0);
    if percent < job.progress.percent {
        return false;
    }
    job.progress.percent = percent;
    true
}
