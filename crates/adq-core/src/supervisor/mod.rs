//! Extractor process supervision.
//!
//! One process per job. The supervisor owns the child handle and both
//! output pipes for the lifetime of the run, feeds the output through the
//! progress parser, and reports the exit back through a [`JobSink`] only
//! after both streams are fully drained.

mod args;
mod run;

pub use args::{build_args, FILEPATH_TRAILER, OUTPUT_TEMPLATE};

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::oneshot;

use crate::job::{Job, JobId};
use crate::progress::ProgressEvent;

/// Locations of the external binaries. How they are found is the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorPaths {
    pub extractor: PathBuf,
    pub encoder: PathBuf,
}

/// Outcome of one extractor run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExitReport {
    /// `None` when the process was ended by a signal or could not be waited on.
    pub code: Option<i32>,
    /// Everything the process wrote to standard error.
    pub stderr: String,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// The extractor binary could not be launched.
#[derive(Debug, thiserror::Error)]
#[error("failed to launch extractor {}: {source}", program.display())]
pub struct SpawnError {
    pub program: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Receiver of per-job process events (implemented by the queue engine).
pub trait JobSink: Send + Sync + 'static {
    /// A classified output line from either stream.
    fn on_progress(&self, id: JobId, event: ProgressEvent);

    /// The process exited and its streams are closed.
    fn on_exit(self: Arc<Self>, id: JobId, report: ExitReport);
}

/// Handle to a live extractor process.
#[derive(Debug)]
pub struct RunningProcess {
    job_id: JobId,
    terminate: Option<oneshot::Sender<()>>,
}

impl RunningProcess {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Ask the process to stop with a graceful termination signal.
    /// Returns immediately; the exit still arrives through [`JobSink::on_exit`].
    /// Only the first request has any effect.
    pub fn terminate(&mut self) -> bool {
        match self.terminate.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Launch the extractor for `job` and start supervising it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_job<S: JobSink>(
    paths: &ExtractorPaths,
    job: &Job,
    sink: Arc<S>,
) -> Result<RunningProcess, SpawnError> {
    let args = build_args(job, &paths.encoder);
    tracing::info!(
        job_id = %job.id,
        extractor = %paths.extractor.display(),
        args = args.len(),
        "starting extractor"
    );

    let mut cmd = Command::new(&paths.extractor);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // Own process group: a terminal Ctrl-C reaches the front end only, and
    // termination goes to the extractor and its transcoder together.
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd
        .spawn()
        .map_err(|source| SpawnError {
            program: paths.extractor.clone(),
            source,
        })?;

    let (tx, rx) = oneshot::channel();
    tokio::spawn(run::supervise(child, job.id, sink, rx));

    Ok(RunningProcess {
        job_id: job.id,
        terminate: Some(tx),
    })
}
