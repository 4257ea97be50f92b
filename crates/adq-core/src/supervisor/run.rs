//! Supervision task: drain both pipes, wait for exit, honor termination requests.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::oneshot;

use crate::job::JobId;
use crate::progress::{classify_line, LineBuffer, ProgressEvent};

use super::{ExitReport, JobSink};

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// The final file path is printed on stdout; a path-like line on
    /// stderr is a diagnostic (e.g. a Python warning) and is dropped.
    fn accepts(self, event: &ProgressEvent) -> bool {
        !(self == Stream::Stderr && matches!(event, ProgressEvent::OutputPath(_)))
    }
}

pub(super) async fn supervise<S: JobSink>(
    mut child: Child,
    id: JobId,
    sink: Arc<S>,
    mut terminate_rx: oneshot::Receiver<()>,
) {
    let stdout = tokio::spawn(drain(child.stdout.take(), id, Arc::clone(&sink), Stream::Stdout));
    let stderr = tokio::spawn(drain(child.stderr.take(), id, Arc::clone(&sink), Stream::Stderr));

    let mut terminating = false;
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            req = &mut terminate_rx, if !terminating => {
                terminating = true;
                // A dropped sender is not a termination request.
                if req.is_ok() {
                    send_terminate(&mut child, id);
                }
            }
        }
    };

    let (_, stderr_text) = tokio::join!(stdout, stderr);
    let stderr_text = stderr_text.unwrap_or_else(|e| {
        tracing::warn!(job_id = %id, "stderr reader task failed: {}", e);
        String::new()
    });

    let code = match status {
        Ok(s) => s.code(),
        Err(e) => {
            tracing::warn!(job_id = %id, "wait on extractor failed: {}", e);
            None
        }
    };
    tracing::debug!(job_id = %id, code = ?code, terminated = terminating, "extractor exited");

    sink.on_exit(id, ExitReport { code, stderr: stderr_text });
}

/// Read a pipe to EOF, forwarding classified lines to `sink`.
/// Returns the raw text of stderr; stdout text is not kept.
async fn drain<R, S>(reader: Option<R>, id: JobId, sink: Arc<S>, stream: Stream) -> String
where
    R: AsyncRead + Unpin + Send + 'static,
    S: JobSink,
{
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut lines = LineBuffer::new();
    let mut kept = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(job_id = %id, "extractor pipe read error: {}", e);
                break;
            }
        };
        if stream == Stream::Stderr {
            kept.extend_from_slice(&chunk[..n]);
        }
        for line in lines.feed(&chunk[..n]) {
            forward(&line, id, &*sink, stream);
        }
    }

    if let Some(line) = lines.finish() {
        forward(&line, id, &*sink, stream);
    }

    String::from_utf8_lossy(&kept).into_owned()
}

fn forward<S: JobSink>(line: &str, id: JobId, sink: &S, stream: Stream) {
    match classify_line(line) {
        Some(event) if stream.accepts(&event) => sink.on_progress(id, event),
        Some(_) => tracing::debug!(job_id = %id, line, "ignoring path-like line on stderr"),
        None => {}
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child, id: JobId) {
    let Some(pid) = child.id() else {
        return;
    };
    // The extractor leads its own process group; signal the whole group.
    let pgid = pid as libc::pid_t;
    let rc = unsafe { libc::kill(-pgid, libc::SIGTERM) };
    if rc == -1 {
        tracing::warn!(
            job_id = %id,
            pid,
            "SIGTERM failed: {}",
            std::io::Error::last_os_error()
        );
    } else {
        tracing::info!(job_id = %id, pid, "sent SIGTERM to extractor process group");
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, id: JobId) {
    match child.start_kill() {
        Ok(()) => tracing::info!(job_id = %id, "requested extractor termination"),
        Err(e) => tracing::warn!(job_id = %id, "terminate extractor: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::DownloadLine;
    use std::path::PathBuf;

    #[cfg(unix)]
    #[test]
    fn stderr_never_sets_output_path() {
        let warning = classify_line(
            "/usr/lib/python3/dist-packages/yt_dlp/utils.py:1: DeprecationWarning: x",
        )
        .unwrap();
        assert!(matches!(warning, ProgressEvent::OutputPath(_)));
        assert!(!Stream::Stderr.accepts(&warning));
        assert!(Stream::Stdout.accepts(&ProgressEvent::OutputPath(PathBuf::from("/m/a.mp3"))));
    }

    #[test]
    fn stderr_still_carries_progress() {
        let line = ProgressEvent::Download(DownloadLine {
            percent: Some(50.0),
            ..DownloadLine::default()
        });
        assert!(Stream::Stderr.accepts(&line));
        assert!(Stream::Stderr.accepts(&ProgressEvent::Percent(12.0)));
    }
}
