//! `adq get <url>...` – queue the URLs, download them one by one, then exit.

use adq_core::admission::PlanTier;
use adq_core::config::AdqConfig;
use adq_core::job::{JobOptions, JobStatus, QueueSnapshot};
use anyhow::{bail, Result};

use crate::cli::session::Session;

pub async fn run_get(
    cfg: &AdqConfig,
    urls: &[String],
    opts: JobOptions,
    plan: Option<PlanTier>,
    json: bool,
) -> Result<()> {
    let session = Session::start(cfg, plan, json);

    let mut admitted = 0usize;
    for url in urls {
        match session.queue.add(url, opts.clone()) {
            Ok(_) => admitted += 1,
            Err(e) => eprintln!("skipped {url}: {e} [{}]", e.code()),
        }
    }

    if admitted > 0 {
        tokio::select! {
            _ = session.queue.wait_idle() => {}
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!("ctrl-c handler: {}", e);
                }
                tracing::info!("interrupted, canceling queued jobs");
                session.cancel_all();
            }
        }
    }

    let state = session.finish().await;
    summarize(&state, urls.len() - admitted)
}

/// Print a one-line summary; error when anything failed or was refused.
fn summarize(state: &QueueSnapshot, refused: usize) -> Result<()> {
    let count = |s: JobStatus| state.jobs.iter().filter(|j| j.status == s).count();
    let failed = count(JobStatus::Failed);
    eprintln!(
        "{} completed, {} failed, {} canceled, {} refused",
        count(JobStatus::Completed),
        failed,
        count(JobStatus::Canceled),
        refused
    );
    if failed + refused > 0 {
        bail!("{} download(s) did not complete", failed + refused);
    }
    Ok(())
}
