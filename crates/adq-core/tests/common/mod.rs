//! Shared helpers for queue integration tests.

#![allow(dead_code)]

pub mod fake_extractor;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adq_core::admission::{PlanTier, TierLimits};
use adq_core::job::{AudioFormat, JobOptions, JobStatus, QueueSnapshot};
use adq_core::queue::DownloadQueue;
use adq_core::supervisor::ExtractorPaths;

/// Every snapshot the queue published, in order.
pub type Recorded = Arc<Mutex<Vec<QueueSnapshot>>>;

pub fn options(out: &Path) -> JobOptions {
    JobOptions {
        output_dir: out.to_path_buf(),
        audio_format: AudioFormat::Mp3,
        embed_metadata: true,
        embed_thumbnail: false,
        allow_playlists: false,
    }
}

pub fn queue(extractor: &Path, limits: TierLimits) -> (DownloadQueue, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recorded);
    let queue = DownloadQueue::new(
        ExtractorPaths {
            extractor: extractor.to_path_buf(),
            encoder: "ffmpeg".into(),
        },
        PlanTier::Free,
        limits,
        move |snap: &QueueSnapshot| sink.lock().unwrap().push(snap.clone()),
    );
    (queue, recorded)
}

/// Poll the queue until `pred` holds, failing the test after 10 seconds.
pub async fn wait_until(queue: &DownloadQueue, what: &str, pred: impl Fn(&QueueSnapshot) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if pred(&queue.get_state()) {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}: {:#?}", queue.get_state());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until the fake extractor has logged that it started for `url`.
pub async fn wait_started(out: &Path, url: &str) {
    let log = out.join(fake_extractor::ORDER_LOG);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let started = std::fs::read_to_string(&log)
            .map(|s| s.lines().any(|l| l == url))
            .unwrap_or(false);
        if started {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("extractor never started for {url}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub async fn wait_idle(queue: &DownloadQueue) {
    tokio::time::timeout(Duration::from_secs(15), queue.wait_idle())
        .await
        .expect("queue did not drain in time");
}

/// Single-active-job invariant over every recorded snapshot.
pub fn assert_single_active(recorded: &Recorded) {
    for snap in recorded.lock().unwrap().iter() {
        let downloading: Vec<_> = snap
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Downloading)
            .map(|j| j.id)
            .collect();
        assert!(downloading.len() <= 1, "more than one downloading: {snap:#?}");
        assert_eq!(downloading.first().copied(), snap.active_id, "active id mismatch: {snap:#?}");
    }
}
