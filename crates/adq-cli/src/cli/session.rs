//! A queue wired to a stdout renderer, shared by `adq get` and `adq shell`.

use adq_core::admission::PlanTier;
use adq_core::config::AdqConfig;
use adq_core::job::QueueSnapshot;
use adq_core::queue::DownloadQueue;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::render::Renderer;

pub struct Session {
    pub queue: DownloadQueue,
    render: JoinHandle<()>,
}

impl Session {
    /// Build the queue. Snapshots are handed to a render task over an
    /// unbounded channel, so the listener never blocks the queue lock.
    pub fn start(cfg: &AdqConfig, plan: Option<PlanTier>, json: bool) -> Self {
        let plan = plan.unwrap_or_else(|| cfg.plan_tier());
        let (tx, mut rx) = mpsc::unbounded_channel::<QueueSnapshot>();
        let queue = DownloadQueue::new(
            cfg.extractor_paths(),
            plan,
            cfg.tier_limits(),
            move |snap: &QueueSnapshot| {
                let _ = tx.send(snap.clone());
            },
        );
        tracing::info!(plan = %plan, extractor = %cfg.extractor_path.display(), "queue started");

        let render = tokio::spawn(async move {
            let mut renderer = Renderer::new(json);
            while let Some(snap) = rx.recv().await {
                for line in renderer.lines(&snap, Instant::now()) {
                    println!("{line}");
                }
            }
        });

        Self { queue, render }
    }

    /// Cancel everything still queued (active job first).
    pub fn cancel_all(&self) {
        let state = self.queue.get_state();
        if let Some(active) = state.active_id {
            self.queue.cancel(&active);
        }
        for job in state.jobs.iter().filter(|j| j.status.is_queued()) {
            self.queue.cancel(&job.id);
        }
    }

    /// Wait for the queue to drain, flush the renderer and return the final state.
    pub async fn finish(self) -> QueueSnapshot {
        self.queue.wait_idle().await;
        let state = self.queue.get_state();
        // The render task ends once the last queue handle (and its listener) is dropped.
        drop(self.queue);
        if let Err(e) = self.render.await {
            tracing::warn!("render task: {}", e);
        }
        state
    }
}
