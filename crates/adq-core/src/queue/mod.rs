//! Queue engine: admission, FIFO scheduling of the single active slot,
//! cancellation, retry, removal and state notification.
//!
//! Terminal-state precedence when signals race: canceled > failed > completed.
//! A cancel marks the job before its process has exited, and the exit
//! handler never overwrites that mark.

mod engine;
mod state;

pub use engine::{DownloadQueue, QueueListener};
pub use state::{CancelOutcome, QueueState};
