//! Incremental parsing of extractor output into progress updates.
//!
//! Output arrives in arbitrary chunks. Each stream gets its own
//! [`LineBuffer`]; completed lines are classified by [`classify_line`] and
//! the resulting [`ProgressEvent`]s are applied to the job record.

mod buffer;
mod classify;

pub use buffer::LineBuffer;
pub use classify::{classify_line, DownloadLine, ProgressEvent};
