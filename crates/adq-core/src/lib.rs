pub mod admission;
pub mod config;
pub mod job;
pub mod logging;
pub mod progress;
pub mod queue;
pub mod supervisor;
