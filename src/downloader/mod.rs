//! Transfer engine module

pub mod engine;
pub mod muxer;
pub mod progress;

// Re-export for convenience
pub use engine::{TransferConfig, TransferEngine};
pub use muxer::Muxer;
pub use progress::{ProgressEvent, ProgressReporter, ProgressSink};
