//! Utility modules for error handling, configuration and file naming

pub mod config;
pub mod error;
pub mod filename;

// Re-export for convenience
pub use config::{AuthMode, DownloaderSettings};
pub use error::{LensError, ResolutionHint, ToolFailureKind};
pub use filename::{destination_path, sanitize_title};
