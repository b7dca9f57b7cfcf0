//! Lensloader library

pub mod downloader;
pub mod extractor;
pub mod orchestrator;
pub mod transport;
pub mod utils;

// Re-export main types for easier use
pub use downloader::{ProgressEvent, TransferConfig, TransferEngine};
pub use extractor::{IdentifierResolver, Quality, RenditionDescriptor, VideoIdentifier, VideoInfo, VideoInfoFetcher};
pub use orchestrator::{DownloadOrchestrator, DownloadRequest, DownloadResult};
pub use transport::{HttpTransport, SharedTransport, Transport};
pub use utils::{AuthMode, DownloaderSettings, LensError};
