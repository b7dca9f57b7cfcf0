//! End-to-end download: resolve, fetch metadata, select, transfer

use crate::downloader::{ProgressSink, TransferConfig, TransferEngine};
use crate::extractor::models::Quality;
use crate::extractor::{selector, IdentifierResolver, VideoInfoFetcher};
use crate::transport::SharedTransport;
use crate::utils::config::DownloaderSettings;
use crate::utils::error::LensError;
use crate::utils::filename::destination_path;
use std::path::PathBuf;
use tracing::{debug, info};

/// Final path on success, classified error otherwise
pub type DownloadResult = Result<PathBuf, LensError>;

/// One download, as requested by the caller
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Page URL, numeric id or encoded id
    pub reference: String,
    pub output_dir: PathBuf,
    pub quality: Quality,
    pub progress: Option<ProgressSink>,
}

impl DownloadRequest {
    pub fn new(reference: impl Into<String>, output_dir: impl Into<PathBuf>, quality: Quality) -> Self {
        Self {
            reference: reference.into(),
            output_dir: output_dir.into(),
            quality,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }
}

/// Composes the pipeline stages. Stages run strictly in sequence and the
/// first failing stage ends the run; nothing is retried here.
pub struct DownloadOrchestrator {
    resolver: IdentifierResolver,
    fetcher: VideoInfoFetcher,
    engine: TransferEngine,
}

impl DownloadOrchestrator {
    /// Build every stage on top of one session
    pub fn new(transport: SharedTransport, settings: &DownloaderSettings) -> Result<Self, LensError> {
        settings.validate()?;

        let resolver = IdentifierResolver::new(transport.clone(), settings)?;
        let fetcher = VideoInfoFetcher::new(transport.clone(), settings);
        let engine = TransferEngine::new(transport, TransferConfig::from(settings));

        Ok(Self::from_parts(resolver, fetcher, engine))
    }

    pub fn from_parts(
        resolver: IdentifierResolver,
        fetcher: VideoInfoFetcher,
        engine: TransferEngine,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            engine,
        }
    }

    pub async fn run(&self, request: DownloadRequest) -> DownloadResult {
        info!("Resolving {}", request.reference);
        let resolved = self.resolver.resolve(&request.reference).await?;

        let info = self
            .fetcher
            .fetch(&resolved.identifier, resolved.title.as_deref())
            .await?;

        let duration_ms = match info.duration_ms {
            0 => resolved.duration_ms.unwrap_or(0),
            known => known,
        };
        info!("Video title: {}", info.title);
        info!("Video duration: {} s", duration_ms / 1000);

        for candidate in selector::candidates(&info) {
            info!(
                "  - {}: {}x{} ({})",
                candidate.quality, candidate.width, candidate.height, candidate.format
            );
        }

        let rendition = selector::select(&info, request.quality)?;
        info!(
            "Selected quality: {} ({}x{})",
            rendition.quality, rendition.width, rendition.height
        );

        tokio::fs::create_dir_all(&request.output_dir).await?;
        let destination = destination_path(&request.output_dir, &info.title);
        debug!("Output file: {}", destination.display());

        let path = self
            .engine
            .transfer(rendition, &destination, request.progress)
            .await?;

        info!("Download complete: {}", path.display());
        Ok(path)
    }
}
