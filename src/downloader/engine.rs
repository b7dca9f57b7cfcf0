//! Transfer engine: remux for segmented playlists, streamed write otherwise

use crate::downloader::muxer::Muxer;
use crate::downloader::progress::{ProgressEvent, ProgressReporter, ProgressSink};
use crate::extractor::models::RenditionDescriptor;
use crate::transport::SharedTransport;
use crate::utils::config::DownloaderSettings;
use crate::utils::error::LensError;
use crate::utils::filename::partial_path;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, error, info};

/// Transfer configuration
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub muxer_program: String,
    pub muxer_deadline: Option<Duration>,
    /// Idle limit while waiting for the next media chunk
    pub media_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            muxer_program: "ffmpeg".to_string(),
            muxer_deadline: None,
            media_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&DownloaderSettings> for TransferConfig {
    fn from(settings: &DownloaderSettings) -> Self {
        Self {
            muxer_program: settings.muxer_program.clone(),
            muxer_deadline: settings.muxer_deadline(),
            media_timeout: settings.media_timeout(),
        }
    }
}

/// Materializes a chosen rendition to a local file
pub struct TransferEngine {
    transport: SharedTransport,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(transport: SharedTransport, config: TransferConfig) -> Self {
        Self { transport, config }
    }

    /// Download `rendition` to `destination`, reporting progress to `progress`
    pub async fn transfer(
        &self,
        rendition: &RenditionDescriptor,
        destination: &Path,
        progress: Option<ProgressSink>,
    ) -> Result<PathBuf, LensError> {
        let mut reporter = ProgressReporter::new(progress);

        if rendition.is_segmented() {
            debug!("Segmented rendition ({}), using remux path", rendition.format);
            self.transfer_segmented(rendition, destination, &mut reporter)
                .await?;
        } else {
            debug!("Flat rendition ({}), using direct path", rendition.format);
            self.transfer_direct(rendition, destination, &mut reporter)
                .await?;
        }

        Ok(destination.to_path_buf())
    }

    async fn transfer_segmented(
        &self,
        rendition: &RenditionDescriptor,
        destination: &Path,
        reporter: &mut ProgressReporter,
    ) -> Result<(), LensError> {
        // Precondition: checked before anything is spawned
        let muxer = Muxer::locate(&self.config.muxer_program)?;

        muxer
            .remux(
                &rendition.play_url,
                destination,
                self.transport.user_agent(),
                self.transport.referer(),
                reporter,
                self.config.muxer_deadline,
            )
            .await
    }

    /// Stream into `<destination>.part`, then rename into place.
    ///
    /// A failed transfer leaves the `.part` file behind and the destination
    /// untouched.
    async fn transfer_direct(
        &self,
        rendition: &RenditionDescriptor,
        destination: &Path,
        reporter: &mut ProgressReporter,
    ) -> Result<(), LensError> {
        let idle_limit = self.config.media_timeout;
        let mut stream = self.transport.stream(&rendition.play_url, idle_limit).await?;
        let total = stream.content_length.filter(|len| *len > 0);

        let part = partial_path(destination);
        let mut file = File::create(&part).await?;
        let mut received = 0u64;

        loop {
            let next = match timeout(idle_limit, stream.chunks.next()).await {
                Ok(next) => next,
                Err(_) => {
                    error!("No data for {:?}; partial file kept at {}", idle_limit, part.display());
                    return Err(LensError::NetworkFailure(format!(
                        "transfer stalled for {:?} after {} bytes",
                        idle_limit, received
                    )));
                }
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;

            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            if let Some(total) = total {
                reporter.report(ProgressEvent::Percent(percent(received, total)));
            }
        }

        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part, destination).await?;
        info!("Wrote {} bytes to {}", received, destination.display());
        Ok(())
    }
}

/// Percentage in tenths, capped at 100
fn percent(received: u64, total: u64) -> f64 {
    let tenths = (received as f64 / total as f64 * 1000.0).floor();
    (tenths / 10.0).min(100.0)
}
