//! Video metadata lookup
//!
//! The API has shipped two incompatible response shapes, so the rendition map
//! is looked up under `playlist` first and `playlist_v2` second, across an
//! ordered list of endpoint templates.

use crate::extractor::models::{Quality, RenditionDescriptor, VideoIdentifier, VideoInfo, PLAYLIST_FORMAT};
use crate::transport::SharedTransport;
use crate::utils::config::{DownloaderSettings, ID_PLACEHOLDER};
use crate::utils::error::LensError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const GENERATED_TITLE_ID_CHARS: usize = 20;

#[derive(Debug, Deserialize)]
struct LensVideoResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    playlist: Option<Value>,
    #[serde(default)]
    playlist_v2: Option<Value>,
}

impl LensVideoResponse {
    /// Primary key first, legacy key second. A collection counts only if at
    /// least one of its entries converts to a rendition.
    fn renditions(&self) -> Option<BTreeMap<Quality, RenditionDescriptor>> {
        [&self.playlist, &self.playlist_v2]
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(convert_collection)
            .find(|renditions| !renditions.is_empty())
    }
}

/// Entries under unknown tags or with malformed fields are skipped one by one
fn convert_collection(collection: &Map<String, Value>) -> BTreeMap<Quality, RenditionDescriptor> {
    collection
        .iter()
        .filter_map(|(tag, entry)| {
            let Ok(quality) = tag.parse::<Quality>() else {
                debug!("Ignoring unknown quality tag {}", tag);
                return None;
            };
            match RawRendition::deserialize(entry) {
                Ok(raw) => Some((quality, raw.into_descriptor(quality))),
                Err(e) => {
                    debug!("Ignoring malformed {} rendition: {}", tag, e);
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawRendition {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    play_url: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

impl RawRendition {
    fn into_descriptor(self, quality: Quality) -> RenditionDescriptor {
        RenditionDescriptor {
            quality,
            width: self.width.unwrap_or(0),
            height: self.height.unwrap_or(0),
            format: self.format.unwrap_or_else(|| PLAYLIST_FORMAT.to_string()),
            play_url: self.play_url.unwrap_or_default(),
            size: self.size,
        }
    }
}

/// Outcome of probing one endpoint
enum Probe {
    Accepted(LensVideoResponse, BTreeMap<Quality, RenditionDescriptor>),
    Rejected,
    Unreachable,
}

/// Queries metadata endpoints until one yields a rendition list
pub struct VideoInfoFetcher {
    transport: SharedTransport,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl VideoInfoFetcher {
    pub fn new(transport: SharedTransport, settings: &DownloaderSettings) -> Self {
        Self::with_endpoints(
            transport,
            settings.metadata_endpoints.clone(),
            settings.metadata_timeout(),
        )
    }

    pub fn with_endpoints(transport: SharedTransport, endpoints: Vec<String>, timeout: Duration) -> Self {
        Self {
            transport,
            endpoints,
            timeout,
        }
    }

    pub async fn fetch(
        &self,
        identifier: &VideoIdentifier,
        hint_title: Option<&str>,
    ) -> Result<VideoInfo, LensError> {
        let mut unreachable = 0usize;

        for template in &self.endpoints {
            let url = template.replace(ID_PLACEHOLDER, identifier.as_str());
            info!("Trying metadata API: {}", url);

            match self.probe(&url).await {
                Probe::Accepted(response, renditions) => {
                    return Ok(build_info(identifier, response, renditions, hint_title));
                }
                Probe::Rejected => {}
                Probe::Unreachable => unreachable += 1,
            }
        }

        if !self.endpoints.is_empty() && unreachable == self.endpoints.len() {
            return Err(LensError::NetworkFailure(format!(
                "all {} metadata endpoints were unreachable",
                unreachable
            )));
        }

        warn!("No metadata endpoint returned a rendition list; the video is likely paid or the cookies expired");
        Err(LensError::AuthenticationRequired {
            identifier: identifier.to_string(),
        })
    }

    async fn probe(&self, url: &str) -> Probe {
        let response = match self.transport.get(url, self.timeout).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                return Probe::Unreachable;
            }
        };

        if !response.is_ok() {
            debug!("{} returned status {}", url, response.status);
            return Probe::Rejected;
        }

        match serde_json::from_str::<LensVideoResponse>(&response.body) {
            Ok(parsed) => match parsed.renditions() {
                Some(renditions) => Probe::Accepted(parsed, renditions),
                None => {
                    debug!("{} answered without a rendition list", url);
                    Probe::Rejected
                }
            },
            Err(e) => {
                debug!("{} returned unparseable JSON: {}", url, e);
                Probe::Rejected
            }
        }
    }
}

fn build_info(
    identifier: &VideoIdentifier,
    response: LensVideoResponse,
    renditions: BTreeMap<Quality, RenditionDescriptor>,
    hint_title: Option<&str>,
) -> VideoInfo {
    let title = response
        .title
        .filter(|t| !t.is_empty())
        .or_else(|| hint_title.filter(|t| !t.is_empty()).map(str::to_string))
        .unwrap_or_else(|| format!("video-{}", identifier.truncated(GENERATED_TITLE_ID_CHARS)));

    VideoInfo {
        identifier: identifier.clone(),
        title,
        duration_ms: response
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d as u64)
            .unwrap_or(0),
        renditions,
    }
}
