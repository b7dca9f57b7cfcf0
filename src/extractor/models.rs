//! Data structures for video information

use crate::utils::error::LensError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Format tag of segmented playlist renditions
pub const PLAYLIST_FORMAT: &str = "m3u8";

/// Opaque video token, usable as a URL path segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoIdentifier(String);

impl VideoIdentifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `max` characters, for log lines and generated titles
    pub fn truncated(&self, max: usize) -> &str {
        match self.0.char_indices().nth(max) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for VideoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rendition quality, declared highest to lowest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Uhd,
    Fhd,
    #[default]
    Hd,
    Sd,
    Ld,
}

impl Quality {
    /// Canonical high-to-low order
    pub const ALL: [Quality; 5] = [
        Quality::Uhd,
        Quality::Fhd,
        Quality::Hd,
        Quality::Sd,
        Quality::Ld,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Uhd => "uhd",
            Quality::Fhd => "fhd",
            Quality::Hd => "hd",
            Quality::Sd => "sd",
            Quality::Ld => "ld",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LensError::InvalidQuality(s.to_string()))
    }
}

/// One encoded variant of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenditionDescriptor {
    pub quality: Quality,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub play_url: String,
    pub size: Option<u64>,
}

impl RenditionDescriptor {
    /// A rendition without a play URL cannot be downloaded
    pub fn is_usable(&self) -> bool {
        !self.play_url.is_empty()
    }

    /// The format tag is not always authoritative, so the URL is checked too
    pub fn is_segmented(&self) -> bool {
        self.format.eq_ignore_ascii_case(PLAYLIST_FORMAT) || self.play_url.contains(".m3u8")
    }
}

/// Resolved metadata for one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub identifier: VideoIdentifier,
    pub title: String,
    /// Milliseconds, 0 when unknown
    pub duration_ms: u64,
    pub renditions: BTreeMap<Quality, RenditionDescriptor>,
}

/// What the identifier resolver produced, plus anything it learned on the way
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReference {
    pub identifier: VideoIdentifier,
    pub title: Option<String>,
    pub duration_ms: Option<u64>,
    /// Name of the strategy that produced this result
    pub source: &'static str,
}

impl ResolvedReference {
    pub fn bare(identifier: VideoIdentifier, source: &'static str) -> Self {
        Self {
            identifier,
            title: None,
            duration_ms: None,
            source,
        }
    }
}
