//! Downloader configuration

use crate::extractor::models::Quality;
use crate::extractor::rules::{default_rules, ExtractionRule};
use crate::transport::SessionCookie;
use crate::utils::error::LensError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ID_PLACEHOLDER: &str = "{id}";
pub const SECTION_PLACEHOLDER: &str = "{section_id}";

/// Where the session cookies come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum AuthMode {
    /// Cookies handed over by the caller
    Supplied(Vec<SessionCookie>),
    /// JSON cookie file exported from a browser
    CookieFile(PathBuf),
    /// Anonymous; only free public videos resolve
    #[default]
    None,
}

/// Downloader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderSettings {
    /// Directory the video is written into
    pub output_dir: PathBuf,

    /// Preferred rendition quality
    pub quality: Quality,

    pub auth: AuthMode,

    /// Per-request timeout for metadata and page calls
    pub metadata_timeout_secs: u64,

    /// Idle timeout while streaming media
    pub media_timeout_secs: u64,

    /// Remux executable, looked up on PATH
    pub muxer_program: String,

    /// Kill the remux tool after this long
    pub muxer_deadline_secs: Option<u64>,

    /// Video metadata endpoints, tried in order
    pub metadata_endpoints: Vec<String>,

    /// Bundled lesson endpoints, tried in order
    pub lesson_endpoints: Vec<String>,

    /// Page extraction rules, tried in order
    pub page_rules: Vec<ExtractionRule>,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            quality: Quality::default(),
            auth: AuthMode::None,
            metadata_timeout_secs: 30,
            media_timeout_secs: 60,
            muxer_program: "ffmpeg".to_string(),
            muxer_deadline_secs: None,
            metadata_endpoints: vec![
                "https://lens.zhihu.com/api/v4/videos/{id}".to_string(),
                "https://lens.zhihu.com/api/videos/{id}".to_string(),
            ],
            lesson_endpoints: vec![
                "https://www.zhihu.com/api/infinity/training/section/{section_id}".to_string(),
                "https://www.zhihu.com/api/v4/market/training/section/{section_id}".to_string(),
                "https://api.zhihu.com/infinity/training/section/{section_id}".to_string(),
            ],
            page_rules: default_rules(),
        }
    }
}

impl DownloaderSettings {
    /// Load settings from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, LensError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LensError::Config(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|e| {
            LensError::Config(format!("invalid settings {}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), LensError> {
        check_templates("metadata_endpoints", &self.metadata_endpoints, ID_PLACEHOLDER)?;
        check_templates("lesson_endpoints", &self.lesson_endpoints, SECTION_PLACEHOLDER)?;
        if self.metadata_timeout_secs == 0 || self.media_timeout_secs == 0 {
            return Err(LensError::Config("timeouts must be positive".to_string()));
        }
        if self.muxer_deadline_secs == Some(0) {
            return Err(LensError::Config("muxer deadline must be positive".to_string()));
        }
        if self.muxer_program.trim().is_empty() {
            return Err(LensError::Config("muxer program is empty".to_string()));
        }
        Ok(())
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.media_timeout_secs)
    }

    pub fn muxer_deadline(&self) -> Option<Duration> {
        self.muxer_deadline_secs.map(Duration::from_secs)
    }
}

fn check_templates(field: &str, templates: &[String], placeholder: &str) -> Result<(), LensError> {
    if templates.is_empty() {
        return Err(LensError::Config(format!("{} is empty", field)));
    }
    if let Some(bad) = templates.iter().find(|t| !t.contains(placeholder)) {
        return Err(LensError::Config(format!(
            "{} entry {:?} lacks {}",
            field, bad, placeholder
        )));
    }
    Ok(())
}
