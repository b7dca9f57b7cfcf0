//! Error handling for Lensloader

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why the identifier resolver gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionHint {
    /// The referenced page could not be fetched at all
    PageFetchFailed(String),
    /// The page was fetched but no extraction rule produced a token
    NoPatternMatched,
}

impl fmt::Display for ResolutionHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageFetchFailed(reason) => write!(f, "page fetch failed: {}", reason),
            Self::NoPatternMatched => write!(f, "no extraction rule matched"),
        }
    }
}

/// Sub-classification of a failed remux run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFailureKind {
    PermissionDenied,
    ResourceMissing,
    Generic,
}

impl fmt::Display for ToolFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PermissionDenied => "access denied",
            Self::ResourceMissing => "resource missing",
            Self::Generic => "tool error",
        };
        f.write_str(text)
    }
}

/// Main error type for Lensloader
#[derive(Debug, Error)]
pub enum LensError {
    #[error("No usable rendition for video {identifier}; authentication is probably required")]
    AuthenticationRequired { identifier: String },

    #[error("Could not resolve a video identifier from {reference:?} ({hint})")]
    IdentifierNotFound {
        reference: String,
        hint: ResolutionHint,
    },

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Video has no playable rendition")]
    NoPlayableRendition,

    #[error("{0} not found. Please install it and make sure it is on PATH")]
    ExternalToolMissing(String),

    #[error("Remux tool exited with code {exit_code} ({kind})")]
    ExternalToolFailure {
        kind: ToolFailureKind,
        exit_code: i32,
        diagnostics: Vec<String>,
    },

    #[error("Remux tool did not finish within {after:?} and was terminated")]
    ExternalToolTimeout { after: Duration },

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Invalid quality tag: {0}")]
    InvalidQuality(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LensError {
    /// An actionable sentence for the person running the download
    pub fn hint(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired { .. } => {
                "Log in on the website, re-export your cookies and pass them with -c; paid lessons must be purchased first"
            }
            Self::IdentifierNotFound {
                hint: ResolutionHint::PageFetchFailed(_),
                ..
            } => "Check your network connection and that the page URL opens in a browser",
            Self::IdentifierNotFound { .. } => {
                "Make sure the URL points at a single video or lesson and that your cookies are valid"
            }
            Self::NetworkFailure(_) => "Check your network connection and try again",
            Self::NoPlayableRendition => "The video lists no playable quality; it may still be processing",
            Self::ExternalToolMissing(_) => "Install ffmpeg (e.g. `brew install ffmpeg` or `apt install ffmpeg`)",
            Self::ExternalToolFailure {
                kind: ToolFailureKind::PermissionDenied,
                ..
            } => "Access was denied; log in again or check that you own this lesson",
            Self::ExternalToolFailure {
                kind: ToolFailureKind::ResourceMissing,
                ..
            } => "The stream no longer exists or was removed",
            Self::ExternalToolFailure { .. } => "See the tool output above for details",
            Self::ExternalToolTimeout { .. } => "Raise the deadline with --deadline or retry on a faster connection",
            Self::Filesystem(_) => "Check that the output directory is writable and has free space",
            Self::InvalidQuality(_) => "Use one of: uhd, fhd, hd, sd, ld",
            Self::Config(_) => "Fix the settings or cookie file and try again",
        }
    }
}

impl From<reqwest::Error> for LensError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkFailure(err.to_string())
    }
}
