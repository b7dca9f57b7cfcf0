//! Session cookies supplied by the caller or read from an exported cookie file

use crate::utils::error::LensError;
use reqwest::cookie::Jar;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Domain assumed for cookies that do not declare one
pub const DEFAULT_COOKIE_DOMAIN: &str = ".zhihu.com";

/// Name of the cookie that carries the login session
pub const AUTH_COOKIE: &str = "z_c0";

/// One cookie as written by the cookie exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
        }
    }

    /// Parse a `NAME=VALUE` pair
    pub fn parse_pair(pair: &str) -> Result<Self, LensError> {
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok(Self::new(name.trim(), value.trim()))
            }
            _ => Err(LensError::Config(format!(
                "cookie must look like NAME=VALUE, got {:?}",
                pair
            ))),
        }
    }

    pub fn domain(&self) -> &str {
        self.domain.as_deref().unwrap_or(DEFAULT_COOKIE_DOMAIN)
    }
}

/// Read a JSON array of cookies
pub fn load_cookie_file(path: &Path) -> Result<Vec<SessionCookie>, LensError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        LensError::Config(format!("cannot read cookie file {}: {}", path.display(), e))
    })?;
    let cookies: Vec<SessionCookie> = serde_json::from_str(&raw).map_err(|e| {
        LensError::Config(format!("invalid cookie file {}: {}", path.display(), e))
    })?;
    info!("Loaded {} cookies from {}", cookies.len(), path.display());
    Ok(cookies)
}

/// Build the jar attached to the HTTP client
pub fn build_jar(cookies: &[SessionCookie]) -> Jar {
    let jar = Jar::default();

    for cookie in cookies {
        let domain = cookie.domain();
        let host = domain.trim_start_matches('.');
        let Ok(url) = Url::parse(&format!("https://{}/", host)) else {
            warn!("Skipping cookie {} with unusable domain {}", cookie.name, domain);
            continue;
        };
        let header = format!("{}={}; Domain={}; Path=/", cookie.name, cookie.value, domain);
        jar.add_cookie_str(&header, &url);
    }

    if !cookies.iter().any(|c| c.name == AUTH_COOKIE) {
        warn!(
            "No {} cookie supplied; only free public videos will be available",
            AUTH_COOKIE
        );
    }

    jar
}
