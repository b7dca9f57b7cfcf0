//! Identifier resolution
//!
//! Product tiers shape their identifiers differently (plain numeric ids, long
//! opaque tokens, tokens that only appear inside the page), so resolution is
//! an ordered chain of strategies. The first strategy that resolves wins.

use crate::extractor::models::{ResolvedReference, VideoIdentifier};
use crate::extractor::rules::{find_title, CompiledRule};
use crate::extractor::traits::{IdentifierStrategy, StrategyOutcome};
use crate::transport::{SharedTransport, Transport};
use crate::utils::config::{DownloaderSettings, SECTION_PLACEHOLDER};
use crate::utils::error::{LensError, ResolutionHint};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Path segment that precedes a single video's identifier
pub const SINGLE_VIDEO_MARKER: &str = "zvideo";

/// Path segment that precedes `<product id>/<section id>` for course lessons
pub const LESSON_MARKER: &str = "training-video";

const DIRECT_TOKEN_MIN_CHARS: usize = 30;

/// Turns a user-supplied reference into a canonical identifier
pub struct IdentifierResolver {
    strategies: Vec<Box<dyn IdentifierStrategy>>,
    transport: SharedTransport,
}

impl IdentifierResolver {
    /// Standard chain: direct id, single-video path, lesson API, page scrape
    pub fn new(transport: SharedTransport, settings: &DownloaderSettings) -> Result<Self, LensError> {
        let rules = settings
            .page_rules
            .iter()
            .map(|rule| rule.compile())
            .collect::<Result<Vec<_>, _>>()?;

        let strategies: Vec<Box<dyn IdentifierStrategy>> = vec![
            Box::new(DirectIdentifier),
            Box::new(SingleVideoPath),
            Box::new(BundledLesson::new(
                settings.lesson_endpoints.clone(),
                settings.metadata_timeout(),
            )),
            Box::new(PageScrape::new(rules, settings.metadata_timeout())),
        ];

        Ok(Self::with_strategies(transport, strategies))
    }

    pub fn with_strategies(
        transport: SharedTransport,
        strategies: Vec<Box<dyn IdentifierStrategy>>,
    ) -> Self {
        Self {
            strategies,
            transport,
        }
    }

    /// Names of the strategies in the order they are tried
    pub fn strategy_ids(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub async fn resolve(&self, reference: &str) -> Result<ResolvedReference, LensError> {
        let reference = reference.trim();
        let mut hint = None;

        for strategy in &self.strategies {
            match strategy.resolve(reference, self.transport.as_ref()).await {
                StrategyOutcome::Resolved(resolved) => {
                    info!(
                        "Resolved video id {} via {}",
                        resolved.identifier.truncated(50),
                        strategy.id()
                    );
                    return Ok(resolved);
                }
                StrategyOutcome::NotApplicable => {
                    debug!("Strategy {} does not apply", strategy.id());
                }
                StrategyOutcome::Missed(reason) => {
                    debug!("Strategy {} missed: {}", strategy.id(), reason);
                    hint = Some(reason);
                }
            }
        }

        Err(LensError::IdentifierNotFound {
            reference: reference.to_string(),
            hint: hint.unwrap_or(ResolutionHint::NoPatternMatched),
        })
    }
}

fn has_url_scheme(reference: &str) -> bool {
    reference.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
    })
}

/// All digits, or a long token without URL-reserved characters
pub fn is_direct_identifier(reference: &str) -> bool {
    if reference.is_empty() || has_url_scheme(reference) {
        return false;
    }
    if reference.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    reference.chars().count() > DIRECT_TOKEN_MIN_CHARS
        && !reference.contains('/')
        && !reference.contains(':')
}

fn parse_web_url(reference: &str) -> Option<Url> {
    let url = Url::parse(reference).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Reference is already an identifier
pub struct DirectIdentifier;

#[async_trait]
impl IdentifierStrategy for DirectIdentifier {
    fn id(&self) -> &'static str {
        "direct"
    }

    async fn resolve(&self, reference: &str, _transport: &dyn Transport) -> StrategyOutcome {
        if is_direct_identifier(reference) {
            StrategyOutcome::Resolved(ResolvedReference::bare(
                VideoIdentifier::new(reference),
                self.id(),
            ))
        } else {
            StrategyOutcome::NotApplicable
        }
    }
}

/// `/zvideo/<id>` page URLs
pub struct SingleVideoPath;

impl SingleVideoPath {
    pub fn extract(reference: &str) -> Option<String> {
        let url = parse_web_url(reference)?;
        let segments = path_segments(&url);
        segments
            .windows(2)
            .find(|pair| pair[0] == SINGLE_VIDEO_MARKER)
            .map(|pair| pair[1].to_string())
    }
}

#[async_trait]
impl IdentifierStrategy for SingleVideoPath {
    fn id(&self) -> &'static str {
        "single-video-path"
    }

    async fn resolve(&self, reference: &str, _transport: &dyn Transport) -> StrategyOutcome {
        match Self::extract(reference) {
            Some(id) => StrategyOutcome::Resolved(ResolvedReference::bare(
                VideoIdentifier::new(id),
                self.id(),
            )),
            None => StrategyOutcome::NotApplicable,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SectionResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    resource: Option<SectionResource>,
}

#[derive(Debug, Deserialize)]
struct SectionResource {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<SectionVideo>,
}

#[derive(Debug, Deserialize)]
struct SectionVideo {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Course lesson URLs, resolved through the section API
pub struct BundledLesson {
    endpoints: Vec<String>,
    timeout: Duration,
}

impl BundledLesson {
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Self {
        Self { endpoints, timeout }
    }

    /// `(product id, section id)` from a lesson URL
    pub fn extract(reference: &str) -> Option<(String, String)> {
        let url = parse_web_url(reference)?;
        let segments = path_segments(&url);
        let marker = segments.iter().position(|s| *s == LESSON_MARKER)?;
        match &segments[marker + 1..] {
            [.., product, section] => Some((product.to_string(), section.to_string())),
            _ => None,
        }
    }

    fn parse_section(&self, body: &str) -> Option<ResolvedReference> {
        let response: SectionResponse = serde_json::from_str(body).ok()?;
        let resource = response.resource?;
        if resource.kind.as_deref() != Some("video") {
            return None;
        }
        let video = resource.data?;
        let id = match video.id? {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if id.is_empty() {
            return None;
        }

        Some(ResolvedReference {
            identifier: VideoIdentifier::new(id),
            title: response.title.filter(|t| !t.is_empty()),
            duration_ms: video.duration.filter(|d| *d >= 0.0).map(|d| d as u64),
            source: self.id(),
        })
    }
}

#[async_trait]
impl IdentifierStrategy for BundledLesson {
    fn id(&self) -> &'static str {
        "lesson-api"
    }

    async fn resolve(&self, reference: &str, transport: &dyn Transport) -> StrategyOutcome {
        let Some((product_id, section_id)) = Self::extract(reference) else {
            return StrategyOutcome::NotApplicable;
        };
        debug!("Lesson reference: product {} section {}", product_id, section_id);

        for template in &self.endpoints {
            let url = template.replace(SECTION_PLACEHOLDER, &section_id);
            debug!("Trying lesson API: {}", url);

            let response = match transport.get(&url, self.timeout).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Lesson API {} failed: {}", url, e);
                    continue;
                }
            };
            if !response.is_ok() {
                debug!("Lesson API {} returned {}", url, response.status);
                continue;
            }
            match self.parse_section(&response.body) {
                Some(resolved) => return StrategyOutcome::Resolved(resolved),
                None => debug!("Lesson API {} returned no video resource", url),
            }
        }

        StrategyOutcome::NotApplicable
    }
}

/// Fetch the page and run the extraction rules over it
pub struct PageScrape {
    rules: Vec<CompiledRule>,
    timeout: Duration,
}

impl PageScrape {
    pub fn new(rules: Vec<CompiledRule>, timeout: Duration) -> Self {
        Self { rules, timeout }
    }

    pub fn scan(&self, page: &str) -> Option<ResolvedReference> {
        self.rules.iter().find_map(|rule| {
            let token = rule.find(page)?;
            debug!("Rule {} matched {}", rule.name, token);
            Some(ResolvedReference {
                identifier: VideoIdentifier::new(token),
                title: if rule.with_title { find_title(page) } else { None },
                duration_ms: None,
                source: self.id(),
            })
        })
    }
}

#[async_trait]
impl IdentifierStrategy for PageScrape {
    fn id(&self) -> &'static str {
        "page-scrape"
    }

    async fn resolve(&self, reference: &str, transport: &dyn Transport) -> StrategyOutcome {
        if parse_web_url(reference).is_none() {
            return StrategyOutcome::NotApplicable;
        }

        let page = match transport.get(reference, self.timeout).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                warn!("Page {} returned HTTP {}", reference, page.status);
                return StrategyOutcome::Missed(ResolutionHint::PageFetchFailed(format!(
                    "HTTP {}",
                    page.status
                )));
            }
            Err(e) => {
                warn!("Failed to fetch page {}: {}", reference, e);
                return StrategyOutcome::Missed(ResolutionHint::PageFetchFailed(e.to_string()));
            }
        };

        match self.scan(&page.body) {
            Some(resolved) => StrategyOutcome::Resolved(resolved),
            None => {
                warn!("No extraction rule matched the page");
                StrategyOutcome::Missed(ResolutionHint::NoPatternMatched)
            }
        }
    }
}
