//! Page extraction rules
//!
//! Page layouts change without notice, so the rules are plain data that can
//! be overridden from the settings file. Each rule captures the candidate
//! token in group 1.

use crate::utils::error::LensError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Tokens of this length or shorter are fragments, never identifiers
pub const MIN_TOKEN_LEN: usize = 10;

/// One structural pattern tried against a page body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub name: String,
    pub pattern: String,
    /// Shortest captured token this rule accepts
    #[serde(default)]
    pub min_len: usize,
    /// Also recover a title from the page when this rule matches
    #[serde(default = "default_with_title")]
    pub with_title: bool,
}

fn default_with_title() -> bool {
    true
}

impl ExtractionRule {
    fn new(name: &str, pattern: &str, min_len: usize) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            min_len,
            with_title: true,
        }
    }

    pub fn compile(&self) -> Result<CompiledRule, LensError> {
        let regex = RegexBuilder::new(&self.pattern)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| LensError::Config(format!("rule {}: {}", self.name, e)))?;
        Ok(CompiledRule {
            name: self.name.clone(),
            regex,
            min_len: self.min_len,
            with_title: self.with_title,
        })
    }
}

/// Rule set used when the settings do not override it, in priority order
pub fn default_rules() -> Vec<ExtractionRule> {
    vec![
        ExtractionRule::new(
            "resource-data-id",
            r#""resource"\s*:\s*\{[^}]*"data"\s*:\s*\{[^}]*"id"\s*:\s*"([a-zA-Z0-9_-]+)""#,
            20,
        ),
        ExtractionRule::new(
            "id-before-video-type",
            r#""id"\s*:\s*"([a-zA-Z0-9_-]+)"[^}]*"type"\s*:\s*"video""#,
            40,
        ),
        ExtractionRule::new(
            "video-type-data-id",
            r#""type"\s*:\s*"video"[^}]*"data"\s*:\s*\{[^}]*"id"\s*:\s*"([a-zA-Z0-9_-]+)""#,
            20,
        ),
        ExtractionRule::new("quoted-video-id", r#""video_id"\s*:\s*"(\d+)""#, 0),
        ExtractionRule::new("lens-id-attribute", r#"data-lens-id="(\d+)""#, 0),
        ExtractionRule {
            with_title: false,
            ..ExtractionRule::new(
                "training-video-autofetch",
                r#""trainingVideo"\s*:\s*\{.*?"videoInfo"\s*:\s*\{[^}]*"resource"\s*:\s*\{[^}]*"data"\s*:\s*\{[^}]*"id"\s*:\s*"([^"]+)""#,
                0,
            )
        },
    ]
}

/// A rule ready to run
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    regex: Regex,
    min_len: usize,
    pub with_title: bool,
}

impl CompiledRule {
    /// First captured token that passes both length filters
    pub fn find<'h>(&self, haystack: &'h str) -> Option<&'h str> {
        self.regex
            .captures_iter(haystack)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|token| token.len() > MIN_TOKEN_LEN && token.len() >= self.min_len)
    }
}

/// First `"title":"..."` occurrence in a page
pub fn find_title(haystack: &str) -> Option<String> {
    let regex = Regex::new(r#""title"\s*:\s*"([^"]+)""#).ok()?;
    regex
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
