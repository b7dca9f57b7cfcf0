//! Shared fixtures: an in-memory transport with scripted replies.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use lensloader::transport::{HttpResponse, MediaStream, Transport};
use lensloader::LensError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Reply for a text GET
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Unreachable(String),
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Status(200, body.to_string())
    }
}

/// Reply for a streamed GET
#[derive(Debug, Clone)]
pub struct MediaReply {
    pub chunks: Vec<Vec<u8>>,
    pub content_length: Option<u64>,
    /// Emit a network error after this many chunks
    pub fail_after: Option<usize>,
}

impl MediaReply {
    pub fn complete(chunks: Vec<Vec<u8>>) -> Self {
        let len = chunks.iter().map(|c| c.len() as u64).sum();
        Self {
            chunks,
            content_length: Some(len),
            fail_after: None,
        }
    }
}

/// Transport that answers from a fixed table and records every URL it sees.
/// URLs without a scripted reply answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    media: HashMap<String, MediaReply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    pub fn media(mut self, url: &str, reply: MediaReply) -> Self {
        self.media.insert(url.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn record(&self, url: &str) {
        self.calls.lock().unwrap().push(url.to_string());
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn user_agent(&self) -> &str {
        "TestAgent/1.0"
    }

    fn referer(&self) -> &str {
        "https://www.zhihu.com/"
    }

    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, LensError> {
        self.record(url);
        match self.replies.get(url) {
            Some(Reply::Status(status, body)) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            Some(Reply::Unreachable(reason)) => Err(LensError::NetworkFailure(reason.clone())),
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }

    async fn stream(&self, url: &str, _timeout: Duration) -> Result<MediaStream, LensError> {
        self.record(url);
        let Some(reply) = self.media.get(url).cloned() else {
            return Err(LensError::NetworkFailure("HTTP error: 404 Not Found".to_string()));
        };

        let fail_after = reply.fail_after;
        let mut items: Vec<Result<Bytes, LensError>> = reply
            .chunks
            .into_iter()
            .take(fail_after.unwrap_or(usize::MAX))
            .map(|chunk| Ok(Bytes::from(chunk)))
            .collect();
        if fail_after.is_some() {
            items.push(Err(LensError::NetworkFailure("connection reset".to_string())));
        }

        Ok(MediaStream {
            content_length: reply.content_length,
            chunks: stream::iter(items).boxed(),
        })
    }
}

pub const LENS_V4: &str = "https://lens.zhihu.com/api/v4/videos/";
pub const LENS_LEGACY: &str = "https://lens.zhihu.com/api/videos/";

pub fn lens_v4(id: &str) -> String {
    format!("{}{}", LENS_V4, id)
}

pub fn lens_legacy(id: &str) -> String {
    format!("{}{}", LENS_LEGACY, id)
}

pub const LESSON_HD_PLAYLIST: &str = r#"{"title":"Lesson 1","duration":60000,"playlist":{"hd":{"width":1280,"height":720,"format":"m3u8","play_url":"https://cdn.example/x.m3u8"}}}"#;

pub const EMPTY_PLAYLISTS: &str = r#"{"title":"Paid","playlist":{},"playlist_v2":{}}"#;
