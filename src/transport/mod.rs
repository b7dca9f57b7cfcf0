//! HTTP transport shared by every pipeline stage
//!
//! The [`Transport`] trait is the seam between the pipeline and the network.
//! [`HttpTransport`] is the real implementation: one persistent reqwest client
//! carrying the browser header profile and the caller's session cookies.

pub mod cookies;

use crate::utils::config::AuthMode;
use crate::utils::error::LensError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use cookies::SessionCookie;

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
pub const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9,en;q=0.8";
pub const PLATFORM_REFERER: &str = "https://www.zhihu.com/";
pub const PLATFORM_ORIGIN: &str = "https://www.zhihu.com";

/// A fully buffered text response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A response body delivered chunk by chunk
pub struct MediaStream {
    pub content_length: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes, LensError>>,
}

/// Network access used by the pipeline
///
/// Implementations must be safe to share across tasks; the pipeline itself
/// only ever issues one request at a time.
#[async_trait]
pub trait Transport: Send + Sync {
    /// User agent sent with every request, replicated to the remux tool
    fn user_agent(&self) -> &str;

    /// Referer sent with every request, replicated to the remux tool
    fn referer(&self) -> &str;

    /// GET a text body. Non-2xx statuses are returned, not raised.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, LensError>;

    /// GET a body as a stream. Non-2xx statuses are a network failure.
    async fn stream(&self, url: &str, timeout: Duration) -> Result<MediaStream, LensError>;
}

/// Shared, explicitly passed session
pub type SharedTransport = Arc<dyn Transport>;

/// reqwest-backed transport with the platform header profile
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build the client for the given authentication mode
    pub fn new(auth: &AuthMode) -> Result<Self, LensError> {
        let cookies = match auth {
            AuthMode::Supplied(cookies) => cookies.clone(),
            AuthMode::CookieFile(path) => cookies::load_cookie_file(path)?,
            AuthMode::None => Vec::new(),
        };
        Self::with_cookies(&cookies)
    }

    pub fn with_cookies(session: &[SessionCookie]) -> Result<Self, LensError> {
        let mut client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers());

        if !session.is_empty() {
            client = client.cookie_provider(Arc::new(cookies::build_jar(session)));
        }

        let client = client
            .build()
            .map_err(|e| LensError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn into_shared(self) -> SharedTransport {
        Arc::new(self)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(REFERER, HeaderValue::from_static(PLATFORM_REFERER));
    headers.insert(ORIGIN, HeaderValue::from_static(PLATFORM_ORIGIN));
    headers
}

#[async_trait]
impl Transport for HttpTransport {
    fn user_agent(&self) -> &str {
        USER_AGENT
    }

    fn referer(&self) -> &str {
        PLATFORM_REFERER
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, LensError> {
        debug!("GET {}", url);
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }

    async fn stream(&self, url: &str, timeout: Duration) -> Result<MediaStream, LensError> {
        debug!("GET (stream) {}", url);
        let response = match tokio::time::timeout(timeout, self.client.get(url).send()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(LensError::NetworkFailure(format!(
                    "no response from {} within {:?}",
                    url, timeout
                )))
            }
        };

        if !response.status().is_success() {
            return Err(LensError::NetworkFailure(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let content_length = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(LensError::from))
            .boxed();

        Ok(MediaStream {
            content_length,
            chunks,
        })
    }
}
