use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Options for a single page fetch
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Ask the backend for a PNG screenshot; ignored by backends that cannot render
    pub capture_screenshot: bool,
}

/// A successfully fetched document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub screenshot: Option<Vec<u8>>,
}

/// Capability interface over the ways a page can be fetched.
///
/// A browser-backed implementation renders pages; the HTTP implementation is
/// the deterministic fallback. The rest of the pipeline does not care which
/// one is active.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Short backend name for logs and results
    fn name(&self) -> &'static str;

    /// Fetch an HTML page. Non-HTML responses are errors.
    async fn fetch_page(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage>;

    /// Fetch an auxiliary resource (robots.txt, sitemaps) without rendering
    async fn fetch_resource(&self, url: &str, timeout: Duration) -> Result<FetchedPage>;

    /// Release any held sessions
    async fn shutdown(&self) {}
}
