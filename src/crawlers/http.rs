use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, redirect};
use std::time::Duration;

use crate::crawlers::crawler::{FetchOptions, FetchedPage, PageFetcher};
use crate::error::{Result, SamplerError};
use crate::parsers::ParserType;

/// Plain HTTP fetcher, used when no WebDriver session is available
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SamplerError::Timeout(url.to_string(), timeout.as_secs())
                } else {
                    SamplerError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SamplerError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
            screenshot: None,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_page(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage> {
        let page = self.get(url, options.timeout).await?;

        let parser_type = ParserType::from_content_type(page.content_type.as_deref(), &page.url);
        if !parser_type.should_extract_links() {
            return Err(SamplerError::NotHtml(url.to_string()));
        }
        if options.capture_screenshot {
            ::log::trace!("HTTP backend cannot capture screenshots, skipping {}", url);
        }
        Ok(page)
    }

    async fn fetch_resource(&self, url: &str, timeout: Duration) -> Result<FetchedPage> {
        self.get(url, timeout).await
    }
}
