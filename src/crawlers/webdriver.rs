use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::config::DiscoveryConfig;
use crate::crawlers::crawler::{FetchOptions, FetchedPage, PageFetcher};
use crate::crawlers::http::HttpFetcher;
use crate::error::{Result, SamplerError};

/// Endpoints tried when the configured WebDriver URL does not answer
const FALLBACK_WEBDRIVER_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // geckodriver / Selenium default
    "http://127.0.0.1:4444",
];

/// Browser-backed fetcher. Sessions are pooled and opened lazily, one per
/// concurrent fetch.
pub struct WebDriverFetcher {
    webdriver_url: String,
    sessions: Mutex<Vec<Client>>,
    http: HttpFetcher,
}

impl WebDriverFetcher {
    /// Open a first session, failing if no WebDriver server answers
    pub async fn connect(webdriver_url: &str, http: HttpFetcher) -> Result<Self> {
        let (client, url) = connect_to_webdriver(webdriver_url).await.ok_or_else(|| {
            SamplerError::BackendUnavailable(format!("no WebDriver server at {webdriver_url}"))
        })?;

        Ok(Self {
            webdriver_url: url,
            sessions: Mutex::new(vec![client]),
            http,
        })
    }

    async fn checkout(&self) -> Result<Client> {
        if let Some(client) = self.sessions.lock().await.pop() {
            return Ok(client);
        }
        ::log::debug!("Opening additional WebDriver session");
        open_session(&self.webdriver_url)
            .await
            .map_err(|e| SamplerError::BackendUnavailable(e.to_string()))
    }

    async fn checkin(&self, client: Client) {
        self.sessions.lock().await.push(client);
    }

    async fn render(client: &Client, url: &str, capture_screenshot: bool) -> Result<FetchedPage> {
        client.goto(url).await?;
        let body = client.source().await?;
        let final_url = client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        let screenshot = if capture_screenshot {
            match client.screenshot().await {
                Ok(png) => Some(png),
                Err(e) => {
                    ::log::debug!("Screenshot failed for {}: {}", url, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(FetchedPage {
            url: final_url,
            // WebDriver does not expose the response status
            status: 200,
            content_type: Some("text/html".to_string()),
            body,
            screenshot,
        })
    }
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    fn name(&self) -> &'static str {
        "webdriver"
    }

    async fn fetch_page(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage> {
        let client = self.checkout().await?;

        let outcome = timeout(
            options.timeout,
            Self::render(&client, url, options.capture_screenshot),
        )
        .await;

        match outcome {
            Ok(Ok(page)) => {
                self.checkin(client).await;
                Ok(page)
            }
            Ok(Err(e)) => {
                let lost_session = matches!(
                    &e,
                    SamplerError::WebDriver(cmd) if cmd.to_string().contains("session")
                );
                if lost_session {
                    ::log::warn!("Lost WebDriver session while loading {}", url);
                    if let Err(close_err) = client.close().await {
                        ::log::debug!("Failed to close broken session: {}", close_err);
                    }
                } else {
                    self.checkin(client).await;
                }
                Err(e)
            }
            Err(_) => {
                // The session may still be busy with the navigation
                if let Err(e) = client.close().await {
                    ::log::debug!("Failed to close timed out session: {}", e);
                }
                Err(SamplerError::Timeout(
                    url.to_string(),
                    options.timeout.as_secs(),
                ))
            }
        }
    }

    async fn fetch_resource(&self, url: &str, timeout: Duration) -> Result<FetchedPage> {
        self.http.fetch_resource(url, timeout).await
    }

    async fn shutdown(&self) {
        let sessions = std::mem::take(&mut *self.sessions.lock().await);
        for client in sessions {
            if let Err(e) = client.close().await {
                ::log::warn!("Failed to close WebDriver session: {}", e);
            }
        }
    }
}

fn headless_capabilities() -> serde_json::Map<String, Value> {
    let mut capabilities = serde_json::Map::new();
    capabilities.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": ["--headless=new", "--disable-gpu"] }),
    );
    capabilities.insert(
        "moz:firefoxOptions".to_string(),
        json!({ "args": ["-headless"] }),
    );
    capabilities
}

async fn open_session(
    webdriver_url: &str,
) -> std::result::Result<Client, fantoccini::error::NewSessionError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(headless_capabilities());
    builder.connect(webdriver_url).await
}

/// Connects to the WebDriver instance, trying common alternative endpoints
async fn connect_to_webdriver(webdriver_url: &str) -> Option<(Client, String)> {
    match open_session(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Some((client, webdriver_url.to_string()));
        }
        Err(e) => {
            ::log::warn!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
        }
    }

    for url in FALLBACK_WEBDRIVER_URLS.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = open_session(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Some((client, url.to_string()));
        }
    }

    None
}

/// Pick the fetch backend for a run: WebDriver when requested and reachable,
/// plain HTTP otherwise.
pub async fn connect_fetcher(config: &DiscoveryConfig) -> Result<Arc<dyn PageFetcher>> {
    let http = HttpFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.timeout_secs.max(1)),
    )?;

    if config.use_webdriver {
        match WebDriverFetcher::connect(&config.webdriver_url, http.clone()).await {
            Ok(fetcher) => {
                ::log::info!("Using WebDriver backend at {}", fetcher.webdriver_url);
                return Ok(Arc::new(fetcher));
            }
            Err(e) => {
                ::log::warn!("{}; falling back to plain HTTP fetching", e);
            }
        }
    }

    ::log::info!("Using HTTP backend");
    Ok(Arc::new(http))
}
