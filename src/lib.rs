// Re-export modules
pub mod categorizer;
pub mod config;
pub mod coordinator;
pub mod crawlers;
pub mod depth;
pub mod error;
pub mod events;
pub mod filter;
pub mod parsers;
pub mod results;
pub mod selector;
pub mod templates;
pub mod utils;

// Re-export commonly used types for convenience
pub use categorizer::Category;
pub use config::{SamplerConfig, SelectionStrategy};
pub use coordinator::{Coordinator, SamplerResult, ScannerConfig};
pub use error::{Result, SamplerError};
pub use events::{ProgressEvent, SamplerStage};
pub use results::DiscoveredPage;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crawlers::PageFetcher;
use events::ProgressReporter;

/// Main builder for a sampling run
pub struct Sampler {
    config: SamplerConfig,
    fetcher: Option<Arc<dyn PageFetcher>>,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler {
    /// Create a new Sampler with default configuration
    pub fn new() -> Self {
        Self {
            config: SamplerConfig::default(),
            fetcher: None,
            progress: ProgressReporter::disabled(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(
        self,
        path: impl AsRef<std::path::Path>,
    ) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let config = SamplerConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(
        self,
        config_str: &str,
    ) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let config = SamplerConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    /// Set the maximum number of pages to discover
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.discovery.max_pages = max_pages;
        self
    }

    /// Set the maximum number of concurrent fetches
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.discovery.max_concurrency = max_concurrency;
        self
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.config.selection.strategy = strategy;
        self
    }

    /// Set the total analysis time budget in minutes
    pub fn with_time_budget(mut self, minutes: f64) -> Self {
        self.config.depth.time_budget_minutes = Some(minutes);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    /// Use a specific fetch backend rather than connecting one at run time
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Send progress events to this channel
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = ProgressReporter::new(sender);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run discovery, template detection, categorization, selection and
    /// budgeting for `start_url`
    pub async fn run(self, start_url: &str) -> SamplerResult {
        let mut config = self.config;

        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.discovery.webdriver_url = webdriver_url;
            }
        }

        let mut coordinator = Coordinator::new(config)
            .with_progress(self.progress)
            .with_cancellation(self.cancel);
        if let Some(fetcher) = self.fetcher {
            coordinator = coordinator.with_fetcher(fetcher);
        }
        coordinator.run(start_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let sampler = Sampler::new()
            .with_config_str(r#"{"discovery": {"max_pages": 12}}"#)
            .unwrap()
            .with_max_concurrency(2)
            .with_strategy(SelectionStrategy::Quick)
            .with_time_budget(45.0)
            .with_output_dir("out");

        let config = sampler.config();
        assert_eq!(config.discovery.max_pages, 12);
        assert_eq!(config.discovery.max_concurrency, 2);
        assert_eq!(config.selection.strategy, SelectionStrategy::Quick);
        assert_eq!(config.depth.time_budget_minutes, Some(45.0));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_bad_config_string() {
        assert!(Sampler::new().with_config_str("{not json").is_err());
    }
}
