use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::depth::{CustomDepth, DepthLevel};

/// Configuration for page discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum number of pages to discover
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum number of hops from the start URL
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Timeout for a single page fetch, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for sitemap requests, in seconds
    #[serde(default = "default_sitemap_timeout_secs")]
    pub sitemap_timeout_secs: u64,

    /// Whether to follow links outside the start URL's registrable domain
    #[serde(default)]
    pub follow_external: bool,

    /// Additional registrable domains considered in scope
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Regex patterns for URLs to exclude, on top of the built-in exclusions
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Maximum number of concurrent fetches
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum number of links queued from a single page
    #[serde(default = "default_links_per_page")]
    pub links_per_page: usize,

    /// Whether to seed the queue from sitemap.xml and friends
    #[serde(default = "default_true")]
    pub use_sitemap: bool,

    /// Whether to try a WebDriver backend before plain HTTP
    #[serde(default = "default_true")]
    pub use_webdriver: bool,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// User agent for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Capture a screenshot of every discovered page (WebDriver only)
    #[serde(default)]
    pub capture_screenshots: bool,

    /// Where screenshots are written
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
}

/// Sampling strategy used by the page selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    #[default]
    WcagEm,
    Quick,
    Comprehensive,
    Custom,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::WcagEm => "wcag_em",
            SelectionStrategy::Quick => "quick",
            SelectionStrategy::Comprehensive => "comprehensive",
            SelectionStrategy::Custom => "custom",
        }
    }
}

/// Weights for the custom scoring strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CustomWeights {
    #[serde(default = "default_weight_priority")]
    pub priority: f64,
    #[serde(default = "default_weight_importance")]
    pub importance: f64,
    #[serde(default = "default_weight_uniqueness")]
    pub template_uniqueness: f64,
    #[serde(default = "default_weight_random")]
    pub random: f64,
}

impl Default for CustomWeights {
    fn default() -> Self {
        Self {
            priority: default_weight_priority(),
            importance: default_weight_importance(),
            template_uniqueness: default_weight_uniqueness(),
            random: default_weight_random(),
        }
    }
}

/// Configuration for page selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub strategy: SelectionStrategy,

    /// Upper bound on selected pages
    #[serde(default = "default_selected_max")]
    pub max_pages: usize,

    /// Selections smaller than this produce a validation warning
    #[serde(default = "default_selected_min")]
    pub min_pages: usize,

    /// Include every authentication/checkout page in WCAG-EM sampling
    #[serde(default)]
    pub include_all_critical: bool,

    /// Size of the WCAG-EM random sample
    #[serde(default = "default_random_sample_size")]
    pub random_sample_size: usize,

    #[serde(default)]
    pub weights: CustomWeights,

    /// Seed for the random sample and custom scores; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Configuration for analysis depth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSettings {
    /// Profile applied to every page; category presets when unset
    #[serde(default)]
    pub default_profile: Option<DepthLevel>,

    /// Settings used when the custom profile is requested
    #[serde(default)]
    pub custom_profile: CustomDepth,

    /// Total time budget in minutes
    #[serde(default)]
    pub time_budget_minutes: Option<f64>,

    /// Whether to fit the assignment to the time budget
    #[serde(default = "default_true")]
    pub optimize: bool,
}

/// Similarity metric used by the template detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    #[default]
    Auto,
    Cosine,
    Jaccard,
}

/// Configuration for template detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default)]
    pub similarity_method: SimilarityMethod,
}

/// Top-level configuration for a sampling run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub templates: TemplateConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub depth: DepthSettings,

    /// Directory for the persisted result, config and URL list
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl SamplerConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            templates: TemplateConfig::default(),
            selection: SelectionConfig::default(),
            depth: DepthSettings::default(),
            output_dir: None,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            timeout_secs: default_timeout_secs(),
            sitemap_timeout_secs: default_sitemap_timeout_secs(),
            follow_external: false,
            allowed_domains: Vec::new(),
            exclude_patterns: Vec::new(),
            max_concurrency: default_max_concurrency(),
            links_per_page: default_links_per_page(),
            use_sitemap: true,
            use_webdriver: true,
            webdriver_url: default_webdriver_url(),
            user_agent: default_user_agent(),
            capture_screenshots: false,
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            max_pages: default_selected_max(),
            min_pages: default_selected_min(),
            include_all_critical: false,
            random_sample_size: default_random_sample_size(),
            weights: CustomWeights::default(),
            seed: None,
        }
    }
}

impl Default for DepthSettings {
    fn default() -> Self {
        Self {
            default_profile: None,
            custom_profile: CustomDepth::default(),
            time_budget_minutes: None,
            optimize: true,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            similarity_method: SimilarityMethod::default(),
        }
    }
}

fn default_max_pages() -> usize {
    50
}

fn default_max_depth() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sitemap_timeout_secs() -> u64 {
    5
}

/// Default value for max_concurrency
fn default_max_concurrency() -> usize {
    4
}

fn default_links_per_page() -> usize {
    20
}

fn default_true() -> bool {
    true
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_user_agent() -> String {
    concat!("page-sampler/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

fn default_selected_max() -> usize {
    20
}

fn default_selected_min() -> usize {
    5
}

fn default_random_sample_size() -> usize {
    5
}

fn default_weight_priority() -> f64 {
    0.4
}

fn default_weight_importance() -> f64 {
    0.3
}

fn default_weight_uniqueness() -> f64 {
    0.2
}

fn default_weight_random() -> f64 {
    0.1
}

fn default_similarity_threshold() -> f64 {
    0.85
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = SamplerConfig::from_json("{}").unwrap();
        assert_eq!(config.discovery.max_pages, 50);
        assert_eq!(config.discovery.max_depth, 3);
        assert_eq!(config.selection.strategy, SelectionStrategy::WcagEm);
        assert_eq!(config.selection.max_pages, 20);
        assert!((config.templates.similarity_threshold - 0.85).abs() < f64::EPSILON);
        assert!(config.depth.optimize);
        assert!(config.depth.time_budget_minutes.is_none());
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "discovery": { "max_pages": 10, "follow_external": true },
            "selection": { "strategy": "comprehensive", "seed": 7 },
            "depth": { "default_profile": "basic", "time_budget_minutes": 30.0 }
        }"#;
        let config = SamplerConfig::from_json(json).unwrap();
        assert_eq!(config.discovery.max_pages, 10);
        assert!(config.discovery.follow_external);
        assert_eq!(config.discovery.max_depth, 3);
        assert_eq!(config.selection.strategy, SelectionStrategy::Comprehensive);
        assert_eq!(config.selection.seed, Some(7));
        assert_eq!(config.depth.default_profile, Some(DepthLevel::Basic));
        assert_eq!(config.depth.time_budget_minutes, Some(30.0));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampler.json");
        std::fs::write(&path, r#"{"templates": {"similarity_method": "jaccard"}}"#).unwrap();

        let config = SamplerConfig::from_file(&path).unwrap();
        assert_eq!(
            config.templates.similarity_method,
            SimilarityMethod::Jaccard
        );
    }
}
