use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Element counts and landmark flags extracted from a page's markup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStructure {
    pub forms: usize,
    pub inputs: usize,
    pub buttons: usize,
    pub images: usize,
    pub videos: usize,
    pub links: usize,

    pub has_h1: bool,
    pub has_nav: bool,
    pub has_main: bool,
    pub has_footer: bool,

    /// At least one `input[type=password]`
    pub has_password_input: bool,
    /// Product-like classes or microdata (prices, add-to-cart, ...)
    pub has_product_markers: bool,
    /// `<article>` or article-like classes/microdata
    pub has_article_markers: bool,
}

impl PageStructure {
    /// Forms, inputs and buttons taken together
    pub fn interactive_elements(&self) -> usize {
        self.forms + self.inputs + self.buttons
    }

    /// Videos plus one for every five images
    pub fn media_elements(&self) -> usize {
        self.videos + self.images / 5
    }
}

/// Represents a discovered page with its URL and structural metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPage {
    /// Canonical URL of the page
    pub url: String,

    /// Title of the page (if available)
    pub title: Option<String>,

    /// Meta description (if available)
    pub description: Option<String>,

    /// Provisional page type assigned during the crawl
    pub page_type: String,

    /// Hops from the start URL
    pub depth: usize,

    /// Heuristic crawl priority, 0-100
    pub priority: u32,

    pub discovered_at: DateTime<Utc>,

    #[serde(flatten)]
    pub structure: PageStructure,

    /// Declared document language
    pub language: Option<String>,

    /// Structural fingerprint of the markup
    pub fingerprint: Option<String>,

    /// Whether the URL was listed in a sitemap
    #[serde(default)]
    pub in_sitemap: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

impl DiscoveredPage {
    /// Create a new page with empty structure
    pub fn new(url: String, page_type: String, depth: usize, priority: u32) -> Self {
        Self {
            url,
            title: None,
            description: None,
            page_type,
            depth,
            priority,
            discovered_at: Utc::now(),
            structure: PageStructure::default(),
            language: None,
            fingerprint: None,
            in_sitemap: false,
            screenshot: None,
        }
    }

    /// Builder-style setter for the structure, mostly used by tests
    pub fn with_structure(mut self, structure: PageStructure) -> Self {
        self.structure = structure;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }
}
