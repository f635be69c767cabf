use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SamplerError};
use crate::utils::registrable_domain;

/// Exclusions applied to every crawl, before user-supplied patterns
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    // Binary, media and asset files
    r"(?i)\.(jpe?g|png|gif|webp|bmp|svg|ico|css|js|mjs|map|json|xml|rss|atom|pdf|docx?|xlsx?|pptx?|zip|gz|tar|rar|7z|exe|dmg|mp3|mp4|m4a|wav|avi|mov|webm|ogg|woff2?|ttf|eot)$",
    // Non-navigational schemes
    r"(?i)^(mailto|tel|javascript|data|ftp):",
    // Session-ending and back-office paths
    r"(?i)/(logout|log-out|signout|sign-out)(/|$)",
    r"(?i)/(wp-admin|admin|administrator)(/|$)",
    r"(?i)/(api|graphql|wp-json)(/|$)",
    r"(?i)/cdn-cgi/",
];

/// Configuration for URL filtering in the crawler
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UrlFilterConfig {
    /// Whether to allow crawling external domains/sites
    #[serde(default)]
    pub follow_external: bool,

    /// Registrable domain of the start URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_domain: Option<String>,

    /// Additional registrable domains treated as in scope
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Regex patterns for URLs to exclude, on top of the defaults
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// URL filter that uses regex patterns and scope rules to decide which URLs to crawl
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    exclude_regexes: Vec<Regex>,
}

impl Default for UrlFilter {
    fn default() -> Self {
        let exclude_regexes = DEFAULT_EXCLUDE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("default exclusion patterns are valid"))
            .collect();
        Self {
            config: UrlFilterConfig::default(),
            exclude_regexes,
        }
    }
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self> {
        let mut exclude_regexes =
            Vec::with_capacity(DEFAULT_EXCLUDE_PATTERNS.len() + config.exclude_patterns.len());
        for pattern in DEFAULT_EXCLUDE_PATTERNS {
            exclude_regexes.push(Regex::new(pattern)?);
        }
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        let config = UrlFilterConfig {
            root_domain: config.root_domain.as_deref().map(registrable_domain),
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| registrable_domain(d))
                .collect(),
            ..config
        };

        Ok(Self {
            config,
            exclude_regexes,
        })
    }

    /// Build a filter scoped to the registrable domain of `root_url`
    pub fn for_root(
        root_url: &Url,
        follow_external: bool,
        allowed_domains: &[String],
        exclude_patterns: &[String],
    ) -> Result<Self> {
        Self::new(UrlFilterConfig {
            follow_external,
            root_domain: root_url.host_str().map(str::to_string),
            allowed_domains: allowed_domains.to_vec(),
            exclude_patterns: exclude_patterns.to_vec(),
        })
    }

    /// Determine if a URL should be crawled based on all filtering rules
    pub fn should_crawl(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if !self.is_in_domain_scope(url) {
            return false;
        }

        // Path patterns anchor at the end, so test the query-free form as well
        !self.is_excluded(url.as_str()) && !self.is_excluded(canonicalize(url).as_str())
    }

    /// Whether a raw link matches any exclusion pattern
    pub fn is_excluded(&self, link: &str) -> bool {
        self.exclude_regexes.iter().any(|regex| regex.is_match(link))
    }

    /// Check if a URL is within the allowed domain scope
    fn is_in_domain_scope(&self, url: &Url) -> bool {
        if self.config.follow_external {
            return true;
        }

        let Some(host) = url.host_str() else {
            return false;
        };
        let domain = registrable_domain(host);

        if self.config.root_domain.as_deref() == Some(domain.as_str()) {
            return true;
        }
        self.config.allowed_domains.iter().any(|d| *d == domain)
    }

    /// Create a normalized version of the URL
    pub fn normalize_url(&self, url: &Url) -> Url {
        canonicalize(url)
    }
}

/// Canonical form of a URL: fragment and query dropped, trailing slash removed
/// except on the root path. Scheme/host case and default ports are already
/// normalized by the `url` parser.
pub fn canonicalize(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.set_query(None);

    let path = normalized.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        normalized.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }
    normalized
}

/// Parse and canonicalize a URL string
pub fn normalize_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).map_err(|e| SamplerError::InvalidUrl(format!("{raw}: {e}")))?;
    Ok(canonicalize(&url).to_string())
}
