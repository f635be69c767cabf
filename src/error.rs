use thiserror::Error;

/// Errors raised anywhere in the sampling pipeline.
///
/// Most of these never escape a run: the crawler skips pages that fail, and the
/// coordinator records stage errors and degrades to safe defaults.
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Timeout: request for {0} took longer than {1} seconds")]
    Timeout(String, u64),
    #[error("Not an HTML document: {0}")]
    NotHtml(String),
    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Similarity computation failed: {0}")]
    Similarity(String),
    #[error("Invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Inconsistent input: {0}")]
    InconsistentInput(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sampling run was cancelled")]
    Cancelled,
}

impl SamplerError {
    /// Whether the error comes from fetching a single page, as opposed to a
    /// problem with the run itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SamplerError::Http(_)
                | SamplerError::Status { .. }
                | SamplerError::Timeout(..)
                | SamplerError::NotHtml(_)
                | SamplerError::WebDriver(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SamplerError>;
