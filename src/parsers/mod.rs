pub mod html;
pub mod sitemap;

#[cfg(test)]
mod tests;

use crate::results::PageStructure;

/// Enum to represent different types of fetched content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserType {
    /// HTML document
    Html,
    /// XML sitemap or sitemap index
    SitemapXml,
    /// Plain-text sitemap, one URL per line
    SitemapText,
    /// Anything we do not parse
    Other,
}

impl ParserType {
    /// Determines the parser type based on the URL
    pub fn from_url(url: &str) -> Self {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_ascii_lowercase();

        if path.ends_with(".xml") || path.ends_with(".xml.gz") {
            ::log::trace!("Classifying as sitemap XML: {}", url);
            ParserType::SitemapXml
        } else if path.ends_with(".txt") {
            ::log::trace!("Classifying as sitemap text: {}", url);
            ParserType::SitemapText
        } else if [".jpg", ".jpeg", ".png", ".gif", ".css", ".js", ".pdf", ".zip"]
            .iter()
            .any(|ext| path.ends_with(ext))
        {
            ParserType::Other
        } else {
            ParserType::Html
        }
    }

    /// Narrows the type using a response's content type, when one is known
    pub fn from_content_type(content_type: Option<&str>, url: &str) -> Self {
        let by_url = Self::from_url(url);
        let Some(content_type) = content_type else {
            return by_url;
        };
        let content_type = content_type.to_ascii_lowercase();

        if content_type.contains("html") {
            ParserType::Html
        } else if content_type.contains("xml") {
            ParserType::SitemapXml
        } else if content_type.starts_with("text/plain") && by_url == ParserType::SitemapText {
            ParserType::SitemapText
        } else {
            ParserType::Other
        }
    }

    /// Returns if the parser should extract links
    pub fn should_extract_links(&self) -> bool {
        matches!(self, ParserType::Html)
    }
}

/// Everything the crawler keeps from one HTML document
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub structure: PageStructure,
    /// Empty when the document has no body elements
    pub fingerprint: Option<String>,
    /// Raw `href` values in document order
    pub links: Vec<String>,
}
