use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Result, SamplerError};
use crate::results::DiscoveredPage;

/// Functional category of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Homepage,
    Authentication,
    Checkout,
    Contact,
    Form,
    Search,
    Product,
    Article,
    Navigation,
    Media,
    Legal,
    About,
    General,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Homepage,
        Category::Authentication,
        Category::Checkout,
        Category::Contact,
        Category::Form,
        Category::Search,
        Category::Product,
        Category::Article,
        Category::Navigation,
        Category::Media,
        Category::Legal,
        Category::About,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Homepage => "homepage",
            Category::Authentication => "authentication",
            Category::Checkout => "checkout",
            Category::Contact => "contact",
            Category::Form => "form",
            Category::Search => "search",
            Category::Product => "product",
            Category::Article => "article",
            Category::Navigation => "navigation",
            Category::Media => "media",
            Category::Legal => "legal",
            Category::About => "about",
            Category::General => "general",
        }
    }

    /// Static weight used as the base of a page's importance
    pub fn priority_weight(&self) -> u32 {
        match self {
            Category::Homepage => 100,
            Category::Checkout => 95,
            Category::Authentication => 90,
            Category::Form => 85,
            Category::Contact => 80,
            Category::Search => 75,
            Category::Product => 70,
            Category::Media => 65,
            Category::Navigation => 60,
            Category::Article => 50,
            Category::About => 45,
            Category::Legal => 40,
            Category::General => 30,
        }
    }

    /// WCAG success criteria most relevant to pages of this kind, for reporting
    pub fn wcag_criteria(&self) -> &'static [&'static str] {
        match self {
            Category::Homepage => &["1.1.1", "1.3.1", "2.4.1", "2.4.2", "2.4.4", "3.1.1"],
            Category::Authentication => &["1.3.5", "2.2.1", "3.3.1", "3.3.2", "3.3.8", "4.1.2"],
            Category::Checkout => &["1.3.5", "2.2.1", "3.3.1", "3.3.2", "3.3.3", "3.3.4"],
            Category::Contact => &["1.3.1", "1.3.5", "3.3.1", "3.3.2", "4.1.2"],
            Category::Form => &["1.3.1", "1.3.5", "2.4.6", "3.3.1", "3.3.2", "4.1.2"],
            Category::Search => &["2.4.5", "3.3.2", "4.1.2", "4.1.3"],
            Category::Product => &["1.1.1", "1.4.3", "2.4.4", "4.1.2"],
            Category::Article => &["1.3.1", "1.4.3", "2.4.6", "3.1.2"],
            Category::Navigation => &["2.4.1", "2.4.3", "2.4.5", "3.2.3"],
            Category::Media => &["1.1.1", "1.2.1", "1.2.2", "1.2.3", "1.2.5", "2.2.2"],
            Category::Legal => &["1.3.1", "1.4.3", "2.4.6"],
            Category::About => &["1.1.1", "1.3.1", "1.4.3"],
            Category::General => &["1.1.1", "1.3.1", "1.4.3", "2.4.4"],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == tag)
            .ok_or_else(|| SamplerError::InvalidConfig(format!("unknown category: {}", s)))
    }
}

/// How a category was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorizationMethod {
    Explicit,
    UrlPattern,
    Content,
}

/// Details attached to a categorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub method: CategorizationMethod,
    pub priority_weight: u32,
    pub wcag_criteria: Vec<String>,
}

/// URL-path patterns per category, matched in order against the lowercased path
const URL_PATTERNS: &[(Category, &str)] = &[
    (Category::Homepage, r"^/?$|^/(index\.(html?|php)|home)/?$"),
    (
        Category::Authentication,
        r"(^|/)(login|log-in|signin|sign-in|logon|register|registration|signup|sign-up|auth|sso|forgot-password|reset-password|password)([/._-]|$)",
    ),
    (
        Category::Checkout,
        r"(^|/)(checkout|cart|basket|bag|payment|billing|shipping|order-confirmation)([/._-]|$)",
    ),
    (
        Category::Contact,
        r"(^|/)(contact|contact-us|contactus|support|help|feedback|get-in-touch)([/._-]|$)",
    ),
    (
        Category::Form,
        r"(^|/)(form|forms|apply|application|subscribe|newsletter|booking|book|quote|survey|rsvp)([/._-]|$)",
    ),
    (Category::Search, r"(^|/)(search|find|results|query)([/._-]|$)"),
    (
        Category::Product,
        r"(^|/)(product|products|shop|store|item|items|catalog|catalogue|p)(/|$)",
    ),
    (
        Category::Article,
        r"(^|/)(blog|news|article|articles|post|posts|story|stories|press)(/|$)",
    ),
    (
        Category::Navigation,
        r"(^|/)(sitemap|category|categories|tag|tags|archive|archives|directory|index)([/.]|$)",
    ),
    (
        Category::Media,
        r"(^|/)(video|videos|gallery|galleries|media|podcast|podcasts|photos|watch)(/|$)",
    ),
    (
        Category::Legal,
        r"(^|/)(privacy|privacy-policy|terms|terms-of-service|terms-and-conditions|legal|cookies|cookie-policy|disclaimer|accessibility|imprint)([/.]|$)",
    ),
    (
        Category::About,
        r"(^|/)(about|about-us|team|our-team|company|careers|mission|history)([/.]|$)",
    ),
];

/// Rule and heuristic based page categorization
pub struct Categorizer {
    patterns: Vec<(Category, Regex)>,
}

impl Categorizer {
    pub fn new() -> Result<Self> {
        let patterns = URL_PATTERNS
            .iter()
            .map(|(category, pattern)| Ok((*category, Regex::new(pattern)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Resolve a page's category: explicit tag, then URL pattern, then content
    pub fn categorize(&self, page: &DiscoveredPage) -> (Category, CategoryInfo) {
        let (category, method) = self.resolve(page);
        let info = CategoryInfo {
            method,
            priority_weight: category.priority_weight(),
            wcag_criteria: category
                .wcag_criteria()
                .iter()
                .map(|c| c.to_string())
                .collect(),
        };
        (category, info)
    }

    fn resolve(&self, page: &DiscoveredPage) -> (Category, CategorizationMethod) {
        if let Ok(category) = page.page_type.parse::<Category>() {
            if category != Category::General {
                return (category, CategorizationMethod::Explicit);
            }
        }

        if let Some(category) = self.match_url(&page.url) {
            return (category, CategorizationMethod::UrlPattern);
        }

        (content_category(page), CategorizationMethod::Content)
    }

    /// First URL pattern matching the page's path
    pub fn match_url(&self, url: &str) -> Option<Category> {
        let path = Url::parse(url)
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_else(|_| url.to_ascii_lowercase());

        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(&path))
            .map(|(category, _)| *category)
    }

    /// Categorize every page, keyed by URL
    pub fn categorize_all(&self, pages: &[DiscoveredPage]) -> HashMap<String, Category> {
        pages
            .iter()
            .map(|p| (p.url.clone(), self.categorize(p).0))
            .collect()
    }
}

fn content_category(page: &DiscoveredPage) -> Category {
    let s = &page.structure;
    if s.has_password_input {
        Category::Authentication
    } else if s.inputs > 5 {
        Category::Form
    } else if s.inputs >= 3 {
        Category::Contact
    } else if s.videos >= 1 {
        Category::Media
    } else if s.has_product_markers {
        Category::Product
    } else if s.has_article_markers {
        Category::Article
    } else {
        Category::General
    }
}

/// Importance of a page given its resolved category, clamped to 0-100
pub fn importance_for(page: &DiscoveredPage, category: Category) -> u32 {
    let s = &page.structure;
    let mut score = category.priority_weight() as i64;
    score += (s.forms as i64 * 10).min(20);
    score += (s.inputs as i64 * 2).min(10);
    score += (s.buttons as i64 * 2).min(10);
    score += (s.videos as i64 * 5).min(10);
    score += (s.images as i64).min(5);

    for (flag, bonus) in [(s.has_h1, 5), (s.has_nav, 5), (s.has_main, 3), (s.has_footer, 2)] {
        if flag {
            score += bonus;
        }
    }

    score -= page.depth as i64 * 5;
    score.clamp(0, 100) as u32
}

/// Number of pages per category
pub fn category_distribution(categories: &HashMap<String, Category>) -> BTreeMap<Category, usize> {
    let mut distribution = BTreeMap::new();
    for category in categories.values() {
        *distribution.entry(*category).or_insert(0) += 1;
    }
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::PageStructure;

    fn page(url: &str, page_type: &str, structure: PageStructure) -> DiscoveredPage {
        DiscoveredPage::new(url.to_string(), page_type.to_string(), 1, 50).with_structure(structure)
    }

    #[test]
    fn test_explicit_tag_wins() {
        let categorizer = Categorizer::new().unwrap();
        let tagged = page("https://e.com/blog/x", "checkout", PageStructure::default());
        let (category, info) = categorizer.categorize(&tagged);
        assert_eq!(category, Category::Checkout);
        assert_eq!(info.method, CategorizationMethod::Explicit);
        assert_eq!(info.priority_weight, 95);
        assert!(!info.wcag_criteria.is_empty());
    }

    #[test]
    fn test_general_tag_falls_through_to_url() {
        let categorizer = Categorizer::new().unwrap();
        let general = page("https://e.com/blog/x", "general", PageStructure::default());
        let (category, info) = categorizer.categorize(&general);
        assert_eq!(category, Category::Article);
        assert_eq!(info.method, CategorizationMethod::UrlPattern);

        let unknown = page("https://e.com/blog/x", "widget", PageStructure::default());
        let (category, _) = categorizer.categorize(&unknown);
        assert_eq!(category, Category::Article);
    }

    #[test]
    fn test_url_patterns_in_order() {
        let categorizer = Categorizer::new().unwrap();
        let cases = [
            ("https://e.com/", Category::Homepage),
            ("https://e.com/index.html", Category::Homepage),
            ("https://e.com/account/login", Category::Authentication),
            ("https://e.com/shop/cart", Category::Checkout),
            ("https://e.com/contact-us", Category::Contact),
            ("https://e.com/newsletter", Category::Form),
            ("https://e.com/search", Category::Search),
            ("https://e.com/products/chair-12", Category::Product),
            ("https://e.com/news/2024/launch", Category::Article),
            ("https://e.com/tags/rust", Category::Navigation),
            ("https://e.com/gallery", Category::Media),
            ("https://e.com/privacy-policy", Category::Legal),
            ("https://e.com/about-us", Category::About),
        ];
        for (url, expected) in cases {
            assert_eq!(categorizer.match_url(url), Some(expected), "{url}");
        }
        assert_eq!(categorizer.match_url("https://e.com/widgets/blue"), None);
    }

    #[test]
    fn test_content_heuristics_order() {
        let categorizer = Categorizer::new().unwrap();
        let url = "https://e.com/x/y";
        let check =
            |structure: PageStructure| categorizer.categorize(&page(url, "general", structure)).0;

        let login = PageStructure {
            has_password_input: true,
            inputs: 9,
            ..Default::default()
        };
        assert_eq!(check(login), Category::Authentication);

        let form = PageStructure {
            inputs: 6,
            videos: 2,
            ..Default::default()
        };
        assert_eq!(check(form), Category::Form);

        let contact = PageStructure {
            inputs: 3,
            ..Default::default()
        };
        assert_eq!(check(contact), Category::Contact);

        let video_product = PageStructure {
            videos: 1,
            has_product_markers: true,
            ..Default::default()
        };
        assert_eq!(check(video_product), Category::Media);

        let product_article = PageStructure {
            has_product_markers: true,
            has_article_markers: true,
            ..Default::default()
        };
        assert_eq!(check(product_article), Category::Product);

        let article = PageStructure {
            has_article_markers: true,
            ..Default::default()
        };
        assert_eq!(check(article), Category::Article);
        assert_eq!(check(PageStructure::default()), Category::General);
    }

    #[test]
    fn test_categorization_is_deterministic() {
        let categorizer = Categorizer::new().unwrap();
        let structure = PageStructure {
            inputs: 4,
            ..Default::default()
        };
        let p = page("https://e.com/x", "general", structure);
        assert_eq!(categorizer.categorize(&p), categorizer.categorize(&p));
    }

    #[test]
    fn test_importance_formula() {
        let mut p = page(
            "https://e.com/x",
            "general",
            PageStructure {
                forms: 3,
                inputs: 2,
                buttons: 1,
                images: 8,
                has_h1: true,
                has_footer: true,
                ..Default::default()
            },
        );
        p.depth = 2;
        // 30 + 20 + 4 + 2 + 0 + 5 + 5 + 2 - 10
        assert_eq!(importance_for(&p, Category::General), 58);
        // clamped at 100
        assert_eq!(importance_for(&p, Category::Homepage), 100);

        p.depth = 40;
        assert_eq!(importance_for(&p, Category::General), 0);
    }

    #[test]
    fn test_distribution() {
        let categories = HashMap::from([
            ("a".to_string(), Category::Product),
            ("b".to_string(), Category::Product),
            ("c".to_string(), Category::Homepage),
        ]);
        let distribution = category_distribution(&categories);
        assert_eq!(distribution[&Category::Product], 2);
        assert_eq!(distribution[&Category::Homepage], 1);
        assert!(!distribution.contains_key(&Category::General));
    }

    #[test]
    fn test_parse_category() {
        assert_eq!("Legal".parse::<Category>().unwrap(), Category::Legal);
        assert!("nonsense".parse::<Category>().is_err());
        assert_eq!(Category::ALL.len(), 13);
    }
}
