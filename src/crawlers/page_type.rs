use url::Url;

use crate::results::PageStructure;
use crate::utils::path_segment_count;

/// URL keywords for the provisional page type, checked in order
const URL_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "authentication",
        &[
            "login", "signin", "sign-in", "log-in", "register", "signup", "sign-up", "auth",
            "password",
        ],
    ),
    ("checkout", &["checkout", "cart", "basket", "payment", "billing"]),
    ("contact", &["contact", "contact-us", "support", "feedback"]),
    ("search", &["search", "find", "results"]),
    ("form", &["form", "apply", "subscribe", "booking", "quote", "survey"]),
    ("product", &["product", "products", "shop", "item", "store", "catalog"]),
    ("article", &["blog", "news", "article", "articles", "post", "posts", "story"]),
    (
        "legal",
        &[
            "privacy",
            "terms",
            "legal",
            "cookies",
            "cookie-policy",
            "disclaimer",
            "accessibility",
        ],
    ),
    ("about", &["about", "about-us", "team", "company", "careers"]),
    ("media", &["video", "videos", "gallery", "media", "podcast"]),
    ("navigation", &["sitemap", "category", "categories", "tag", "tags", "archive"]),
];

const HOME_PATHS: &[&str] = &["/", "/index.html", "/index.htm", "/index.php", "/home"];

/// Base score per provisional page type
pub fn type_base_score(page_type: &str) -> i64 {
    match page_type {
        "homepage" => 100,
        "authentication" | "checkout" => 85,
        "form" => 75,
        "contact" => 70,
        "search" => 65,
        "product" => 60,
        "navigation" | "media" => 55,
        "article" => 50,
        "about" => 45,
        _ => 40,
    }
}

/// Provisional page type: URL keywords first, then content heuristics
pub fn classify_page_type(url: &Url, structure: &PageStructure) -> String {
    classify_by_url(url)
        .unwrap_or_else(|| classify_by_content(structure))
        .to_string()
}

/// Page type implied by the URL alone
pub fn classify_by_url(url: &Url) -> Option<&'static str> {
    let path = url.path().to_ascii_lowercase();
    if HOME_PATHS.contains(&path.as_str()) {
        return Some("homepage");
    }

    let words: Vec<&str> = path
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    URL_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|k| {
                if k.contains('-') {
                    path.contains(k)
                } else {
                    words.contains(k)
                }
            })
        })
        .map(|(page_type, _)| *page_type)
}

fn classify_by_content(structure: &PageStructure) -> &'static str {
    if structure.has_password_input {
        "authentication"
    } else if structure.has_product_markers {
        "product"
    } else if structure.has_article_markers {
        "article"
    } else if structure.forms > 0 {
        "form"
    } else {
        "general"
    }
}

/// `typeBaseScore - 15*depth + 15 if in sitemap + 10 if shallow path`, clamped to 0..=100
pub fn compute_priority(page_type: &str, depth: usize, in_sitemap: bool, url: &Url) -> u32 {
    let mut score = type_base_score(page_type) - 15 * depth as i64;
    if in_sitemap {
        score += 15;
    }
    if path_segment_count(url) <= 1 {
        score += 10;
    }
    score.clamp(0, 100) as u32
}
