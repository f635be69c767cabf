use crate::parsers::PageExtract;
use crate::results::PageStructure;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Elements inspected when building a fingerprint
pub const FINGERPRINT_ELEMENT_LIMIT: usize = 100;
/// Tokens kept in a fingerprint
pub const FINGERPRINT_TOKEN_LIMIT: usize = 50;
/// Separator between fingerprint tokens
pub const FINGERPRINT_DELIMITER: &str = "|";

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

struct Selectors {
    title: Selector,
    description: Selector,
    html: Selector,
    body_elements: Selector,
    links: Selector,
    forms: Selector,
    inputs: Selector,
    buttons: Selector,
    images: Selector,
    videos: Selector,
    h1: Selector,
    nav: Selector,
    main: Selector,
    footer: Selector,
    password: Selector,
    product: Selector,
    article: Selector,
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    title: sel("title"),
    description: sel(r#"meta[name="description"], meta[property="og:description"]"#),
    html: sel("html"),
    body_elements: sel("body *"),
    links: sel("a[href]"),
    forms: sel("form"),
    inputs: sel(concat!(
        r#"input:not([type="hidden"]):not([type="submit"]):not([type="button"])"#,
        r#":not([type="reset"]), textarea, select"#,
    )),
    buttons: sel(
        r#"button, input[type="submit"], input[type="button"], input[type="reset"], [role="button"]"#,
    ),
    images: sel("img"),
    videos: sel(r#"video, iframe[src*="youtube"], iframe[src*="vimeo"]"#),
    h1: sel("h1"),
    nav: sel(r#"nav, [role="navigation"]"#),
    main: sel(r#"main, [role="main"]"#),
    footer: sel(r#"footer, [role="contentinfo"]"#),
    password: sel(r#"input[type="password"]"#),
    product: sel(
        r#"[itemtype*="Product"], [class*="product"], [class*="price"], [class*="add-to-cart"], [data-product-id]"#,
    ),
    article: sel(
        r#"article, [itemtype*="Article"], [itemtype*="BlogPosting"], [class*="post-content"], [class*="article-body"], [class*="entry-content"]"#,
    ),
});

/// Parses an HTML document into the metadata the crawler keeps
pub fn parse(html: &str) -> PageExtract {
    let doc = Html::parse_document(html);
    let s = &*SELECTORS;

    let title = doc
        .select(&s.title)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let description = doc
        .select(&s.description)
        .filter_map(|m| m.value().attr("content"))
        .map(collapse_whitespace)
        .find(|d| !d.is_empty());

    let language = doc
        .select(&s.html)
        .next()
        .and_then(|h| h.value().attr("lang"))
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let links = doc
        .select(&s.links)
        .filter_map(|e| e.value().attr("href"))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty() && !h.starts_with('#'))
        .collect::<Vec<String>>();

    let structure = PageStructure {
        forms: doc.select(&s.forms).count(),
        inputs: doc.select(&s.inputs).count(),
        buttons: doc.select(&s.buttons).count(),
        images: doc.select(&s.images).count(),
        videos: doc.select(&s.videos).count(),
        links: links.len(),
        has_h1: doc.select(&s.h1).next().is_some(),
        has_nav: doc.select(&s.nav).next().is_some(),
        has_main: doc.select(&s.main).next().is_some(),
        has_footer: doc.select(&s.footer).next().is_some(),
        has_password_input: doc.select(&s.password).next().is_some(),
        has_product_markers: doc.select(&s.product).next().is_some(),
        has_article_markers: doc.select(&s.article).next().is_some(),
    };

    let fingerprint = fingerprint(&doc);

    ::log::debug!(
        "HTML parser found {} links, {} forms, {} inputs",
        links.len(),
        structure.forms,
        structure.inputs
    );

    PageExtract {
        title,
        description,
        language,
        structure,
        fingerprint,
        links,
    }
}

/// Builds the structural fingerprint of a parsed document
pub fn fingerprint(doc: &Html) -> Option<String> {
    let tokens = doc
        .select(&SELECTORS.body_elements)
        .filter(|e| !is_inside_skipped(e))
        .take(FINGERPRINT_ELEMENT_LIMIT)
        .map(|e| element_token(&e))
        .take(FINGERPRINT_TOKEN_LIMIT)
        .collect::<Vec<_>>();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(FINGERPRINT_DELIMITER))
    }
}

/// Fingerprint of an HTML string
pub fn fingerprint_html(html: &str) -> Option<String> {
    fingerprint(&Html::parse_document(html))
}

/// Splits a fingerprint back into its tokens
pub fn fingerprint_tokens(fingerprint: &str) -> Vec<&str> {
    fingerprint
        .split(FINGERPRINT_DELIMITER)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Replaces digit runs in a class name with `N`, so `item-12` and `item-7` match
pub fn generalize_class(class: &str) -> String {
    DIGITS.replace_all(&class.to_ascii_lowercase(), "N").into_owned()
}

fn element_token(element: &ElementRef) -> String {
    let tag = element.value().name();
    let first_class = element
        .value()
        .attr("class")
        .and_then(|c| c.split_whitespace().next());
    match first_class {
        Some(class) => format!("{}.{}", tag, generalize_class(class)),
        None => tag.to_string(),
    }
}

fn is_inside_skipped(element: &ElementRef) -> bool {
    if SKIPPED_TAGS.contains(&element.value().name()) {
        return true;
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIPPED_TAGS.contains(&a.value().name()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
