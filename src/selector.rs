//! Sample selection strategies.
//!
//! Every selected URL carries a justification and lands in exactly one bucket:
//! the structured sample (common pages and template coverage), critical pages
//! (processes and special functionality) or the random sample.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::categorizer::{Category, importance_for};
use crate::config::{CustomWeights, SelectionConfig, SelectionStrategy};
use crate::error::{Result, SamplerError};
use crate::results::DiscoveredPage;
use crate::templates::Template;

/// Categories every WCAG-EM sample should try to contain
const COMMON_CATEGORIES: [Category; 4] = [
    Category::Homepage,
    Category::Contact,
    Category::Navigation,
    Category::Legal,
];

const QUICK_CATEGORIES: [Category; 5] = [
    Category::Homepage,
    Category::Authentication,
    Category::Checkout,
    Category::Contact,
    Category::Form,
];

const QUICK_LIMIT: usize = 5;
const COMPREHENSIVE_PER_TEMPLATE: usize = 3;
const SPECIAL_LIMIT: usize = 3;

/// Multi-step processes: each step lists alternative URL keywords
const PROCESSES: &[(&str, &[&[&str]])] = &[
    (
        "checkout",
        &[
            &["cart", "basket", "bag"],
            &["checkout"],
            &["payment", "billing"],
            &["confirmation", "order-complete", "thank-you", "thankyou"],
        ],
    ),
    (
        "login",
        &[
            &["login", "log-in", "signin", "sign-in"],
            &["account", "dashboard", "profile"],
        ],
    ),
    (
        "registration",
        &[
            &["register", "registration", "signup", "sign-up"],
            &["confirm", "welcome", "verify"],
        ],
    ),
    ("search", &[&["search"], &["results"]]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Structured,
    Critical,
    Random,
}

/// Outcome of a selection run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Selected URLs in inclusion order
    pub selected_pages: Vec<String>,
    pub structured_sample: Vec<String>,
    pub critical_pages: Vec<String>,
    pub random_sample: Vec<String>,
    /// Why each URL was selected
    pub justifications: BTreeMap<String, String>,
    pub templates_covered: usize,
    pub categories_covered: usize,
    pub strategy: SelectionStrategy,
    pub warnings: Vec<String>,
}

impl SelectionResult {
    pub fn is_selected(&self, url: &str) -> bool {
        self.justifications.contains_key(url)
    }
}

/// Accumulates a capped, deduplicated selection
struct Picker {
    limit: usize,
    result: SelectionResult,
    chosen: HashSet<String>,
}

impl Picker {
    fn new(limit: usize, strategy: SelectionStrategy) -> Self {
        Self {
            limit,
            result: SelectionResult {
                strategy,
                ..Default::default()
            },
            chosen: HashSet::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.result.selected_pages.len() >= self.limit
    }

    fn contains(&self, url: &str) -> bool {
        self.chosen.contains(url)
    }

    /// Returns whether the URL was newly added
    fn add(&mut self, url: &str, bucket: Bucket, reason: String) -> bool {
        if self.is_full() || self.contains(url) {
            return false;
        }
        self.chosen.insert(url.to_string());
        self.result.selected_pages.push(url.to_string());
        self.result.justifications.insert(url.to_string(), reason);
        let target = match bucket {
            Bucket::Structured => &mut self.result.structured_sample,
            Bucket::Critical => &mut self.result.critical_pages,
            Bucket::Random => &mut self.result.random_sample,
        };
        target.push(url.to_string());
        true
    }
}

/// Chooses the pages to test
pub struct PageSelector {
    config: SelectionConfig,
    rng: StdRng,
}

impl PageSelector {
    pub fn new(config: SelectionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Select with the configured strategy, falling back to the top-ranked
    /// pages if the strategy cannot run
    pub fn select(
        &mut self,
        pages: &[DiscoveredPage],
        templates: &BTreeMap<String, Template>,
        categories: &HashMap<String, Category>,
    ) -> SelectionResult {
        let mut result = match self.try_select(pages, templates, categories) {
            Ok(result) => result,
            Err(e) => {
                ::log::warn!("Selection strategy failed ({}), taking top-ranked pages", e);
                let mut fallback = self.first_pages(pages);
                fallback
                    .warnings
                    .push(format!("Selection strategy failed, used top-ranked pages: {}", e));
                fallback
            }
        };

        finish(&mut result, templates, categories);
        let warnings = validate_selection(&result, pages, templates, categories, &self.config);
        result.warnings.extend(warnings);
        ::log::info!(
            "Selected {} of {} pages ({} strategy, {} templates covered)",
            result.selected_pages.len(),
            pages.len(),
            result.strategy.as_str(),
            result.templates_covered
        );
        result
    }

    pub fn try_select(
        &mut self,
        pages: &[DiscoveredPage],
        templates: &BTreeMap<String, Template>,
        categories: &HashMap<String, Category>,
    ) -> Result<SelectionResult> {
        check_templates(pages, templates)?;

        let result = match self.config.strategy {
            SelectionStrategy::WcagEm => self.wcag_em(pages, templates, categories),
            SelectionStrategy::Quick => self.quick(pages, categories),
            SelectionStrategy::Comprehensive => self.comprehensive(pages, templates, categories),
            SelectionStrategy::Custom => self.custom(pages, templates, categories)?,
        };
        Ok(result)
    }

    fn wcag_em(
        &mut self,
        pages: &[DiscoveredPage],
        templates: &BTreeMap<String, Template>,
        categories: &HashMap<String, Category>,
    ) -> SelectionResult {
        let mut picker = Picker::new(self.config.max_pages, SelectionStrategy::WcagEm);

        for common in COMMON_CATEGORIES {
            if let Some(page) = pages.iter().find(|p| category_of(categories, p) == common) {
                picker.add(&page.url, Bucket::Structured, format!("Common page: {}", common));
            }
        }

        for template in templates.values() {
            picker.add(
                &template.representative,
                Bucket::Structured,
                format!(
                    "Representative of template '{}' ({} pages)",
                    template.name, template.page_count
                ),
            );
        }

        for (name, steps) in PROCESSES {
            let Some(flow) = find_process(pages, steps) else {
                continue;
            };
            ::log::debug!("Found complete {} process across {} pages", name, flow.len());
            for (i, url) in flow.iter().enumerate() {
                picker.add(
                    url,
                    Bucket::Critical,
                    format!("Step {} of {} in the {} process", i + 1, flow.len(), name),
                );
            }
        }

        if self.config.include_all_critical {
            for page in pages {
                let category = category_of(categories, page);
                if matches!(category, Category::Authentication | Category::Checkout) {
                    picker.add(&page.url, Bucket::Critical, format!("Critical {} page", category));
                }
            }
        }

        let remaining: Vec<&DiscoveredPage> =
            pages.iter().filter(|p| !picker.contains(&p.url)).collect();
        let sample_size = self.config.random_sample_size.min(remaining.len());
        for page in remaining.choose_multiple(&mut self.rng, sample_size) {
            picker.add(&page.url, Bucket::Random, "Random sample".to_string());
        }

        let special = pages
            .iter()
            .filter(|p| !picker.contains(&p.url))
            .filter_map(|p| special_functionality(p).map(|reason| (p, reason)))
            .take(SPECIAL_LIMIT)
            .collect::<Vec<_>>();
        for (page, reason) in special {
            picker.add(&page.url, Bucket::Critical, format!("Special functionality: {}", reason));
        }

        picker.result
    }

    fn quick(
        &mut self,
        pages: &[DiscoveredPage],
        categories: &HashMap<String, Category>,
    ) -> SelectionResult {
        let limit = QUICK_LIMIT.min(self.config.max_pages);
        let mut picker = Picker::new(limit, SelectionStrategy::Quick);

        for page in pages {
            let category = category_of(categories, page);
            if !QUICK_CATEGORIES.contains(&category) {
                continue;
            }
            let bucket = match category {
                Category::Authentication | Category::Checkout => Bucket::Critical,
                _ => Bucket::Structured,
            };
            picker.add(&page.url, bucket, format!("Key {} page", category));
        }

        picker.result
    }

    fn comprehensive(
        &mut self,
        pages: &[DiscoveredPage],
        templates: &BTreeMap<String, Template>,
        categories: &HashMap<String, Category>,
    ) -> SelectionResult {
        let mut picker = Picker::new(self.config.max_pages, SelectionStrategy::Comprehensive);
        let by_url: HashMap<&str, &DiscoveredPage> =
            pages.iter().map(|p| (p.url.as_str(), p)).collect();

        for template in templates.values() {
            let mut members: Vec<(&DiscoveredPage, u32)> = template
                .pages
                .iter()
                .filter_map(|url| by_url.get(url.as_str()).copied())
                .map(|p| (p, importance_for(p, category_of(categories, p))))
                .collect();
            members.sort_by(|a, b| b.1.cmp(&a.1));

            let top = members.into_iter().take(COMPREHENSIVE_PER_TEMPLATE);
            for (rank, (page, importance)) in top.enumerate() {
                picker.add(
                    &page.url,
                    Bucket::Structured,
                    format!(
                        "#{} by importance ({}) in template '{}'",
                        rank + 1,
                        importance,
                        template.name
                    ),
                );
            }
        }

        picker.result
    }

    fn custom(
        &mut self,
        pages: &[DiscoveredPage],
        templates: &BTreeMap<String, Template>,
        categories: &HashMap<String, Category>,
    ) -> Result<SelectionResult> {
        let weights = self.config.weights;
        check_weights(&weights)?;

        let template_sizes: HashMap<&str, usize> = templates
            .values()
            .flat_map(|t| t.pages.iter().map(move |url| (url.as_str(), t.page_count)))
            .collect();

        let mut scored: Vec<(&DiscoveredPage, f64)> = pages
            .iter()
            .map(|page| {
                let importance = importance_for(page, category_of(categories, page)) as f64;
                let size = template_sizes.get(page.url.as_str()).copied().unwrap_or(1).max(1);
                let uniqueness = 100.0 / size as f64;
                let noise: f64 = self.rng.gen_range(0.0..=100.0);
                let score = page.priority as f64 * weights.priority
                    + importance * weights.importance
                    + uniqueness * weights.template_uniqueness
                    + noise * weights.random;
                (page, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut picker = Picker::new(self.config.max_pages, SelectionStrategy::Custom);
        for (page, score) in scored {
            if picker.is_full() {
                break;
            }
            picker.add(&page.url, Bucket::Structured, format!("Custom score {:.1}", score));
        }
        Ok(picker.result)
    }

    fn first_pages(&self, pages: &[DiscoveredPage]) -> SelectionResult {
        let mut picker = Picker::new(self.config.max_pages, self.config.strategy);
        for page in pages {
            if picker.is_full() {
                break;
            }
            picker.add(&page.url, Bucket::Structured, "Top-ranked page (fallback)".to_string());
        }
        picker.result
    }
}

fn category_of(categories: &HashMap<String, Category>, page: &DiscoveredPage) -> Category {
    categories.get(&page.url).copied().unwrap_or(Category::General)
}

/// Every template member must be a known page
fn check_templates(pages: &[DiscoveredPage], templates: &BTreeMap<String, Template>) -> Result<()> {
    let known: HashSet<&str> = pages.iter().map(|p| p.url.as_str()).collect();
    for template in templates.values() {
        if let Some(unknown) = template.pages.iter().find(|url| !known.contains(url.as_str())) {
            return Err(SamplerError::InconsistentInput(format!(
                "template {} references unknown page {}",
                template.id, unknown
            )));
        }
        if !template.contains(&template.representative) {
            return Err(SamplerError::InconsistentInput(format!(
                "template {} representative {} is not a member",
                template.id, template.representative
            )));
        }
    }
    Ok(())
}

fn check_weights(weights: &CustomWeights) -> Result<()> {
    let all = [
        weights.priority,
        weights.importance,
        weights.template_uniqueness,
        weights.random,
    ];
    if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(SamplerError::InvalidConfig(
            "custom weights must be finite and non-negative".to_string(),
        ));
    }
    if all.iter().sum::<f64>() == 0.0 {
        return Err(SamplerError::InvalidConfig(
            "custom weights are all zero".to_string(),
        ));
    }
    Ok(())
}

/// Distinct pages for every step of a process, or `None` if a step is missing
fn find_process(pages: &[DiscoveredPage], steps: &[&[&str]]) -> Option<Vec<String>> {
    let mut flow: Vec<String> = Vec::with_capacity(steps.len());
    for keywords in steps {
        let page = pages.iter().find(|p| {
            !flow.contains(&p.url) && {
                let path = url_path(&p.url);
                keywords.iter().any(|k| path.contains(k))
            }
        })?;
        flow.push(page.url.clone());
    }
    Some(flow)
}

fn url_path(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase())
}

fn special_functionality(page: &DiscoveredPage) -> Option<&'static str> {
    let s = &page.structure;
    if s.forms > 2 {
        Some("multiple forms")
    } else if s.videos > 0 {
        Some("video content")
    } else if s.images > 10 {
        Some("image-heavy content")
    } else {
        None
    }
}

/// Fill in coverage counts
fn finish(
    result: &mut SelectionResult,
    templates: &BTreeMap<String, Template>,
    categories: &HashMap<String, Category>,
) {
    result.templates_covered = templates
        .values()
        .filter(|t| t.pages.iter().any(|url| result.is_selected(url)))
        .count();
    result.categories_covered = result
        .selected_pages
        .iter()
        .map(|url| categories.get(url).copied().unwrap_or(Category::General))
        .collect::<BTreeSet<_>>()
        .len();
}

/// Methodology warnings for a finished selection
pub fn validate_selection(
    result: &SelectionResult,
    pages: &[DiscoveredPage],
    templates: &BTreeMap<String, Template>,
    categories: &HashMap<String, Category>,
    config: &SelectionConfig,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let selected_category =
        |url: &String| categories.get(url).copied().unwrap_or(Category::General);

    if result.selected_pages.len() < config.min_pages {
        warnings.push(format!(
            "Only {} pages selected, below the minimum of {}",
            result.selected_pages.len(),
            config.min_pages
        ));
    }

    if !result
        .selected_pages
        .iter()
        .any(|url| selected_category(url) == Category::Homepage)
    {
        warnings.push("Selection does not include a homepage".to_string());
    }

    let covered = templates
        .values()
        .filter(|t| t.pages.iter().any(|url| result.is_selected(url)))
        .count();
    if covered < 2 && pages.len() >= 5 {
        warnings.push(format!(
            "Only {} template(s) covered across {} discovered pages",
            covered,
            pages.len()
        ));
    }

    let interactive =
        |c: Category| matches!(c, Category::Form | Category::Contact | Category::Authentication);
    let candidates = pages
        .iter()
        .filter(|p| interactive(category_of(categories, p)))
        .count();
    let chosen = result
        .selected_pages
        .iter()
        .filter(|url| interactive(selected_category(*url)))
        .count();
    if candidates >= 3 && chosen == 0 {
        warnings.push(format!(
            "None of the {} form, contact or authentication pages were selected",
            candidates
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::PageStructure;
    use crate::templates::singleton_templates;

    fn page(url: &str, priority: u32) -> DiscoveredPage {
        DiscoveredPage::new(url.to_string(), "general".to_string(), 1, priority)
    }

    fn config(strategy: SelectionStrategy, max_pages: usize) -> SelectionConfig {
        SelectionConfig {
            strategy,
            max_pages,
            seed: Some(42),
            ..Default::default()
        }
    }

    /// 30 pages: homepage, 2 contact, 5 forms, 22 products
    fn site() -> (Vec<DiscoveredPage>, HashMap<String, Category>) {
        let mut pages = vec![page("https://e.com/", 100)];
        let mut categories = HashMap::from([("https://e.com/".to_string(), Category::Homepage)]);
        for i in 0..29 {
            let url = format!("https://e.com/page/{i}");
            let category = match i {
                0..=1 => Category::Contact,
                2..=6 => Category::Form,
                _ => Category::Product,
            };
            pages.push(page(&url, 90 - i as u32));
            categories.insert(url, category);
        }
        (pages, categories)
    }

    fn assert_consistent(result: &SelectionResult, max_pages: usize) {
        assert!(result.selected_pages.len() <= max_pages);
        let mut union: Vec<&String> = result
            .structured_sample
            .iter()
            .chain(&result.critical_pages)
            .chain(&result.random_sample)
            .collect();
        union.sort();
        let mut selected: Vec<&String> = result.selected_pages.iter().collect();
        selected.sort();
        assert_eq!(union, selected);
        for url in &result.selected_pages {
            assert!(!result.justifications[url].is_empty());
        }
        assert_eq!(result.justifications.len(), result.selected_pages.len());
    }

    #[test]
    fn test_cap_and_justifications_for_every_strategy() {
        let (pages, categories) = site();
        let templates = singleton_templates(&pages);
        for strategy in [
            SelectionStrategy::WcagEm,
            SelectionStrategy::Quick,
            SelectionStrategy::Comprehensive,
            SelectionStrategy::Custom,
        ] {
            for max_pages in [0, 1, 7, 50] {
                let mut selector = PageSelector::new(config(strategy, max_pages));
                let result = selector.select(&pages, &templates, &categories);
                assert_consistent(&result, max_pages);
                assert_eq!(result.strategy, strategy);
            }
        }
    }

    #[test]
    fn test_wcag_em_always_includes_homepage() {
        let (mut pages, categories) = site();
        // homepage ranked last
        pages.rotate_left(1);
        let templates = singleton_templates(&pages);
        for max_pages in [1, 3, 20] {
            let mut selector = PageSelector::new(config(SelectionStrategy::WcagEm, max_pages));
            let result = selector.select(&pages, &templates, &categories);
            assert!(result.is_selected("https://e.com/"), "max_pages={max_pages}");
            assert!(result.structured_sample.contains(&"https://e.com/".to_string()));
        }
    }

    #[test]
    fn test_wcag_em_finds_processes_and_special_pages() {
        let mut pages = vec![
            page("https://e.com/", 100),
            page("https://e.com/cart", 80),
            page("https://e.com/checkout", 80),
            page("https://e.com/checkout/payment", 70),
            page("https://e.com/order/confirmation", 60),
            page("https://e.com/login", 80),
        ];
        pages.push(page("https://e.com/media/tour", 20).with_structure(PageStructure {
            videos: 1,
            ..Default::default()
        }));
        let categories = HashMap::from([("https://e.com/".to_string(), Category::Homepage)]);
        // one template for everything but the homepage
        let mut templates = singleton_templates(&pages[..1]);
        let mut rest = singleton_templates(&pages[1..]);
        let mut merged = rest.remove("template_001").unwrap();
        merged.pages = pages[1..].iter().map(|p| p.url.clone()).collect();
        merged.page_count = merged.pages.len();
        templates.insert("template_002".to_string(), merged);

        let mut selector = PageSelector::new(SelectionConfig {
            random_sample_size: 0,
            ..config(SelectionStrategy::WcagEm, 20)
        });
        let result = selector.select(&pages, &templates, &categories);

        for step in ["cart", "checkout", "checkout/payment", "order/confirmation"] {
            let url = format!("https://e.com/{step}");
            assert!(result.is_selected(&url), "{url}");
        }
        let payment = &result.justifications["https://e.com/checkout/payment"];
        assert!(payment.contains("checkout process"));
        // login alone is not a complete process
        assert!(!result.is_selected("https://e.com/login"));
        assert!(result.critical_pages.contains(&"https://e.com/media/tour".to_string()));
        assert!(result.random_sample.is_empty());
    }

    #[test]
    fn test_include_all_critical() {
        let pages = vec![
            page("https://e.com/", 100),
            page("https://e.com/x", 10),
            page("https://e.com/y", 10),
        ];
        let categories = HashMap::from([
            ("https://e.com/".to_string(), Category::Homepage),
            ("https://e.com/x".to_string(), Category::Authentication),
            ("https://e.com/y".to_string(), Category::Checkout),
        ]);
        let mut templates = singleton_templates(&pages[..1]);
        let mut others = singleton_templates(&pages[1..]);
        let mut merged = others.remove("template_001").unwrap();
        merged.pages = vec!["https://e.com/x".into(), "https://e.com/y".into()];
        merged.page_count = 2;
        templates.insert("template_002".to_string(), merged);

        let mut selector = PageSelector::new(SelectionConfig {
            include_all_critical: true,
            random_sample_size: 0,
            ..config(SelectionStrategy::WcagEm, 10)
        });
        let result = selector.select(&pages, &templates, &categories);
        assert_eq!(result.selected_pages.len(), 3);
        assert!(result.critical_pages.contains(&"https://e.com/y".to_string()));
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let (pages, categories) = site();
        let templates = singleton_templates(&pages);
        for strategy in [SelectionStrategy::WcagEm, SelectionStrategy::Custom] {
            let a = PageSelector::new(config(strategy, 10)).select(&pages, &templates, &categories);
            let b = PageSelector::new(config(strategy, 10)).select(&pages, &templates, &categories);
            assert_eq!(a.selected_pages, b.selected_pages);
        }
    }

    #[test]
    fn test_quick_takes_key_pages_only() {
        let (pages, categories) = site();
        let templates = singleton_templates(&pages);
        let result = PageSelector::new(config(SelectionStrategy::Quick, 20))
            .select(&pages, &templates, &categories);
        assert_eq!(result.selected_pages.len(), 5);
        for url in &result.selected_pages {
            assert!(QUICK_CATEGORIES.contains(&categories[url]));
        }
        assert_eq!(result.selected_pages[0], "https://e.com/");
    }

    #[test]
    fn test_quick_without_key_pages_selects_nothing() {
        let pages: Vec<DiscoveredPage> = (0..6)
            .map(|i| page(&format!("https://e.com/blog/{i}"), 80 - i))
            .collect();
        let categories: HashMap<String, Category> = pages
            .iter()
            .map(|p| (p.url.clone(), Category::Article))
            .collect();
        let templates = singleton_templates(&pages);

        let result = PageSelector::new(config(SelectionStrategy::Quick, 10))
            .select(&pages, &templates, &categories);
        assert!(result.selected_pages.is_empty());
        assert!(result.justifications.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("below the minimum")));
    }

    #[test]
    fn test_comprehensive_caps_per_template() {
        let (pages, categories) = site();
        let mut templates = singleton_templates(&pages[..1]);
        let mut rest = singleton_templates(&pages[1..]);
        let mut merged = rest.remove("template_001").unwrap();
        merged.pages = pages[1..].iter().map(|p| p.url.clone()).collect();
        merged.page_count = merged.pages.len();
        templates.insert("template_002".to_string(), merged);

        let result = PageSelector::new(config(SelectionStrategy::Comprehensive, 20))
            .select(&pages, &templates, &categories);
        assert_eq!(result.selected_pages.len(), 4);
        assert_eq!(result.templates_covered, 2);
    }

    #[test]
    fn test_invalid_weights_fall_back_to_top_pages() {
        let (pages, categories) = site();
        let templates = singleton_templates(&pages);
        let mut cfg = config(SelectionStrategy::Custom, 4);
        cfg.weights.random = -1.0;
        let result = PageSelector::new(cfg).select(&pages, &templates, &categories);
        let expected: Vec<String> = pages[..4].iter().map(|p| p.url.clone()).collect();
        assert_eq!(result.selected_pages, expected);
        assert!(result.warnings.iter().any(|w| w.contains("Selection strategy failed")));
    }

    #[test]
    fn test_inconsistent_templates_fall_back() {
        let (pages, categories) = site();
        let mut templates = singleton_templates(&pages);
        if let Some(t) = templates.values_mut().next() {
            t.pages.push("https://elsewhere.com/".to_string());
        }
        let mut selector = PageSelector::new(config(SelectionStrategy::WcagEm, 3));
        assert!(selector.try_select(&pages, &templates, &categories).is_err());
        let result = selector.select(&pages, &templates, &categories);
        assert_eq!(result.selected_pages.len(), 3);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_validation_warnings() {
        let (pages, categories) = site();
        let templates = singleton_templates(&pages);
        let cfg = config(SelectionStrategy::WcagEm, 20);

        let mut result = SelectionResult::default();
        for url in ["https://e.com/page/20", "https://e.com/page/21"] {
            result.selected_pages.push(url.to_string());
            result.justifications.insert(url.to_string(), "test".to_string());
        }
        let warnings = validate_selection(&result, &pages, &templates, &categories, &cfg);
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings.iter().any(|w| w.contains("below the minimum")));
        assert!(warnings.iter().any(|w| w.contains("homepage")));
        assert!(warnings.iter().any(|w| w.contains("form, contact or authentication")));
    }
}
