//! Structural template detection.
//!
//! Pages are compared by their fingerprints and grouped with a transitive
//! union-find clustering: two pages whose similarity reaches the threshold end up
//! in the same template, as does anything linked to them through a chain of
//! similar pages.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{SimilarityMethod, TemplateConfig};
use crate::error::{Result, SamplerError};
use crate::parsers::html::{FINGERPRINT_DELIMITER, fingerprint_tokens};
use crate::results::DiscoveredPage;

/// Pairwise comparisons above this are refused by the vector backend
const MAX_COSINE_PAGES: usize = 5000;
/// Tolerance when comparing a similarity with the threshold
const SIMILARITY_EPSILON: f64 = 1e-9;

/// Fraction of member pages carrying common structural elements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonElements {
    pub forms: f64,
    pub h1: f64,
    pub nav: f64,
    pub main: f64,
    pub footer: f64,
    /// Most common declared language
    pub language: Option<String>,
}

/// A cluster of structurally similar pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    /// Member URLs, in crawl order
    pub pages: Vec<String>,
    pub page_count: usize,
    pub representative: String,
    pub average_priority: f64,
    pub page_types: BTreeSet<String>,
    pub common_elements: CommonElements,
}

impl Template {
    pub fn contains(&self, url: &str) -> bool {
        self.pages.iter().any(|p| p == url)
    }
}

/// Pairwise similarity over tokenized fingerprints
pub trait SimilarityBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Symmetric N×N matrix of similarities in `0.0..=1.0`
    fn similarity_matrix(&self, fingerprints: &[Vec<String>]) -> Result<Vec<Vec<f64>>>;
}

/// Cosine similarity over token and adjacent-token-pair counts
#[derive(Debug, Default, Clone, Copy)]
pub struct CosineSimilarity;

/// Jaccard overlap of token sets
#[derive(Debug, Default, Clone, Copy)]
pub struct JaccardSimilarity;

type SparseVector = HashMap<usize, f64>;

impl CosineSimilarity {
    fn vectorize(fingerprints: &[Vec<String>]) -> Vec<(SparseVector, f64)> {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();

        fingerprints
            .iter()
            .map(|tokens| {
                let mut vector = SparseVector::new();
                let features = tokens.iter().cloned().chain(
                    tokens
                        .windows(2)
                        .map(|pair| format!("{}>{}", pair[0], pair[1])),
                );
                for feature in features {
                    let next_id = vocabulary.len();
                    let id = *vocabulary.entry(feature).or_insert(next_id);
                    *vector.entry(id).or_insert(0.0) += 1.0;
                }
                let norm = vector.values().map(|v| v * v).sum::<f64>().sqrt();
                (vector, norm)
            })
            .collect()
    }
}

impl SimilarityBackend for CosineSimilarity {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn similarity_matrix(&self, fingerprints: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
        if fingerprints.len() > MAX_COSINE_PAGES {
            return Err(SamplerError::Similarity(format!(
                "{} pages exceed the vector backend limit of {}",
                fingerprints.len(),
                MAX_COSINE_PAGES
            )));
        }

        let vectors = Self::vectorize(fingerprints);
        Ok(fill_matrix(fingerprints, |i, j| {
            let ((a, norm_a), (b, norm_b)) = (&vectors[i], &vectors[j]);
            if *norm_a == 0.0 || *norm_b == 0.0 {
                return 0.0;
            }
            let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
            let dot: f64 = small
                .iter()
                .filter_map(|(k, v)| large.get(k).map(|w| v * w))
                .sum();
            (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
        }))
    }
}

impl SimilarityBackend for JaccardSimilarity {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    fn similarity_matrix(&self, fingerprints: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
        let sets: Vec<BTreeSet<&str>> = fingerprints
            .iter()
            .map(|tokens| tokens.iter().map(String::as_str).collect())
            .collect();

        Ok(fill_matrix(fingerprints, |i, j| {
            let union = sets[i].union(&sets[j]).count();
            if union == 0 {
                return 0.0;
            }
            sets[i].intersection(&sets[j]).count() as f64 / union as f64
        }))
    }
}

/// Builds a symmetric matrix. Identical token lists always score exactly 1.0.
fn fill_matrix(fingerprints: &[Vec<String>], pair: impl Fn(usize, usize) -> f64) -> Vec<Vec<f64>> {
    let n = fingerprints.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let similarity = if fingerprints[i] == fingerprints[j] {
                1.0
            } else {
                pair(i, j)
            };
            matrix[i][j] = similarity;
            matrix[j][i] = similarity;
        }
    }
    matrix
}

/// Backend for a configured method; `Auto` prefers the vector backend
pub fn backend_for(method: SimilarityMethod) -> Box<dyn SimilarityBackend> {
    match method {
        SimilarityMethod::Auto | SimilarityMethod::Cosine => Box::new(CosineSimilarity),
        SimilarityMethod::Jaccard => Box::new(JaccardSimilarity),
    }
}

/// Union-find over page indices
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Groups pages into structural templates
pub struct TemplateDetector {
    threshold: f64,
    backend: Box<dyn SimilarityBackend>,
}

impl TemplateDetector {
    pub fn new(config: &TemplateConfig) -> Self {
        Self::with_backend(
            config.similarity_threshold,
            backend_for(config.similarity_method),
        )
    }

    pub fn with_backend(threshold: f64, backend: Box<dyn SimilarityBackend>) -> Self {
        Self { threshold, backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Detect templates, degrading to one template per page on any error
    pub fn detect(&self, pages: &[DiscoveredPage]) -> BTreeMap<String, Template> {
        match self.try_detect(pages) {
            Ok(templates) => templates,
            Err(e) => {
                ::log::warn!("Template detection failed ({}), using one template per page", e);
                singleton_templates(pages)
            }
        }
    }

    pub fn try_detect(&self, pages: &[DiscoveredPage]) -> Result<BTreeMap<String, Template>> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SamplerError::InvalidConfig(format!(
                "similarity threshold {} is outside 0..=1",
                self.threshold
            )));
        }
        if pages.len() < 2 {
            return Ok(singleton_templates(pages));
        }

        let fingerprints: Vec<Vec<String>> = pages
            .iter()
            .map(|p| {
                let fingerprint = p
                    .fingerprint
                    .clone()
                    .unwrap_or_else(|| synthetic_fingerprint(p));
                fingerprint_tokens(&fingerprint)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect();

        let matrix = self.backend.similarity_matrix(&fingerprints)?;
        if matrix.len() != pages.len() || matrix.iter().any(|row| row.len() != pages.len()) {
            return Err(SamplerError::Similarity(
                "similarity matrix does not match page count".to_string(),
            ));
        }

        let clusters = cluster(&matrix, self.threshold);
        ::log::info!(
            "Detected {} templates across {} pages ({} similarity, threshold {:.2})",
            clusters.len(),
            pages.len(),
            self.backend.name(),
            self.threshold
        );

        Ok(build_templates(pages, clusters))
    }
}

/// Convenience wrapper with default configuration
pub fn detect_templates(pages: &[DiscoveredPage]) -> BTreeMap<String, Template> {
    TemplateDetector::new(&TemplateConfig::default()).detect(pages)
}

/// Clusters indices whose similarity reaches `threshold`, transitively.
/// Clusters are ordered by their first member.
fn cluster(matrix: &[Vec<f64>], threshold: f64) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut sets = DisjointSet::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if matrix[i][j] + SIMILARITY_EPSILON >= threshold {
                sets.union(i, j);
            }
        }
    }

    let mut by_root: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = sets.find(i);
        let slot = *by_root.entry(root).or_insert_with(|| {
            clusters.push(Vec::new());
            clusters.len() - 1
        });
        clusters[slot].push(i);
    }
    clusters
}

/// One template per page
pub fn singleton_templates(pages: &[DiscoveredPage]) -> BTreeMap<String, Template> {
    build_templates(pages, (0..pages.len()).map(|i| vec![i]).collect())
}

fn build_templates(
    pages: &[DiscoveredPage],
    clusters: Vec<Vec<usize>>,
) -> BTreeMap<String, Template> {
    clusters
        .into_iter()
        .enumerate()
        .map(|(i, members)| {
            let members: Vec<&DiscoveredPage> = members.iter().map(|&m| &pages[m]).collect();
            let template = make_template(format!("template_{:03}", i + 1), &members);
            (template.id.clone(), template)
        })
        .collect()
}

fn make_template(id: String, members: &[&DiscoveredPage]) -> Template {
    let count = members.len();

    let representative = members
        .iter()
        .fold(None::<(&DiscoveredPage, i64)>, |best, &page| {
            let score = representative_score(page);
            match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((page, score)),
            }
        })
        .map(|(page, _)| page.url.clone())
        .unwrap_or_default();

    let dominant_type = most_common(members.iter().map(|p| p.page_type.as_str()))
        .unwrap_or("general")
        .to_string();
    let label = type_label(&dominant_type);
    let name = if count > 1 {
        format!("{label} Pages ({count} pages)")
    } else {
        format!("{label} Page")
    };

    let fraction = |f: fn(&DiscoveredPage) -> bool| {
        if count == 0 {
            0.0
        } else {
            members.iter().filter(|p| f(p)).count() as f64 / count as f64
        }
    };

    let common_elements = CommonElements {
        forms: fraction(|p| p.structure.forms > 0),
        h1: fraction(|p| p.structure.has_h1),
        nav: fraction(|p| p.structure.has_nav),
        main: fraction(|p| p.structure.has_main),
        footer: fraction(|p| p.structure.has_footer),
        language: most_common(members.iter().filter_map(|p| p.language.as_deref()))
            .map(str::to_string),
    };

    let average_priority = if count == 0 {
        0.0
    } else {
        members.iter().map(|p| p.priority as f64).sum::<f64>() / count as f64
    };

    Template {
        id,
        name,
        pages: members.iter().map(|p| p.url.clone()).collect(),
        page_count: count,
        representative,
        average_priority,
        page_types: members.iter().map(|p| p.page_type.clone()).collect(),
        common_elements,
    }
}

/// `priority×2 − depth×10 + forms×5 + inputs×2 + buttons×2`
pub fn representative_score(page: &DiscoveredPage) -> i64 {
    page.priority as i64 * 2 - page.depth as i64 * 10
        + page.structure.forms as i64 * 5
        + page.structure.inputs as i64 * 2
        + page.structure.buttons as i64 * 2
}

/// Fingerprint stand-in built from counts and landmarks, for pages crawled
/// without markup
pub fn synthetic_fingerprint(page: &DiscoveredPage) -> String {
    let s = &page.structure;
    let mut tokens = vec![
        format!("type-{}", page.page_type),
        format!("forms-{}", bucket(s.forms)),
        format!("inputs-{}", bucket(s.inputs)),
        format!("buttons-{}", bucket(s.buttons)),
        format!("images-{}", bucket(s.images)),
        format!("videos-{}", bucket(s.videos)),
        format!("links-{}", bucket(s.links)),
    ];
    for (flag, token) in [
        (s.has_h1, "h1"),
        (s.has_nav, "nav"),
        (s.has_main, "main"),
        (s.has_footer, "footer"),
    ] {
        if flag {
            tokens.push(token.to_string());
        }
    }
    tokens.join(FINGERPRINT_DELIMITER)
}

fn bucket(count: usize) -> &'static str {
    match count {
        0 => "none",
        1 => "one",
        2..=3 => "few",
        4..=7 => "several",
        _ => "many",
    }
}

/// Most frequent item; ties go to the one seen first
fn most_common<'a>(items: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(k, _)| *k == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None::<(&str, usize)>, |best, (k, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((k, n)),
        })
        .map(|(k, _)| k)
}

/// Human-readable label for a page type tag
pub fn type_label(page_type: &str) -> String {
    page_type
        .split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::PageStructure;

    fn page(url: &str, page_type: &str, fingerprint: &str) -> DiscoveredPage {
        DiscoveredPage::new(url.to_string(), page_type.to_string(), 1, 50)
            .with_fingerprint(fingerprint)
    }

    fn tokens(fp: &str) -> Vec<String> {
        fingerprint_tokens(fp).into_iter().map(str::to_string).collect()
    }

    const PRODUCT_FP: &str = "header.site|nav|div.product|img|span.price|button.buy|footer";

    #[test]
    fn test_single_page_is_singleton() {
        let pages = vec![page("https://e.com/", "homepage", "div")];
        let templates = detect_templates(&pages);
        assert_eq!(templates.len(), 1);
        let only = templates.values().next().unwrap();
        assert_eq!(only.pages, vec!["https://e.com/"]);
        assert_eq!(only.representative, "https://e.com/");
        assert_eq!(only.name, "Homepage Page");

        assert!(detect_templates(&[]).is_empty());
    }

    #[test]
    fn test_identical_fingerprints_share_template() {
        let pages = vec![
            page("https://e.com/p/1", "product", PRODUCT_FP),
            page("https://e.com/about", "about", "main|h1|p|p|p|footer"),
            page("https://e.com/p/2", "product", PRODUCT_FP),
            page("https://e.com/p/3", "product", PRODUCT_FP),
        ];
        for method in [SimilarityMethod::Cosine, SimilarityMethod::Jaccard] {
            let detector = TemplateDetector::new(&TemplateConfig {
                similarity_threshold: 1.0,
                similarity_method: method,
            });
            let templates = detector.detect(&pages);
            assert_eq!(templates.len(), 2);
            let products = templates.values().find(|t| t.page_count == 3).unwrap();
            assert_eq!(products.name, "Product Pages (3 pages)");
            assert!(products.contains("https://e.com/p/2"));
        }
    }

    #[test]
    fn test_every_page_in_exactly_one_template() {
        let pages: Vec<_> = (0..12)
            .map(|i| {
                let fp = if i % 3 == 0 {
                    PRODUCT_FP.to_string()
                } else {
                    format!("div.a{i}|p.b{i}")
                };
                page(&format!("https://e.com/{i}"), "general", &fp)
            })
            .collect();
        let templates = detect_templates(&pages);

        let mut seen = Vec::new();
        for template in templates.values() {
            assert_eq!(template.page_count, template.pages.len());
            assert!(template.contains(&template.representative));
            seen.extend(template.pages.iter().cloned());
        }
        seen.sort();
        let mut expected: Vec<_> = pages.iter().map(|p| p.url.clone()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_lower_threshold_never_adds_clusters() {
        let fps = [
            "a|b|c|d|e|f",
            "a|b|c|d|e|g",
            "a|b|c|x|y|z",
            "q|r|s|t",
            "q|r|s|u",
            "m|n",
        ];
        let pages: Vec<_> = fps
            .iter()
            .enumerate()
            .map(|(i, fp)| page(&format!("https://e.com/{i}"), "general", fp))
            .collect();

        for method in [SimilarityMethod::Cosine, SimilarityMethod::Jaccard] {
            let mut previous = usize::MAX;
            for threshold in [1.0, 0.95, 0.85, 0.7, 0.5, 0.3, 0.1, 0.0] {
                let detector = TemplateDetector::new(&TemplateConfig {
                    similarity_threshold: threshold,
                    similarity_method: method,
                });
                let count = detector.detect(&pages).len();
                assert!(
                    count <= previous,
                    "{method:?} threshold {threshold}: {count} > {previous}"
                );
                previous = count;
            }
            assert_eq!(previous, 1);
        }
    }

    #[test]
    fn test_transitive_merge() {
        // a~b and b~c but a and c are far apart
        let matrix = vec![
            vec![1.0, 0.9, 0.1],
            vec![0.9, 1.0, 0.9],
            vec![0.1, 0.9, 1.0],
        ];
        assert_eq!(cluster(&matrix, 0.85), vec![vec![0, 1, 2]]);
        assert_eq!(cluster(&matrix, 0.95), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_similarity_backends() {
        let fps = vec![tokens("a|b|c|d"), tokens("a|b|c|e"), tokens("a|b|c|d")];
        let jaccard = JaccardSimilarity.similarity_matrix(&fps).unwrap();
        assert!((jaccard[0][1] - 0.6).abs() < 1e-9);
        assert_eq!(jaccard[0][2], 1.0);
        assert_eq!(jaccard[1][0], jaccard[0][1]);

        let cosine = CosineSimilarity.similarity_matrix(&fps).unwrap();
        assert_eq!(cosine[0][2], 1.0);
        assert!(cosine[0][1] > 0.0 && cosine[0][1] < 1.0);
        assert_eq!(cosine[1][0], cosine[0][1]);
    }

    #[test]
    fn test_scenario_large_cluster_with_best_representative() {
        let mut pages = Vec::new();
        for i in 0..25 {
            let mut p = page(&format!("https://e.com/product/{i}"), "product", PRODUCT_FP);
            p.priority = 40 + (i as u32 % 7);
            p.depth = 1 + i % 3;
            p.structure = PageStructure {
                forms: i % 2,
                inputs: i % 4,
                buttons: 1,
                ..Default::default()
            };
            pages.push(p);
        }
        for i in 0..15 {
            pages.push(page(
                &format!("https://e.com/other/{i}"),
                "article",
                &format!("section.s{i}|p.p{i}|span.t{i}"),
            ));
        }

        let templates = detect_templates(&pages);
        assert!(templates.len() >= 2);

        let big = templates.values().find(|t| t.page_count == 25).unwrap();
        let members: Vec<_> = pages.iter().filter(|p| big.contains(&p.url)).collect();
        let best = members.iter().map(|p| representative_score(p)).max().unwrap();
        let rep = pages.iter().find(|p| p.url == big.representative).unwrap();
        assert_eq!(representative_score(rep), best);
        assert_eq!(big.page_types, BTreeSet::from(["product".to_string()]));
    }

    struct FailingBackend;

    impl SimilarityBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn similarity_matrix(&self, _fingerprints: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
            Err(SamplerError::Similarity("backend exploded".to_string()))
        }
    }

    #[test]
    fn test_backend_failure_degrades_to_singletons() {
        let pages = vec![
            page("https://e.com/1", "product", PRODUCT_FP),
            page("https://e.com/2", "product", PRODUCT_FP),
            page("https://e.com/3", "product", PRODUCT_FP),
        ];
        let detector = TemplateDetector::with_backend(0.85, Box::new(FailingBackend));
        assert!(detector.try_detect(&pages).is_err());
        assert_eq!(detector.detect(&pages).len(), 3);

        let bad_threshold = TemplateDetector::with_backend(1.5, Box::new(JaccardSimilarity));
        assert_eq!(bad_threshold.detect(&pages).len(), 3);
    }

    #[test]
    fn test_synthetic_fingerprint_groups_fallback_pages() {
        let structure = PageStructure {
            forms: 1,
            inputs: 3,
            has_h1: true,
            has_nav: true,
            ..Default::default()
        };
        let a = DiscoveredPage::new("https://e.com/a".into(), "form".into(), 1, 50)
            .with_structure(structure.clone());
        let b = DiscoveredPage::new("https://e.com/b".into(), "form".into(), 1, 50)
            .with_structure(structure);
        assert_eq!(synthetic_fingerprint(&a), synthetic_fingerprint(&b));
        assert_eq!(detect_templates(&[a, b]).len(), 1);
    }

    #[test]
    fn test_common_elements_and_labels() {
        let mut a = page("https://e.com/a", "contact", "form|input");
        a.structure.forms = 1;
        a.structure.has_nav = true;
        a.language = Some("en".into());
        let mut b = page("https://e.com/b", "contact", "form|input");
        b.language = Some("en".into());
        let c = page("https://e.com/c", "form", "form|input");

        let templates = detect_templates(&[a, b, c]);
        let template = templates.values().next().unwrap();
        assert_eq!(template.name, "Contact Pages (3 pages)");
        assert!((template.common_elements.forms - 1.0 / 3.0).abs() < 1e-9);
        assert!((template.common_elements.nav - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(template.common_elements.language.as_deref(), Some("en"));
        assert_eq!(template.page_types.len(), 2);
        assert_eq!(type_label("multi_step-form"), "Multi Step Form");
    }
}
