//! Runs the sampling pipeline end to end.
//!
//! Stages run in a fixed order. A failing stage is recorded on the result and
//! replaced by a safe default so later stages still run; only an unusable start
//! URL or cancellation ends the run early, in the `failed` state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::categorizer::{
    CategorizationMethod, Category, Categorizer, category_distribution, importance_for,
};
use crate::config::{SamplerConfig, SelectionStrategy};
use crate::crawlers::web::fallback_page;
use crate::crawlers::{Crawler, PageFetcher, connect_fetcher};
use crate::depth::{DepthLevel, DepthManager, PageDepth, total_minutes};
use crate::error::{Result, SamplerError};
use crate::events::{ProgressReporter, SamplerStage};
use crate::filter::canonicalize;
use crate::results::DiscoveredPage;
use crate::selector::{PageSelector, SelectionResult};
use crate::templates::{Template, TemplateDetector, singleton_templates};

pub const RESULT_FILE: &str = "sampler_result.json";
pub const CONFIG_FILE: &str = "sampler_config.json";
pub const URL_LIST_FILE: &str = "selected_urls.txt";

/// Resolved category and how it was decided, keyed by URL
type CategoryMap = HashMap<String, (Category, CategorizationMethod)>;

/// Derived data for one discovered page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnnotation {
    pub category: Category,
    pub category_method: CategorizationMethod,
    pub importance: u32,
    pub template_id: Option<String>,
    pub selected: bool,
    pub selection_reason: Option<String>,
}

/// Everything a sampling run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerResult {
    pub start_url: String,
    pub state: SamplerStage,
    pub pages: Vec<DiscoveredPage>,
    pub templates: BTreeMap<String, Template>,
    pub selection: SelectionResult,
    pub depth_assignments: Vec<PageDepth>,
    pub category_distribution: BTreeMap<Category, usize>,
    pub annotations: BTreeMap<String, PageAnnotation>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub fetch_backend: Option<String>,
    pub similarity_backend: Option<String>,
    pub total_estimated_minutes: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SamplerResult {
    fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            state: SamplerStage::Idle,
            pages: Vec::new(),
            templates: BTreeMap::new(),
            selection: SelectionResult::default(),
            depth_assignments: Vec::new(),
            category_distribution: BTreeMap::new(),
            annotations: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            fetch_backend: None,
            similarity_backend: None,
            total_estimated_minutes: 0.0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == SamplerStage::Done
    }

    pub fn selected_urls(&self) -> &[String] {
        &self.selection.selected_pages
    }

    /// Flat view for the downstream scanning layer
    pub fn scanner_config(&self) -> ScannerConfig {
        let depth_configs = self
            .depth_assignments
            .iter()
            .map(|a| {
                (
                    a.url.clone(),
                    ScannerDepth {
                        level: a.config.level,
                        estimated_minutes: a.config.estimated_minutes,
                        viewports: a.config.viewports.iter().map(|v| v.name.clone()).collect(),
                        scanners: a.config.scanners.clone(),
                    },
                )
            })
            .collect();

        ScannerConfig {
            urls: self.selection.selected_pages.clone(),
            depth_configs,
            estimated_total_hours: self.total_estimated_minutes / 60.0,
            methodology: Methodology {
                strategy: self.selection.strategy,
                pages_selected: self.selection.selected_pages.len(),
                templates_covered: self.selection.templates_covered,
                pages_discovered: self.pages.len(),
                templates_detected: self.templates.len(),
            },
        }
    }

    fn fail(&mut self, error: SamplerError) {
        ::log::error!("Sampling failed: {}", error);
        self.errors.push(error.to_string());
        self.state = SamplerStage::Failed;
        self.finished_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDepth {
    pub level: DepthLevel,
    pub estimated_minutes: f64,
    pub viewports: Vec<String>,
    pub scanners: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Methodology {
    pub strategy: SelectionStrategy,
    pub pages_selected: usize,
    pub templates_covered: usize,
    pub pages_discovered: usize,
    pub templates_detected: usize,
}

/// Scanner-facing summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub urls: Vec<String>,
    pub depth_configs: BTreeMap<String, ScannerDepth>,
    pub estimated_total_hours: f64,
    pub methodology: Methodology,
}

/// Drives one sampling run over injected collaborators
pub struct Coordinator {
    config: SamplerConfig,
    fetcher: Option<Arc<dyn PageFetcher>>,
    progress: ProgressReporter,
    cancel: CancellationToken,
    stage: SamplerStage,
}

impl Coordinator {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            fetcher: None,
            progress: ProgressReporter::disabled(),
            cancel: CancellationToken::new(),
            stage: SamplerStage::Idle,
        }
    }

    /// Use this fetch backend instead of connecting one from the config
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stage(&self) -> SamplerStage {
        self.stage
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn enter(&mut self, stage: SamplerStage, result: &mut SamplerResult, message: &str) {
        ::log::debug!("Stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        result.state = stage;
        self.progress.emit(stage, message, result.pages.len(), None);
    }

    fn abort(&mut self, result: &mut SamplerResult, error: SamplerError) {
        result.fail(error);
        self.stage = SamplerStage::Failed;
        self.progress.emit(
            SamplerStage::Failed,
            result.errors.last().cloned().unwrap_or_default(),
            result.pages.len(),
            None,
        );
    }

    /// Run the whole pipeline. Always returns a result; check `state` and
    /// `errors` for the outcome.
    pub async fn run(&mut self, start_url: &str) -> SamplerResult {
        let mut result = SamplerResult::new(start_url);

        self.enter(SamplerStage::Discovering, &mut result, "Discovering pages");
        if let Err(e) = self.discover(start_url, &mut result).await {
            self.abort(&mut result, e);
            return result;
        }
        if self.cancel.is_cancelled() {
            self.abort(&mut result, SamplerError::Cancelled);
            return result;
        }

        self.enter(SamplerStage::DetectingTemplates, &mut result, "Detecting templates");
        self.detect_templates(&mut result);
        if self.cancel.is_cancelled() {
            self.abort(&mut result, SamplerError::Cancelled);
            return result;
        }

        self.enter(SamplerStage::Categorizing, &mut result, "Categorizing pages");
        let categories = self.categorize(&mut result);
        if self.cancel.is_cancelled() {
            self.abort(&mut result, SamplerError::Cancelled);
            return result;
        }

        self.enter(SamplerStage::Selecting, &mut result, "Selecting pages");
        self.select(&mut result, &categories);
        if self.cancel.is_cancelled() {
            self.abort(&mut result, SamplerError::Cancelled);
            return result;
        }

        self.enter(SamplerStage::Budgeting, &mut result, "Assigning analysis depth");
        self.budget(&mut result, &categories);
        annotate(&mut result, &categories);

        if let Some(dir) = self.config.output_dir.clone() {
            self.enter(SamplerStage::Persisting, &mut result, "Writing results");
            result.state = SamplerStage::Done;
            result.finished_at = Some(Utc::now());
            if let Err(e) = persist(&dir, &result, &self.config) {
                ::log::error!("Failed to write results to {}: {}", dir.display(), e);
                result.errors.push(format!("persistence failed: {}", e));
            }
        }

        self.stage = SamplerStage::Done;
        result.state = SamplerStage::Done;
        result.finished_at = Some(Utc::now());
        self.progress.emit(
            SamplerStage::Done,
            format!("Selected {} pages", result.selection.selected_pages.len()),
            result.selection.selected_pages.len(),
            Some(result.pages.len()),
        );
        ::log::info!(
            "Sampling complete: {} pages discovered, {} templates, {} selected, \
             {:.0} minutes estimated",
            result.pages.len(),
            result.templates.len(),
            result.selection.selected_pages.len(),
            result.total_estimated_minutes
        );
        result
    }

    async fn discover(&mut self, start_url: &str, result: &mut SamplerResult) -> Result<()> {
        let root = Url::parse(start_url.trim())
            .map_err(|e| SamplerError::InvalidUrl(format!("{start_url}: {e}")))?;
        if !matches!(root.scheme(), "http" | "https") {
            return Err(SamplerError::InvalidUrl(format!(
                "{start_url}: only http and https are supported"
            )));
        }

        let (fetcher, owned) = match &self.fetcher {
            Some(fetcher) => (Arc::clone(fetcher), false),
            None => (connect_fetcher(&self.config.discovery).await?, true),
        };
        result.fetch_backend = Some(fetcher.name().to_string());

        let crawler = Crawler::new(self.config.discovery.clone(), Arc::clone(&fetcher))
            .with_cancellation(self.cancel.clone())
            .with_progress(self.progress.clone());
        let crawled = crawler.crawl(start_url).await;
        if owned {
            fetcher.shutdown().await;
        }

        result.pages = match crawled {
            Ok(pages) => pages,
            Err(e @ SamplerError::InvalidUrl(_)) => return Err(e),
            Err(e) => {
                ::log::warn!("Discovery failed ({}), continuing with the start page", e);
                result.errors.push(format!("discovery failed: {}", e));
                vec![fallback_page(&canonicalize(&root), false)]
            }
        };
        Ok(())
    }

    fn detect_templates(&mut self, result: &mut SamplerResult) {
        let detector = TemplateDetector::new(&self.config.templates);
        result.similarity_backend = Some(detector.backend_name().to_string());
        result.templates = match detector.try_detect(&result.pages) {
            Ok(templates) => templates,
            Err(e) => {
                ::log::warn!("Template detection failed ({}), one template per page", e);
                result.errors.push(format!("template detection failed: {}", e));
                singleton_templates(&result.pages)
            }
        };
    }

    fn categorize(&mut self, result: &mut SamplerResult) -> CategoryMap {
        let categories: CategoryMap = match Categorizer::new() {
            Ok(categorizer) => result
                .pages
                .iter()
                .map(|p| {
                    let (category, info) = categorizer.categorize(p);
                    (p.url.clone(), (category, info.method))
                })
                .collect(),
            Err(e) => {
                result.errors.push(format!("categorization failed: {}", e));
                result
                    .pages
                    .iter()
                    .map(|p| (p.url.clone(), (Category::General, CategorizationMethod::Content)))
                    .collect()
            }
        };

        let plain = plain_categories(&categories);
        result.category_distribution = category_distribution(&plain);
        categories
    }

    fn select(&mut self, result: &mut SamplerResult, categories: &CategoryMap) {
        let mut selector = PageSelector::new(self.config.selection.clone());
        let plain = plain_categories(categories);
        result.selection = selector.select(&result.pages, &result.templates, &plain);
        result.warnings.extend(result.selection.warnings.iter().cloned());
    }

    fn budget(&mut self, result: &mut SamplerResult, categories: &CategoryMap) {
        let plain = plain_categories(categories);
        let by_url: HashMap<&str, &DiscoveredPage> =
            result.pages.iter().map(|p| (p.url.as_str(), p)).collect();
        let selected: Vec<DiscoveredPage> = result
            .selection
            .selected_pages
            .iter()
            .filter_map(|url| by_url.get(url.as_str()).map(|p| (*p).clone()))
            .collect();

        let manager = DepthManager::new(self.config.depth.clone());
        let budget = self.config.depth.time_budget_minutes;

        match budget {
            Some(budget) if self.config.depth.optimize => {
                let outcome = manager.optimize_for_budget(&selected, budget, &plain);
                if !outcome.dropped.is_empty() {
                    drop_from_selection(result, &outcome.dropped);
                }
                if !outcome.within_budget() {
                    result.warnings.push(format!(
                        "Estimated {:.1} minutes exceeds the {:.1} minute budget",
                        outcome.total_minutes, budget
                    ));
                }
                result.depth_assignments = outcome.assignments;
            }
            Some(budget) => {
                result.depth_assignments = manager.assign(&selected, &plain);
                let total = total_minutes(&result.depth_assignments);
                if total > budget {
                    result.warnings.push(format!(
                        "Estimated {:.1} minutes exceeds the {:.1} minute budget \
                         (optimization disabled)",
                        total, budget
                    ));
                }
            }
            None => {
                result.depth_assignments = manager.assign(&selected, &plain);
            }
        }

        result.total_estimated_minutes = total_minutes(&result.depth_assignments);
    }
}

fn plain_categories(categories: &CategoryMap) -> HashMap<String, Category> {
    categories
        .iter()
        .map(|(url, (category, _))| (url.clone(), *category))
        .collect()
}

/// Remove pages cut by the budget and report any template coverage lost
fn drop_from_selection(result: &mut SamplerResult, dropped: &[String]) {
    let dropped: HashSet<&str> = dropped.iter().map(String::as_str).collect();
    let covered_before = result.selection.templates_covered;

    let selection = &mut result.selection;
    for list in [
        &mut selection.selected_pages,
        &mut selection.structured_sample,
        &mut selection.critical_pages,
        &mut selection.random_sample,
    ] {
        list.retain(|url| !dropped.contains(url.as_str()));
    }
    selection.justifications.retain(|url, _| !dropped.contains(url.as_str()));

    let covered_after = result
        .templates
        .values()
        .filter(|t| t.pages.iter().any(|url| result.selection.is_selected(url)))
        .count();
    result.selection.templates_covered = covered_after;

    result.warnings.push(format!(
        "Time budget removed {} selected pages",
        dropped.len()
    ));
    if covered_after < covered_before {
        result.warnings.push(format!(
            "Time budget reduced template coverage from {} to {}",
            covered_before, covered_after
        ));
    }
}

fn annotate(result: &mut SamplerResult, categories: &CategoryMap) {
    let template_of: HashMap<&str, &str> = result
        .templates
        .values()
        .flat_map(|t| t.pages.iter().map(move |url| (url.as_str(), t.id.as_str())))
        .collect();

    result.annotations = result
        .pages
        .iter()
        .map(|page| {
            let (category, method) = categories
                .get(&page.url)
                .copied()
                .unwrap_or((Category::General, CategorizationMethod::Content));
            let reason = result.selection.justifications.get(&page.url).cloned();
            let annotation = PageAnnotation {
                category,
                category_method: method,
                importance: importance_for(page, category),
                template_id: template_of.get(page.url.as_str()).map(|id| id.to_string()),
                selected: reason.is_some(),
                selection_reason: reason,
            };
            (page.url.clone(), annotation)
        })
        .collect();
}

/// Write the result, the configuration and the selected URL list
pub fn persist(dir: &Path, result: &SamplerResult, config: &SamplerConfig) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(RESULT_FILE), serde_json::to_string_pretty(result)?)?;
    std::fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(config)?)?;

    let mut urls = result.selection.selected_pages.join("\n");
    if !urls.is_empty() {
        urls.push('\n');
    }
    std::fs::write(dir.join(URL_LIST_FILE), urls)?;

    ::log::info!("Wrote sampler results to {}", dir.display());
    Ok(())
}
