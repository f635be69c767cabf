//! Analysis depth profiles and the time-budget optimizer.
//!
//! The optimizer is a greedy two-phase heuristic: demote non-protected pages one
//! level, then truncate the ranked list. It does not search for an optimal
//! assignment since page order already encodes priority.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::categorizer::Category;
use crate::config::DepthSettings;
use crate::results::DiscoveredPage;

/// Named analysis depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthLevel {
    Basic,
    Standard,
    Full,
    Custom,
}

impl DepthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepthLevel::Basic => "basic",
            DepthLevel::Standard => "standard",
            DepthLevel::Full => "full",
            DepthLevel::Custom => "custom",
        }
    }

    /// One level lighter. Custom profiles sit outside the ladder and stay put.
    pub fn demote(self) -> Self {
        match self {
            DepthLevel::Full => DepthLevel::Standard,
            DepthLevel::Standard | DepthLevel::Basic => DepthLevel::Basic,
            DepthLevel::Custom => DepthLevel::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
        }
    }

    pub fn desktop() -> Self {
        Self::new("desktop", 1920, 1080)
    }

    pub fn tablet() -> Self {
        Self::new("tablet", 768, 1024)
    }

    pub fn mobile() -> Self {
        Self::new("mobile", 375, 667)
    }
}

/// Region of a page a scanner should examine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentArea {
    Visible,
    Hidden,
    Modal,
    Accordion,
}

/// User-defined profile, costed by its size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomDepth {
    #[serde(default = "default_custom_viewports")]
    pub viewports: Vec<Viewport>,
    #[serde(default = "default_custom_states")]
    pub interaction_states: Vec<String>,
    #[serde(default = "default_custom_areas")]
    pub content_areas: Vec<ContentArea>,
    #[serde(default)]
    pub interactions: Vec<String>,
    #[serde(default = "default_custom_scanners")]
    pub scanners: Vec<String>,
}

impl Default for CustomDepth {
    fn default() -> Self {
        Self {
            viewports: default_custom_viewports(),
            interaction_states: default_custom_states(),
            content_areas: default_custom_areas(),
            interactions: Vec::new(),
            scanners: default_custom_scanners(),
        }
    }
}

impl CustomDepth {
    /// `2 + 1.5×viewports + 0.5×states + 0.5×areas + 1×interactions + 1.5×scanners`
    pub fn estimated_minutes(&self) -> f64 {
        2.0 + 1.5 * self.viewports.len() as f64
            + 0.5 * self.interaction_states.len() as f64
            + 0.5 * self.content_areas.len() as f64
            + self.interactions.len() as f64
            + 1.5 * self.scanners.len() as f64
    }
}

fn default_custom_viewports() -> Vec<Viewport> {
    vec![Viewport::desktop()]
}

fn default_custom_states() -> Vec<String> {
    strings(&["default"])
}

fn default_custom_areas() -> Vec<ContentArea> {
    vec![ContentArea::Visible]
}

fn default_custom_scanners() -> Vec<String> {
    strings(&["axe", "pa11y"])
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A concrete analysis profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthConfig {
    pub level: DepthLevel,
    pub viewports: Vec<Viewport>,
    pub interaction_states: Vec<String>,
    pub content_areas: Vec<ContentArea>,
    pub interactions: Vec<String>,
    pub scanners: Vec<String>,
    pub estimated_minutes: f64,
}

impl DepthConfig {
    pub fn basic() -> Self {
        Self {
            level: DepthLevel::Basic,
            viewports: vec![Viewport::desktop()],
            interaction_states: strings(&["default"]),
            content_areas: vec![ContentArea::Visible],
            interactions: Vec::new(),
            scanners: strings(&["axe", "pa11y"]),
            estimated_minutes: 5.0,
        }
    }

    pub fn standard() -> Self {
        Self {
            level: DepthLevel::Standard,
            viewports: vec![Viewport::desktop(), Viewport::mobile()],
            interaction_states: strings(&["default", "hover", "focus"]),
            content_areas: vec![ContentArea::Visible, ContentArea::Hidden],
            interactions: strings(&["keyboard"]),
            scanners: strings(&["axe", "pa11y", "lighthouse"]),
            estimated_minutes: 8.0,
        }
    }

    pub fn full() -> Self {
        Self {
            level: DepthLevel::Full,
            viewports: vec![Viewport::desktop(), Viewport::tablet(), Viewport::mobile()],
            interaction_states: strings(&["default", "hover", "focus", "active", "disabled"]),
            content_areas: vec![
                ContentArea::Visible,
                ContentArea::Hidden,
                ContentArea::Modal,
                ContentArea::Accordion,
            ],
            interactions: strings(&["keyboard", "mouse", "touch"]),
            scanners: strings(&["axe", "pa11y", "lighthouse", "html_validator"]),
            estimated_minutes: 15.0,
        }
    }

    pub fn custom(profile: &CustomDepth) -> Self {
        Self {
            level: DepthLevel::Custom,
            viewports: profile.viewports.clone(),
            interaction_states: profile.interaction_states.clone(),
            content_areas: profile.content_areas.clone(),
            interactions: profile.interactions.clone(),
            scanners: profile.scanners.clone(),
            estimated_minutes: profile.estimated_minutes(),
        }
    }
}

/// Depth assigned to one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDepth {
    pub url: String,
    pub category: Option<Category>,
    pub config: DepthConfig,
}

/// Result of fitting an assignment to a time budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetOutcome {
    /// Surviving assignments, in ranking order
    pub assignments: Vec<PageDepth>,
    pub budget_minutes: f64,
    pub total_minutes: f64,
    /// Pages moved down one level
    pub demoted: Vec<String>,
    /// Pages removed by truncation
    pub dropped: Vec<String>,
}

impl BudgetOutcome {
    pub fn within_budget(&self) -> bool {
        self.total_minutes <= self.budget_minutes
    }
}

/// Categories whose pages are never demoted and are kept first on truncation
pub fn is_protected(category: Option<Category>) -> bool {
    matches!(
        category,
        Some(Category::Homepage | Category::Authentication | Category::Checkout | Category::Contact)
    )
}

/// Preset level for a category
pub fn category_preset(category: Category) -> DepthLevel {
    match category {
        Category::Homepage
        | Category::Authentication
        | Category::Checkout
        | Category::Contact
        | Category::Form
        | Category::Media => DepthLevel::Full,
        Category::Search | Category::Product | Category::Navigation => DepthLevel::Standard,
        Category::Article | Category::Legal | Category::About | Category::General => {
            DepthLevel::Basic
        }
    }
}

/// Level for an uncategorized page, from its interactive and media content
pub fn content_preset(page: &DiscoveredPage) -> DepthLevel {
    let interactive = page.structure.interactive_elements();
    let media = page.structure.media_elements();
    if interactive >= 3 || media >= 2 {
        DepthLevel::Full
    } else if interactive >= 1 || media >= 1 {
        DepthLevel::Standard
    } else {
        DepthLevel::Basic
    }
}

pub fn total_minutes(assignments: &[PageDepth]) -> f64 {
    assignments.iter().map(|a| a.config.estimated_minutes).sum()
}

/// Assigns and budgets analysis depth
#[derive(Debug, Clone, Default)]
pub struct DepthManager {
    settings: DepthSettings,
}

impl DepthManager {
    pub fn new(settings: DepthSettings) -> Self {
        Self { settings }
    }

    pub fn profile(&self, level: DepthLevel) -> DepthConfig {
        match level {
            DepthLevel::Basic => DepthConfig::basic(),
            DepthLevel::Standard => DepthConfig::standard(),
            DepthLevel::Full => DepthConfig::full(),
            DepthLevel::Custom => DepthConfig::custom(&self.settings.custom_profile),
        }
    }

    /// Default level for a page: configured override, else category preset,
    /// else content heuristics
    pub fn default_level(&self, page: &DiscoveredPage, category: Option<Category>) -> DepthLevel {
        if let Some(level) = self.settings.default_profile {
            return level;
        }
        match category {
            Some(category) => category_preset(category),
            None => content_preset(page),
        }
    }

    /// Default depth per page, in input order
    pub fn assign(
        &self,
        pages: &[DiscoveredPage],
        categories: &HashMap<String, Category>,
    ) -> Vec<PageDepth> {
        pages
            .iter()
            .map(|page| {
                let category = categories.get(&page.url).copied();
                PageDepth {
                    url: page.url.clone(),
                    category,
                    config: self.profile(self.default_level(page, category)),
                }
            })
            .collect()
    }

    /// Fit the default assignment into `budget_minutes`
    pub fn optimize_for_budget(
        &self,
        pages: &[DiscoveredPage],
        budget_minutes: f64,
        categories: &HashMap<String, Category>,
    ) -> BudgetOutcome {
        let mut assignments = self.assign(pages, categories);
        let mut outcome = BudgetOutcome {
            total_minutes: total_minutes(&assignments),
            assignments: Vec::new(),
            budget_minutes,
            demoted: Vec::new(),
            dropped: Vec::new(),
        };

        if outcome.total_minutes <= budget_minutes {
            outcome.assignments = assignments;
            return outcome;
        }

        for assignment in assignments.iter_mut() {
            if is_protected(assignment.category) {
                continue;
            }
            let demoted = assignment.config.level.demote();
            if demoted != assignment.config.level {
                assignment.config = self.profile(demoted);
                outcome.demoted.push(assignment.url.clone());
            }
        }
        outcome.total_minutes = total_minutes(&assignments);
        ::log::debug!(
            "Demoted {} pages, {:.1} of {:.1} minutes",
            outcome.demoted.len(),
            outcome.total_minutes,
            budget_minutes
        );

        if outcome.total_minutes <= budget_minutes || assignments.is_empty() {
            outcome.assignments = assignments;
            return outcome;
        }

        let average = outcome.total_minutes / assignments.len() as f64;
        let limit = ((budget_minutes / average).floor().max(0.0) as usize).max(1);

        let order: Vec<usize> = (0..assignments.len())
            .filter(|&i| is_protected(assignments[i].category))
            .chain((0..assignments.len()).filter(|&i| !is_protected(assignments[i].category)))
            .collect();

        let mut keep = vec![false; assignments.len()];
        let mut running = 0.0;
        let mut kept = 0;
        for i in order {
            let cost = assignments[i].config.estimated_minutes;
            if kept >= limit || (kept > 0 && running + cost > budget_minutes) {
                break;
            }
            keep[i] = true;
            running += cost;
            kept += 1;
        }

        for (assignment, keep) in assignments.into_iter().zip(keep) {
            if keep {
                outcome.assignments.push(assignment);
            } else {
                outcome.dropped.push(assignment.url);
            }
        }
        outcome.total_minutes = running;
        ::log::info!(
            "Truncated sample to {} pages to fit {:.1} minutes ({} dropped)",
            outcome.assignments.len(),
            budget_minutes,
            outcome.dropped.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::PageStructure;

    fn pages(n: usize) -> Vec<DiscoveredPage> {
        (0..n)
            .map(|i| DiscoveredPage::new(format!("https://e.com/p{i}"), "general".into(), 1, 50))
            .collect()
    }

    fn categorize_all(pages: &[DiscoveredPage], category: Category) -> HashMap<String, Category> {
        pages.iter().map(|p| (p.url.clone(), category)).collect()
    }

    #[test]
    fn test_profiles() {
        let shape = |profile: &DepthConfig| {
            (
                profile.viewports.len(),
                profile.interaction_states.len(),
                profile.scanners.len(),
            )
        };
        assert_eq!(shape(&DepthConfig::basic()), (1, 1, 2));
        assert_eq!(shape(&DepthConfig::standard()), (2, 3, 3));
        let full = DepthConfig::full();
        assert_eq!(shape(&full), (3, 5, 4));
        assert_eq!(full.estimated_minutes, 15.0);
    }

    #[test]
    fn test_custom_cost() {
        let custom = CustomDepth {
            viewports: vec![Viewport::desktop(), Viewport::mobile()],
            interaction_states: strings(&["default", "focus"]),
            content_areas: vec![ContentArea::Visible, ContentArea::Modal],
            interactions: strings(&["keyboard"]),
            scanners: strings(&["axe"]),
        };
        // 2 + 3 + 1 + 1 + 1 + 1.5
        assert_eq!(custom.estimated_minutes(), 9.5);
        assert_eq!(DepthConfig::custom(&custom).level, DepthLevel::Custom);
    }

    #[test]
    fn test_presets_and_overrides() {
        let manager = DepthManager::default();
        let plain = &pages(1)[0];
        assert_eq!(manager.default_level(plain, Some(Category::Checkout)), DepthLevel::Full);
        assert_eq!(manager.default_level(plain, Some(Category::Product)), DepthLevel::Standard);
        assert_eq!(manager.default_level(plain, Some(Category::Legal)), DepthLevel::Basic);

        assert_eq!(manager.default_level(plain, None), DepthLevel::Basic);
        let one_button = plain.clone().with_structure(PageStructure {
            buttons: 1,
            ..Default::default()
        });
        assert_eq!(manager.default_level(&one_button, None), DepthLevel::Standard);
        let gallery = plain.clone().with_structure(PageStructure {
            images: 10,
            ..Default::default()
        });
        assert_eq!(manager.default_level(&gallery, None), DepthLevel::Full);

        let forced = DepthManager::new(DepthSettings {
            default_profile: Some(DepthLevel::Basic),
            ..Default::default()
        });
        assert_eq!(forced.default_level(plain, Some(Category::Homepage)), DepthLevel::Basic);
    }

    #[test]
    fn test_within_budget_is_unchanged() {
        let manager = DepthManager::default();
        let pages = pages(3);
        let categories = categorize_all(&pages, Category::Article);
        let outcome = manager.optimize_for_budget(&pages, 60.0, &categories);
        assert_eq!(outcome.assignments, manager.assign(&pages, &categories));
        assert!(outcome.demoted.is_empty() && outcome.dropped.is_empty());
        assert_eq!(outcome.total_minutes, 15.0);
    }

    #[test]
    fn test_demotion_spares_protected_pages() {
        let manager = DepthManager::default();
        let pages = pages(4);
        let mut categories = categorize_all(&pages, Category::Form);
        categories.insert(pages[0].url.clone(), Category::Homepage);

        // 4 × 15 = 60; after demotion 15 + 3 × 8 = 39
        let outcome = manager.optimize_for_budget(&pages, 40.0, &categories);
        assert!(outcome.within_budget());
        assert_eq!(outcome.total_minutes, 39.0);
        assert_eq!(outcome.assignments[0].config.level, DepthLevel::Full);
        assert!(outcome.assignments[1..].iter().all(|a| a.config.level == DepthLevel::Standard));
        assert_eq!(outcome.demoted.len(), 3);
    }

    #[test]
    fn test_scenario_tight_budget_keeps_critical_pages() {
        let manager = DepthManager::default();
        let pages = pages(20);
        let mut categories = categorize_all(&pages, Category::Form);
        categories.insert(pages[5].url.clone(), Category::Homepage);
        categories.insert(pages[12].url.clone(), Category::Checkout);

        let outcome = manager.optimize_for_budget(&pages, 10.0, &categories);
        assert!(!outcome.assignments.is_empty());
        assert!(is_protected(outcome.assignments[0].category));
        assert_eq!(outcome.assignments[0].url, pages[5].url);
        // over by at most one page's worst-case cost
        assert!(outcome.total_minutes <= 10.0 + 15.0);
        assert_eq!(outcome.assignments.len() + outcome.dropped.len(), 20);
    }

    #[test]
    fn test_truncation_preserves_ranking_order() {
        let manager = DepthManager::default();
        let pages = pages(10);
        let mut categories = categorize_all(&pages, Category::Product);
        categories.insert(pages[7].url.clone(), Category::Contact);

        // 9 × 5 (demoted) + 15 = 60 over a 30 minute budget: limit 5 pages
        let outcome = manager.optimize_for_budget(&pages, 30.0, &categories);
        let urls: Vec<_> = outcome.assignments.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://e.com/p0",
                "https://e.com/p1",
                "https://e.com/p2",
                "https://e.com/p7",
            ]
        );
        assert!(outcome.within_budget());
        assert_eq!(outcome.total_minutes, 30.0);
    }

    #[test]
    fn test_budget_bound_holds() {
        let manager = DepthManager::default();
        for n in [1, 3, 8, 25] {
            let pages = pages(n);
            let categories = categorize_all(&pages, Category::Media);
            for budget in [0.0, 4.0, 12.0, 50.0, 500.0] {
                let outcome = manager.optimize_for_budget(&pages, budget, &categories);
                assert!(outcome.total_minutes <= budget + 15.0, "n={n} budget={budget}");
                assert!(!outcome.assignments.is_empty());
            }
        }
    }
}
