use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::DiscoveryConfig;
use crate::crawlers::crawler::{FetchOptions, PageFetcher};
use crate::crawlers::page_type::{classify_by_url, classify_page_type, compute_priority};
use crate::error::{Result, SamplerError};
use crate::events::{ProgressReporter, SamplerStage};
use crate::filter::{UrlFilter, canonicalize};
use crate::parsers::{self, ParserType, html, sitemap};
use crate::results::DiscoveredPage;
use crate::utils::{calculate_timeout, sanitize_filename};

/// Sitemap documents fetched beyond the well-known locations
const MAX_NESTED_SITEMAPS: usize = 5;
/// Upper bound on URLs taken from sitemaps
const MAX_SITEMAP_URLS: usize = 1000;
/// How long an idle worker waits before re-checking the queue
const IDLE_POLL: Duration = Duration::from_millis(100);
/// Extra time granted on top of the fetch timeout before a fetch is abandoned
const FETCH_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct QueuedUrl {
    url: String,
    depth: usize,
}

/// Shared crawl state, guarded by one mutex
#[derive(Default)]
struct CrawlState {
    queue: VecDeque<QueuedUrl>,
    /// Every URL ever queued; claiming pops from `queue`, so a URL is claimed once
    seen: HashSet<String>,
    discovered: Vec<DiscoveredPage>,
    /// Claimed URLs whose fetch has not been recorded yet
    in_flight: usize,
}

enum Claim {
    Url(QueuedUrl),
    Wait,
    Done,
}

struct CrawlContext {
    config: DiscoveryConfig,
    fetcher: Arc<dyn PageFetcher>,
    filter: UrlFilter,
    sitemap_urls: HashSet<String>,
    state: Mutex<CrawlState>,
    wakeup: Notify,
    cancel: CancellationToken,
    progress: ProgressReporter,
}

/// Breadth-first page discovery over a pluggable fetch backend
pub struct Crawler {
    config: DiscoveryConfig,
    fetcher: Arc<dyn PageFetcher>,
    cancel: CancellationToken,
    progress: ProgressReporter,
}

impl Crawler {
    pub fn new(config: DiscoveryConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            config,
            fetcher,
            cancel: CancellationToken::new(),
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Crawl from `start_url`, returning at most `max_pages` pages sorted by
    /// priority (descending) then depth. Individual fetch failures are skipped;
    /// when nothing could be fetched a single fallback page for the start URL
    /// is returned.
    pub async fn crawl(&self, start_url: &str) -> Result<Vec<DiscoveredPage>> {
        ::log::info!("Starting crawl for: {}", start_url);

        let root_url = Url::parse(start_url.trim())
            .map_err(|e| SamplerError::InvalidUrl(format!("{start_url}: {e}")))?;
        if !matches!(root_url.scheme(), "http" | "https") {
            return Err(SamplerError::InvalidUrl(format!(
                "{start_url}: only http and https are supported"
            )));
        }
        let root_url = canonicalize(&root_url);

        let filter = UrlFilter::for_root(
            &root_url,
            self.config.follow_external,
            &self.config.allowed_domains,
            &self.config.exclude_patterns,
        )?;

        if self.config.max_pages == 0 {
            ::log::warn!("max_pages is 0, nothing to crawl");
            return Ok(Vec::new());
        }

        let sitemap_urls = if self.config.use_sitemap {
            self.discover_sitemap_urls(&root_url, &filter).await
        } else {
            Vec::new()
        };
        ::log::info!("Seeded {} URLs from sitemaps", sitemap_urls.len());

        let mut state = CrawlState::default();
        state.seen.insert(root_url.to_string());
        state.queue.push_back(QueuedUrl {
            url: root_url.to_string(),
            depth: 0,
        });
        if self.config.max_depth >= 1 {
            for url in &sitemap_urls {
                if state.seen.insert(url.clone()) {
                    state.queue.push_back(QueuedUrl {
                        url: url.clone(),
                        depth: 1,
                    });
                }
            }
        }

        let ctx = Arc::new(CrawlContext {
            config: self.config.clone(),
            fetcher: Arc::clone(&self.fetcher),
            filter,
            sitemap_urls: sitemap_urls.into_iter().collect(),
            state: Mutex::new(state),
            wakeup: Notify::new(),
            cancel: self.cancel.clone(),
            progress: self.progress.clone(),
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.max_concurrency.max(1) {
            let ctx = Arc::clone(&ctx);
            workers.spawn(async move { worker_loop(worker_id, ctx).await });
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                ::log::error!("Crawl worker panicked: {}", e);
            }
        }

        let mut pages = std::mem::take(&mut ctx.state.lock().await.discovered);
        pages.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.depth.cmp(&b.depth)));

        if pages.is_empty() {
            ::log::warn!(
                "No pages could be fetched from {}, using a fallback page",
                root_url
            );
            let in_sitemap = ctx.sitemap_urls.contains(root_url.as_str());
            pages.push(fallback_page(&root_url, in_sitemap));
        }

        ::log::info!("Crawl complete - discovered {} pages", pages.len());
        Ok(pages)
    }

    /// Best-effort sitemap discovery: robots.txt directives plus the
    /// well-known locations. Failures are ignored.
    async fn discover_sitemap_urls(&self, root_url: &Url, filter: &UrlFilter) -> Vec<String> {
        let per_request = Duration::from_secs(self.config.sitemap_timeout_secs.max(1));
        self.sitemap_urls_within(root_url, filter, per_request, per_request * 4)
            .await
    }

    /// Sitemap discovery bounded by `overall`; URLs found before the deadline are kept
    async fn sitemap_urls_within(
        &self,
        root_url: &Url,
        filter: &UrlFilter,
        per_request: Duration,
        overall: Duration,
    ) -> Vec<String> {
        let mut found = Vec::new();
        let collect = self.collect_sitemap_urls(root_url, filter, per_request, &mut found);
        let timed_out = timeout(overall, collect).await.is_err();
        if timed_out {
            ::log::warn!(
                "Sitemap discovery timed out for {}, keeping {} URLs found so far",
                root_url,
                found.len()
            );
        }
        found
    }

    async fn collect_sitemap_urls(
        &self,
        root_url: &Url,
        filter: &UrlFilter,
        per_request: Duration,
        found: &mut Vec<String>,
    ) {
        let origin = root_url.origin().ascii_serialization();

        let mut pending: VecDeque<String> = VecDeque::new();
        if let Ok(robots) = self
            .fetcher
            .fetch_resource(&format!("{origin}/robots.txt"), per_request)
            .await
        {
            pending.extend(sitemap::parse_robots(&robots.body));
        }
        for name in ["sitemap.xml", "sitemap_index.xml", "sitemap.txt"] {
            pending.push_back(format!("{origin}/{name}"));
        }

        let mut fetched_docs = HashSet::new();
        let mut nested = 0;
        let mut found_set = HashSet::new();

        while let Some(doc_url) = pending.pop_front() {
            if !fetched_docs.insert(doc_url.clone()) {
                continue;
            }

            let doc = match self.fetcher.fetch_resource(&doc_url, per_request).await {
                Ok(doc) => doc,
                Err(e) => {
                    ::log::debug!("No sitemap at {}: {}", doc_url, e);
                    continue;
                }
            };

            let declared = ParserType::from_content_type(doc.content_type.as_deref(), &doc_url);
            let parser_type = match declared {
                ParserType::Other | ParserType::Html => ParserType::from_url(&doc_url),
                known => known,
            };
            let entries = sitemap::parse(&doc.body, parser_type);

            for child in entries.sitemaps {
                if nested < MAX_NESTED_SITEMAPS {
                    nested += 1;
                    pending.push_back(child);
                }
            }

            for raw in entries.urls {
                if found.len() >= MAX_SITEMAP_URLS {
                    break;
                }
                let Ok(url) = Url::parse(&raw) else {
                    continue;
                };
                if !filter.should_crawl(&url) {
                    continue;
                }
                let normalized = filter.normalize_url(&url).to_string();
                if found_set.insert(normalized.clone()) {
                    found.push(normalized);
                }
            }
        }
    }
}

/// Crawl with a fresh crawler and no cancellation or progress reporting
pub async fn crawl(
    start_url: &str,
    config: &DiscoveryConfig,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<Vec<DiscoveredPage>> {
    Crawler::new(config.clone(), fetcher).crawl(start_url).await
}

/// Processes URLs until the queue is drained, the page limit is reached or the
/// crawl is cancelled
async fn worker_loop(worker_id: usize, ctx: Arc<CrawlContext>) {
    ::log::trace!("Worker {} starting", worker_id);

    loop {
        let queued = match claim_next(&ctx).await {
            Claim::Url(queued) => queued,
            Claim::Wait => {
                let _ = timeout(IDLE_POLL, ctx.wakeup.notified()).await;
                continue;
            }
            Claim::Done => break,
        };

        ::log::debug!("Worker {} fetching {} (depth {})", worker_id, queued.url, queued.depth);
        let outcome = fetch_page(&ctx, &queued).await;
        record_outcome(worker_id, &ctx, queued, outcome).await;
        ctx.wakeup.notify_waiters();
    }

    ::log::trace!("Worker {} finished", worker_id);
}

/// Takes the next URL off the queue and reserves a page slot for it. The lock is
/// released before the fetch starts.
async fn claim_next(ctx: &CrawlContext) -> Claim {
    let mut state = ctx.state.lock().await;

    if ctx.cancel.is_cancelled() {
        return Claim::Done;
    }

    if state.discovered.len() + state.in_flight >= ctx.config.max_pages {
        // An in-flight fetch may still fail and free its slot
        return if state.in_flight == 0 {
            Claim::Done
        } else {
            Claim::Wait
        };
    }

    match state.queue.pop_front() {
        Some(queued) => {
            state.in_flight += 1;
            Claim::Url(queued)
        }
        None if state.in_flight == 0 => Claim::Done,
        None => Claim::Wait,
    }
}

/// Records a fetch result and queues the links it discovered
async fn record_outcome(
    worker_id: usize,
    ctx: &CrawlContext,
    queued: QueuedUrl,
    outcome: Result<FetchOutcome>,
) {
    let mut state = ctx.state.lock().await;
    state.in_flight -= 1;

    if ctx.cancel.is_cancelled() {
        ::log::debug!("Discarding result for {} after cancellation", queued.url);
        return;
    }

    let FetchOutcome {
        page,
        links,
        redirected_to,
    } = match outcome {
        Ok(result) => result,
        Err(e) if e.is_transient() => {
            ::log::warn!("Worker {} skipping {}: {}", worker_id, queued.url, e);
            return;
        }
        Err(e) => {
            ::log::error!("Worker {} failed on {}: {}", worker_id, queued.url, e);
            return;
        }
    };

    if state.discovered.len() >= ctx.config.max_pages {
        return;
    }
    if let Some(target) = redirected_to {
        if !state.seen.insert(target.clone()) {
            ::log::debug!("{} redirects to already known {}, skipping", queued.url, target);
            return;
        }
    }
    ::log::info!("Discovered {} ({}, priority {})", page.url, page.page_type, page.priority);
    state.discovered.push(page);

    let discovered = state.discovered.len();
    ctx.progress.emit(
        SamplerStage::Discovering,
        format!("Discovered {}", queued.url),
        discovered,
        Some(ctx.config.max_pages),
    );

    if queued.depth >= ctx.config.max_depth {
        return;
    }

    let mut queued_links = 0;
    for link in links {
        if queued_links >= ctx.config.links_per_page {
            break;
        }
        if state.seen.insert(link.clone()) {
            ::log::trace!("Queuing link for crawling: {}", link);
            state.queue.push_back(QueuedUrl {
                url: link,
                depth: queued.depth + 1,
            });
            queued_links += 1;
        }
    }
}

/// A fetched page with its in-scope links
struct FetchOutcome {
    page: DiscoveredPage,
    links: Vec<String>,
    /// Canonical final URL when the fetch was redirected elsewhere
    redirected_to: Option<String>,
}

/// Fetches and parses one page
async fn fetch_page(ctx: &CrawlContext, queued: &QueuedUrl) -> Result<FetchOutcome> {
    let options = FetchOptions {
        timeout: calculate_timeout(ctx.config.timeout_secs, queued.url.len()),
        capture_screenshot: ctx.config.capture_screenshots,
    };

    let fetched = match timeout(
        options.timeout + FETCH_GRACE,
        ctx.fetcher.fetch_page(&queued.url, &options),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(SamplerError::Timeout(
                queued.url.clone(),
                options.timeout.as_secs(),
            ));
        }
    };

    let page_url = Url::parse(&queued.url)
        .map_err(|e| SamplerError::InvalidUrl(format!("{}: {e}", queued.url)))?;
    let base_url = Url::parse(&fetched.url).unwrap_or_else(|_| page_url.clone());
    if base_url != page_url && !ctx.filter.should_crawl(&base_url) {
        return Err(SamplerError::InvalidUrl(format!(
            "{} redirected out of scope to {}",
            queued.url, base_url
        )));
    }

    let extract = html::parse(&fetched.body);
    let links = resolve_links(&base_url, &extract.links, &ctx.filter);

    let in_sitemap = ctx.sitemap_urls.contains(&queued.url);
    let mut page = build_page(&page_url, queued.depth, in_sitemap, extract);

    if let Some(png) = fetched.screenshot {
        page.screenshot = save_screenshot(&ctx.config.screenshot_dir, &page.url, &png).await;
    }

    let final_url = ctx.filter.normalize_url(&base_url).to_string();
    let redirected_to = (final_url != queued.url).then_some(final_url);

    Ok(FetchOutcome {
        page,
        links,
        redirected_to,
    })
}

/// Resolves raw hrefs against the page URL, keeping in-scope, canonical, distinct links
fn resolve_links(base_url: &Url, raw_links: &[String], filter: &UrlFilter) -> Vec<String> {
    let mut seen = HashSet::new();
    raw_links
        .iter()
        .filter(|raw| !filter.is_excluded(raw))
        .filter_map(|raw| base_url.join(raw).ok())
        .filter(|url| filter.should_crawl(url))
        .map(|url| filter.normalize_url(&url).to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn build_page(
    url: &Url,
    depth: usize,
    in_sitemap: bool,
    extract: parsers::PageExtract,
) -> DiscoveredPage {
    let page_type = classify_page_type(url, &extract.structure);
    let priority = compute_priority(&page_type, depth, in_sitemap, url);

    let mut page = DiscoveredPage::new(url.to_string(), page_type, depth, priority);
    page.title = extract.title;
    page.description = extract.description;
    page.language = extract.language;
    page.structure = extract.structure;
    page.fingerprint = extract.fingerprint;
    page.in_sitemap = in_sitemap;
    page
}

/// Page synthesized for the start URL when nothing could be fetched
pub fn fallback_page(root_url: &Url, in_sitemap: bool) -> DiscoveredPage {
    let page_type = classify_by_url(root_url).unwrap_or("homepage").to_string();
    let priority = compute_priority(&page_type, 0, in_sitemap, root_url);
    let mut page = DiscoveredPage::new(root_url.to_string(), page_type, 0, priority);
    page.in_sitemap = in_sitemap;
    page
}

/// Writes a screenshot, returning its path; failures are logged and swallowed
async fn save_screenshot(dir: &Path, url: &str, png: &[u8]) -> Option<PathBuf> {
    let path = dir.join(format!("{}.png", sanitize_filename(url)));
    let written = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, png).await
    }
    .await;

    match written {
        Ok(()) => Some(path),
        Err(e) => {
            ::log::debug!("Failed to save screenshot for {}: {}", url, e);
            None
        }
    }
}
