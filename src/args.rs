use clap::{Parser, ValueEnum};
use page_sampler::SelectionStrategy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-sampler")]
#[command(about = "Discovers a site's pages and selects an accessibility test sample")]
#[command(version)]
pub struct Args {
    /// Start URL of the site to sample
    pub url: String,

    /// JSON configuration file; flags below override it
    #[arg(short = 'f', long)]
    pub config: Option<PathBuf>,

    /// Maximum number of pages to discover
    #[arg(short = 'p', long)]
    pub max_pages: Option<usize>,

    /// Maximum link depth from the start URL
    #[arg(short = 'd', long)]
    pub max_depth: Option<usize>,

    /// Number of concurrent fetches
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Selection strategy
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Maximum number of pages to select
    #[arg(short = 'n', long)]
    pub select: Option<usize>,

    /// Seed for reproducible random sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Total analysis time budget in minutes
    #[arg(short, long)]
    pub budget: Option<f64>,

    /// Directory for the result files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fetch with plain HTTP instead of WebDriver
    #[arg(long)]
    pub no_webdriver: bool,

    /// Follow links to other domains
    #[arg(long)]
    pub follow_external: bool,

    /// Print the scanner configuration as JSON instead of the URL list
    #[arg(long)]
    pub scanner_config: bool,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    WcagEm,
    Quick,
    Comprehensive,
    Custom,
}

/// Convert from CLI argument strategy to the library's strategy
pub fn convert_strategy(arg: StrategyArg) -> SelectionStrategy {
    match arg {
        StrategyArg::WcagEm => SelectionStrategy::WcagEm,
        StrategyArg::Quick => SelectionStrategy::Quick,
        StrategyArg::Comprehensive => SelectionStrategy::Comprehensive,
        StrategyArg::Custom => SelectionStrategy::Custom,
    }
}

impl Args {
    /// Default log filter for the verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }
}
