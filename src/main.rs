use clap::Parser;
use page_sampler::events::ProgressEvent;
use page_sampler::{Sampler, SamplerConfig, SamplerStage};
use std::error::Error;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod args;
use args::{Args, convert_strategy};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            ::log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    let config = build_config(&args)?;
    ::log::info!("Starting page sampling for: {}", args.url);

    if config.discovery.use_webdriver {
        ::log::info!(
            "WebDriver fetching expects a server at {} (set WEBDRIVER_URL to override); \
             plain HTTP is used if it is unreachable",
            config.discovery.webdriver_url
        );
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(log_progress(rx));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ::log::warn!("Interrupted, cancelling run");
            on_interrupt.cancel();
        }
    });

    let start_time = std::time::Instant::now();
    let result = Sampler::new()
        .with_config(config)
        .with_progress(tx)
        .with_cancellation(cancel)
        .run(&args.url)
        .await;
    let _ = progress.await;

    for warning in &result.warnings {
        ::log::warn!("{}", warning);
    }
    for error in &result.errors {
        ::log::error!("{}", error);
    }

    if args.scanner_config {
        println!("{}", serde_json::to_string_pretty(&result.scanner_config())?);
    } else {
        for url in result.selected_urls() {
            println!("{}", url);
        }
    }

    ::log::info!(
        "Sampling finished in {:.2} seconds: {} of {} pages selected, {:.1} hours estimated",
        start_time.elapsed().as_secs_f64(),
        result.selected_urls().len(),
        result.pages.len(),
        result.total_estimated_minutes / 60.0
    );
    Ok(result.is_success())
}

/// Config file (if any) with command-line overrides applied
fn build_config(args: &Args) -> Result<SamplerConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SamplerConfig::from_file(path)?,
        None => SamplerConfig::default(),
    };

    if let Some(max_pages) = args.max_pages {
        config.discovery.max_pages = max_pages;
    }
    if let Some(max_depth) = args.max_depth {
        config.discovery.max_depth = max_depth;
    }
    if let Some(concurrency) = args.concurrency {
        config.discovery.max_concurrency = concurrency;
    }
    if let Some(strategy) = args.strategy {
        config.selection.strategy = convert_strategy(strategy);
    }
    if let Some(select) = args.select {
        config.selection.max_pages = select;
    }
    if args.seed.is_some() {
        config.selection.seed = args.seed;
    }
    if args.budget.is_some() {
        config.depth.time_budget_minutes = args.budget;
    }
    if args.output.is_some() {
        config.output_dir = args.output.clone();
    }
    if args.no_webdriver {
        config.discovery.use_webdriver = false;
    }
    if args.follow_external {
        config.discovery.follow_external = true;
    }
    Ok(config)
}

async fn log_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        match event.stage {
            SamplerStage::Discovering => ::log::debug!("[{}] {}", event.completed, event.message),
            SamplerStage::Failed => ::log::error!("{}", event.message),
            stage if stage.is_terminal() => ::log::info!("Finished: {}", event.message),
            stage => ::log::info!("{:?}: {}", stage, event.message),
        }
    }
}
