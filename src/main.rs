//! Tag-Walker main entry point
//!
//! This is the command-line interface for the Tag-Walker site walker.

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tag_walker::config::{
    load_rules_with_hash, load_settings, validate_start_url, write_sample_rules, DriverKind,
    RuleConfig, Settings,
};
use tag_walker::crawler::{run_walk, stop_channel, StopSignal};
use tag_walker::driver::{HttpDriver, WebDriverBrowser};
use tag_walker::output::{
    print_statistics, MarkdownOutputHandler, OutputHandler, RunContext, RunSummary,
    SqliteOutputHandler,
};
use tag_walker::CrawlReport;
use tracing_subscriber::EnvFilter;

/// Tag-Walker: a randomized site walker
///
/// Tag-Walker follows random links through a site, fills in configured forms
/// along the way and periodically resets the browser session, so marketing
/// tags see realistic visits.
#[derive(Parser, Debug)]
#[command(name = "tag-walker")]
#[command(version)]
#[command(about = "A randomized, config-governed site walker", long_about = None)]
struct Cli {
    /// Path to TOML settings file
    #[arg(value_name = "SETTINGS", required_unless_present = "init_rules")]
    settings: Option<PathBuf>,

    /// Override the start URL from the settings file
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,

    /// Seed for every random draw (reproducible walks)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Validate settings and rules and show what would run without walking
    #[arg(long)]
    dry_run: bool,

    /// Write a sample rule file to PATH and exit
    #[arg(long, value_name = "PATH")]
    init_rules: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.init_rules {
        write_sample_rules(path)
            .with_context(|| format!("Failed to write sample rules to {}", path.display()))?;
        println!("Sample rules written to {}", path.display());
        return Ok(());
    }

    let Some(settings_path) = &cli.settings else {
        bail!("No settings file given");
    };

    tracing::info!("Loading settings from: {}", settings_path.display());
    let mut settings = load_settings(settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;

    if let Some(start_url) = &cli.start_url {
        validate_start_url(start_url).context("Invalid --start-url")?;
        settings.crawl.start_url = start_url.clone();
    }

    let rules_path = resolve_rules_path(settings_path, &settings.rules.path);
    tracing::info!("Loading rules from: {}", rules_path.display());
    let (rules, config_hash) = load_rules_with_hash(&rules_path)
        .with_context(|| format!("Failed to load rules from {}", rules_path.display()))?;
    tracing::info!("Rules loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&settings, &rules);
        return Ok(());
    }

    handle_walk(settings, rules, &config_hash, cli.seed).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tag_walker=info,warn"),
            1 => EnvFilter::new("tag_walker=debug,info"),
            2 => EnvFilter::new("tag_walker=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Relative rule paths are taken from the settings file's directory
fn resolve_rules_path(settings_path: &Path, rules_path: &str) -> PathBuf {
    let rules_path = Path::new(rules_path);
    if rules_path.is_absolute() {
        return rules_path.to_path_buf();
    }
    match settings_path.parent() {
        Some(dir) => dir.join(rules_path),
        None => rules_path.to_path_buf(),
    }
}

/// Handles the --dry-run mode: shows the effective parameters
fn handle_dry_run(settings: &Settings, rules: &RuleConfig) {
    println!("=== Tag-Walker Dry Run ===\n");

    println!("Walk:");
    println!("  Start URL: {}", settings.crawl.start_url);
    println!("  Max steps: {}", settings.crawl.max_steps);
    println!("  Delay: {}s", settings.crawl.delay_seconds);
    println!("  Stay in domain: {}", settings.crawl.stay_in_domain);
    println!("  Avoid revisits: {}", settings.crawl.avoid_revisits);
    println!("  Max links per page: {}", settings.crawl.max_links_per_page);
    println!("  Fetch retries: {}", settings.crawl.fetch_retries);
    println!("  Log cookies: {}", settings.crawl.log_cookies);

    println!("\nRestarts:");
    if settings.restart.enabled {
        println!("  Every {} steps", settings.restart.range);
    } else {
        println!("  Disabled");
    }

    println!("\nDriver:");
    println!("  Kind: {:?}", settings.driver.kind);
    println!("  Timing profile: {:?}", settings.driver.timing_profile);
    if settings.driver.kind == DriverKind::Webdriver {
        println!("  WebDriver URL: {}", settings.driver.webdriver_url);
        println!("  Headless: {}", settings.driver.headless);
    }

    let patterns: Vec<_> = rules.ignore_patterns.iter().filter(|p| p.enabled).collect();
    println!("\nIgnore Patterns ({}):", patterns.len());
    for pattern in patterns {
        println!("  - [{}] {}", pattern.kind, pattern.pattern);
    }

    let actions: Vec<_> = rules.actions.iter().filter(|a| a.enabled).collect();
    println!("\nActions ({}):", actions.len());
    for action in actions {
        println!(
            "  - {} on '{}' ({} inputs{})",
            action.name,
            action.url_pattern,
            action.inputs.len(),
            if action.click_element.is_some() { ", click" } else { "" }
        );
    }

    println!("\nWord Lists ({}):", rules.word_lists.len());
    for (name, words) in &rules.word_lists {
        println!("  - {} ({} values)", name, words.len());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main walk
async fn handle_walk(
    settings: Settings,
    rules: RuleConfig,
    config_hash: &str,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let rng = match seed {
        Some(seed) => {
            tracing::info!("Using random seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let (stop_handle, stop) = stop_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current step");
            stop_handle.stop();
        }
    });

    let context = RunContext::new(&settings, &rules, config_hash);
    let rules = Arc::new(rules);

    let report = match settings.driver.kind {
        DriverKind::Webdriver => {
            let driver = WebDriverBrowser::connect(&settings.driver)
                .await
                .context("Failed to start the browser")?;
            walk(&settings, rules, driver, rng, stop).await?
        }
        DriverKind::Http => {
            let driver =
                HttpDriver::from_config(&settings.driver).context("Failed to build HTTP client")?;
            walk(&settings, rules, driver, rng, stop).await?
        }
    };

    write_reports(&settings, &report, &context);

    print_statistics(&RunSummary::from_report(&report));

    if report.termination.is_failure() {
        bail!("Walk ended early: {}", report.termination);
    }
    Ok(())
}

async fn walk<D: tag_walker::BrowserDriver>(
    settings: &Settings,
    rules: Arc<RuleConfig>,
    driver: D,
    rng: StdRng,
    stop: StopSignal,
) -> anyhow::Result<CrawlReport> {
    run_walk(settings, rules, driver, rng, stop)
        .await
        .context("Walk failed")
}

/// Writes the configured report files; failures are logged, not fatal
fn write_reports(settings: &Settings, report: &CrawlReport, context: &RunContext) {
    if let Some(path) = &settings.output.history_path {
        if let Err(e) = MarkdownOutputHandler::new(path).write_report(report, context) {
            tracing::error!("Failed to write history report to {}: {}", path, e);
        }
    }

    if let Some(path) = &settings.output.database_path {
        let result = SqliteOutputHandler::new(Path::new(path))
            .and_then(|handler| handler.write_report(report, context));
        if let Err(e) = result {
            tracing::error!("Failed to export history to {}: {}", path, e);
        }
    }
}
