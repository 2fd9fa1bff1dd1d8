//! Parallel-Harvest main entry point
//!
//! This is the command-line interface for the Parallel-Harvest corpus builder.

use clap::Parser;
use parallel_harvest::config::{load_config_with_hash, Config};
use parallel_harvest::crawler::{run_crawl, run_scrape, ResumeMode, RunContext};
use parallel_harvest::driver::HttpPageDriver;
use parallel_harvest::output::{
    export_corpus, generate_markdown_summary, print_totals, ExportReport, RunTotals,
};
use parallel_harvest::sitemap::{resolve_sitemap_url, HttpSitemapLoader};
use parallel_harvest::state::Registry;
use parallel_harvest::storage::{if_present, Workspace};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Parallel-Harvest: a resumable parallel-corpus harvester
///
/// Parallel-Harvest finds pages of a multilingual site that exist in several
/// languages, extracts their paragraphs per language and exports a
/// line-aligned corpus for every language pair. Crawl and scrape progress is
/// checkpointed so interrupted runs resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "parallel-harvest")]
#[command(version)]
#[command(about = "A resumable parallel-corpus harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the crawl phase (discover parallel documents)
    #[arg(long)]
    crawl: bool,

    /// Run the scrape phase (extract text of discovered documents)
    #[arg(long)]
    scrape: bool,

    /// Export the aligned corpus from scraped tables
    #[arg(long)]
    export: bool,

    /// Require existing crawl checkpoints and resume from them
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start the crawl from the sitemap, ignoring existing checkpoints
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Clear every scraped flag and extract all documents again
    #[arg(long)]
    rescrape: bool,

    /// Validate config and show what would be harvested without running
    #[arg(long, conflicts_with_all = ["stats", "crawl", "scrape", "export"])]
    dry_run: bool,

    /// Show progress totals from the working directory and exit
    #[arg(long, conflicts_with_all = ["dry_run", "crawl", "scrape", "export"])]
    stats: bool,
}

impl Cli {
    fn resume_mode(&self) -> ResumeMode {
        if self.fresh {
            ResumeMode::Fresh
        } else if self.resume {
            ResumeMode::Required
        } else {
            ResumeMode::IfPresent
        }
    }

    /// Phases to run; none selected means all of them
    fn phases(&self) -> (bool, bool, bool) {
        if !self.crawl && !self.scrape && !self.export {
            (true, true, true)
        } else {
            (self.crawl, self.scrape, self.export)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let workspace = Workspace::new(&config.output.working_dir);

    if cli.dry_run {
        handle_dry_run(&config, &workspace)?;
    } else if cli.stats {
        handle_stats(&workspace)?;
    } else {
        handle_harvest(&cli, &config, &workspace).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("parallel_harvest=info,warn"),
            1 => EnvFilter::new("parallel_harvest=debug,info"),
            2 => EnvFilter::new("parallel_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the harvest plan
fn handle_dry_run(config: &Config, workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Parallel-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Sitemap: {}", resolve_sitemap_url(&config.site.sitemap_url)?);
    if !config.site.exclude.is_empty() {
        println!("  Excluding URLs containing: {}", config.site.exclude.join(", "));
    }

    println!("\nLanguages:");
    println!("  Main: {}", config.languages.main);
    println!("  Probed: {}", config.languages.targets.join(", "));
    if config.languages.export.is_empty() {
        println!("  Exported: all found");
    } else {
        println!("  Exported: {}", config.languages.export.join(", "));
    }

    println!("\nCrawl:");
    println!("  Save interval: {} URLs", config.crawler.save_interval);
    match config.crawler.max_documents {
        0 => println!("  Document cap: none"),
        n => println!("  Document cap: {}", n),
    }
    println!("  Probe attempts: {}", config.crawler.probe_attempts);

    println!("\nScrape:");
    println!("  Save interval: {} documents", config.scraper.save_interval);
    println!("  Render attempts: {}", config.scraper.max_attempts);

    println!("\nWorking directory: {}", workspace.root().display());
    println!(
        "  Frontier checkpoint: {}",
        present(&workspace.frontier_path())
    );
    println!(
        "  Registry checkpoint: {}",
        present(&workspace.registry_path())
    );

    println!("\n✓ Configuration is valid");
    Ok(())
}

fn present(path: &Path) -> &'static str {
    if path.exists() {
        "found (will resume)"
    } else {
        "none"
    }
}

/// Handles the --stats mode: shows totals from the checkpoints
fn handle_stats(workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    println!("Working directory: {}\n", workspace.root().display());
    let totals = RunTotals::load(workspace)?;
    print_totals(&totals);
    Ok(())
}

/// Runs the selected phases in order: crawl, scrape, export
async fn handle_harvest(
    cli: &Cli,
    config: &Config,
    workspace: &Workspace,
) -> Result<(), Box<dyn std::error::Error>> {
    let (crawl, scrape, export) = cli.phases();

    if crawl || scrape {
        let driver = HttpPageDriver::new(config.driver.clone())?;
        let mut ctx = RunContext::new(driver, workspace.clone());

        if crawl {
            let mode = cli.resume_mode();
            tracing::info!("Starting crawl ({:?})", mode);
            let source = HttpSitemapLoader::from_config(config)?;
            match run_crawl(&mut ctx, &source, config, mode).await {
                Ok(report) => tracing::info!(
                    "Crawl finished: {} of {} URLs visited, {} documents",
                    report.urls_visited,
                    report.urls_total,
                    report.documents_total
                ),
                Err(e) => {
                    tracing::error!("Crawl failed: {}", e);
                    RunTotals::log_from(workspace);
                    return Err(e.into());
                }
            }
        }

        if scrape {
            tracing::info!("Starting scrape");
            match run_scrape(&mut ctx, config, cli.rescrape).await {
                Ok(report) => tracing::info!(
                    "Scrape finished: {} scraped, {} rejected",
                    report.scraped,
                    report.rejected.len()
                ),
                Err(e) => {
                    tracing::error!("Scrape failed: {}", e);
                    RunTotals::log_from(workspace);
                    return Err(e.into());
                }
            }
        }
    }

    let mut export_report: Option<ExportReport> = None;
    if export {
        tracing::info!("Exporting aligned corpus");
        match export_corpus(workspace, config) {
            Ok(report) => export_report = Some(report),
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                RunTotals::log_from(workspace);
                return Err(e.into());
            }
        }
    }

    let totals = RunTotals::load(workspace)?;
    totals.log();

    if let Some(summary_path) = &config.output.summary_path {
        let registry = if_present(Registry::load(&workspace.registry_path()))?.unwrap_or_default();
        generate_markdown_summary(
            &totals,
            &registry,
            &config.languages.main,
            export_report.as_ref(),
            Path::new(summary_path),
        )?;
        tracing::info!("Summary written to {}", summary_path);
    }

    Ok(())
}
