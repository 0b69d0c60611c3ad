use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};

use paperlist_core::config_file::{self, ConfigFile};
use paperlist_core::lookup::SemanticScholar;
use paperlist_core::{Config, ProgressEvent, ResolutionCache, Resolver, scan_collection};
use paperlist_pdf_mupdf::MupdfBackend;
use paperlist_reporting::{ReportOptions, SystemClock, render_markdown, write_report};

mod output;

use output::ColorMode;

/// Build a Markdown reading list from a folder tree of research papers
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root of the paper collection; subdirectories become categories
    root_dir: PathBuf,

    /// Markdown file to write
    #[arg(short, long, default_value = "README.md")]
    output: PathBuf,

    /// Heading level of top-level categories, 1-6 (default: 1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=6))]
    heading_base: Option<u8>,

    /// File whose contents are placed before the list
    #[arg(long)]
    header: Option<PathBuf>,

    /// File whose contents are placed after the list
    #[arg(long)]
    footer: Option<PathBuf>,

    /// Resolution cache file (default: paperlist-cache.json)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Ignore the existing cache and look every paper up again
    #[arg(long)]
    refresh: bool,

    /// Keep resolutions in memory only; no cache file is read or written
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,

    /// Semantic Scholar API key
    #[arg(long)]
    s2_api_key: Option<String>,

    /// Separator placed between author names (default: ", ")
    #[arg(long)]
    author_separator: Option<String>,

    /// Keep only letters, digits, hyphens and spaces in titles
    #[arg(long)]
    strip_title_punctuation: bool,

    /// Leave citation counts out of the list
    #[arg(long)]
    no_citation_count: bool,

    /// Per-request timeout in seconds (default: 10)
    #[arg(long)]
    timeout: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = config_file::load_config();
    let config = build_config(&cli, &file_config, |key| std::env::var(key).ok());
    let report = report_options(&cli, &file_config);
    tracing::debug!(?config, "resolved configuration");

    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());

    let directories = scan_collection(&cli.root_dir)
        .with_context(|| format!("failed to scan {}", cli.root_dir.display()))?;
    let total: usize = directories.iter().map(|d| d.pdfs.len()).sum();

    let cache = if cli.no_cache {
        ResolutionCache::in_memory()
    } else {
        ResolutionCache::open(&config.cache_path, config.refresh)
            .with_context(|| format!("failed to open cache {}", config.cache_path.display()))?
    };

    let client = reqwest::Client::builder()
        .user_agent(concat!("paperlist/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let s2 = SemanticScholar::new(config.s2_api_key.clone()).with_base_url(&config.s2_base_url);
    let mut resolver =
        Resolver::from_config(&config, Arc::new(MupdfBackend::new()), Arc::new(s2), cache)
            .with_client(client);

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let outcome = resolver
        .resolve_all(directories, |event| match event {
            ProgressEvent::Resolving { path, .. } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                bar.set_message(name);
            }
            ProgressEvent::CacheHit { .. } | ProgressEvent::Resolved { .. } => bar.inc(1),
            ProgressEvent::Failed { error, .. } => {
                bar.println(output::failure_line(&error, color));
                bar.inc(1);
            }
        })
        .await;
    bar.finish_and_clear();

    let document = render_markdown(&outcome.groups, &report, &SystemClock);
    write_report(&cli.output, &document)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    let mut stdout = std::io::stdout();
    output::print_summary(&mut stdout, &outcome, &cli.output, color)?;
    Ok(())
}

/// Install the fmt subscriber on stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn build_config(
    cli: &Cli,
    file: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> Config {
    let mut config = Config::default();
    file.apply_to(&mut config);

    if let Some(key) = cli.s2_api_key.clone().or_else(|| env("S2_API_KEY")) {
        config.s2_api_key = Some(key);
    }
    if let Some(path) = cli
        .cache
        .clone()
        .or_else(|| env("PAPERLIST_CACHE").map(PathBuf::from))
    {
        config.cache_path = path;
    }
    if let Some(secs) = cli
        .timeout
        .or_else(|| env("PAPERLIST_TIMEOUT").and_then(|v| v.parse().ok()))
    {
        config.timeout_secs = secs;
    }
    if let Some(sep) = &cli.author_separator {
        config.render.author_separator = sep.clone();
    }
    if cli.strip_title_punctuation {
        config.render.strip_title_punctuation = true;
    }
    if cli.no_citation_count {
        config.render.show_citation_count = false;
    }
    config.refresh = cli.refresh;
    config
}

fn report_options(cli: &Cli, file: &ConfigFile) -> ReportOptions {
    let report = file.report.clone().unwrap_or_default();
    let header = cli
        .header
        .clone()
        .or_else(|| report.header_path.map(PathBuf::from));
    let footer = cli
        .footer
        .clone()
        .or_else(|| report.footer_path.map(PathBuf::from));

    ReportOptions {
        heading_base: cli
            .heading_base
            .map(usize::from)
            .or(report.heading_base)
            .unwrap_or(1),
        header: header.as_deref().and_then(read_optional),
        footer: footer.as_deref().and_then(read_optional),
    }
}

/// Contents of an optional boilerplate file; absent or unreadable gives `None`.
fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "boilerplate file not found, skipping");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read boilerplate file");
            None
        }
    }
}
