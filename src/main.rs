//! WhatchuCookin - company intel aggregator
//!
//! A CLI tool that queries every configured intel backend for one company
//! at once, tolerates any subset of them failing, and renders the result
//! as a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, client setup, global cycle failure, etc.)
//!   2 - A source ended in error and --fail-on-source-error was set

mod aggregate;
mod cli;
mod config;
mod models;
mod report;
mod sources;

use aggregate::{Aggregator, AggregatorConfig, HttpTransport, Transport};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Phase, Report, ReportMetadata, SubmitOutcome, UnimplementedPanel, ViewModel};
use report::RenderOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging so `general.verbose` can set the level
    let loaded = load_config(&args);
    let config_verbose = loaded
        .as_ref()
        .map(|(config, _)| config.general.verbose)
        .unwrap_or(false);
    init_logging(args.log_level(config_verbose));

    info!("WhatchuCookin v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, loaded).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .whatchucookin.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to change the API base, sources and report options.");
    Ok(())
}

/// Initialize logging at the given level.
///
/// Logs go to stderr so a report printed on stdout stays clean.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one aggregation cycle and emit the report. Returns the exit code.
async fn run(args: Args, loaded: Result<(Config, ConfigOrigin)>) -> Result<i32> {
    let (mut config, origin) = loaded?;
    origin.log();
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let sources = sources::select_sources(&config.sources, args.sources.as_deref())?;
    let names: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();
    info!("Sources: {}", names.join(", "));

    let transport: Arc<dyn Transport> = Arc::new(
        HttpTransport::new(config.api.timeout_seconds.map(Duration::from_secs))
            .context("Failed to create HTTP client")?,
    );

    let ready_delay = Duration::from_millis(config.general.ready_delay_ms);
    let aggregator = Aggregator::new(
        AggregatorConfig {
            base_url: config.api.base_url.clone(),
            sources,
            publish: config.general.publish,
            ready_delay,
        },
        transport,
    );

    let quiet = args.quiet;
    if !quiet {
        eprintln!("🍳 Cooking intel for {}...", args.company().trim());
        eprintln!("   API: {}", config.api.base_url);
        eprintln!("   Sources: {}", names.join(", "));
    }

    let progress = args.show_progress().then(|| spawn_progress(&aggregator));
    let mut ready_rx = aggregator.subscribe();

    let started = Instant::now();
    let settled = match aggregator.submit(args.company()).await {
        SubmitOutcome::Completed(view) => view,
        SubmitOutcome::Skipped(reason) => bail!("Nothing to fetch: {}", reason),
    };
    let duration = started.elapsed().as_secs_f64();

    if let Some(handle) = progress {
        if let Err(e) = handle.await {
            warn!("Progress display stopped abnormally: {}", e);
        }
    }

    let view = wait_until_ready(&mut ready_rx, settled, ready_delay).await;

    let report = Report {
        metadata: ReportMetadata {
            company: view
                .query
                .as_ref()
                .map(|q| q.to_string())
                .unwrap_or_else(|| args.company().trim().to_string()),
            generated_at: Utc::now(),
            api_base: config.api.base_url.clone(),
            sources_requested: names,
            sources_ok: view.ok_count(),
            sources_failed: view.failed_count(),
            duration_seconds: duration,
        },
        placeholders: if config.report.show_placeholders {
            UnimplementedPanel::ALL.to_vec()
        } else {
            Vec::new()
        },
        view,
    };

    let options = RenderOptions {
        jobs_filter: args.jobs_filter.clone(),
        jobs_sort: args.jobs_sort,
        max_keywords: config.report.max_keywords,
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &options),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
        }
        None => print!("{}", output),
    }

    if !quiet {
        eprintln!("\n📊 Summary:");
        eprintln!(
            "   Sources: {} ok | {} failed",
            report.metadata.sources_ok, report.metadata.sources_failed
        );
        for (name, code) in report.view.errors() {
            eprintln!("   - {}: {}", name, code);
        }
        eprintln!("   Duration: {:.1}s", duration);
        if let Some(ref path) = args.output {
            eprintln!("\n✅ Report saved to: {}", path.display());
        }
    }

    if let Some(ref global) = report.view.global_error {
        eprintln!("\n⛔ Cycle failed: {}", global);
        return Ok(1);
    }

    if args.fail_on_source_error && report.metadata.sources_failed > 0 {
        eprintln!(
            "\n⛔ {} source(s) failed. Failing (exit code 2).",
            report.metadata.sources_failed
        );
        return Ok(2);
    }

    Ok(0)
}

/// Draw one tick per settled source until the cycle settles.
fn spawn_progress(aggregator: &Aggregator) -> JoinHandle<()> {
    let bar = ProgressBar::new(aggregator.sources().len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} sources {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut rx = aggregator.subscribe();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let (settled, failed, phase) = {
                let vm = rx.borrow_and_update();
                (vm.sources.len() as u64, vm.failed_count(), vm.phase)
            };

            bar.set_position(settled);
            if failed > 0 {
                bar.set_message(format!("({} failed)", failed));
            }
            if matches!(phase, Phase::Settled | Phase::Ready) {
                break;
            }
        }
        bar.finish_and_clear();
    })
}

/// Wait for the ready signal of the settled cycle, falling back to the
/// settled snapshot if it does not arrive in time.
async fn wait_until_ready(
    rx: &mut tokio::sync::watch::Receiver<ViewModel>,
    settled: ViewModel,
    ready_delay: Duration,
) -> ViewModel {
    let cycle = settled.cycle;
    let deadline = ready_delay + Duration::from_secs(1);

    match tokio::time::timeout(
        deadline,
        rx.wait_for(|vm| vm.cycle == cycle && vm.phase == Phase::Ready),
    )
    .await
    {
        Ok(Ok(vm)) => vm.clone(),
        _ => {
            warn!("Ready signal not observed for cycle {}", cycle);
            settled
        }
    }
}

/// Where the configuration came from, reported once logging is up.
enum ConfigOrigin {
    File(PathBuf),
    Builtin,
    Unreadable(anyhow::Error),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded config from {}", path.display()),
            ConfigOrigin::Builtin => debug!("No config file found, using defaults"),
            ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so nothing is logged here.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::File(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Builtin)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(e))),
    }
}
