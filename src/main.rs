//! fitview - fitness statistics for evolutionary populations
//!
//! A CLI tool that loads genomes from fitness files, gathers pooled views
//! over the (possibly nested) population and reports its statistics.
//!
//! Exit codes:
//!   0 - Success (best fitness meets --fail-below, or no --fail-below set)
//!   1 - Runtime error (unreadable input, bad config, replay divergence, etc.)
//!   2 - Best fitness below the --fail-below target

mod cli;
mod config;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use fitview::replay::{self, ReplayOutcome};
use fitview::report::{self, Report};
use fitview::scanner::{PopulationScanner, ScanConfig};
use fitview::ViewPool;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("fitview v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fitview.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

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
    println!("   Edit it to customize formats, pool size, replay, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete statistics workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(input) = args.input.clone() else {
        anyhow::bail!("An --input path is required");
    };
    let scan_config = config.scanner.scan_config();

    if args.dry_run {
        return handle_dry_run(&input, &scan_config);
    }

    // Step 1: Load the population tree
    status(&args, &format!("📥 Loading population: {}", input.display()));
    let scanner = PopulationScanner::new(input.clone(), scan_config);
    let root = Arc::new(
        scanner
            .load()
            .with_context(|| format!("Failed to load population from {}", input.display()))?,
    );
    info!(
        "Loaded {} genomes in {} top-level members",
        root.leaf_count(),
        root.len()
    );

    let pool = ViewPool::with_max_idle(config.pool.max_idle);

    // Step 2: Optionally replay per-generation statistics gathering
    let replay_outcome: Option<ReplayOutcome> = if config.replay.generations > 0 {
        status(
            &args,
            &format!(
                "🔁 Replaying {} generations with {} workers...",
                config.replay.generations, config.replay.workers
            ),
        );
        let options = config.replay.replay_options(!args.quiet);
        Some(replay::replay(Arc::clone(&root), pool.clone(), &options).await?)
    } else {
        None
    };

    // Step 3: Build the report
    status(&args, "📝 Generating report...");
    let duration = start_time.elapsed().as_secs_f64();
    let report_options = config.report.report_options();
    let report = Report::build(
        &input,
        &root,
        &pool,
        replay_outcome.as_ref(),
        &report_options,
        duration,
    );

    let output = match config.general.format {
        OutputFormat::Text => report::generate_text_report(&report, report_options.precision),
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, report_options.precision)
        }
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    // Step 4: Write the report
    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            status(&args, &format!("✅ Report saved to: {}", path.display()));
        }
        None => print!("{}", output),
    }

    let best = report.summary.map(|s| s.max);
    if let Some(target) = args.fail_below {
        match best {
            Some(best) if best >= target => {}
            Some(best) => {
                eprintln!(
                    "\n⛔ Best fitness {} is below {}. Failing (exit code 2).",
                    best, target
                );
                return Ok(2);
            }
            None => {
                eprintln!("\n⛔ Population is empty. Failing (exit code 2).");
                return Ok(2);
            }
        }
    }

    Ok(0)
}

/// Progress lines go to stderr so a report printed to stdout stays clean.
fn status(args: &Args, line: &str) {
    if !args.quiet {
        eprintln!("{}", line);
    }
}

/// Handle --dry-run: scan files, print what would be loaded, exit.
fn handle_dry_run(input: &Path, scan_config: &ScanConfig) -> Result<i32> {
    println!("\n🔍 Dry run: scanning population files...\n");

    let scanner = PopulationScanner::new(input.to_path_buf(), scan_config.clone());
    let files = scanner.scan()?;

    if files.is_empty() {
        println!("   No matching population files found.");
    } else {
        println!("   Found {} files that would be loaded:\n", files.len());
        for file in &files {
            println!("     📄 {} ({} bytes)", file.path, file.size);
        }
        println!("\n   Total: {} files", files.len());
    }

    println!("\n✅ Dry run complete. No statistics were gathered.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
