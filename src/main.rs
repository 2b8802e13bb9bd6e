mod config;
mod error;
mod logging;
mod probe;
mod rank;
mod report;
mod scheduler;
mod traits;
mod types;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use config::Settings;
use indicatif::{ProgressBar, ProgressStyle};
use probe::HttpProber;
use report::Report;
use std::path::PathBuf;
use std::sync::Arc;
use traits::Prober;

#[derive(Parser)]
#[command(name = "pipspeed")]
#[command(about = "Measure PyPI mirror download speed and recommend the fastest", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (default: <config dir>/pipspeed/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark mirrors and recommend the fastest (default)
    Test(TestArgs),
    /// Show the configured mirrors and packages
    List,
}

#[derive(Args, Default)]
struct TestArgs {
    /// Number of probes in flight at once
    #[arg(long)]
    workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Package to fetch (repeatable); replaces the configured list
    #[arg(short, long = "package")]
    packages: Vec<String>,

    /// Only test this mirror (repeatable, case-insensitive)
    #[arg(short, long = "mirror")]
    mirrors: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl TestArgs {
    /// Apply command-line overrides on top of the loaded settings, then validate the result.
    fn apply(&self, settings: &mut Settings) -> error::Result<()> {
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        if !self.packages.is_empty() {
            settings.packages = self.packages.clone();
        }
        settings.retain_mirrors(&self.mirrors)?;
        settings.validate()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Test(TestArgs::default())) {
        Commands::Test(args) => handle_test(settings, args).await?,
        Commands::List => handle_list(&settings),
    }

    Ok(())
}

// --- Handlers ---

async fn handle_test(mut settings: Settings, args: TestArgs) -> Result<()> {
    args.apply(&mut settings)?;

    if !args.json {
        println!(
            "Testing {} mirrors with packages: {}",
            settings.mirrors.len(),
            settings.packages.join(", ")
        );
    }
    tracing::info!(
        workers = settings.workers,
        timeout_secs = settings.timeout_secs,
        probes = settings.probe_count(),
        "starting benchmark"
    );

    let prober = Arc::new(HttpProber::new(settings.timeout())?);

    let pb = ProgressBar::new(settings.probe_count() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("|| "),
    );
    pb.set_message("Testing...");

    let report = benchmark(&settings, prober, &pb).await?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!(); // Newline after progress bar
        print!("{}", report.render());
    }

    Ok(())
}

/// Probe, rank and build the report. Fails with `NoData` when every probe failed.
async fn benchmark(
    settings: &Settings,
    prober: Arc<dyn Prober>,
    pb: &ProgressBar,
) -> error::Result<Report> {
    let results = scheduler::run_probes(
        prober,
        &settings.mirrors,
        &settings.packages,
        settings.workers,
        pb,
    )
    .await?;

    pb.finish_with_message("Testing completed.");

    let ranking = rank::rank(&results);
    Report::new(&settings.mirrors, &settings.packages, &results, ranking)
}

fn handle_list(settings: &Settings) {
    println!("{:<12} URL", "MIRROR");
    println!("{}", "-".repeat(60));
    for m in &settings.mirrors {
        println!("{:<12} {}", m.name, m.url);
    }
    println!("{}", "-".repeat(60));
    println!("Packages: {}", settings.packages.join(", "));
    println!(
        "Workers: {}, timeout: {}s",
        settings.workers, settings.timeout_secs
    );
}
