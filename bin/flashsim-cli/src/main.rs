//! FlashSim - BAST flash translation layer simulator
//!
//! Replays request traces or synthetic workloads against a simulated flash
//! array and reports latency and translation-layer statistics.

mod driver;
mod trace;
mod workload;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flashsim_common::Config;
use flashsim_ftl::BastFtl;
use flashsim_storage::SimulatedFlash;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use workload::{Pattern, WorkloadGenerator, WorkloadSpec};

#[derive(Parser, Debug)]
#[command(name = "flashsim")]
#[command(about = "BAST flash translation layer simulator")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, env = "FLASHSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overrides the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Print the summary as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Pages per erase block
    #[arg(long, global = true)]
    block_size: Option<usize>,

    /// Maximum number of live log blocks
    #[arg(long, global = true)]
    log_limit: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a synthetic workload
    Run {
        /// Address pattern
        #[arg(long, value_enum, default_value_t = Pattern::Random)]
        pattern: Pattern,

        /// Number of requests to issue
        #[arg(long, default_value_t = 100_000)]
        requests: usize,

        /// Fraction of requests that are reads
        #[arg(long, default_value_t = 0.3)]
        read_ratio: f64,

        /// Fraction of requests that are trims
        #[arg(long, default_value_t = 0.05)]
        trim_ratio: f64,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Replay a request trace
    Replay {
        /// Trace file, one `<op> <page> [time]` per line
        trace: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(block_size) = args.block_size {
        config.geometry.block_size = block_size;
    }
    if let Some(log_limit) = args.log_limit {
        config.ftl.log_limit = log_limit;
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config.logging.level, args.log_format);

    info!(
        "Geometry: {} physical / {} logical blocks of {} pages, log limit {}",
        config.geometry.physical_blocks,
        config.geometry.logical_blocks,
        config.geometry.block_size,
        config.ftl.log_limit
    );

    let flash = SimulatedFlash::from_config(&config)?;
    let mut ftl = BastFtl::from_config(flash, &config)?;

    let summary = match args.command {
        Commands::Run {
            pattern,
            requests,
            read_ratio,
            trim_ratio,
            seed,
        } => {
            let generator = WorkloadGenerator::new(WorkloadSpec {
                pattern,
                pages: ftl.logical_pages(),
                read_ratio,
                trim_ratio,
                seed,
            })?;
            info!("Running {} {:?} requests (seed {})", requests, pattern, seed);
            driver::execute(&mut ftl, generator.take(requests))?
        }
        Commands::Replay { trace } => {
            let requests = trace::load_trace(&trace)?;
            info!("Replaying {} requests from {}", requests.len(), trace.display());
            driver::execute(&mut ftl, requests)?
        }
    };

    info!(
        "Simulation finished: {} requests in {:.1} us",
        summary.requests, summary.end_time
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}
