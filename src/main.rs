mod cell;
mod config;
mod location;
mod record;
mod replay;
mod sampler;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use crate::config::{Config, SessionConfig};
use crate::replay::{Delivery, Scenario};
use crate::sampler::Sampler;

const POLL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "wavetrack")]
#[command(about = "Location and cellular signal sampling agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a replay scenario file
    Validate { scenario: PathBuf },
    /// Replay a scenario through a sampling session
    Run {
        scenario: PathBuf,
        /// YAML config file with a `session` section
        #[arg(long)]
        config: Option<PathBuf>,
        /// Minimum seconds between samples (non-positive or invalid means 5)
        #[arg(long, allow_hyphen_values = true)]
        interval: Option<String>,
        /// Output file name
        #[arg(long)]
        filename: Option<String>,
        /// Directory the output file is written to
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Stop after this long instead of at the end of the scenario
        #[arg(long, value_parser = humantime::parse_duration)]
        duration: Option<Duration>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario } => validate(&scenario),
        Commands::Run {
            scenario,
            config,
            interval,
            filename,
            output_dir,
            duration,
        } => {
            let session = match load_session(config.as_deref(), interval, filename, output_dir) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Config error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            run(&scenario, session, duration).await
        }
    }
}

fn validate(path: &Path) -> ExitCode {
    let scenario = match Scenario::from_file(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Scenario error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Scenario is valid ({} deliveries, {} cell snapshots, {})",
        scenario.deliveries.len(),
        scenario.snapshots.len(),
        humantime::format_duration(scenario.duration())
    );
    if !scenario.location_permission {
        println!("  location permission denied");
    }
    for (i, timed) in scenario.deliveries.iter().enumerate() {
        let what = match &timed.delivery {
            Delivery::Fixes(fixes) => match fixes.last() {
                Some(fix) => format!(
                    "{} fix(es), last {},{}",
                    fixes.len(),
                    fix.latitude,
                    fix.longitude
                ),
                None => "empty".to_string(),
            },
            Delivery::Failure(e) => format!("failure: {}", e),
        };
        println!(
            "  {}: {} @ {}",
            i + 1,
            what,
            humantime::format_duration(timed.at)
        );
    }
    ExitCode::SUCCESS
}

fn load_session(
    config_path: Option<&Path>,
    interval: Option<String>,
    filename: Option<String>,
    output_dir: Option<PathBuf>,
) -> Result<SessionConfig, config::ConfigError> {
    let mut session = match config_path {
        Some(path) => Config::from_file(path)?.session,
        None => SessionConfig::default(),
    };

    if let Some(raw) = interval {
        session.interval = config::parse_interval(&raw);
    }
    if let Some(name) = filename {
        session.filename = name;
    }
    if let Some(dir) = output_dir {
        session.output_dir = dir;
    }
    Ok(session)
}

async fn run(path: &Path, session: SessionConfig, duration: Option<Duration>) -> ExitCode {
    let scenario = match Scenario::from_file(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Scenario error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let origin = Instant::now();
    let deadline = run_deadline(
        origin,
        scenario.duration(),
        session.interval_secs(),
        duration,
    );
    if deadline.is_none() {
        log::info!("Run length is unbounded, stop with Ctrl-C");
    }

    let (location, cells) = scenario.into_providers(origin);
    let mut sampler = Sampler::new(Arc::new(location), Arc::new(cells));

    if let Err(e) = sampler.start(&session).await {
        eprintln!("Failed to start sampling: {}", e);
        return ExitCode::FAILURE;
    }

    loop {
        tokio::select! {
            _ = wait_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
            _ = tokio::time::sleep(POLL) => {
                if !sampler.is_running() {
                    log::warn!("Sampling session terminated early");
                    break;
                }
            }
        }
    }

    sampler.stop().await;

    match serde_json::to_string_pretty(&sampler.status()) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to render status: {}", e),
    }
    ExitCode::SUCCESS
}

/// End of a run: `duration` when given, otherwise the scenario length plus one
/// interval so the last delivery can still be sampled. `None` when the end lies
/// beyond what the clock can represent.
fn run_deadline(
    origin: Instant,
    scenario_len: Duration,
    interval_secs: u64,
    duration: Option<Duration>,
) -> Option<Instant> {
    let length = match duration {
        Some(d) => d,
        None => scenario_len.checked_add(Duration::from_secs(interval_secs))?,
    };
    origin.checked_add(length)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
