//! Board analysis entry point for the Settler game agent.
//!
//! Generates a standard board from a seed, ranks its opening spots the way
//! the brain would, and runs a real brain thread through one opening round
//! on the same board. The combined report is printed as JSON.
//!
//! # Environment
//!
//! - `BOARD_SEED` -- board shuffle seed (default `0`)
//! - `SETTLER_CONFIG` -- path to the brain's YAML configuration (default
//!   `settler-config.yaml` when present, built-in defaults otherwise)
//! - `RUST_LOG` -- tracing filter (default `info`)

mod error;
mod report;
mod smoke;

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use settler_board::{Board, Layout};
use settler_core::BrainConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AnalyzeError;
use crate::report::BoardReport;
use crate::smoke::OpeningRun;

/// Default configuration file looked up in the working directory.
const DEFAULT_CONFIG: &str = "settler-config.yaml";

/// Opening spots listed in the report.
const TOP_SPOTS: usize = 8;

/// How long the smoke-run waits for each placement.
const PLACEMENT_WAIT: Duration = Duration::from_secs(10);

/// Everything printed on stdout.
#[derive(Serialize)]
struct Output<'a> {
    board: &'a BoardReport,
    brain_opening: &'a OpeningRun,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration or seed is invalid, the board
/// cannot be generated, or the brain does not answer.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("settler-analyze starting");

    let config = load_config()?;
    let seed = board_seed()?;
    info!(
        seed,
        planner = ?config.strategy.planner,
        eta_cutoff = config.strategy.eta_cutoff,
        "configuration loaded"
    );

    let layout = Layout::standard(seed).map_err(AnalyzeError::from)?;
    let board = Board::new(layout.clone());
    let report = report::analyze(&board, seed, &config.strategy, TOP_SPOTS);
    info!(spots = report.spots.len(), "board analysed");

    let opening = smoke::opening_run(layout, config, PLACEMENT_WAIT).await?;

    let output = Output {
        board: &report,
        brain_opening: &opening,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    info!("settler-analyze finished");
    Ok(())
}

fn load_config() -> Result<BrainConfig, AnalyzeError> {
    let path = std::env::var("SETTLER_CONFIG").map_or_else(
        |_| {
            let fallback = PathBuf::from(DEFAULT_CONFIG);
            fallback.exists().then_some(fallback)
        },
        |p| Some(PathBuf::from(p)),
    );
    Ok(match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            BrainConfig::from_file(&path)?
        }
        None => BrainConfig::parse("")?,
    })
}

fn board_seed() -> Result<u64, AnalyzeError> {
    match std::env::var("BOARD_SEED") {
        Ok(raw) => raw
            .trim()
            .parse()
            .ok()
            .ok_or_else(|| AnalyzeError::Seed { value: raw.clone() }),
        Err(_) => Ok(0),
    }
}
