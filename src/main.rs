// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:   Configuration structs loaded from JSON (+ environment)
// - schema:   Identifiers, catalog pages and the rotation plan
// - error:    Typed errors for catalog calls and rotation runs
// - util:     Shared helper utilities (time, progress labels)
// - catalog:  Catalog client trait and the Spotify implementation
// - rotation: Reader, sampler, differ, mutator and the run itself
// - metrics:  Process-wide counters
//
mod config;
mod schema;
mod error;
mod util;
mod catalog;
mod rotation;
mod metrics;

// ------------------------------------------------------------
// External dependencies
// ------------------------------------------------------------

use std::process::ExitCode;

use rand::rngs::StdRng;
use rand::SeedableRng;

use catalog::spotify::SpotifyClient;
use config::load_config;
use metrics::METRICS;
use rotation::runner::Rotator;
use schema::RotationReport;

const DEFAULT_CONFIG_PATH: &str = "config.json";

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// One invocation performs exactly one rotation and exits.
//
// Exit status:
// - 0 when every step completed
// - 1 on any failure, including panics inside the run
//
// Overlapping invocations against the same destination are not
// guarded against; the scheduler must serialize runs.
//
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting daily playlist refresh...");
    log::info!("{}", util::now_rfc3339());

    // Run on its own task so a panic is reported instead of
    // escaping with the default panic exit code.
    let outcome = tokio::spawn(run()).await;

    log::info!("{}", METRICS.summary());

    match outcome {
        Ok(Ok(report)) => {
            if !report.degraded_sources.is_empty() {
                log::warn!(
                    "Completed with unreadable sources: {}",
                    report.degraded_sources.join(", ")
                );
            }
            log::info!(
                "Playlist successfully refreshed! carried_over={} removed={} added={}",
                report.carried_over,
                report.removed,
                report.added
            );
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            log::error!("Error refreshing playlist: {e:#}");
            log::error!("Script failed to complete successfully");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("Unhandled error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<RotationReport> {
    let path = config_path();
    let config = load_config(&path)?;

    let client = SpotifyClient::new(&config.catalog, config.log_requests())?;
    let rotator = Rotator::new(config.rotation.clone()).dry_run(config.dry_run());

    let mut rng = StdRng::from_os_rng();
    let report = rotator.run(&client, &mut rng).await?;
    Ok(report)
}

// ------------------------------------------------------------
// Configuration path
// ------------------------------------------------------------
//
// First CLI argument, then $ROTATOR_CONFIG, then ./config.json.
//
fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ROTATOR_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}
