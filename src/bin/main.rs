//! fdm-pipe-backend binary entry point.

use clap::Parser;
use fdm_pipe_backend::{metrics, telemetry, Config, PipeServer, Router};
use std::io;
use std::path::PathBuf;
use tracing::{error, info};

/// PowerDNS pipe backend routing query names to targets by partition key.
#[derive(Parser, Debug)]
#[command(name = "fdm-pipe-backend")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Defaults to `fdm-pipe-backend.toml` if present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deployment environment selecting the routing profile.
    #[arg(short, long, env = "DEPLOY_ENV")]
    environment: Option<String>,

    /// Validate the configuration, print the partition table to stderr and exit.
    #[arg(long)]
    check: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref(), args.environment.as_deref())?;

    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    let routing = match config.backend.routing_config() {
        Ok(routing) => routing,
        Err(e) => {
            error!("refusing to start: {}", e);
            return Err(e.into());
        }
    };

    info!(
        environment = %config.backend.environment,
        key_function = ?routing.key_function,
        record_type = %routing.record_type,
        keys = routing.table.len(),
        "Starting fdm-pipe-backend"
    );
    metrics::record_table_size(routing.table.len());

    if args.check {
        for (key, targets) in routing.table.iter() {
            eprintln!("{}\t{}", key, targets.join(","));
        }
        info!("configuration is valid");
        return Ok(());
    }

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let server = PipeServer::new(config.backend.name.clone(), Router::new(routing), stdin, stdout)
        .with_malformed_policy(config.backend.on_malformed);

    if let Err(e) = server.run() {
        error!("pipe backend error: {}", e);
        return Err(e.into());
    }

    info!("fdm-pipe-backend shutdown complete");
    Ok(())
}
