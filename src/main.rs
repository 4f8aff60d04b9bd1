use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use broker_node::config::load_config;
use broker_node::lifecycle;
use broker_node::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "broker-node")]
#[command(about = "Lifecycle and health orchestrator for a broker-connected node", long_about = None)]
struct Args {
    /// Path to the node configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.log) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(
        config = %args.config.display(),
        brokers = %config.brokers.path,
        app_server = %config.app_server.url,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Node failed to start");
            ExitCode::FAILURE
        }
    }
}
