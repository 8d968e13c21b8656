//! Orphanage experiment binary
//!
//! Loads the experiment configuration, wires up the node clients and runs
//! the controller. Logs go to stdout and to a log file next to the results.

use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skein_client::NodeClient;
use skein_experiment::{ClientPool, Controller, ExperimentConfig};

/// Orphanage attack experiment driver
#[derive(Parser, Debug)]
#[command(name = "skein-experiment", version, about)]
struct Cli {
    /// Path to a JSON experiment configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the results directory
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Override the experiment series label
    #[arg(long)]
    label: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_file(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(results_dir) = cli.results_dir {
        config.results_dir = results_dir;
    }
    if let Some(label) = cli.label {
        config.label = label;
    }

    std::fs::create_dir_all(&config.results_dir)?;
    let log_name = format!(
        "orphanage-tests-{}.log",
        chrono::Local::now().format("%d%m%y_%I%M%S%p")
    );
    let log_file = File::create(config.results_dir.join(&log_name))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    tracing::info!(log = %log_name, "experiment log file created");

    let honest_clients = config
        .honest_urls
        .iter()
        .map(|url| NodeClient::new(url.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    let adversary_client = NodeClient::new(config.adversary_url.clone())?;

    let honest = ClientPool::new("honest", honest_clients);
    let adversary = ClientPool::new("adversary", vec![adversary_client]);

    let controller = Controller::new(config, honest, adversary);
    controller.run().await?;

    tracing::info!("experiment run finished");
    Ok(())
}
