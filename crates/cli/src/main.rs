use clap::{Parser, Subcommand};

mod commands;

use commands::{EstimateArgs, RunArgs};

#[derive(Parser)]
#[command(name = "algo-cost")]
#[command(about = "Real-time transaction cost estimates from a streamed order book", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream order book snapshots and print a cost estimate for each
    Run(RunArgs),
    /// Estimate costs once from a snapshot file
    Estimate(EstimateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(RunArgs {
            log_file: Some(path),
            ..
        }) => {
            // Keep stdout for estimates
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }

    match cli.command {
        Commands::Run(args) => {
            commands::run_stream(args).await?;
        }
        Commands::Estimate(args) => {
            commands::run_estimate(args)?;
        }
    }

    Ok(())
}
