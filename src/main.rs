use clap::{Parser, Subcommand};
use commission::service::{
    mock::generator,
    orchestrator::{Orchestrator, WorkloadSource},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "commission", version, about = "A commission marketplace CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the workload CSV file to process
    #[arg(value_name = "FILE")]
    file: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate dummy test data to a file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "workload.csv", value_name = "FILE")]
        output: String,

        /// Number of requests to generate
        #[arg(short, long, default_value = "10", value_name = "COUNT")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    match args.command {
        Some(Commands::Generate { output, count }) => {
            generator(&output, count)?;
        }
        None => {
            let file = args
                .file
                .ok_or("Please provide a CSV file path or use the generate command")?;

            let orchestrator = Orchestrator::new(WorkloadSource::Csv { file_path: file }).await;
            let wallets = orchestrator.process().await?;
            Orchestrator::output_csv(&wallets)?;
        }
    }

    Ok(())
}
