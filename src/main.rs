use anyhow::Context;
use clap::Parser;

use conduit::engine;
use conduit::engine::factory;
use conduit::logging;

/// Conduit - a configurable byte-stream message proxy
#[derive(Parser)]
#[command(name = "conduit")]
#[command(version = "0.1.0")]
#[command(about = "Conduit: a configurable byte-stream message proxy")]
#[command(long_about = "\
------------------------------------------------------------
    Conduit assembles a linear byte pipeline from the
    command line: the first stage is the source, the last
    is the sink, and every stage in between reframes or
    rewrites the stream.

        conduit udp:0.0.0.0:7000 -length +lines tcp:10.0.0.1:9000

    The pipeline runs until the source reports end of
    transport, then drains buffered data and exits.
------------------------------------------------------------")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// List available stage types
    #[arg(short = 'L', long)]
    list_stages: bool,

    /// Ordered pipeline stages, each `name[:options]`; position 0 is the source
    #[arg(value_name = "STAGE", allow_hyphen_values = true)]
    stages: Vec<String>,
}

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize the diagnostic stream with the specified level
    logging::init_logging(&cli.log_level);

    // Handle list stages command
    if cli.list_stages {
        println!("Available stage types:");
        for stage in factory::list_stages() {
            println!("  - {stage}");
        }
        return;
    }

    // Build the pipeline from the ordered stage tokens
    let build = engine::build_pipeline(&cli.stages).context("failed to build pipeline");
    let mut pipeline = match build {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(2);
        }
    };

    // Run until the source exhausts; anything else is fatal
    if let Err(e) = pipeline.run().await {
        tracing::error!("{e}");
        tracing::error!("Fatal error: run loop terminated.");
        std::process::exit(1);
    }

    tracing::info!("Source exhausted; pipeline drained.");
}
