use bulk_email_verifier::{setup_logging, Cli, CliRunner};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Resolve configuration before logging so VERBOSE from the environment counts
    let runner = CliRunner::from_cli(&args);
    let verbose = runner
        .as_ref()
        .map(|runner| runner.config.verbose)
        .unwrap_or(args.verbose);
    setup_logging(verbose)?;

    info!("Starting bulk-email-verifier v{}", env!("CARGO_PKG_VERSION"));

    let runner = match runner {
        Ok(runner) => runner,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let result = tokio::select! {
        result = runner.run() => result,
        _ = tokio::signal::ctrl_c() => {
            error!("Interrupted before completion; no results were written");
            std::process::exit(130);
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}
