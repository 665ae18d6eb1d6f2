use clap::Parser;
use tracing_subscriber::EnvFilter;
use vishnora::cli::{self, Commands};
use vishnora::errors::VishnoraError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    // Logs go to stderr so `probe` output on stdout stays machine-readable.
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Serve(args) => cli::serve::handle_serve(args).await,
        Commands::Trigger(args) => cli::trigger::handle_trigger(args).await,
        Commands::Cancel(args) => cli::cancel::handle_cancel(args).await,
        Commands::Status(args) => cli::status::handle_status(args).await,
        Commands::Probe(args) => cli::probe::handle_probe(args, cli.quiet).await,
        Commands::Validate(args) => cli::validate::handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            VishnoraError::Config(_) => 2,
            VishnoraError::NotFound(_) => 3,
            VishnoraError::Network(_) => 4,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}
