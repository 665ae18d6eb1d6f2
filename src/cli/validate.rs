use std::path::Path;
use crate::cli::commands::ValidateArgs;
use crate::config::parse_config;
use crate::errors::VishnoraError;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), VishnoraError> {
    let config = parse_config(Path::new(&args.config)).await?;
    let policy = config.probe_policy();
    println!("Configuration is valid: {}", args.config);
    println!(
        "  workers={} canaries={}/{} fetch_timeout={}s probe_timeout={}s",
        config.worker_concurrency(),
        policy.canary_a,
        policy.canary_b,
        config.fetch_timeout().as_secs(),
        policy.request_timeout.as_secs()
    );
    Ok(())
}
