use clap::{Args, Parser, Subcommand};
use crate::models::campaign::{CampaignModule, Environment};

#[derive(Parser)]
#[command(name = "vishnora", version, about = "Security validation campaigns for OpenAPI and GraphQL surfaces")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the control API and the campaign worker pool
    Serve(ServeArgs),
    /// Queue a campaign on a running server
    Trigger(TriggerArgs),
    /// Cancel a queued or running campaign
    Cancel(CampaignRef),
    /// Show a campaign's status and findings
    Status(StatusArgs),
    /// Run one campaign locally and print its findings
    Probe(ProbeArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// YAML worker configuration
    #[arg(short, long)]
    pub config: Option<String>,

    /// Listen port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Listen address (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    pub db: Option<String>,

    /// Concurrent campaigns (overrides config)
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Where the campaign's surface lives and how to talk to it.
#[derive(Args, Clone)]
pub struct SurfaceArgs {
    /// Base URL that OpenAPI paths are appended to
    #[arg(long)]
    pub base_url: String,

    /// OpenAPI document URL (JSON or YAML)
    #[arg(long)]
    pub openapi_url: Option<String>,

    /// GraphQL endpoint; introspected, then probed
    #[arg(long)]
    pub graphql_url: Option<String>,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Outbound requests per second (0 = unlimited)
    #[arg(long, default_value = "10")]
    pub rate: u32,
}

#[derive(Args, Clone)]
pub struct TriggerArgs {
    #[command(flatten)]
    pub surface: SurfaceArgs,

    /// Validation module
    #[arg(long, default_value = "api", value_parser = parse_module)]
    pub module: CampaignModule,

    /// Target environment
    #[arg(long, default_value = "staging", value_parser = parse_env)]
    pub env: Environment,

    /// Mark the campaign as not safe-mode
    #[arg(long = "unsafe")]
    pub allow_unsafe: bool,

    /// Block until the campaign finishes
    #[arg(long)]
    pub wait: bool,

    /// Control API address
    #[arg(long, default_value = super::DEFAULT_SERVER)]
    pub server: String,
}

#[derive(Args, Clone)]
pub struct CampaignRef {
    /// Campaign ID
    pub campaign_id: String,

    /// Control API address
    #[arg(long, default_value = super::DEFAULT_SERVER)]
    pub server: String,
}

#[derive(Args, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub campaign: CampaignRef,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Continuously poll until the campaign finishes
    #[arg(long)]
    pub follow: bool,

    /// Poll interval in seconds
    #[arg(long, default_value = "5")]
    pub interval: u64,
}

#[derive(Args, Clone)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub surface: SurfaceArgs,

    /// YAML worker configuration (probe and spec sections apply)
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}

pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name is empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_module(raw: &str) -> Result<CampaignModule, String> {
    raw.parse().map_err(|e: crate::errors::VishnoraError| e.to_string())
}

fn parse_env(raw: &str) -> Result<Environment, String> {
    raw.parse().map_err(|e: crate::errors::VishnoraError| e.to_string())
}

impl SurfaceArgs {
    pub fn campaign_config(&self) -> crate::models::campaign::CampaignConfig {
        crate::models::campaign::CampaignConfig {
            base_url: Some(self.base_url.clone()),
            openapi_url: self.openapi_url.clone(),
            graphql_url: self.graphql_url.clone(),
            headers: self.headers.iter().cloned().collect(),
        }
    }
}
