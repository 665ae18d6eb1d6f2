use std::path::Path;
use std::sync::Arc;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use crate::cli::commands::ProbeArgs;
use crate::config::security::validate_probe_headers;
use crate::config::{parse_config, VishnoraConfig};
use crate::errors::VishnoraError;
use crate::models::campaign::Campaign;
use crate::pipeline::{CampaignRunner, RunnerSettings};
use crate::store::MemoryStore;
use crate::utils::formatting::format_duration;
use tracing::info;

/// One-shot local campaign against an in-memory store.
pub async fn handle_probe(args: ProbeArgs, quiet: bool) -> Result<(), VishnoraError> {
    let config = match &args.config {
        Some(path) => parse_config(Path::new(path)).await?,
        None => VishnoraConfig::default(),
    };
    let campaign_config = args.surface.campaign_config();
    validate_probe_headers(&campaign_config.headers)?;

    let mut campaign = Campaign::new(uuid::Uuid::new_v4().to_string(), &campaign_config);
    campaign.rate = args.surface.rate;
    let campaign_id = campaign.id.clone();

    let store = Arc::new(MemoryStore::new());
    store.insert(campaign);
    let runner = CampaignRunner::new(store.clone(), store.clone(), RunnerSettings::from_config(&config))?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after the current target");
                cancel.cancel();
            }
        });
    }

    let report = runner.execute(&campaign_id, &cancel).await?;
    let mut findings = store.findings(&campaign_id);
    findings.sort_by_key(|r| r.finding.severity.rank());
    if !quiet {
        eprintln!(
            "{} finding(s), status {}, {}",
            findings.len(),
            report.status,
            format_duration(report.duration_ms)
        );
    }
    println!("{}", serde_json::to_string_pretty(&json!({ "report": report, "findings": findings }))?);
    Ok(())
}
