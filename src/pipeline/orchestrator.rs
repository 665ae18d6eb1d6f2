use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use crate::config::security::validate_probe_headers;
use crate::config::VishnoraConfig;
use crate::errors::VishnoraError;
use crate::evidence::EvidenceRecorder;
use crate::models::campaign::{Campaign, CampaignConfig, CampaignModule, CampaignStatus, SourceKind, SpecSource};
use crate::models::finding::FindingRecord;
use crate::probe::{ProbeExecutor, ProbePolicy};
use crate::store::{CampaignStore, FindingSink};
use crate::surface::{build_get_targets, build_graphql_targets, SpecLoader};
use super::state::{RunReport, SourceOutcome};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub policy: ProbePolicy,
    pub fetch_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from_config(&VishnoraConfig::default())
    }
}

impl RunnerSettings {
    pub fn from_config(config: &VishnoraConfig) -> Self {
        Self {
            policy: config.probe_policy(),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// Executes one campaign job end to end: status to running, load each
/// declared source, probe, record evidence, persist, final status.
pub struct CampaignRunner {
    store: Arc<dyn CampaignStore>,
    sink: Arc<dyn FindingSink>,
    client: Client,
    settings: RunnerSettings,
}

impl CampaignRunner {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        sink: Arc<dyn FindingSink>,
        settings: RunnerSettings,
    ) -> Result<Self, VishnoraError> {
        let client = Client::builder()
            .user_agent(concat!("vishnora/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VishnoraError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { store, sink, client, settings })
    }

    pub async fn execute(
        &self,
        campaign_id: &str,
        cancel: &CancellationToken,
    ) -> Result<RunReport, VishnoraError> {
        let started = Instant::now();
        let campaign = self.store
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| VishnoraError::NotFound(campaign_id.to_string()))?;

        if campaign.status != CampaignStatus::Queued {
            info!(campaign_id = %campaign_id, status = %campaign.status, "Campaign not queued, ignoring delivery");
            return Ok(RunReport::skipped(campaign_id, campaign.status));
        }

        // Losing the race to a cancel shows up as an illegal transition.
        match self.store.update_status(campaign_id, CampaignStatus::Running).await {
            Ok(()) => {}
            Err(VishnoraError::IllegalTransition { from, .. }) => {
                info!(campaign_id = %campaign_id, status = %from, "Campaign left queued before start, ignoring delivery");
                return Ok(RunReport::skipped(campaign_id, from));
            }
            Err(e) => return Err(e),
        }
        info!(campaign_id = %campaign_id, module = %campaign.module.as_str(), rate = campaign.rate, "Campaign started");

        let result = self.run(&campaign, cancel).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(mut report) => {
                let status = if report.canceled {
                    CampaignStatus::Canceled
                } else {
                    CampaignStatus::Completed
                };
                if let Err(e) = self.store.update_status(campaign_id, status).await {
                    error!(campaign_id = %campaign_id, status = %status, error = %e, "Could not record final status");
                    self.mark_failed(campaign_id).await;
                    return Err(e);
                }
                report.status = status;
                report.duration_ms = duration_ms;
                info!(
                    campaign_id = %campaign_id,
                    status = %status,
                    findings = report.findings,
                    failed_sources = report.failed_sources(),
                    duration_ms,
                    "Campaign finished"
                );
                Ok(report)
            }
            Err(e) => {
                let class = e.classify();
                error!(campaign_id = %campaign_id, error_type = class.error_type, error = %e, "Campaign failed");
                self.mark_failed(campaign_id).await;
                Err(e)
            }
        }
    }

    async fn mark_failed(&self, campaign_id: &str) {
        if let Err(e) = self.store.update_status(campaign_id, CampaignStatus::Failed).await {
            error!(campaign_id = %campaign_id, error = %e, "Could not mark campaign failed");
        }
    }

    async fn run(&self, campaign: &Campaign, cancel: &CancellationToken) -> Result<RunReport, VishnoraError> {
        let config = load_config(campaign);

        let sources = config.sources();
        if sources.is_empty() {
            info!(campaign_id = %campaign.id, "No spec sources declared, nothing to probe");
        }
        if !campaign.safe {
            debug!(campaign_id = %campaign.id, "Unsafe mode requested; denylist still applies");
        }

        let executor = ProbeExecutor::new(self.client.clone(), self.settings.policy.clone(), campaign.rate);
        // Findings from the differential probes always belong to the API module.
        let recorder = EvidenceRecorder::new(CampaignModule::Api.label());
        let mut report = RunReport::new(&campaign.id);
        let mut records: Vec<FindingRecord> = Vec::new();

        for source in &sources {
            if cancel.is_cancelled() {
                info!(campaign_id = %campaign.id, "Cancellation observed between sources");
                report.canceled = true;
                break;
            }

            match self.run_source(source, &config.headers, &executor, &recorder, cancel).await {
                Ok((outcome, found)) => {
                    report.canceled |= outcome.canceled;
                    report.sources.push(outcome);
                    records.extend(found);
                }
                Err(e) if e.is_source_isolated() => {
                    warn!(campaign_id = %campaign.id, source = %source.kind, url = %source.spec_url, error = %e, "Source failed, continuing");
                    report.sources.push(SourceOutcome::failed(source, &e));
                }
                Err(e) => return Err(e),
            }
        }

        // Findings already gathered are kept even when the run was canceled.
        for record in &records {
            self.sink.create(&campaign.id, record).await?;
        }
        report.findings = records.len();
        Ok(report)
    }

    async fn run_source(
        &self,
        source: &SpecSource,
        headers: &BTreeMap<String, String>,
        executor: &ProbeExecutor,
        recorder: &EvidenceRecorder,
        cancel: &CancellationToken,
    ) -> Result<(SourceOutcome, Vec<FindingRecord>), VishnoraError> {
        let loader = SpecLoader::new(self.client.clone(), self.settings.fetch_timeout);

        let (targets, run) = match source.kind {
            SourceKind::OpenApi => {
                let doc = loader.load_openapi(&source.spec_url).await?;
                let targets = build_get_targets(&doc, &source.base_url);
                info!(url = %source.spec_url, targets = targets.len(), "REST targets derived");
                let run = executor.run_rest(&targets, headers, cancel).await;
                (targets.len(), run)
            }
            SourceKind::GraphQl => {
                let schema = loader.load_graphql_schema(&source.spec_url).await?;
                let targets = build_graphql_targets(&schema);
                info!(url = %source.spec_url, queries = targets.queries.len(), mutations = targets.mutations.len(), "GraphQL targets derived");
                // Introspection and probes go to the same endpoint.
                let run = executor.run_graphql(&source.spec_url, &targets, headers, cancel).await;
                (targets.queries.len(), run)
            }
        };

        let outcome = SourceOutcome::probed(source, targets, &run);
        let records = run.findings
            .into_iter()
            .map(|raw| recorder.record(raw, headers))
            .collect();
        Ok((outcome, records))
    }
}

/// Headers that could smuggle extra header lines are treated like an
/// unparseable blob: the run proceeds with the empty configuration.
fn load_config(campaign: &Campaign) -> CampaignConfig {
    let config = CampaignConfig::from_blob(&campaign.id, &campaign.config);
    match validate_probe_headers(&config.headers) {
        Ok(()) => config,
        Err(e) => {
            warn!(campaign_id = %campaign.id, error = %e, "Campaign headers unusable, running with empty configuration");
            CampaignConfig::default()
        }
    }
}
