use serde::Serialize;
use crate::errors::VishnoraError;
use crate::models::campaign::{CampaignStatus, SourceKind, SpecSource};
use crate::probe::ProbeRun;
use crate::utils::truncation::truncate_error;

/// What happened to one declared spec source during a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub spec_url: String,
    pub targets: usize,
    pub probed: usize,
    pub skipped: usize,
    pub findings: usize,
    /// Cancellation stopped this source before all its targets were tried.
    pub canceled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceOutcome {
    pub fn probed(source: &SpecSource, targets: usize, run: &ProbeRun) -> Self {
        Self {
            kind: source.kind,
            spec_url: source.spec_url.clone(),
            targets,
            probed: run.probed,
            skipped: run.skipped,
            findings: run.findings.len(),
            canceled: run.canceled,
            error: None,
        }
    }

    pub fn failed(source: &SpecSource, error: &VishnoraError) -> Self {
        Self {
            kind: source.kind,
            spec_url: source.spec_url.clone(),
            targets: 0,
            probed: 0,
            skipped: 0,
            findings: 0,
            canceled: false,
            error: Some(truncate_error(&error.to_string())),
        }
    }
}

/// Summary of one job execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub campaign_id: String,
    /// Status the campaign was left in.
    pub status: CampaignStatus,
    /// True when the delivery was ignored because the campaign was not queued.
    pub skipped: bool,
    /// Probing stopped early on the cancel signal. Decides `canceled` over
    /// `completed`; a signal arriving after the last target does not count.
    pub canceled: bool,
    pub sources: Vec<SourceOutcome>,
    pub findings: usize,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn new(campaign_id: &str) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            status: CampaignStatus::Running,
            skipped: false,
            canceled: false,
            sources: Vec::new(),
            findings: 0,
            duration_ms: 0,
        }
    }

    pub fn skipped(campaign_id: &str, status: CampaignStatus) -> Self {
        Self {
            status,
            skipped: true,
            ..Self::new(campaign_id)
        }
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}
