use thiserror::Error;
use crate::models::campaign::CampaignStatus;

#[derive(Debug, Error)]
pub enum VishnoraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Probe network error: {0}")]
    ProbeNetwork(String),

    #[error("Campaign not found: {0}")]
    NotFound(String),

    #[error("Illegal status transition for campaign {campaign_id}: {from} -> {to}")]
    IllegalTransition {
        campaign_id: String,
        from: CampaignStatus,
        to: CampaignStatus,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
