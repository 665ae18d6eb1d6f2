use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use crate::errors::VishnoraError;

/// Which validation module a campaign belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CampaignModule {
    #[default]
    Api,
    Identity,
    K8s,
    Saas,
}

impl CampaignModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Identity => "identity",
            Self::K8s => "k8s",
            Self::Saas => "saas",
        }
    }

    /// Human label carried on findings produced under this module.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Api => "API & GraphQL Pentest",
            Self::Identity => "Identity Path Validation",
            Self::K8s => "Kubernetes Attack Chains",
            Self::Saas => "SaaS Exploit Validation",
        }
    }
}

impl FromStr for CampaignModule {
    type Err = VishnoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(Self::Api),
            "identity" => Ok(Self::Identity),
            "k8s" => Ok(Self::K8s),
            "saas" => Ok(Self::Saas),
            other => Err(VishnoraError::Config(format!("Invalid module: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }
}

impl FromStr for Environment {
    type Err = VishnoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staging" => Ok(Self::Staging),
            "prod" => Ok(Self::Prod),
            other => Err(VishnoraError::Config(format!("Invalid env: {}", other))),
        }
    }
}

/// Campaign lifecycle. Every store implementation routes status writes
/// through [`CampaignStatus::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// `running -> canceled` is only written by the runner after it has
    /// observed the cooperative cancel signal.
    pub fn can_transition_to(&self, next: CampaignStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Canceled)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Canceled)
        )
    }

    pub fn transition(
        self,
        campaign_id: &str,
        next: CampaignStatus,
    ) -> Result<CampaignStatus, VishnoraError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(VishnoraError::IllegalTransition {
                campaign_id: campaign_id.to_string(),
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = VishnoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            other => Err(VishnoraError::Persistence(format!("Unknown campaign status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub module: CampaignModule,
    pub env: Environment,
    pub safe: bool,
    /// Outbound probe budget in requests per second. Zero disables the gate.
    pub rate: u32,
    /// Free-form JSON blob; see [`CampaignConfig::from_blob`].
    pub config: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(id: impl Into<String>, config: &CampaignConfig) -> Self {
        Self {
            id: id.into(),
            module: CampaignModule::Api,
            env: Environment::Staging,
            safe: true,
            rate: 10,
            config: serde_json::to_string(config).unwrap_or_default(),
            status: CampaignStatus::Queued,
            created_at: Utc::now(),
        }
    }
}

/// Structured view of the campaign config blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub base_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub openapi_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub graphql_url: Option<String>,
    #[serde(deserialize_with = "lenient_headers")]
    pub headers: BTreeMap<String, String>,
}

/// Anything but a JSON string counts as absent.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Scalar header values are stringified; nulls, arrays and objects are dropped.
fn lenient_headers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error> {
    let Value::Object(map) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::String(s) => Some((name, s)),
            Value::Number(n) => Some((name, n.to_string())),
            Value::Bool(b) => Some((name, b.to_string())),
            _ => None,
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    OpenApi,
    GraphQl,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenApi => "openapi",
            Self::GraphQl => "graphql",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared spec source of a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSource {
    pub kind: SourceKind,
    pub spec_url: String,
    pub base_url: String,
}

impl CampaignConfig {
    /// Parse the blob leniently. An unparseable blob yields the empty
    /// configuration so the run still completes without probes.
    pub fn from_blob(campaign_id: &str, blob: &str) -> Self {
        if blob.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<CampaignConfig>(blob) {
            Ok(config) => config,
            Err(e) => {
                warn!(campaign_id = %campaign_id, error = %e, "Campaign config unparseable, running with empty configuration");
                Self::default()
            }
        }
    }

    /// Declared sources in execution order. A source needs both its spec
    /// URL and the base URL; empty strings count as absent.
    pub fn sources(&self) -> Vec<SpecSource> {
        let Some(base_url) = non_empty(&self.base_url) else {
            return Vec::new();
        };
        let mut sources = Vec::new();
        if let Some(url) = non_empty(&self.openapi_url) {
            sources.push(SpecSource {
                kind: SourceKind::OpenApi,
                spec_url: url.to_string(),
                base_url: base_url.to_string(),
            });
        }
        if let Some(url) = non_empty(&self.graphql_url) {
            sources.push(SpecSource {
                kind: SourceKind::GraphQl,
                spec_url: url.to_string(),
                base_url: base_url.to_string(),
            });
        }
        sources
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
