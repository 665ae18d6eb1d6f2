use std::collections::BTreeMap;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::errors::VishnoraError;

/// Severity level for a finding, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Lower values indicate higher severity.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl FromStr for Severity {
    type Err = VishnoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Critical" => Ok(Severity::Critical),
            "High" => Ok(Severity::High),
            "Medium" => Ok(Severity::Medium),
            "Low" => Ok(Severity::Low),
            other => Err(VishnoraError::Persistence(format!("Unknown severity: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingStatus {
    /// The probe's decision rule fired.
    Validated,
    /// Reserved for producers that only suspect an issue.
    Potential,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Validated => "Validated",
            FindingStatus::Potential => "Potential",
        }
    }
}

impl FromStr for FindingStatus {
    type Err = VishnoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Validated" => Ok(FindingStatus::Validated),
            "Potential" => Ok(FindingStatus::Potential),
            other => Err(VishnoraError::Persistence(format!("Unknown finding status: {}", other))),
        }
    }
}

/// A persisted finding. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    /// Human label of the validation module, e.g. "API & GraphQL Pentest".
    pub module: String,
    /// Best-effort guess of the owning service.
    pub service: String,
    pub status: FindingStatus,
    pub time: DateTime<Utc>,
}

/// Reproducible proof attached 1:1 to a [`Finding`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub poc_curl: String,
    pub res_sample: String,
    pub details: BTreeMap<String, String>,
}

/// A finding together with its evidence, the unit handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingRecord {
    #[serde(flatten)]
    pub finding: Finding,
    pub evidence: Evidence,
}

pub fn new_finding_id() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("F-{}", raw[..8].to_uppercase())
}
