use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::probe::heuristic::ProbePolicy;

pub const DEFAULT_WORKER_CONCURRENCY: usize = 2;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DB_PATH: &str = "./data/vishnora.db";

/// Worker process configuration, read from an optional YAML file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct VishnoraConfig {
    pub worker: Option<WorkerConfig>,
    pub spec: Option<SpecConfig>,
    pub probe: Option<ProbeConfig>,
    pub database: Option<DatabaseConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WorkerConfig {
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SpecConfig {
    pub fetch_timeout_secs: Option<u64>,
}

/// Tunables of the differential probe. Unset fields keep the documented defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProbeConfig {
    pub canary_ids: Option<Vec<String>>,
    pub rest_min_body_bytes: Option<usize>,
    pub graphql_min_body_bytes: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl VishnoraConfig {
    pub fn worker_concurrency(&self) -> usize {
        self.worker
            .as_ref()
            .and_then(|w| w.concurrency)
            .unwrap_or(DEFAULT_WORKER_CONCURRENCY)
    }

    pub fn fetch_timeout(&self) -> Duration {
        let secs = self.spec
            .as_ref()
            .and_then(|s| s.fetch_timeout_secs)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn database_path(&self) -> Option<&str> {
        self.database.as_ref().and_then(|d| d.path.as_deref())
    }

    pub fn probe_policy(&self) -> ProbePolicy {
        let mut policy = ProbePolicy::default();
        let Some(probe) = &self.probe else {
            return policy;
        };
        if let Some(ids) = &probe.canary_ids {
            if let [a, b] = ids.as_slice() {
                policy.canary_a = a.clone();
                policy.canary_b = b.clone();
            }
        }
        if let Some(n) = probe.rest_min_body_bytes {
            policy.rest_min_body_bytes = n;
        }
        if let Some(n) = probe.graphql_min_body_bytes {
            policy.graphql_min_body_bytes = n;
        }
        if let Some(secs) = probe.request_timeout_secs {
            policy.request_timeout = Duration::from_secs(secs);
        }
        policy
    }
}
