//! The differential-authorization decision rule.
//!
//! This is a presence/shape heuristic: two distinct canary ids both returning
//! a sizeable 2xx body is flagged. It cannot tell public data from another
//! principal's record.

use std::sync::LazyLock;
use std::time::Duration;
use regex::Regex;
use crate::config::types::DEFAULT_PROBE_TIMEOUT_SECS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePolicy {
    pub canary_a: String,
    pub canary_b: String,
    /// REST: flag when the second body has at least this many bytes.
    pub rest_min_body_bytes: usize,
    /// GraphQL: flag when the body has at least this many bytes.
    pub graphql_min_body_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            canary_a: "123".to_string(),
            canary_b: "456".to_string(),
            rest_min_body_bytes: 20,
            // "more than 20 bytes"
            graphql_min_body_bytes: 21,
            request_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl ProbePolicy {
    pub fn rest_flags(&self, status_a: u16, status_b: u16, body_b_len: usize) -> bool {
        is_success(status_a) && is_success(status_b) && body_b_len >= self.rest_min_body_bytes
    }

    pub fn graphql_flags(&self, status: u16, body_len: usize) -> bool {
        is_success(status) && body_len >= self.graphql_min_body_bytes
    }
}

static SERVICE_HINTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)user|account", "accounts-api"),
        (r"(?i)order|cart", "orders-api"),
        (r"(?i)payment|billing", "billing-api"),
    ]
    .into_iter()
    .map(|(pattern, service)| (Regex::new(pattern).expect("valid service regex"), service))
    .collect()
});

pub const DEFAULT_SERVICE: &str = "api";
pub const GRAPHQL_SERVICE: &str = "graphql-api";

/// Best-effort owning service from path keywords; first match wins.
pub fn guess_service(path: &str) -> &'static str {
    SERVICE_HINTS
        .iter()
        .find(|(re, _)| re.is_match(path))
        .map(|(_, service)| *service)
        .unwrap_or(DEFAULT_SERVICE)
}
