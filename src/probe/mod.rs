pub mod executor;
pub mod heuristic;
pub mod ratelimit;

pub use executor::{ProbeExecutor, ProbeRun};
pub use heuristic::{guess_service, ProbePolicy};
pub use ratelimit::RateLimiter;

use crate::models::finding::Severity;

/// What the executor saw when a decision rule fired. Evidence is derived
/// from this, never from a second request.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Rest {
        path: String,
        url_a: String,
        url_b: String,
        status_a: u16,
        status_b: u16,
        /// Body of the second (canary B) response.
        body: String,
    },
    GraphQl {
        endpoint: String,
        query: String,
        /// Exact JSON body that was POSTed.
        request_body: String,
        status: u16,
        body: String,
    },
}

/// A fired decision, not yet turned into a persisted finding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFinding {
    pub title: String,
    pub severity: Severity,
    pub service: String,
    pub observation: Observation,
}
