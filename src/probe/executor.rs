use std::collections::BTreeMap;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::errors::VishnoraError;
use crate::models::finding::Severity;
use crate::models::target::{GraphQlTargets, Target};
use crate::surface::graphql::typename_probe_query;
use crate::surface::openapi::substitute_first_id;
use crate::utils::http::read_capped;
use crate::utils::truncation::MAX_SAMPLE_BYTES;
use super::heuristic::{guess_service, ProbePolicy, GRAPHQL_SERVICE};
use super::ratelimit::RateLimiter;
use super::{Observation, RawFinding};

/// Outcome of probing one source's targets.
#[derive(Debug, Default)]
pub struct ProbeRun {
    pub findings: Vec<RawFinding>,
    /// Targets for which every request completed.
    pub probed: usize,
    /// Targets dropped because a request failed.
    pub skipped: usize,
    /// Mutations discovered but never sent.
    pub mutations_skipped: usize,
    /// Set when cancellation stopped the run early.
    pub canceled: bool,
}

struct Response {
    status: u16,
    /// Raw body bytes received, counted up to the read cap.
    len: usize,
    /// Lossy UTF-8 rendering of those bytes.
    body: String,
}

/// Issues the differential requests. Requests within a run are sequential;
/// the token bucket, when present, gates each one.
pub struct ProbeExecutor {
    client: Client,
    policy: ProbePolicy,
    limiter: Option<RateLimiter>,
}

impl ProbeExecutor {
    pub fn new(client: Client, policy: ProbePolicy, rate_per_sec: u32) -> Self {
        Self {
            client,
            policy,
            limiter: RateLimiter::new(rate_per_sec),
        }
    }

    pub async fn run_rest(
        &self,
        targets: &[Target],
        headers: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> ProbeRun {
        let mut run = ProbeRun::default();

        for target in targets.iter().filter(|t| t.has_id_parameter) {
            if cancel.is_cancelled() {
                run.canceled = true;
                break;
            }

            let url_a = substitute_first_id(&target.url_template, &self.policy.canary_a);
            let url_b = substitute_first_id(&target.url_template, &self.policy.canary_b);

            let a = match self.send(self.client.get(&url_a), headers).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(url = %url_a, error = %e, "Probe request failed, skipping target");
                    run.skipped += 1;
                    continue;
                }
            };
            let b = match self.send(self.client.get(&url_b), headers).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(url = %url_b, error = %e, "Probe request failed, skipping target");
                    run.skipped += 1;
                    continue;
                }
            };
            run.probed += 1;

            debug!(path = %target.path, status_a = a.status, status_b = b.status, bytes = b.len, "REST target probed");

            if self.policy.rest_flags(a.status, b.status, b.len) {
                info!(path = %target.path, "Differential access observed");
                run.findings.push(RawFinding {
                    title: format!("Potential IDOR on {}", target.path),
                    severity: Severity::High,
                    service: guess_service(&target.path).to_string(),
                    observation: Observation::Rest {
                        path: target.path.clone(),
                        url_a,
                        url_b,
                        status_a: a.status,
                        status_b: b.status,
                        body: b.body,
                    },
                });
            }
        }

        run
    }

    pub async fn run_graphql(
        &self,
        endpoint: &str,
        targets: &GraphQlTargets,
        headers: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> ProbeRun {
        let mut run = ProbeRun {
            mutations_skipped: targets.mutations.len(),
            ..Default::default()
        };
        if run.mutations_skipped > 0 {
            debug!(count = run.mutations_skipped, "GraphQL mutations discovered, not probed");
        }

        for field in &targets.queries {
            if cancel.is_cancelled() {
                run.canceled = true;
                break;
            }

            let query = typename_probe_query(field);
            let request_body = json!({ "query": query }).to_string();

            let mut request = self.client.post(endpoint).body(request_body.clone());
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                request = request.header(reqwest::header::CONTENT_TYPE, "application/json");
            }

            let resp = match self.send(request, headers).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(endpoint = %endpoint, field = %field, error = %e, "GraphQL probe failed, skipping field");
                    run.skipped += 1;
                    continue;
                }
            };
            run.probed += 1;

            if self.policy.graphql_flags(resp.status, resp.len) {
                info!(field = %field, "GraphQL query field answered");
                run.findings.push(RawFinding {
                    title: format!("GraphQL query accessible: {}", field),
                    severity: Severity::Medium,
                    service: GRAPHQL_SERVICE.to_string(),
                    observation: Observation::GraphQl {
                        endpoint: endpoint.to_string(),
                        query,
                        request_body,
                        status: resp.status,
                        body: resp.body,
                    },
                });
            }
        }

        run
    }

    /// Enough body to decide every threshold and fill the evidence sample.
    fn read_cap(&self) -> usize {
        self.policy
            .rest_min_body_bytes
            .max(self.policy.graphql_min_body_bytes)
            .max(MAX_SAMPLE_BYTES)
    }

    /// An unreadable body counts as empty; only transport failures are errors.
    async fn send(
        &self,
        request: RequestBuilder,
        headers: &BTreeMap<String, String>,
    ) -> Result<Response, VishnoraError> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let request = headers
            .iter()
            .fold(request, |req, (name, value)| req.header(name.as_str(), value.as_str()))
            .timeout(self.policy.request_timeout);

        let resp = request
            .send()
            .await
            .map_err(|e| VishnoraError::ProbeNetwork(e.to_string()))?;

        let status = resp.status().as_u16();
        let raw = read_capped(resp, self.read_cap()).await.unwrap_or_else(|e| {
            debug!(error = %e, "Probe response body unreadable, treating as empty");
            Default::default()
        });
        Ok(Response {
            status,
            len: raw.bytes.len(),
            body: String::from_utf8_lossy(&raw.bytes).into_owned(),
        })
    }
}
