use std::collections::BTreeMap;
use chrono::Utc;
use crate::models::finding::{new_finding_id, Evidence, Finding, FindingRecord, FindingStatus};
use crate::probe::{Observation, RawFinding};
use crate::utils::formatting::shell_quote;
use crate::utils::truncation::truncate_sample;

/// Turns fired probe decisions into finding + evidence pairs. Infallible.
pub struct EvidenceRecorder {
    module_label: String,
}

impl EvidenceRecorder {
    pub fn new(module_label: impl Into<String>) -> Self {
        Self { module_label: module_label.into() }
    }

    pub fn record(&self, raw: RawFinding, headers: &BTreeMap<String, String>) -> FindingRecord {
        let (poc_curl, body, details) = match raw.observation {
            Observation::Rest { path, url_a, url_b, status_a, status_b, body } => {
                // The second request is the one that crossed the boundary.
                let curl = poc_curl_rest("GET", &url_b, headers);
                let details = BTreeMap::from([
                    ("path".to_string(), path),
                    ("urlA".to_string(), url_a),
                    ("urlB".to_string(), url_b),
                    ("statusA".to_string(), status_a.to_string()),
                    ("statusB".to_string(), status_b.to_string()),
                ]);
                (curl, body, details)
            }
            Observation::GraphQl { endpoint, query, request_body, status, body } => {
                let curl = poc_curl_graphql(&endpoint, &request_body, headers);
                let details = BTreeMap::from([
                    ("endpoint".to_string(), endpoint),
                    ("query".to_string(), query),
                    ("status".to_string(), status.to_string()),
                ]);
                (curl, body, details)
            }
        };

        FindingRecord {
            finding: Finding {
                id: new_finding_id(),
                title: raw.title,
                severity: raw.severity,
                module: self.module_label.clone(),
                service: raw.service,
                status: FindingStatus::Validated,
                time: Utc::now(),
            },
            evidence: Evidence {
                poc_curl,
                res_sample: truncate_sample(&body),
                details,
            },
        }
    }
}

fn header_flags(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .map(|(name, value)| format!(" -H {}", shell_quote(&format!("{}: {}", name, value))))
        .collect()
}

/// `curl -i -X GET '<url>' -H 'name: value'...`
pub fn poc_curl_rest(method: &str, url: &str, headers: &BTreeMap<String, String>) -> String {
    format!("curl -i -X {} {}{}", method, shell_quote(url), header_flags(headers))
}

/// `curl -X POST '<url>' -H 'Content-Type: application/json'... --data '<json>'`
pub fn poc_curl_graphql(endpoint: &str, body: &str, headers: &BTreeMap<String, String>) -> String {
    let mut all = BTreeMap::new();
    if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
        all.insert("Content-Type".to_string(), "application/json".to_string());
    }
    all.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
    format!(
        "curl -X POST {}{} --data {}",
        shell_quote(endpoint),
        header_flags(&all),
        shell_quote(body)
    )
}
