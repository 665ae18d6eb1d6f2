use std::time::Duration;
use reqwest::Client;
use serde_json::{json, Value};
use crate::errors::VishnoraError;
use super::graphql::{IntrospectionResult, INTROSPECTION_QUERY};
use super::openapi::OpenApiDocument;
use crate::utils::http::read_capped;
use tracing::{debug, info};

/// Largest OpenAPI document or introspection response accepted.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

/// Fetches and normalizes target-surface documents. Nothing is cached;
/// every campaign run re-fetches.
pub struct SpecLoader {
    client: Client,
    timeout: Duration,
}

impl SpecLoader {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn load_openapi(&self, url: &str) -> Result<OpenApiDocument, VishnoraError> {
        let resp = self.client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| VishnoraError::Fetch(format!("OpenAPI fetch failed for {}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(VishnoraError::Fetch(format!("OpenAPI fetch failed: {}", status.as_u16())));
        }

        let bytes = read_document(resp, "OpenAPI").await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| VishnoraError::Parse(format!("OpenAPI document is not UTF-8: {}", e)))?;

        let format = detect_format(url, &text);
        debug!(url = %url, ?format, bytes = text.len(), "OpenAPI document fetched");
        let doc = parse_document(&text, format)?;
        info!(url = %url, paths = doc.path_count(), "OpenAPI document loaded");
        Ok(doc)
    }

    pub async fn load_graphql_schema(&self, url: &str) -> Result<IntrospectionResult, VishnoraError> {
        let resp = self.client
            .post(url)
            .timeout(self.timeout)
            .json(&json!({ "query": INTROSPECTION_QUERY }))
            .send()
            .await
            .map_err(|e| VishnoraError::Fetch(format!("GraphQL introspection failed for {}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(VishnoraError::Fetch(format!("GraphQL introspection failed: {}", status.as_u16())));
        }

        let bytes = read_document(resp, "GraphQL").await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| VishnoraError::Parse(format!("Invalid introspection response: {}", e)))
    }
}

async fn read_document(resp: reqwest::Response, what: &str) -> Result<Vec<u8>, VishnoraError> {
    let body = read_capped(resp, MAX_DOCUMENT_BYTES)
        .await
        .map_err(|e| VishnoraError::Fetch(format!("{} body read failed: {}", what, e)))?;
    if body.truncated {
        return Err(VishnoraError::Fetch(format!(
            "{} document exceeds {} bytes",
            what, MAX_DOCUMENT_BYTES
        )));
    }
    Ok(body.bytes)
}

/// Extension of the URL path decides; otherwise anything not starting with
/// `{` is treated as YAML.
pub fn detect_format(url: &str, body: &str) -> DocumentFormat {
    let path = reqwest::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or(url).to_lowercase());

    if path.ends_with(".yaml") || path.ends_with(".yml") {
        DocumentFormat::Yaml
    } else if path.ends_with(".json") {
        DocumentFormat::Json
    } else if body.trim_start().starts_with('{') {
        DocumentFormat::Json
    } else {
        DocumentFormat::Yaml
    }
}

pub fn parse_document(text: &str, format: DocumentFormat) -> Result<OpenApiDocument, VishnoraError> {
    let value = match format {
        DocumentFormat::Json => serde_json::from_str::<Value>(text)
            .map_err(|e| VishnoraError::Parse(format!("Malformed OpenAPI JSON: {}", e)))?,
        DocumentFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(text)
                .map_err(|e| VishnoraError::Parse(format!("Malformed OpenAPI YAML: {}", e)))?;
            yaml_to_json(yaml)
        }
    };
    Ok(OpenApiDocument::new(value))
}

/// YAML allows non-string mapping keys (`200:` under `responses`); JSON does not.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_by_extension() {
        assert_eq!(detect_format("https://x/openapi.yaml", "{}"), DocumentFormat::Yaml);
        assert_eq!(detect_format("https://x/openapi.YML?v=2", "{}"), DocumentFormat::Yaml);
        assert_eq!(detect_format("https://x/openapi.json", "openapi: 3.0.0"), DocumentFormat::Json);
    }

    #[test]
    fn test_detect_format_sniffs_when_ambiguous() {
        assert_eq!(detect_format("https://x/spec", "  {\"paths\":{}}"), DocumentFormat::Json);
        assert_eq!(detect_format("https://x/spec", "openapi: 3.0.0\npaths: {}"), DocumentFormat::Yaml);
    }

    #[test]
    fn test_parse_yaml_with_numeric_keys() {
        let text = "openapi: 3.0.0\npaths:\n  /v1/users/{id}:\n    get:\n      responses:\n        200:\n          description: ok\n";
        let doc = parse_document(text, DocumentFormat::Yaml).unwrap();
        let get = &doc.as_value()["paths"]["/v1/users/{id}"]["get"];
        assert_eq!(get["responses"]["200"]["description"], "ok");
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_document("{\"paths\": ", DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, VishnoraError::Parse(_)));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = parse_document("paths: [unclosed", DocumentFormat::Yaml).unwrap_err();
        assert!(matches!(err, VishnoraError::Parse(_)));
    }
}
