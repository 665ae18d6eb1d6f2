use std::collections::HashSet;
use std::path::Path;
use crate::errors::VishnoraError;
use super::types::VishnoraConfig;
use super::security::validate_security_patterns;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<VishnoraConfig, VishnoraError> {
    if !path.exists() {
        return Err(VishnoraError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(VishnoraError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<VishnoraConfig, VishnoraError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(VishnoraConfig::default());
    }

    validate_security_patterns(&yaml)?;

    validate_schema(&yaml)?;

    let config: VishnoraConfig = serde_yaml::from_value(yaml)?;

    validate_semantics(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), VishnoraError> {
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| VishnoraError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| VishnoraError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| VishnoraError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Advisory only; the typed parse and semantic checks are authoritative.
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Reject values that parse but would make the probe meaningless or unsafe.
fn validate_semantics(config: &VishnoraConfig) -> Result<(), VishnoraError> {
    if let Some(worker) = &config.worker {
        if worker.concurrency == Some(0) {
            return Err(VishnoraError::Config("worker.concurrency must be at least 1".into()));
        }
    }

    if let Some(spec) = &config.spec {
        if spec.fetch_timeout_secs == Some(0) {
            return Err(VishnoraError::Config("spec.fetch_timeout_secs must be at least 1".into()));
        }
    }

    if let Some(probe) = &config.probe {
        if probe.request_timeout_secs == Some(0) {
            return Err(VishnoraError::Config("probe.request_timeout_secs must be at least 1".into()));
        }
        if let Some(ids) = &probe.canary_ids {
            if ids.len() != 2 {
                return Err(VishnoraError::Config(format!(
                    "probe.canary_ids must list exactly two ids, got {}",
                    ids.len()
                )));
            }
            let distinct: HashSet<&String> = ids.iter().collect();
            if distinct.len() != 2 {
                return Err(VishnoraError::Config("probe.canary_ids must be distinct".into()));
            }
            for id in ids {
                if id.is_empty() || id.contains(['/', '?', '#', '{', '}']) || id.chars().any(char::is_whitespace) {
                    return Err(VishnoraError::Config(format!(
                        "probe.canary_ids entry '{}' is not a plain path segment",
                        id
                    )));
                }
            }
        }
    }

    Ok(())
}
