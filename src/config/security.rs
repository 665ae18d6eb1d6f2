use std::collections::BTreeMap;
use crate::errors::VishnoraError;

const DANGEROUS_PATTERNS: &[&str] = &[
    "../",
    "..\\",
    "<script",
    "javascript:",
    "vbscript:",
    "file:",
];

/// Walk every string in a YAML document and reject known-dangerous content.
pub fn validate_security_patterns(value: &serde_yaml::Value) -> Result<(), VishnoraError> {
    let mut path = Vec::new();
    walk(value, &mut path)
}

fn walk(value: &serde_yaml::Value, path: &mut Vec<String>) -> Result<(), VishnoraError> {
    match value {
        serde_yaml::Value::String(s) => check_string(s, path),
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                path.push(k.as_str().unwrap_or("?").to_string());
                walk(v, path)?;
                path.pop();
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                path.push(format!("[{}]", i));
                walk(v, path)?;
                path.pop();
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_string(s: &str, path: &[String]) -> Result<(), VishnoraError> {
    let lower = s.to_lowercase();
    let hit = DANGEROUS_PATTERNS.iter().find(|p| lower.contains(*p));
    if let Some(pattern) = hit {
        let location = if path.is_empty() { "root".to_string() } else { path.join(".") };
        return Err(VishnoraError::Config(format!(
            "Dangerous pattern '{}' found at config path: {}",
            pattern, location
        )));
    }
    Ok(())
}

/// Probe headers end up both on the wire and inside the replay command,
/// so line breaks and NULs are refused outright.
pub fn validate_probe_headers(headers: &BTreeMap<String, String>) -> Result<(), VishnoraError> {
    for (name, value) in headers {
        if name.is_empty() || !name.bytes().all(is_token_byte) {
            return Err(VishnoraError::Config(format!("Invalid header name: {:?}", name)));
        }
        if value.contains(['\r', '\n', '\0']) {
            return Err(VishnoraError::Config(format!(
                "Header '{}' contains a line break or NUL",
                name
            )));
        }
    }
    Ok(())
}

// RFC 9110 token characters.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
