use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "worker": {
                "type": "object",
                "properties": {
                    "concurrency": { "type": "integer", "minimum": 1 }
                }
            },
            "spec": {
                "type": "object",
                "properties": {
                    "fetch_timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "probe": {
                "type": "object",
                "properties": {
                    "canary_ids": {
                        "type": "array",
                        "items": { "type": "string", "minLength": 1 },
                        "minItems": 2,
                        "maxItems": 2
                    },
                    "rest_min_body_bytes": { "type": "integer", "minimum": 0 },
                    "graphql_min_body_bytes": { "type": "integer", "minimum": 0 },
                    "request_timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "database": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                }
            },
            "server": {
                "type": "object",
                "properties": {
                    "host": { "type": "string" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535 }
                }
            }
        }
    })
});
