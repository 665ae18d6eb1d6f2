use std::sync::LazyLock;
use regex::Regex;
use serde_json::{Map, Value};
use crate::models::target::Target;

/// Paths that look destructive or touch authentication. Applied whatever the
/// campaign's `safe` flag says.
static DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(delete|admin|token|auth|login|logout)").expect("valid denylist regex")
});

/// A brace-delimited template segment whose name contains `id`.
static ID_PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{[^}]*id[^}]*\}").expect("valid id parameter regex")
});

/// Normalized OpenAPI document. Only `paths` is consulted.
#[derive(Debug, Clone)]
pub struct OpenApiDocument(Value);

impl OpenApiDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.0.get("paths").and_then(Value::as_object)
    }

    pub fn path_count(&self) -> usize {
        self.paths().map_or(0, Map::len)
    }
}

pub fn is_denylisted(path: &str) -> bool {
    DENYLIST.is_match(path)
}

pub fn has_id_parameter(path: &str) -> bool {
    ID_PARAMETER.is_match(path)
}

/// Replace the first id-like template segment with `id`.
pub fn substitute_first_id(url_template: &str, id: &str) -> String {
    ID_PARAMETER.replacen(url_template, 1, regex::NoExpand(id)).into_owned()
}

/// Every non-denylisted path exposing `get`, in document order.
pub fn build_get_targets(doc: &OpenApiDocument, base_url: &str) -> Vec<Target> {
    let Some(paths) = doc.paths() else {
        return Vec::new();
    };
    let base = base_url.trim_end_matches('/');

    paths
        .iter()
        .filter(|(_, ops)| ops.get("get").is_some_and(|op| !op.is_null()))
        .filter(|(path, _)| !is_denylisted(path))
        .map(|(path, _)| Target {
            method: "GET".to_string(),
            url_template: format!("{}{}", base, path),
            path: path.clone(),
            has_id_parameter: has_id_parameter(path),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(paths: Value) -> OpenApiDocument {
        OpenApiDocument::new(json!({ "openapi": "3.0.0", "paths": paths }))
    }

    #[test]
    fn test_users_by_id_target() {
        let d = doc(json!({ "/v1/users/{id}": { "get": {} } }));
        let targets = build_get_targets(&d, "https://api.example.com");
        assert_eq!(targets, vec![Target {
            method: "GET".into(),
            url_template: "https://api.example.com/v1/users/{id}".into(),
            path: "/v1/users/{id}".into(),
            has_id_parameter: true,
        }]);
    }

    #[test]
    fn test_denylisted_paths_excluded() {
        let d = doc(json!({
            "/v1/admin/users/{id}": { "get": {} },
            "/v1/Token/refresh": { "get": {} },
            "/oauth/authorize": { "get": {} },
            "/login": { "get": {} },
            "/v1/logout": { "get": {} },
            "/v1/items/{id}/DELETE": { "get": {} },
            "/v1/orders/{orderId}": { "get": {} },
        }));
        let targets = build_get_targets(&d, "https://x");
        let paths: Vec<_> = targets.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(paths, vec!["/v1/orders/{orderId}"]);
    }

    #[test]
    fn test_non_get_paths_skipped() {
        let d = doc(json!({
            "/v1/users": { "post": {} },
            "/v1/carts/{cartId}": { "get": {}, "put": {} },
            "/v1/null": { "get": null },
        }));
        let targets = build_get_targets(&d, "https://x");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, "/v1/carts/{cartId}");
    }

    #[test]
    fn test_id_parameter_detection() {
        assert!(has_id_parameter("/v1/users/{userId}"));
        assert!(has_id_parameter("/v1/users/{ID}"));
        assert!(has_id_parameter("/v1/docs/{docIdentifier}"));
        assert!(!has_id_parameter("/v1/users/{name}"));
        assert!(!has_id_parameter("/v1/id/list"));
    }

    #[test]
    fn test_document_order_preserved() {
        let d = doc(json!({
            "/z/{id}": { "get": {} },
            "/a/{id}": { "get": {} },
            "/m": { "get": {} },
        }));
        let targets = build_get_targets(&d, "https://x/");
        let paths: Vec<_> = targets.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(paths, vec!["/z/{id}", "/a/{id}", "/m"]);
        assert!(!targets[2].has_id_parameter);
        assert_eq!(targets[0].url_template, "https://x/z/{id}");
    }

    #[test]
    fn test_trailing_slashes_stripped_from_base() {
        let d = doc(json!({ "/v1/orders/{id}": { "get": {} } }));
        let targets = build_get_targets(&d, "https://x///");
        assert_eq!(targets[0].url_template, "https://x/v1/orders/{id}");
    }

    #[test]
    fn test_missing_paths_yields_nothing() {
        let d = OpenApiDocument::new(json!({ "openapi": "3.0.0" }));
        assert!(build_get_targets(&d, "https://x").is_empty());
    }

    #[test]
    fn test_substitute_first_id_only() {
        let url = "https://x/v1/orgs/{orgId}/users/{userId}";
        assert_eq!(substitute_first_id(url, "123"), "https://x/v1/orgs/123/users/{userId}");
        assert_eq!(substitute_first_id("https://x/v1/a/{name}", "1"), "https://x/v1/a/{name}");
    }

    #[test]
    fn test_substitute_does_not_expand_dollar() {
        assert_eq!(substitute_first_id("https://x/{id}", "$1"), "https://x/$1");
    }
}
