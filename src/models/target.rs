use serde::{Deserialize, Serialize};

/// A REST probe target derived from an OpenAPI path. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Always `GET` under the current probing policy.
    pub method: String,
    pub url_template: String,
    /// Path as written in the spec, e.g. `/v1/users/{id}`.
    pub path: String,
    pub has_id_parameter: bool,
}

/// Field names discovered on the `Query` and `Mutation` root types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlTargets {
    pub queries: Vec<String>,
    pub mutations: Vec<String>,
}
