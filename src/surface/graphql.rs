use serde::{Deserialize, Serialize};
use crate::models::target::GraphQlTargets;

pub const INTROSPECTION_QUERY: &str = r#"
{
  __schema {
    queryType { name }
    mutationType { name }
    types {
      name
      kind
      fields { name }
    }
  }
}
"#;

/// Response body of the introspection query. Every level is optional so a
/// partial or error-shaped response still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntrospectionResult {
    #[serde(default)]
    pub data: Option<IntrospectionData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntrospectionData {
    #[serde(rename = "__schema", default)]
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default)]
    pub query_type: Option<NamedType>,
    #[serde(default)]
    pub mutation_type: Option<NamedType>,
    #[serde(default)]
    pub types: Vec<SchemaType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedType {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaType {
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<SchemaField>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
}

impl IntrospectionResult {
    fn types(&self) -> &[SchemaType] {
        self.data
            .as_ref()
            .and_then(|d| d.schema.as_ref())
            .map(|s| s.types.as_slice())
            .unwrap_or(&[])
    }
}

/// Field names of the types literally named `Query` and `Mutation`.
pub fn build_graphql_targets(introspection: &IntrospectionResult) -> GraphQlTargets {
    GraphQlTargets {
        queries: field_names(introspection.types(), "Query"),
        mutations: field_names(introspection.types(), "Mutation"),
    }
}

fn field_names(types: &[SchemaType], type_name: &str) -> Vec<String> {
    types
        .iter()
        .find(|t| t.name.as_deref() == Some(type_name))
        .and_then(|t| t.fields.as_ref())
        .map(|fields| fields.iter().map(|f| f.name.clone()).collect())
        .unwrap_or_default()
}

/// Minimal selection touching only `__typename` of a root query field.
pub fn typename_probe_query(field: &str) -> String {
    format!("{{ {} {{ __typename }} }}", field)
}
