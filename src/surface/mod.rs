//! Target surface: fetching OpenAPI / GraphQL documents and deriving probe targets.

pub mod loader;
pub mod openapi;
pub mod graphql;

pub use loader::{SpecLoader, DocumentFormat};
pub use openapi::{build_get_targets, OpenApiDocument};
pub use graphql::{build_graphql_targets, IntrospectionResult};
