use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use crate::api::AppState;
use crate::errors::VishnoraError;

pub async fn list_findings(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, VishnoraError> {
    if state.db.get_campaign(&id)?.is_none() {
        return Err(VishnoraError::NotFound(id));
    }
    let findings = state.db.get_findings(&id)?;
    Ok(Json(json!({ "findings": findings, "total": findings.len() })))
}
