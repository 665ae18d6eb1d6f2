use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use crate::api::models::{CancelResponse, CreateCampaignRequest, CreateCampaignResponse, ListQuery};
use crate::api::AppState;
use crate::config::security::validate_probe_headers;
use crate::errors::VishnoraError;
use crate::models::campaign::{CampaignConfig, CampaignStatus};

pub async fn create_campaign(
    State(state): State<AppState>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CreateCampaignResponse>), VishnoraError> {
    validate_probe_headers(&req.headers)?;

    let campaign_id = uuid::Uuid::new_v4().to_string();
    let campaign = req.into_campaign(campaign_id.clone());
    state.db.create_campaign(&campaign)?;
    state.queue.enqueue(&campaign_id).await;

    info!(campaign_id = %campaign_id, module = %campaign.module.as_str(), "Campaign queued");
    Ok((
        StatusCode::CREATED,
        Json(CreateCampaignResponse { ok: true, campaign_id }),
    ))
}

pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, VishnoraError> {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);
    let campaigns = state.db.list_campaigns(limit, offset)?;
    Ok(Json(json!({ "campaigns": campaigns, "total": campaigns.len() })))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, VishnoraError> {
    let campaign = state.db
        .get_campaign(&id)?
        .ok_or_else(|| VishnoraError::NotFound(id.clone()))?;
    let finding_count = state.db.count_findings(&id)?;
    let config = CampaignConfig::from_blob(&id, &campaign.config);

    let mut body = serde_json::to_value(&campaign)?;
    body["configParsed"] = serde_json::to_value(&config)?;
    body["findingCount"] = json!(finding_count);
    body["active"] = json!(state.active.contains(&id));
    Ok(Json(body))
}

/// Queued campaigns are dropped from the queue and marked canceled at once.
/// Running ones get their token tripped; the runner writes the final status.
pub async fn cancel_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CancelResponse>), VishnoraError> {
    let campaign = state.db
        .get_campaign(&id)?
        .ok_or_else(|| VishnoraError::NotFound(id.clone()))?;

    if campaign.status.is_terminal() {
        return Err(VishnoraError::IllegalTransition {
            campaign_id: id,
            from: campaign.status,
            to: CampaignStatus::Canceled,
        });
    }

    if state.active.cancel(&id) {
        info!(campaign_id = %id, "Cancel signalled to running campaign");
        return Ok(accepted(id));
    }

    let removed = state.queue.remove(&id).await;
    match state.db.set_campaign_status(&id, CampaignStatus::Canceled) {
        Ok(()) => {
            info!(campaign_id = %id, removed_from_queue = removed, from = %campaign.status, "Campaign canceled");
            Ok((
                StatusCode::OK,
                Json(CancelResponse { ok: true, campaign_id: id, status: CampaignStatus::Canceled }),
            ))
        }
        // A worker picked it up in between; signal it instead.
        Err(VishnoraError::IllegalTransition { from: CampaignStatus::Running, .. }) => {
            state.active.cancel(&id);
            Ok(accepted(id))
        }
        Err(e) => Err(e),
    }
}

fn accepted(campaign_id: String) -> (StatusCode, Json<CancelResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(CancelResponse { ok: true, campaign_id, status: CampaignStatus::Running }),
    )
}
