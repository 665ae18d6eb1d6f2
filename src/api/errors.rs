use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use crate::errors::VishnoraError;

impl IntoResponse for VishnoraError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            VishnoraError::NotFound(_) => StatusCode::NOT_FOUND,
            VishnoraError::IllegalTransition { .. } => StatusCode::CONFLICT,
            VishnoraError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::campaign::CampaignStatus;

    #[test]
    fn test_status_mapping() {
        assert_eq!(VishnoraError::NotFound("x".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(VishnoraError::Config("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            VishnoraError::IllegalTransition {
                campaign_id: "x".into(),
                from: CampaignStatus::Completed,
                to: CampaignStatus::Canceled,
            }
            .into_response()
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            VishnoraError::Persistence("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
