use axum::{extract::State, Extension, Json};
use replyradar_core::DiscoveryType;
use replyradar_engine::DiscoveryError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct TriggerBody {
    pub account_id: Uuid,
    pub discovery_type: String,
}

#[derive(Debug, Serialize)]
pub(super) struct TriggerData {
    pub created: usize,
}

/// Manual discovery trigger, for dashboard-driven refresh. Runs the
/// discovery synchronously and reports how many opportunities it created.
pub(super) async fn trigger_discovery(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<TriggerBody>,
) -> Result<Json<ApiResponse<TriggerData>>, ApiError> {
    let discovery_type = body.discovery_type.parse::<DiscoveryType>().map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("unknown discovery type '{}'", body.discovery_type),
        )
    })?;

    let account = replyradar_db::get_account_by_public_id(&state.pool, body.account_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let created = state
        .scheduler
        .trigger_now(account.id, discovery_type)
        .await
        .map_err(|e| match e {
            DiscoveryError::Platform(platform_err) => {
                tracing::warn!(
                    account_id = account.id,
                    error = %platform_err,
                    "manual discovery trigger failed upstream"
                );
                ApiError::new(req_id.0.clone(), "upstream_error", platform_err.to_string())
            }
            DiscoveryError::Db(db_err) => map_db_error(req_id.0.clone(), &db_err),
        })?;

    Ok(Json(ApiResponse {
        data: TriggerData {
            created: created.len(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
