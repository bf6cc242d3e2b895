use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use replyradar_core::OpportunityStatus;
use replyradar_db::{OpportunityFilter, OpportunityRow, OpportunitySort, StatusFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct OpportunityItem {
    pub id: Uuid,
    pub post_id: String,
    pub content: String,
    pub posted_at: DateTime<Utc>,
    pub like_count: i32,
    pub repost_count: i32,
    pub reply_count: i32,
    pub recency_score: f32,
    pub impact_score: f32,
    pub total_score: i32,
    pub discovery_type: String,
    pub status: String,
    pub discovered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OpportunityRow> for OpportunityItem {
    fn from(row: OpportunityRow) -> Self {
        Self {
            id: row.public_id,
            post_id: row.post_id,
            content: row.content,
            posted_at: row.posted_at,
            like_count: row.like_count,
            repost_count: row.repost_count,
            reply_count: row.reply_count,
            recency_score: row.recency_score,
            impact_score: row.impact_score,
            total_score: row.total_score,
            discovery_type: row.discovery_type,
            status: row.status,
            discovered_at: row.discovered_at,
            expires_at: row.expires_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct AuthorItem {
    pub platform_user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub follower_count: i32,
}

#[derive(Debug, Serialize)]
pub(super) struct OpportunityDetail {
    #[serde(flatten)]
    pub opportunity: OpportunityItem,
    pub author: AuthorItem,
}

#[derive(Debug, Serialize)]
pub(super) struct OpportunityList {
    pub items: Vec<OpportunityItem>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub account_id: Option<Uuid>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub(super) async fn list_opportunities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<OpportunityList>>, ApiError> {
    let status = match query.status.as_deref() {
        None => StatusFilter::Only(OpportunityStatus::Pending),
        Some("all") => StatusFilter::All,
        Some(raw) => match raw.parse::<OpportunityStatus>() {
            Ok(s) => StatusFilter::Only(s),
            Err(_) => {
                return Err(ApiError::new(
                    req_id.0,
                    "validation_error",
                    format!("unknown status filter '{raw}'"),
                ));
            }
        },
    };

    let sort = match query.sort.as_deref() {
        None | Some("score") => OpportunitySort::Score,
        Some("discovered_at") => OpportunitySort::DiscoveredAt,
        Some(raw) => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                format!("unknown sort '{raw}'; expected 'score' or 'discovered_at'"),
            ));
        }
    };

    let account_id = match query.account_id {
        Some(public_id) => Some(
            replyradar_db::get_account_by_public_id(&state.pool, public_id)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?
                .id,
        ),
        None => None,
    };

    let filter = OpportunityFilter {
        account_id,
        status,
        sort,
        limit: normalize_limit(query.limit),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let rows = replyradar_db::list_opportunities(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let total = replyradar_db::count_opportunities(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OpportunityList {
            items: rows.into_iter().map(OpportunityItem::from).collect(),
            total,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_opportunity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OpportunityDetail>>, ApiError> {
    let found = replyradar_db::get_opportunity_with_author(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OpportunityDetail {
            opportunity: found.opportunity.into(),
            author: AuthorItem {
                platform_user_id: found.author.platform_user_id,
                username: found.author.username,
                display_name: found.author.display_name,
                bio: found.author.bio,
                follower_count: found.author.follower_count,
            },
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateStatusBody {
    pub status: String,
}

pub(super) async fn update_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<ApiResponse<OpportunityItem>>, ApiError> {
    let new_status = body.status.parse::<OpportunityStatus>().map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("unknown status '{}'", body.status),
        )
    })?;

    if !new_status.is_terminal() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "status can only move out of 'pending', not back into it",
        ));
    }

    let row = replyradar_db::update_status(&state.pool, public_id, new_status)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkDismissBody {
    pub account_id: Uuid,
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub(super) struct BulkDismissData {
    pub dismissed: u64,
    pub skipped: Vec<Uuid>,
}

pub(super) async fn bulk_dismiss(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BulkDismissBody>,
) -> Result<Json<ApiResponse<BulkDismissData>>, ApiError> {
    let account = replyradar_db::get_account_by_public_id(&state.pool, body.account_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let outcome = replyradar_db::bulk_dismiss(&state.pool, account.id, &body.ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BulkDismissData {
            dismissed: outcome.dismissed,
            skipped: outcome.skipped,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
