//! Key issuance endpoint

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::PresentedKey;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

#[derive(Debug, Clone, Deserialize)]
pub struct IssueKeyQuery {
    /// Missing values are rejected as an invalid tier, after the caller check
    #[serde(default)]
    pub user_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedKeyResponse {
    pub api_key: String,
    pub user_type: String,
}

/// POST /generate-api-key?user_type=trial|paid
///
/// Admin only. The tier is checked after the caller.
pub async fn generate_api_key(
    State(state): State<AppState>,
    presented: PresentedKey,
    Query(query): Query<IssueKeyQuery>,
) -> Result<Json<IssuedKeyResponse>, ApiError> {
    let record = state
        .api_key_service
        .issue_key(&query.user_type, presented.as_str())
        .await?;

    info!(tier = %record.tier(), "Issued API key over HTTP");

    Ok(Json(IssuedKeyResponse {
        api_key: record.key().to_string(),
        user_type: record.tier().to_string(),
    }))
}
