//! Blog generation endpoint

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use validator::Validate;

use crate::api::middleware::PresentedKey;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::content::BlogRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogResponse {
    pub status: String,
    pub blog_post: String,
}

/// POST /generate-blog
///
/// The body is parsed and validated before the key is authorized, so a
/// rejected request does not count against a trial quota.
pub async fn generate_blog(
    State(state): State<AppState>,
    presented: PresentedKey,
    Json(request): Json<BlogRequest>,
) -> Result<Json<BlogResponse>, ApiError> {
    request.validate()?;

    let tier = state
        .api_key_service
        .authorize(presented.as_str())
        .await?;

    info!(
        tier = %tier,
        word_count = request.word_count,
        provider = state.content_generator.provider_name(),
        "Generating blog post"
    );

    let post = state
        .content_generator
        .generate_blog(&request)
        .await
        .inspect_err(|e| error!(error = %e, "Blog generation failed"))?;

    Ok(Json(BlogResponse {
        status: "success".to_string(),
        blog_post: post.content,
    }))
}
