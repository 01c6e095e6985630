/**
 * Page Routes
 * Resolved public pages: stored blocks merged with the seeded defaults
 */
use axum::extract::State;

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::{Json, Path};
use crate::pages::{self, ResolvedPage};
use crate::state::AppState;

/// GET /api/pages/:page
pub async fn get_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> ApiResult<Json<ApiResponse<ResolvedPage>>> {
    pages::load_page(&state.store, &page)
        .await
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::NotFound(format!("Page '{}' not found", page)))
}
