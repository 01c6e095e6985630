/**
 * Resource Routes
 * Generic list / read / create / update / delete handlers shared by the
 * admin-managed collections
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::routes::auth::AdminSession;
use crate::state::AppState;
use crate::store::{Entity, ListFilter, Repository, Store};

// ============================================================================
// Resource contract
// ============================================================================

pub trait Resource: Entity<Draft: DeserializeOwned, Patch: DeserializeOwned> + Serialize {
    /// Listing and reading published rows needs no session
    const PUBLIC_READ: bool = false;

    /// Creating needs no session (public forms)
    const PUBLIC_CREATE: bool = false;

    fn repo(store: &Store) -> &Arc<dyn Repository<Self>>;

    /// Normalize and check a new row before it is stored.
    fn validate_draft(draft: &mut Self::Draft) -> ApiResult<()>;

    /// Normalize and check an update against the current row.
    fn validate_patch(&self, patch: &mut Self::Patch) -> ApiResult<()>;

    /// Whether anonymous visitors may see this row
    fn is_public(&self) -> bool {
        true
    }

    /// Runs after a successful create
    fn on_created(&self, _state: &AppState) {}
}

// ============================================================================
// Validation
// ============================================================================

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Sanitize HTML content using ammonia
pub fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

pub fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn require_email(value: &str) -> ApiResult<()> {
    require_text("email", value)?;
    if !value.contains('@') {
        return Err(ApiError::validation("Invalid email format"));
    }
    Ok(())
}

pub fn require_slug(value: &str) -> ApiResult<()> {
    if !is_valid_slug(value) {
        return Err(ApiError::validation(
            "Slug must contain only lowercase letters, numbers, and hyphens",
        ));
    }
    Ok(())
}

/// Trim a string in place
pub fn trim(value: &mut String) {
    *value = value.trim().to_string();
}

/// Trim an optional string, turning blanks into `None`
pub fn trim_opt(value: &mut Option<String>) {
    *value = value
        .take()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("Authentication required".to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/<collection>
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    session: Option<AdminSession>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Json<ApiResponse<Vec<R>>>> {
    if session.is_none() && (!R::PUBLIC_READ || filter.all) {
        return Err(unauthorized());
    }
    let rows = R::repo(&state.store).filtered(&filter).await?;
    let (items, total) = filter.paginate(rows);
    Ok(ApiResponse::page(items, total))
}

/// GET /api/<collection>/:id_or_slug
pub async fn fetch<R: Resource>(
    State(state): State<AppState>,
    session: Option<AdminSession>,
    Path(key): Path<String>,
) -> ApiResult<Json<ApiResponse<R>>> {
    if session.is_none() && !R::PUBLIC_READ {
        return Err(unauthorized());
    }
    let repo = R::repo(&state.store);
    let row = match key.parse::<i64>() {
        Ok(id) => repo.get(id).await?,
        Err(_) => repo.find_by_slug(&key).await?,
    };
    if session.is_none() && !row.is_public() {
        return Err(ApiError::NotFound(format!("{} {} not found", R::KIND, key)));
    }
    Ok(ApiResponse::ok(row))
}

/// POST /api/<collection>
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    session: Option<AdminSession>,
    Json(mut draft): Json<R::Draft>,
) -> ApiResult<impl IntoResponse> {
    if session.is_none() && !R::PUBLIC_CREATE {
        return Err(unauthorized());
    }
    R::validate_draft(&mut draft)?;
    let row = R::repo(&state.store).create(draft).await?;
    tracing::info!(kind = R::KIND, id = row.id(), "Created");
    row.on_created(&state);
    Ok((StatusCode::CREATED, ApiResponse::ok(row)))
}

/// PUT /api/<collection>/:id
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<i64>,
    Json(mut patch): Json<R::Patch>,
) -> ApiResult<Json<ApiResponse<R>>> {
    let repo = R::repo(&state.store);
    let current = repo.get(id).await?;
    current.validate_patch(&mut patch)?;
    let row = repo.update(id, patch).await?;
    tracing::info!(kind = R::KIND, id, "Updated");
    Ok(ApiResponse::ok(row))
}

/// DELETE /api/<collection>/:id
pub async fn remove<R: Resource>(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    R::repo(&state.store).delete(id).await?;
    tracing::info!(kind = R::KIND, id, "Deleted");
    Ok(ApiResponse::ok(serde_json::json!({ "id": id, "deleted": true })))
}

/// Mount the five handlers for `R` under `base`
pub fn routes<R: Resource>(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(list::<R>).post(create::<R>))
        .route(
            &format!("{}/{{key}}", base),
            get(fetch::<R>).put(update::<R>).delete(remove::<R>),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("payroll-compliance"));
        assert!(is_valid_slug("hr2026"));
        assert!(!is_valid_slug("Payroll"));
        assert!(!is_valid_slug("double--dash"));
        assert!(!is_valid_slug("-leading"));
    }

    #[test]
    fn test_sanitize_html_strips_scripts() {
        let clean = sanitize_html("<p>Hi</p><script>alert(1)</script>");
        assert_eq!(clean, "<p>Hi</p>");
    }

    #[test]
    fn test_trim_opt_drops_blank() {
        let mut value = Some("   ".to_string());
        trim_opt(&mut value);
        assert!(value.is_none());
        let mut value = Some("  Acme ".to_string());
        trim_opt(&mut value);
        assert_eq!(value.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_require_email() {
        assert!(require_email("jane@example.com").is_ok());
        assert!(require_email("jane.example.com").is_err());
        assert!(require_email("  ").is_err());
    }
}
