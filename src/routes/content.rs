/**
 * Content Routes
 * Content block listing and the admin block editor
 */
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::blocks::{self, editor, BlockKind, BlockType};
use crate::db::models::{ContentBlock, ContentBlockUpdate};
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::routes::auth::AdminSession;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub page: Option<String>,
    pub section: Option<String>,
}

/// Body of PUT /api/content/:id
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBlockRequest {
    pub content: Option<Value>,
    /// Raw JSON text from the editor; replaces content wholesale
    pub raw: Option<String>,
    pub sort_order: Option<i32>,
    pub block_type: Option<BlockType>,
}

#[derive(Debug, Deserialize)]
pub struct FieldEditRequest {
    pub field: String,
    pub value: Value,
}

/// Blocks grouped by section, each list in display order
pub type SectionedBlocks = BTreeMap<String, Vec<ContentBlock>>;

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/content?page=P[&section=S]
pub async fn list_blocks(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> ApiResult<Json<ApiResponse<SectionedBlocks>>> {
    let page = query
        .page
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("page query parameter is required".to_string()))?;
    let section = query.section.as_deref().filter(|s| !s.is_empty());

    let blocks = state.store.content.list(page, section).await?;
    let total = blocks.len();
    let mut grouped = SectionedBlocks::new();
    for block in blocks {
        grouped.entry(block.section.clone()).or_default().push(block);
    }
    for list in grouped.values_mut() {
        list.sort_by(|a, b| a.position(b));
    }

    Ok(ApiResponse::page(grouped, total))
}

/// GET /api/content/:id
pub async fn get_block(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<ContentBlock>>> {
    Ok(ApiResponse::ok(state.store.content.get(id).await?))
}

/// PUT /api/content/:id
/// Replace content and/or sort order. Content must decode as the block type.
pub async fn update_block(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBlockRequest>,
) -> ApiResult<Json<ApiResponse<ContentBlock>>> {
    let current = state.store.content.get(id).await?;

    let content = match (payload.content, payload.raw) {
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "Send either content or raw, not both".to_string(),
            ))
        }
        (Some(content), None) => Some(content),
        (None, Some(raw)) => Some(editor::parse_raw(&raw).map_err(|e| ApiError::validation(e.to_string()))?),
        (None, None) => None,
    };

    let block_type = payload.block_type.unwrap_or(current.block_type);
    let effective = content.as_ref().unwrap_or(&current.content);
    blocks::validate(block_type, effective).map_err(|e| ApiError::validation(e.to_string()))?;

    let updated = state
        .store
        .content
        .update(
            id,
            ContentBlockUpdate {
                content,
                sort_order: payload.sort_order,
                block_type: payload.block_type,
            },
        )
        .await?;

    tracing::info!(
        block_id = id,
        page = %updated.page,
        section = %updated.section,
        editor = %session.email,
        "Content block updated"
    );
    Ok(ApiResponse::ok(updated))
}

/// PATCH /api/content/:id/field
/// Set one `field` or `parent.field` of a block's content
pub async fn update_block_field(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<i64>,
    Json(payload): Json<FieldEditRequest>,
) -> ApiResult<Json<ApiResponse<ContentBlock>>> {
    let current = state.store.content.get(id).await?;
    let content = editor::set_field(
        current.block_type,
        &current.content,
        &payload.field,
        payload.value,
    )
    .map_err(|e| ApiError::validation(e.to_string()))?;
    blocks::validate(current.block_type, &content)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let updated = state
        .store
        .content
        .update(
            id,
            ContentBlockUpdate {
                content: Some(content),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(block_id = id, field = %payload.field, editor = %session.email, "Content field updated");
    Ok(ApiResponse::ok(updated))
}

/// GET /api/admin/content/:id/form
pub async fn block_form(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<editor::BlockForm>>> {
    let block = state.store.content.get(id).await?;
    Ok(ApiResponse::ok(editor::form(&block)))
}

/// GET /api/admin/block-types
pub async fn block_types(_session: AdminSession) -> Json<ApiResponse<&'static [BlockKind]>> {
    ApiResponse::ok(blocks::registry())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::models::NewContentBlock;
    use crate::routes::auth::{create_session_token, SESSION_COOKIE};
    use crate::store::Store;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::{get, patch};
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    async fn setup() -> (Router, String, i64) {
        let state = AppState::new(Store::memory(), AppConfig::for_tests("uploads".into()));
        let block = state
            .store
            .content
            .upsert(NewContentBlock {
                page: "home".to_string(),
                section: "hero".to_string(),
                block_type: BlockType::CtaButtons,
                block_key: "cta".to_string(),
                content: json!({ "primary": { "text": "Book", "url": "/booking" } }),
                sort_order: 1,
            })
            .await
            .unwrap();
        let session = AdminSession {
            id: 0,
            email: "owner@eshrm.africa".to_string(),
            name: "Owner".to_string(),
            role: crate::db::models::AdminRole::SuperAdmin,
        };
        let (token, _) = create_session_token(&session, &state.config.jwt_secret, 1).unwrap();
        let app = Router::new()
            .route("/api/content", get(list_blocks))
            .route("/api/content/{id}", get(get_block).put(update_block))
            .route("/api/content/{id}/field", patch(update_block_field))
            .route("/api/admin/content/{id}/form", get(block_form))
            .with_state(state);
        (app, format!("{}={}", SESSION_COOKIE, token), block.id)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn json_request(method: &str, uri: &str, cookie: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_requires_page() {
        let (app, _, _) = setup().await;
        let (status, body) = send(app, Request::get("/api/content").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_update_requires_session() {
        let (app, _, id) = setup().await;
        let req = json_request("PUT", &format!("/api/content/{id}"), "", json!({ "content": {} }));
        let (status, _) = send(app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_rejects_malformed_content() {
        let (app, cookie, id) = setup().await;
        let req = json_request(
            "PUT",
            &format!("/api/content/{id}"),
            &cookie,
            json!({ "content": { "primary": "not an object" } }),
        );
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_raw_json_is_rejected() {
        let (app, cookie, id) = setup().await;
        let req = json_request("PUT", &format!("/api/content/{id}"), &cookie, json!({ "raw": "{ broken" }));
        let (status, _) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_field_edit_merges_nested_value() {
        let (app, cookie, id) = setup().await;
        let req = json_request(
            "PATCH",
            &format!("/api/content/{id}/field"),
            &cookie,
            json!({ "field": "primary.text", "value": "Book now" }),
        );
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"]["primary"], json!({ "text": "Book now", "url": "/booking" }));
    }

    #[tokio::test]
    async fn test_form_lists_registry_fields() {
        let (app, cookie, id) = setup().await;
        let req = Request::get(format!("/api/admin/content/{id}/form"))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["fields"][0]["name"], "primary");
        assert_eq!(body["data"]["fields"][0]["value"]["text"], "Book");
    }

    #[tokio::test]
    async fn test_unknown_block_is_not_found() {
        let (app, _, _) = setup().await;
        let (status, _) = send(app, Request::get("/api/content/999").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
