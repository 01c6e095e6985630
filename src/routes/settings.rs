/**
 * Settings Routes
 * Site-wide key/value settings
 */
use axum::extract::State;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::db::models::SiteSetting;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::{Json, Path};
use crate::routes::auth::AdminSession;
use crate::state::AppState;

pub type SettingsMap = BTreeMap<String, Value>;

const MAX_KEY_LENGTH: usize = 100;

fn check_key(key: &str) -> ApiResult<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(format!("invalid setting key '{}'", key)))
    }
}

/// GET /api/settings
pub async fn list_settings(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<SettingsMap>>> {
    let map: SettingsMap = state
        .store
        .settings
        .all()
        .await?
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect();
    let total = map.len();
    Ok(ApiResponse::page(map, total))
}

/// GET /api/settings/:key
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<ApiResponse<SiteSetting>>> {
    Ok(ApiResponse::ok(state.store.settings.get(&key).await?))
}

/// PUT /api/settings
/// Upsert every key in the body
pub async fn update_settings(
    State(state): State<AppState>,
    session: AdminSession,
    Json(payload): Json<SettingsMap>,
) -> ApiResult<Json<ApiResponse<Vec<SiteSetting>>>> {
    if payload.is_empty() {
        return Err(ApiError::BadRequest("No settings provided".to_string()));
    }
    for key in payload.keys() {
        check_key(key)?;
    }

    let mut saved = Vec::with_capacity(payload.len());
    for (key, value) in payload {
        saved.push(state.store.settings.put(&key, value).await?);
    }

    tracing::info!(count = saved.len(), by = %session.email, "Settings updated");
    let total = saved.len();
    Ok(ApiResponse::page(saved, total))
}

/// DELETE /api/settings/:key
pub async fn delete_setting(
    State(state): State<AppState>,
    session: AdminSession,
    Path(key): Path<String>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    state.store.settings.delete(&key).await?;
    tracing::info!(by = %session.email, "Setting deleted: {}", key);
    Ok(ApiResponse::ok(serde_json::json!({ "key": key, "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::models::AdminRole;
    use crate::routes::auth::{create_session_token, SESSION_COOKIE};
    use crate::store::Store;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    fn setup() -> (Router, String) {
        let state = AppState::new(Store::memory(), AppConfig::for_tests("uploads".into()));
        let session = AdminSession {
            id: 0,
            email: "owner@eshrm.com".to_string(),
            name: "Owner".to_string(),
            role: AdminRole::SuperAdmin,
        };
        let (token, _) = create_session_token(&session, &state.config.jwt_secret, 1).unwrap();
        let app = Router::new()
            .route("/api/settings", get(list_settings).put(update_settings))
            .route("/api/settings/{key}", get(get_setting).delete(delete_setting))
            .with_state(state);
        (app, format!("{}={}", SESSION_COOKIE, token))
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("site.phone_number").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("bad key").is_err());
    }

    #[tokio::test]
    async fn test_bulk_update_then_public_map() {
        let (app, cookie) = setup();
        let req = Request::put("/api/settings")
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "phone": "+254 700 000000", "show_banner": true }).to_string()))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .oneshot(Request::get("/api/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(res).await;
        assert_eq!(body["data"]["phone"], "+254 700 000000");
        assert_eq!(body["data"]["show_banner"], true);
    }

    #[tokio::test]
    async fn test_update_requires_session() {
        let (app, _) = setup();
        let req = Request::put("/api/settings")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"phone":"x"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let (app, _) = setup();
        let res = app
            .oneshot(Request::get("/api/settings/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
