/**
 * Setup Routes
 * First-run wizard: database check, migrations and seed, first admin, completion
 */
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use super::resource::{require_email, require_text};
use super::users::hash_password;
use crate::db::models::{AdminRole, AdminUserDraft};
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::Json;
use crate::seed;
use crate::setup::{SetupError, SetupStep, SetupView, SETUP_COMPLETED_KEY};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SetupAction {
    TestDatabase,
    SetupDatabase,
    CreateAdmin {
        email: String,
        password: String,
        name: String,
    },
    CompleteSetup,
}

impl SetupAction {
    fn step(&self) -> SetupStep {
        match self {
            SetupAction::TestDatabase => SetupStep::TestDatabase,
            SetupAction::SetupDatabase => SetupStep::SetupDatabase,
            SetupAction::CreateAdmin { .. } => SetupStep::CreateAdmin,
            SetupAction::CompleteSetup => SetupStep::CompleteSetup,
        }
    }
}

impl From<SetupError> for ApiError {
    fn from(err: SetupError) -> Self {
        match err {
            SetupError::AlreadyCompleted => ApiError::Forbidden(err.to_string()),
            SetupError::OutOfOrder { .. } | SetupError::Busy(_) => ApiError::Conflict(err.to_string()),
        }
    }
}

/// Reseeding and admin creation close as soon as any admin user exists.
async fn ensure_unclaimed(state: &AppState, step: SetupStep) -> ApiResult<()> {
    if !matches!(step, SetupStep::SetupDatabase | SetupStep::CreateAdmin) {
        return Ok(());
    }
    if state.store.users.list().await?.is_empty() {
        Ok(())
    } else {
        tracing::warn!("Rejected setup step {}: an admin user already exists", step);
        Err(ApiError::Forbidden(
            "Setup is closed once an admin user exists".to_string(),
        ))
    }
}

async fn run_action(state: &AppState, action: SetupAction) -> ApiResult<String> {
    match action {
        SetupAction::TestDatabase => {
            let latency = state.store.ping().await.map_err(|e| {
                tracing::error!("Setup database check failed: {}", e);
                ApiError::Unavailable(format!("Database connection failed: {}", e))
            })?;
            Ok(format!(
                "Connected to {} store in {}ms",
                state.store.backend_name(),
                latency.as_millis()
            ))
        }
        SetupAction::SetupDatabase => {
            state.store.migrate().await?;
            let count = seed::seed(&state.store).await?;
            Ok(format!("Schema ready; {} content blocks seeded", count))
        }
        SetupAction::CreateAdmin {
            email,
            password,
            name,
        } => {
            let email = email.trim().to_lowercase();
            let name = name.trim().to_string();
            require_email(&email)?;
            require_text("name", &name)?;
            let password_hash = hash_password(password).await?;
            let user = state
                .store
                .users
                .create(AdminUserDraft {
                    email,
                    name,
                    password_hash,
                    role: AdminRole::SuperAdmin,
                })
                .await?;
            Ok(format!("Admin user {} created", user.email))
        }
        SetupAction::CompleteSetup => {
            state
                .store
                .settings
                .put(SETUP_COMPLETED_KEY, Value::Bool(true))
                .await?;
            Ok("Setup complete".to_string())
        }
    }
}

/// GET /api/admin/setup
pub async fn setup_status(State(state): State<AppState>) -> Json<ApiResponse<SetupView>> {
    ApiResponse::ok(state.setup.read().await.view())
}

/// POST /api/admin/setup
/// Run the next wizard step. A failed step is recorded and may be retried.
pub async fn run_setup_step(
    State(state): State<AppState>,
    Json(action): Json<SetupAction>,
) -> ApiResult<Json<ApiResponse<SetupView>>> {
    let step = action.step();
    ensure_unclaimed(&state, step).await?;
    state.setup.write().await.begin(step)?;
    tracing::info!("Setup step started: {}", step);

    let outcome = run_action(&state, action).await;

    let mut wizard = state.setup.write().await;
    match outcome {
        Ok(message) => {
            tracing::info!("Setup step completed: {} ({})", step, message);
            wizard.finish(step, Ok(message));
            Ok(ApiResponse::ok(wizard.view()))
        }
        Err(err) => {
            tracing::warn!("Setup step failed: {}: {}", step, err);
            wizard.finish(step, Err(err.to_string()));
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::Store;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    fn setup() -> (Router, AppState) {
        let state = AppState::new(Store::memory(), AppConfig::for_tests("uploads".into()));
        let app = Router::new()
            .route("/api/admin/setup", get(setup_status).post(run_setup_step))
            .with_state(state.clone());
        (app, state)
    }

    async fn post(app: &Router, body: Value) -> (StatusCode, Value) {
        let req = Request::post("/api/admin/setup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_out_of_order_action_conflicts() {
        let (app, _) = setup();
        let (status, body) = post(&app, json!({ "action": "create_admin", "email": "a@b.co", "password": "password1", "name": "A" })).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_full_wizard_then_forbidden() {
        let (app, state) = setup();
        assert_eq!(post(&app, json!({ "action": "test_database" })).await.0, StatusCode::OK);
        assert_eq!(post(&app, json!({ "action": "setup_database" })).await.0, StatusCode::OK);
        assert!(state.store.content.count().await.unwrap() > 0);

        let (status, _) = post(
            &app,
            json!({ "action": "create_admin", "email": "Owner@ESHRM.com", "password": "correct-horse", "name": "Owner" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let owner = state.store.users.find_by_slug("owner@eshrm.com").await.unwrap();
        assert_eq!(owner.role, AdminRole::SuperAdmin);

        let (status, body) = post(&app, json!({ "action": "complete_setup" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["completed"], true);
        let flag = state.store.settings.get(SETUP_COMPLETED_KEY).await.unwrap();
        assert_eq!(flag.value, Value::Bool(true));

        let (status, _) = post(&app, json!({ "action": "test_database" })).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_failed_step_is_recorded_and_retryable() {
        let (app, _) = setup();
        post(&app, json!({ "action": "test_database" })).await;
        post(&app, json!({ "action": "setup_database" })).await;

        let (status, _) = post(&app, json!({ "action": "create_admin", "email": "a@b.co", "password": "short", "name": "A" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let res = app
            .clone()
            .oneshot(Request::get("/api/admin/setup").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let view: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(view["data"]["current_step"], "create_admin");
        assert_eq!(view["data"]["steps"][2]["status"], "error");

        let (status, _) = post(&app, json!({ "action": "create_admin", "email": "a@b.co", "password": "long-enough", "name": "A" })).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_existing_admin_closes_reseed_and_admin_creation() {
        let (app, state) = setup();
        state
            .store
            .users
            .create(AdminUserDraft {
                email: "owner@eshrm.com".to_string(),
                name: "Owner".to_string(),
                password_hash: "hash".to_string(),
                role: AdminRole::SuperAdmin,
            })
            .await
            .unwrap();

        assert_eq!(post(&app, json!({ "action": "test_database" })).await.0, StatusCode::OK);
        let (status, body) = post(&app, json!({ "action": "setup_database" })).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(state.store.content.count().await.unwrap(), 0);

        let (status, _) = post(
            &app,
            json!({ "action": "create_admin", "email": "other@x.co", "password": "long-enough", "name": "X" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let users = state.store.users.list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "owner@eshrm.com");
    }
}
