/**
 * Admin Session Routes
 * JWT session cookie with login, logout and session lookup
 */
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{AppendHeaders, IntoResponse},
};
use bcrypt::verify;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::models::{AdminRole, AdminUser, AdminUserPatch};
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::Json;
use crate::state::AppState;
use crate::store::StoreError;

// ============================================================================
// Configuration
// ============================================================================

pub const SESSION_COOKIE: &str = "eshrm_session";

/// Consecutive failures before an account is locked
const MAX_LOGIN_ATTEMPTS: i32 = 5;

/// Lock duration after too many failures
const LOCKOUT_MINUTES: i64 = 15;

/// Session id used for the environment bootstrap admin
const BOOTSTRAP_USER_ID: i64 = 0;

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // User ID
    pub email: String, // User email
    pub role: String,  // User role
    pub exp: i64,      // Expiry timestamp
    pub iat: i64,      // Issued at timestamp
}

/// The signed-in admin, resolved once per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSession {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
}

impl AdminSession {
    fn from_user(user: &AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }

    fn bootstrap(email: &str) -> Self {
        Self {
            id: BOOTSTRAP_USER_ID,
            email: email.to_string(),
            name: "Administrator".to_string(),
            role: AdminRole::SuperAdmin,
        }
    }

    /// User management needs an admin or super admin role.
    pub fn require_user_manager(&self) -> ApiResult<()> {
        if self.role.can_manage_users() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Your role cannot manage admin users".to_string(),
            ))
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginData {
    pub user: AdminSession,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a signed session token
pub fn create_session_token(
    session: &AdminSession,
    secret: &str,
    ttl_hours: i64,
) -> Result<(String, DateTime<Utc>), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours);

    let claims = Claims {
        sub: session.id.to_string(),
        email: session.email.clone(),
        role: session.role.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, exp))
}

/// Verify and decode a session token
pub fn verify_session_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Extract the session cookie from any Cookie header
fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_header(value: String) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&value)
        .map_err(|_| ApiError::Internal("Failed to build session cookie".to_string()))
}

/// Resolve the session carried by the request, if any.
async fn resolve_session(headers: &HeaderMap, state: &AppState) -> ApiResult<Option<AdminSession>> {
    let Some(token) = extract_session_cookie(headers).or_else(|| extract_bearer_token(headers))
    else {
        return Ok(None);
    };

    let claims = match verify_session_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected session token");
            return Ok(None);
        }
    };

    let Ok(user_id) = claims.sub.parse::<i64>() else {
        return Ok(None);
    };
    // Bootstrap sessions end once a real admin exists.
    if user_id == BOOTSTRAP_USER_ID {
        let no_users = state.store.users.list().await?.is_empty();
        return Ok(no_users.then(|| AdminSession::bootstrap(&claims.email)));
    }

    match state.store.users.get(user_id).await {
        Ok(user) if user.is_active => Ok(Some(AdminSession::from_user(&user))),
        Ok(_) | Err(StoreError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_session(&parts.headers, state)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

impl OptionalFromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        resolve_session(&parts.headers, state).await
    }
}

async fn check_password(password: String, hash: String) -> bool {
    // bcrypt is CPU-bound; keep the async executor free.
    tokio::task::spawn_blocking(move || verify(&password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Authenticate against stored users, or the environment credentials while
/// no user exists yet.
async fn authenticate(state: &AppState, payload: &LoginRequest) -> ApiResult<AdminSession> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let users = &state.store.users;

    let user = match users.find_by_slug(&payload.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound { .. }) => {
            let no_users = users.list().await?.is_empty();
            let (Some(email), Some(hash)) = (
                state.config.admin_email.as_deref(),
                state.config.admin_password_hash.clone(),
            ) else {
                tracing::warn!("Login attempt for unknown user: {}", payload.email);
                return Err(invalid());
            };
            if no_users
                && email.eq_ignore_ascii_case(&payload.email)
                && check_password(payload.password.clone(), hash).await
            {
                tracing::info!("Bootstrap admin signed in: {}", email);
                return Ok(AdminSession::bootstrap(email));
            }
            tracing::warn!("Login attempt for unknown user: {}", payload.email);
            return Err(invalid());
        }
        Err(e) => return Err(e.into()),
    };

    let now = Utc::now();
    if user.locked_until.is_some_and(|until| until > now) {
        tracing::warn!("Login attempt on locked account: {}", user.email);
        return Err(ApiError::Unauthorized(
            "Account is temporarily locked. Try again later.".to_string(),
        ));
    }
    if !user.is_active {
        return Err(ApiError::Forbidden("Account is disabled.".to_string()));
    }

    if !check_password(payload.password.clone(), user.password_hash.clone()).await {
        let attempts = user.login_attempts + 1;
        let patch = if attempts >= MAX_LOGIN_ATTEMPTS {
            tracing::warn!(attempts, "Locking account after failed logins: {}", user.email);
            AdminUserPatch {
                login_attempts: Some(0),
                locked_until: Some(Some(now + Duration::minutes(LOCKOUT_MINUTES))),
                ..Default::default()
            }
        } else {
            AdminUserPatch {
                login_attempts: Some(attempts),
                ..Default::default()
            }
        };
        users.update(user.id, patch).await?;
        tracing::warn!("Failed login attempt for: {}", user.email);
        return Err(invalid());
    }

    let user = users
        .update(
            user.id,
            AdminUserPatch {
                login_attempts: Some(0),
                locked_until: Some(None),
                last_login_at: Some(now),
                ..Default::default()
            },
        )
        .await?;
    Ok(AdminSession::from_user(&user))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/admin/login
/// Sign in and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }

    let session = authenticate(&state, &payload).await?;

    let ttl_hours = state.config.session_ttl_hours;
    let (token, expires_at) = create_session_token(&session, &state.config.jwt_secret, ttl_hours)
        .map_err(|e| {
            tracing::error!("Failed to create session token: {}", e);
            ApiError::Internal("Failed to create session".to_string())
        })?;
    let cookie = cookie_header(session_cookie(
        &token,
        ttl_hours * 3600,
        state.config.is_production(),
    ))?;

    tracing::info!("Successful login for user: {}", session.email);

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::ok(LoginData {
            user: session,
            token,
            expires_at,
        }),
    ))
}

/// POST /api/admin/logout
/// Clear the session cookie
pub async fn logout(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let cookie = cookie_header(session_cookie("", 0, state.config.is_production()))?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::ok(serde_json::json!({ "logged_out": true })),
    ))
}

/// GET /api/admin/session
/// Return the signed-in admin or 401
pub async fn session(session: AdminSession) -> Json<ApiResponse<AdminSession>> {
    ApiResponse::ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::models::AdminUserDraft;
    use crate::store::Store;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(Store::memory(), AppConfig::for_tests("uploads".into()))
    }

    fn auth_router(state: AppState) -> Router {
        Router::new()
            .route("/api/admin/login", post(login))
            .route("/api/admin/logout", post(logout))
            .route("/api/admin/session", get(session))
            .with_state(state)
    }

    async fn add_user(state: &AppState, email: &str, password: &str) -> AdminUser {
        state
            .store
            .users
            .create(AdminUserDraft {
                email: email.to_string(),
                name: "Test Admin".to_string(),
                password_hash: bcrypt::hash(password, 4).unwrap(),
                role: AdminRole::Admin,
            })
            .await
            .unwrap()
    }

    async fn post_login(app: Router, email: &str, password: &str) -> axum::response::Response {
        let body = serde_json::to_vec(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
        .unwrap();
        let req = Request::post("/api/admin/login")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    #[test]
    fn test_verify_session_token_invalid_returns_err() {
        assert!(verify_session_token("invalid.jwt.token", "secret").is_err());
    }

    #[test]
    fn test_extract_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; eshrm_session=abc.def; lang=en"),
        );
        assert_eq!(extract_session_cookie(&headers).as_deref(), Some("abc.def"));
    }

    #[tokio::test]
    async fn test_login_empty_email_returns_bad_request() {
        let res = post_login(auth_router(test_state()), "", "password123").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_wrong_credentials_returns_unauthorized() {
        let state = test_state();
        add_user(&state, "admin@eshrm.africa", "correct-horse").await;
        let res = post_login(auth_router(state), "admin@eshrm.africa", "wrongpassword").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_sets_cookie_accepted_by_session() {
        let state = test_state();
        add_user(&state, "admin@eshrm.africa", "correct-horse").await;
        let app = auth_router(state);

        let res = post_login(app.clone(), "ADMIN@eshrm.africa", "correct-horse").await;
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let req = Request::get("/api/admin/session")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["email"], "admin@eshrm.africa");
    }

    #[tokio::test]
    async fn test_session_without_cookie_is_unauthorized() {
        let req = Request::get("/api/admin/session").body(Body::empty()).unwrap();
        let res = auth_router(test_state()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_account_locks_after_repeated_failures() {
        let state = test_state();
        let user = add_user(&state, "admin@eshrm.africa", "correct-horse").await;
        let app = auth_router(state.clone());
        for _ in 0..MAX_LOGIN_ATTEMPTS {
            post_login(app.clone(), "admin@eshrm.africa", "nope-nope").await;
        }
        let locked = state.store.users.get(user.id).await.unwrap();
        assert!(locked.locked_until.is_some());

        let res = post_login(app, "admin@eshrm.africa", "correct-horse").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bootstrap_credentials_work_while_no_users_exist() {
        let mut config = AppConfig::for_tests("uploads".into());
        config.admin_email = Some("owner@eshrm.africa".to_string());
        config.admin_password_hash = Some(bcrypt::hash("bootstrap-pass", 4).unwrap());
        let state = AppState::new(Store::memory(), config);

        let res = post_login(auth_router(state.clone()), "owner@eshrm.africa", "bootstrap-pass").await;
        assert_eq!(res.status(), StatusCode::OK);

        add_user(&state, "someone@eshrm.africa", "whatever-pass").await;
        let res = post_login(auth_router(state), "owner@eshrm.africa", "bootstrap-pass").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let req = Request::post("/api/admin/logout").body(Body::empty()).unwrap();
        let res = auth_router(test_state()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
