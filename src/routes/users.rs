/**
 * Admin User Routes
 * Account management for the admin panel
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use bcrypt::{hash, DEFAULT_COST};
use serde::Deserialize;

use super::resource::{require_email, require_text};
use crate::db::models::{AdminRole, AdminUser, AdminUserDraft, AdminUserPatch};
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::routes::auth::AdminSession;
use crate::state::AppState;
use crate::store::ListFilter;

pub const MIN_PASSWORD_LENGTH: usize = 8;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: AdminRole,
}

fn default_role() -> AdminRole {
    AdminRole::Editor
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Hash a password with bcrypt on the blocking pool
pub async fn hash_password(password: String) -> ApiResult<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

/// Super admin accounts are only managed by other super admins
fn guard_super_admin_target(session: &AdminSession, target: &AdminUser) -> ApiResult<()> {
    if target.role == AdminRole::SuperAdmin && session.role != AdminRole::SuperAdmin {
        return Err(ApiError::Forbidden(
            "Only a super admin can modify a super admin account".to_string(),
        ));
    }
    Ok(())
}

fn is_active_super_admin(user: &AdminUser) -> bool {
    user.is_active && user.role == AdminRole::SuperAdmin
}

/// Refuse a change that would leave no active super admin
async fn guard_last_super_admin(state: &AppState, target: &AdminUser) -> ApiResult<()> {
    if !is_active_super_admin(target) {
        return Ok(());
    }
    let others = state
        .store
        .users
        .list()
        .await?
        .iter()
        .filter(|u| u.id != target.id && is_active_super_admin(u))
        .count();
    if others == 0 {
        return Err(ApiError::Conflict(
            "The last active super admin cannot be removed, demoted or deactivated".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Json<ApiResponse<Vec<AdminUser>>>> {
    let rows = state.store.users.filtered(&filter).await?;
    let (items, total) = filter.paginate(rows);
    Ok(ApiResponse::page(items, total))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<AdminUser>>> {
    Ok(ApiResponse::ok(state.store.users.get(id).await?))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    session: AdminSession,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    session.require_user_manager()?;
    if payload.role == AdminRole::SuperAdmin && session.role != AdminRole::SuperAdmin {
        return Err(ApiError::Forbidden(
            "Only a super admin can create super admins".to_string(),
        ));
    }

    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();
    require_email(&email)?;
    require_text("name", &name)?;
    let password_hash = hash_password(payload.password).await?;

    let user = state
        .store
        .users
        .create(AdminUserDraft {
            email,
            name,
            password_hash,
            role: payload.role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, by = %session.email, "Admin user created: {}", user.email);
    Ok((StatusCode::CREATED, ApiResponse::ok(user)))
}

/// PUT /api/admin/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<AdminUser>>> {
    session.require_user_manager()?;
    let current = state.store.users.get(id).await?;
    guard_super_admin_target(&session, &current)?;

    if payload.role == Some(AdminRole::SuperAdmin) && session.role != AdminRole::SuperAdmin {
        return Err(ApiError::Forbidden(
            "Only a super admin can grant the super admin role".to_string(),
        ));
    }
    let demoted = payload.role.is_some_and(|r| r != AdminRole::SuperAdmin);
    let deactivated = payload.is_active == Some(false);
    if demoted || deactivated {
        guard_last_super_admin(&state, &current).await?;
    }

    let email = payload.email.map(|e| e.trim().to_lowercase());
    if let Some(email) = &email {
        require_email(email)?;
    }
    let name = payload.name.map(|n| n.trim().to_string());
    if let Some(name) = &name {
        require_text("name", name)?;
    }
    let password_hash = match payload.password {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };

    let user = state
        .store
        .users
        .update(
            id,
            AdminUserPatch {
                email,
                name,
                password_hash,
                role: payload.role,
                is_active: payload.is_active,
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(user_id = id, by = %session.email, "Admin user updated");
    Ok(ApiResponse::ok(user))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    session.require_user_manager()?;
    if session.id == id {
        return Err(ApiError::Conflict("You cannot delete your own account".to_string()));
    }
    let target = state.store.users.get(id).await?;
    guard_super_admin_target(&session, &target)?;
    guard_last_super_admin(&state, &target).await?;
    state.store.users.delete(id).await?;

    tracing::info!(user_id = id, by = %session.email, "Admin user deleted: {}", target.email);
    Ok(ApiResponse::ok(serde_json::json!({ "id": id, "deleted": true })))
}
