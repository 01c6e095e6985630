/**
 * Media Routes
 * Multipart uploads stored on disk with one MediaAsset record per file
 */
use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use sha2::{Digest, Sha256};
use std::path::Path as FsPath;
use uuid::Uuid;

use crate::db::models::{MediaAsset, MediaDraft, MediaPatch};
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::routes::auth::AdminSession;
use crate::routes::resource::trim_opt;
use crate::state::AppState;
use crate::store::ListFilter;

/// Per-file upload cap
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Cap on a whole multipart request
pub const MAX_REQUEST_SIZE: usize = 50 * 1024 * 1024;

/// Public URL prefix the upload directory is served under
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

/// Detect the file type from its leading bytes
fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        // PDF: 25 50 44 46
        [0x25, 0x50, 0x44, 0x46, ..] => Some("application/pdf"),
        _ => None,
    }
}

fn get_extension_from_mime(mime: &str) -> &str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

/// Keep only the last path segment of a client-supplied name
fn display_name(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();
    if name.trim().is_empty() || name == ".." {
        "upload".to_string()
    } else {
        name
    }
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Read a file part, refusing to buffer more than the per-file cap
async fn read_limited(field: &mut Field<'_>, name: &str) -> ApiResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| {
        tracing::error!("Failed to read upload bytes: {}", e);
        ApiError::BadRequest("Failed to read file data".to_string())
    })? {
        if bytes.len() + chunk.len() > MAX_FILE_SIZE {
            return Err(ApiError::validation(format!(
                "{} is too large. Maximum size is 10MB.",
                name
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn store_file(state: &AppState, original_name: String, bytes: &[u8]) -> ApiResult<MediaAsset> {
    if bytes.is_empty() {
        return Err(ApiError::validation(format!("{} is empty", original_name)));
    }
    let mime_type = detect_mime_type(bytes).ok_or_else(|| {
        ApiError::validation(format!(
            "{} is not an allowed type. Allowed: JPEG, PNG, GIF, WebP, PDF.",
            original_name
        ))
    })?;

    let filename = format!("{}.{}", Uuid::new_v4(), get_extension_from_mime(mime_type));
    let file_path = state.config.upload_dir.join(&filename);
    tokio::fs::write(&file_path, bytes).await.map_err(|e| {
        tracing::error!("Failed to write upload file: {}", e);
        ApiError::Internal("Failed to save file".to_string())
    })?;

    let draft = MediaDraft {
        url: format!("{}/{}", UPLOAD_URL_PREFIX, filename),
        filename,
        original_name,
        file_size: bytes.len() as i64,
        mime_type: mime_type.to_string(),
        checksum: checksum(bytes),
    };
    match state.store.media.create(draft).await {
        Ok(asset) => Ok(asset),
        Err(e) => {
            let _ = tokio::fs::remove_file(&file_path).await;
            Err(e.into())
        }
    }
}

async fn remove_file(dir: &FsPath, filename: &str) {
    match tokio::fs::remove_file(dir.join(filename)).await {
        Ok(()) => tracing::info!("Media file deleted: {}", filename),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Media file already missing: {}", filename);
        }
        Err(e) => tracing::error!("Failed to delete file {}: {}", filename, e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/media
pub async fn list_media(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Json<ApiResponse<Vec<MediaAsset>>>> {
    let rows = state.store.media.filtered(&filter).await?;
    let (items, total) = filter.paginate(rows);
    Ok(ApiResponse::page(items, total))
}

/// POST /api/media
/// Every file part is stored in order; the response lists the new assets.
pub async fn upload_media(
    State(state): State<AppState>,
    session: AdminSession,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create upload directory: {}", e);
            ApiError::Internal("Failed to initialize upload directory".to_string())
        })?;

    let mut assets = Vec::new();
    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Multipart error: {}", e);
                return Err(ApiError::BadRequest("Invalid multipart data".to_string()));
            }
        };
        let Some(original_name) = field.file_name().map(display_name) else {
            continue;
        };

        let bytes = read_limited(&mut field, &original_name).await?;
        let asset = store_file(&state, original_name, &bytes).await?;
        tracing::info!(
            id = asset.id,
            size = asset.file_size,
            mime = %asset.mime_type,
            uploaded_by = %session.email,
            "Media uploaded: {}",
            asset.filename
        );
        assets.push(asset);
    }

    if assets.is_empty() {
        return Err(ApiError::BadRequest("No file provided".to_string()));
    }
    let total = assets.len();
    Ok((StatusCode::CREATED, ApiResponse::page(assets, total)))
}

/// PUT /api/media/:id
pub async fn update_media(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<i64>,
    Json(mut patch): Json<MediaPatch>,
) -> ApiResult<Json<ApiResponse<MediaAsset>>> {
    if let Some(alt_text) = patch.alt_text.as_mut() {
        trim_opt(alt_text);
    }
    patch.original_name = patch.original_name.as_deref().map(display_name);
    Ok(ApiResponse::ok(state.store.media.update(id, patch).await?))
}

/// DELETE /api/media/:id
/// Removes the record and its file
pub async fn delete_media(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let asset = state.store.media.get(id).await?;
    state.store.media.delete(id).await?;
    remove_file(&state.config.upload_dir, &asset.filename).await;
    Ok(ApiResponse::ok(serde_json::json!({ "id": id, "deleted": true })))
}
