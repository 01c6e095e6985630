//! ESHRM Backend - content, leads and admin API for the marketing site

pub mod blocks;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod notify;
pub mod pages;
pub mod routes;
pub mod seed;
pub mod setup;
pub mod state;
pub mod store;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::models::{Booking, CaseStudy, Insight, Lead, Service, Testimonial};
use crate::routes::{
    auth, content, health, media, pages as page_routes, resource, rss, settings, setup as setup_routes,
    users,
};
use crate::setup::{SetupWizard, SETUP_COMPLETED_KEY};
use crate::state::AppState;
use crate::store::Store;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to the local frontend dev server.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        // Collections
        .merge(resource::routes::<Lead>("/api/leads"))
        .merge(resource::routes::<Booking>("/api/bookings"))
        .merge(resource::routes::<CaseStudy>("/api/case-studies"))
        .merge(resource::routes::<Service>("/api/services"))
        .merge(resource::routes::<Testimonial>("/api/testimonials"))
        .merge(resource::routes::<Insight>("/api/insights"))
        // Content
        .route("/api/content", get(content::list_blocks))
        .route(
            "/api/content/{id}",
            get(content::get_block).put(content::update_block),
        )
        .route("/api/content/{id}/field", patch(content::update_block_field))
        .route("/api/pages/{page}", get(page_routes::get_page))
        // Admin
        .route("/api/admin/login", post(auth::login))
        .route("/api/admin/logout", post(auth::logout))
        .route("/api/admin/session", get(auth::session))
        .route("/api/admin/block-types", get(content::block_types))
        .route("/api/admin/content/{id}/form", get(content::block_form))
        .route(
            "/api/admin/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/admin/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/admin/setup",
            get(setup_routes::setup_status).post(setup_routes::run_setup_step),
        )
        // Media
        .route(
            "/api/media",
            get(media::list_media)
                .post(media::upload_media)
                .layer(DefaultBodyLimit::max(media::MAX_REQUEST_SIZE)),
        )
        .route(
            "/api/media/{id}",
            put(media::update_media).delete(media::delete_media),
        )
        .nest_service(media::UPLOAD_URL_PREFIX, uploads)
        // Settings
        .route(
            "/api/settings",
            get(settings::list_settings).put(settings::update_settings),
        )
        .route(
            "/api/settings/{key}",
            get(settings::get_setting).delete(settings::delete_setting),
        )
        .route("/rss.xml", get(rss::rss_feed))
        .route("/health", get(health::health_ping))
        .route("/health/detailed", get(health::health_detailed))
        .route("/health/database", get(health::health_database))
        .route("/health/ready", get(health::health_ready))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // JSON bodies keep axum's 2 MB default; this caps multipart uploads
        .layer(RequestBodyLimitLayer::new(media::MAX_REQUEST_SIZE))
        .layer(cors)
        .with_state(state)
}

/// Pick the store: Postgres when DATABASE_URL is set, else the seeded memory store.
async fn open_store(config: &AppConfig) -> Result<Store, BoxError> {
    if config.database_url.is_some() {
        let pool = db::init_pool(None).await?;
        let store = Store::postgres(pool);
        store.migrate().await?;
        tracing::info!("Using Postgres store");
        Ok(store)
    } else {
        tracing::warn!("DATABASE_URL not set. Running on the in-memory store; data is not persisted.");
        let store = Store::memory();
        seed::seed(&store).await?;
        Ok(store)
    }
}

/// Setup counts as finished once the completion flag is stored or an admin exists.
async fn restore_setup(store: &Store) -> SetupWizard {
    if let Ok(setting) = store.settings.get(SETUP_COMPLETED_KEY).await {
        if setting.value.as_bool() == Some(true) {
            return SetupWizard::finished();
        }
    }
    match store.users.list().await {
        Ok(users) if !users.is_empty() => SetupWizard::finished(),
        _ => SetupWizard::new(),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the server (used by main).
pub async fn run() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // Guards must outlive the server or buffered log lines are lost.
    let _log_guards = logging::init(&logging::LogConfig::from_env());

    let config = AppConfig::from_env()?;
    if config.is_production() && config.admin_email.is_some() && config.admin_password_hash.is_none() {
        tracing::warn!("SECURITY: ADMIN_EMAIL is set without ADMIN_PASSWORD_HASH; bootstrap login is disabled.");
    }

    let store = open_store(&config).await?;
    let wizard = restore_setup(&store).await;
    if !wizard.is_completed() {
        tracing::info!("Setup has not been completed; the wizard is available at /api/admin/setup");
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(store, config).with_setup(wizard);
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        create_app(AppState::new(Store::memory(), AppConfig::for_tests("uploads".into())))
    }

    #[tokio::test]
    async fn test_health_responds_with_request_id() {
        let res = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_public_collection_is_mounted() {
        let res = app()
            .oneshot(Request::get("/api/services").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_leads_listing_requires_admin() {
        let res = app()
            .oneshot(Request::get("/api/leads").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_restore_setup_reads_flag() {
        let store = Store::memory();
        assert!(!restore_setup(&store).await.is_completed());
        store
            .settings
            .put(SETUP_COMPLETED_KEY, serde_json::Value::Bool(true))
            .await
            .unwrap();
        assert!(restore_setup(&store).await.is_completed());
    }

    #[tokio::test]
    async fn test_restore_setup_closes_when_admin_exists() {
        use crate::db::models::{AdminRole, AdminUserDraft};
        let store = Store::memory();
        store
            .users
            .create(AdminUserDraft {
                email: "owner@eshrm.com".to_string(),
                name: "Owner".to_string(),
                password_hash: "hash".to_string(),
                role: AdminRole::SuperAdmin,
            })
            .await
            .unwrap();
        assert!(restore_setup(&store).await.is_completed());
    }
}
