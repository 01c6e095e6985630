//! End-to-end behaviour through the full router on the in-memory store.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use eshrm_backend::blocks::BlockType;
use eshrm_backend::config::AppConfig;
use eshrm_backend::create_app;
use eshrm_backend::db::models::{AdminRole, NewContentBlock};
use eshrm_backend::routes::auth::{create_session_token, AdminSession, SESSION_COOKIE};
use eshrm_backend::seed;
use eshrm_backend::state::AppState;
use eshrm_backend::store::Store;

struct TestApp {
    router: Router,
    state: AppState,
    cookie: String,
    _uploads: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let state = AppState::new(Store::memory(), AppConfig::for_tests(uploads.path().to_path_buf()));
        let session = AdminSession {
            id: 0,
            email: "owner@eshrm.com".to_string(),
            name: "Owner".to_string(),
            role: AdminRole::SuperAdmin,
        };
        let (token, _) = create_session_token(&session, &state.config.jwt_secret, 1).unwrap();
        Self {
            router: create_app(state.clone()),
            state,
            cookie: format!("{}={}", SESSION_COOKIE, token),
            _uploads: uploads,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::get(uri)
                .header(header::COOKIE, &self.cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::COOKIE, &self.cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn put_block(&self, page: &str, section: &str, block_type: BlockType, key: &str, order: i32, content: Value) {
        self.state
            .store
            .content
            .upsert(NewContentBlock {
                page: page.to_string(),
                section: section.to_string(),
                block_type,
                block_key: key.to_string(),
                content,
                sort_order: order,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn seeding_twice_reproduces_the_catalog() {
    let app = TestApp::new();
    seed::seed(&app.state.store).await.unwrap();
    seed::seed(&app.state.store).await.unwrap();

    let expected = seed::defaults_for("about");
    let (status, body) = app.get("/api/content?page=about").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], expected.len());

    for block in expected {
        let listed = body["data"][&block.section]
            .as_array()
            .unwrap()
            .iter()
            .filter(|b| b["block_key"] == block.block_key)
            .collect::<Vec<_>>();
        assert_eq!(listed.len(), 1, "{}/{}", block.section, block.block_key);
        assert_eq!(listed[0]["content"], block.content);
    }
}

#[tokio::test]
async fn updated_content_reads_back_verbatim() {
    let app = TestApp::new();
    seed::seed(&app.state.store).await.unwrap();
    let (_, body) = app.get("/api/content?page=home&section=hero").await;
    let block = body["data"]["hero"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["block_key"] == "title")
        .unwrap()
        .clone();
    let id = block["id"].as_i64().unwrap();

    let content = json!({ "text": "People. Performance. Africa.", "title": "Headline" });
    let (status, _) = app
        .json("PUT", &format!("/api/content/{id}"), json!({ "content": content }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/api/content/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], content);
}

#[tokio::test]
async fn empty_collection_falls_back_to_defaults() {
    let app = TestApp::new();
    app.put_block("home", "stats", BlockType::Text, "title", 1, json!({ "text": "By the numbers" }))
        .await;

    let (status, body) = app.get("/api/pages/home").await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"]["sections"]["stats"];
    assert_eq!(stats["blocks"]["title"]["text"], "By the numbers");
    assert_eq!(stats["collections"]["stats_item"]["source"], "defaults");
    assert_eq!(stats["collections"]["stats_item"]["items"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn stored_collection_replaces_defaults_entirely() {
    let app = TestApp::new();
    app.put_block("home", "stats", BlockType::StatsItem, "offices", 1, json!({ "value": "3", "label": "Offices" }))
        .await;

    let (_, body) = app.get("/api/pages/home").await;
    let collection = &body["data"]["sections"]["stats"]["collections"]["stats_item"];
    assert_eq!(collection["source"], "content");
    let items = collection["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"], "offices");
    assert_eq!(items[0]["label"], "Offices");
}

#[tokio::test]
async fn two_stored_values_render_two_cards() {
    let app = TestApp::new();
    app.put_block("about", "values", BlockType::Feature, "excellence", 1, json!({ "title": "Excellence" }))
        .await;
    app.put_block("about", "values", BlockType::Feature, "integrity", 2, json!({ "title": "Integrity" }))
        .await;

    let (_, body) = app.get("/api/pages/about").await;
    let values = &body["data"]["sections"]["values"];
    let cards = values["collections"]["feature"]["items"].as_array().unwrap();
    let keys: Vec<&str> = cards.iter().map(|c| c["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["excellence", "integrity"]);
    assert_eq!(values["blocks"]["title"]["text"], "Our Values");
}

#[tokio::test]
async fn qualified_lead_leaves_the_new_listing() {
    let app = TestApp::new();
    let form = Request::post("/api/leads")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "name": "Amina Yusuf", "email": "amina@example.com", "message": "Payroll audit" }).to_string(),
        ))
        .unwrap();
    let (status, body) = app.send(form).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "new");
    let id = body["data"]["id"].as_i64().unwrap();

    let (_, listing) = app.get("/api/leads?status=new").await;
    assert_eq!(listing["total"], 1);

    let (status, body) = app
        .json("PUT", &format!("/api/leads/{id}"), json!({ "status": "qualified" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "qualified");

    let (_, listing) = app.get("/api/leads?status=new").await;
    assert_eq!(listing["total"], 0);
    let (_, lead) = app.get(&format!("/api/leads/{id}")).await;
    assert_eq!(lead["data"]["status"], "qualified");
}

fn multipart_body(boundary: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn three_uploads_create_three_assets_in_order() {
    let app = TestApp::new();
    let png: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    let jpeg: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
    let pdf: &[u8] = b"%PDF-1.4\n%%EOF\n";
    let boundary = "eshrm-test-boundary";
    let body = multipart_body(boundary, &[("logo.png", png), ("team.jpg", jpeg), ("brochure.pdf", pdf)]);

    let req = Request::post("/api/media")
        .header(header::COOKIE, &app.cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::CREATED);

    let assets = body["data"].as_array().unwrap();
    assert_eq!(assets.len(), 3);
    let expected = [
        ("logo.png", png.len(), "image/png"),
        ("team.jpg", jpeg.len(), "image/jpeg"),
        ("brochure.pdf", pdf.len(), "application/pdf"),
    ];
    for (asset, (name, size, mime)) in assets.iter().zip(expected) {
        assert_eq!(asset["original_name"], name);
        assert_eq!(asset["file_size"], size);
        assert_eq!(asset["mime_type"], mime);
        let stored = app.state.config.upload_dir.join(asset["filename"].as_str().unwrap());
        assert_eq!(std::fs::metadata(stored).unwrap().len() as usize, size);
    }

    let (_, listing) = app.get("/api/media").await;
    assert_eq!(listing["total"], 3);
}

#[tokio::test]
async fn rejected_upload_type_is_a_validation_error() {
    let app = TestApp::new();
    let boundary = "eshrm-test-boundary";
    let body = multipart_body(boundary, &[("setup.exe", &b"MZ\x90\x00\x03"[..])]);
    let req = Request::post("/api/media")
        .header(header::COOKIE, &app.cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn block_type_change_validates_against_the_new_type() {
    let app = TestApp::new();
    let block = app
        .state
        .store
        .content
        .upsert(NewContentBlock {
            page: "home".to_string(),
            section: "proof".to_string(),
            block_type: BlockType::Text,
            block_key: "quote".to_string(),
            content: json!({ "text": "Great partner", "rating": "high" }),
            sort_order: 1,
        })
        .await
        .unwrap();
    let uri = format!("/api/content/{}", block.id);

    // Valid text, invalid testimonial.
    let (status, body) = app.json("PUT", &uri, json!({ "block_type": "testimonial" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .json(
            "PUT",
            &uri,
            json!({ "block_type": "testimonial", "content": { "quote": "Great partner", "rating": 9 } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, unchanged) = app.get(&uri).await;
    assert_eq!(unchanged["data"]["block_type"], "text");

    let content = json!({ "quote": "Great partner", "author": "Kofi", "rating": 5 });
    let (status, body) = app
        .json("PUT", &uri, json!({ "block_type": "testimonial", "content": content }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["block_type"], "testimonial");
    assert_eq!(body["data"]["content"], content);
}

#[tokio::test]
async fn unknown_lead_status_keeps_the_error_envelope() {
    let app = TestApp::new();
    let form = Request::post("/api/leads")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "name": "Kwame Mensah", "email": "kwame@example.com" }).to_string(),
        ))
        .unwrap();
    let (_, body) = app.send(form).await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .json("PUT", &format!("/api/leads/{id}"), json!({ "status": "bogus" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("bogus"));

    let (status, body) = app
        .json("PUT", "/api/leads/not-a-number", json!({ "status": "qualified" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn huge_page_number_returns_an_empty_page() {
    let app = TestApp::new();
    let (status, body) = app
        .get("/api/services?page=18446744073709551615&page_size=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn setup_wizard_refuses_new_admin_once_one_exists() {
    let app = TestApp::new();
    app.state
        .store
        .users
        .create(eshrm_backend::db::models::AdminUserDraft {
            email: "owner@eshrm.com".to_string(),
            name: "Owner".to_string(),
            password_hash: "hash".to_string(),
            role: AdminRole::SuperAdmin,
        })
        .await
        .unwrap();

    let anonymous = |body: Value| {
        Request::post("/api/admin/setup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };
    let (status, _) = app.send(anonymous(json!({ "action": "test_database" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(anonymous(json!({ "action": "setup_database" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(anonymous(
            json!({ "action": "create_admin", "email": "evil@x.co", "password": "long-enough", "name": "Evil" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let users = app.state.store.users.list().await.unwrap();
    assert_eq!(users.len(), 1);
}
