use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use sdc_backend::{
    AppConfig, AppState, ResourceService, create_router, request_body_limit,
    auth::Claims,
    config::Env,
    models::{ContactMessage, GalleryItem, Person, Project},
    storage::{MockStorageService, StorageState},
    store::{InMemoryDocumentStore, StoreState},
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

const BOUNDARY: &str = "sdc-test-boundary";

struct TestApp {
    state: AppState,
    storage: Arc<MockStorageService>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(config: AppConfig) -> Self {
        let storage = Arc::new(MockStorageService::new());
        let state = AppState {
            store: Arc::new(InMemoryDocumentStore::new()) as StoreState,
            storage: storage.clone() as StorageState,
            config,
        };
        Self { state, storage }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Local-mode admin identity via the development header bypass.
fn as_admin(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder.header("x-user-id", "admin-1").header("x-user-role", "ADMIN")
}

fn admin_get(uri: &str) -> Request<Body> {
    as_admin(Request::builder().uri(uri)).body(Body::empty()).unwrap()
}

fn admin_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    as_admin(Request::builder().method(method).uri(uri))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: Vec<u8>,
    },
}

fn multipart_body(parts: Vec<Part<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                field,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn admin_multipart(method: &str, uri: &str, parts: Vec<Part<'_>>) -> Request<Body> {
    as_admin(Request::builder().method(method).uri(uri))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn png(field: &'static str, file_name: &'static str, size: usize) -> Part<'static> {
    Part::File {
        field,
        file_name,
        content_type: "image/png",
        bytes: vec![7u8; size],
    }
}

// --- Infrastructure ---

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send(get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "message": "Server is running", "environment": "local" })
    );
}

#[tokio::test]
async fn test_unmatched_route_is_route_not_found() {
    let app = TestApp::new();
    let (status, body) = app.send(get("/api/does-not-exist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "success": false, "message": "Not found - /api/does-not-exist" })
    );
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new();
    let response = app.router().oneshot(get("/api/health")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Admin gate ---

#[tokio::test]
async fn test_admin_routes_require_credentials() {
    let app = TestApp::new();
    let (status, body) = app.send(get("/api/admin/people")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Not authorized to access this route"));
}

#[tokio::test]
async fn test_admin_routes_reject_other_roles() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/admin/contacts")
        .header("x-user-id", "editor-1")
        .header("x-user-role", "EDITOR")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        json!("User role EDITOR is not authorized to access this route")
    );
}

fn production_app() -> TestApp {
    TestApp::with_config(AppConfig {
        env: Env::Production,
        jwt_secret: "test-secret".to_string(),
        ..AppConfig::default()
    })
}

fn token(role: &str, secret: &str, expires_in: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "user-1".to_string(),
        role: role.to_string(),
        iat: now as usize,
        exp: (now + expires_in) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_bearer_token_grants_admin_access() {
    let app = production_app();
    let request = Request::builder()
        .uri("/api/admin/people")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token("admin", "test-secret", 3600)),
        )
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "count": 0, "data": [] }));
}

#[tokio::test]
async fn test_token_cookie_is_accepted() {
    let app = production_app();
    let request = Request::builder()
        .uri("/api/admin/gallery")
        .header(
            header::COOKIE,
            format!("theme=dark; token={}", token("ADMIN", "test-secret", 3600)),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_tokens_are_unauthorized() {
    let app = production_app();
    for bad in [
        token("ADMIN", "some-other-secret", 3600),
        token("ADMIN", "test-secret", -3600),
        "not-a-jwt".to_string(),
    ] {
        let request = Request::builder()
            .uri("/api/admin/people")
            .header(header::AUTHORIZATION, format!("Bearer {bad}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_header_bypass_is_disabled_in_production() {
    let app = production_app();
    let (status, _) = app.send(admin_get("/api/admin/people")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// --- Contact form ---

#[tokio::test]
async fn test_contact_submission() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/public/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "name": "A", "email": "a@b.co", "subject": "S", "message": "M",
                "status": "REPLIED"
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("UNREAD"));
    assert_eq!(body["data"]["email"], json!("a@b.co"));
    assert!(body["data"]["id"].is_string());

    let (_, listed) = app.send(admin_get("/api/admin/contacts?status=unread")).await;
    assert_eq!(listed["count"], json!(1));
}

#[tokio::test]
async fn test_contact_submission_reports_every_failure() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/public/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "email": "nope" }).to_string()))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Validation failed"));
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "email", "subject", "message"]);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/public/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_admin_updates_contact_status() {
    let app = TestApp::new();
    let created = app
        .state
        .service::<ContactMessage>()
        .create(payload(json!({
            "name": "A", "email": "a@b.co", "subject": "S", "message": "M"
        })))
        .await
        .unwrap();
    let uri = format!("/api/admin/contacts/{}", created.id);

    let (status, body) = app
        .send(admin_json("PUT", &uri, json!({ "status": "read" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("READ"));
    assert_eq!(body["data"]["subject"], json!("S"));

    let (status, body) = app
        .send(admin_json("PUT", &uri, json!({ "status": "LOST" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], json!("status"));
}

// --- Uploads through admin routes ---

#[tokio::test]
async fn test_project_multipart_create() {
    let app = TestApp::new();
    let request = admin_multipart(
        "POST",
        "/api/admin/projects",
        vec![
            Part::Text("title", "Portal"),
            Part::Text("description", "The club portal"),
            Part::Text("category", "Web"),
            Part::Text("technologies", r#"["React","Node"]"#),
            png("images", "first.png", 64),
            png("images", "second.png", 64),
        ],
    );
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let data = &body["data"];
    assert_eq!(data["technologies"], json!(["React", "Node"]));

    let images: Vec<&str> = data["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(images.len(), 2);
    assert!(images.iter().all(|url| url.starts_with("/uploads/projects/images-")));
    assert_eq!(data["thumbnail"], json!(images[0]));

    let written = app.storage.written();
    assert_eq!(written.len(), 2);
    assert_eq!(format!("/uploads/{}", written[0]), images[0]);
    assert_eq!(format!("/uploads/{}", written[1]), images[1]);
}

#[tokio::test]
async fn test_single_image_upload_sets_path() {
    let app = TestApp::new();
    let request = admin_multipart(
        "POST",
        "/api/admin/gallery",
        vec![
            Part::Text("title", "Hack night"),
            Part::Text("category", "hackathon"),
            png("image", "night.png", 32),
        ],
    );
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["category"], json!("HACKATHON"));
    let image = body["data"]["image"].as_str().unwrap();
    assert!(image.starts_with("/uploads/gallery/image-"));
    assert!(image.ends_with(".png"));
}

#[tokio::test]
async fn test_disguised_executable_is_rejected() {
    let app = TestApp::new();
    let request = admin_multipart(
        "POST",
        "/api/admin/people",
        vec![
            Part::Text("name", "N"),
            Part::Text("designation", "D"),
            Part::Text("category", "TEAM"),
            Part::File {
                field: "image",
                file_name: "avatar.jpg",
                content_type: "application/x-msdownload",
                bytes: b"MZ\x90\x00".to_vec(),
            },
        ],
    );
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        json!("Only image files are allowed (jpeg, jpg, png, gif, webp)")
    );
    assert!(app.storage.written().is_empty());
}

#[tokio::test]
async fn test_oversize_file_is_rejected() {
    let app = TestApp::with_config(AppConfig {
        max_file_size: 1024 * 1024,
        ..AppConfig::default()
    });
    let request = admin_multipart(
        "POST",
        "/api/admin/testimonials",
        vec![
            Part::Text("name", "N"),
            Part::Text("designation", "D"),
            Part::Text("message", "M"),
            png("image", "big.png", 1024 * 1024 + 1),
        ],
    );
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        json!("File size is too large. Maximum size is 1MB")
    );
    assert!(app.storage.written().is_empty());
}

#[tokio::test]
async fn test_six_megabyte_image_exceeds_default_limit() {
    let app = TestApp::new();
    let request = admin_multipart(
        "POST",
        "/api/admin/gallery",
        vec![
            Part::Text("title", "Poster"),
            png("image", "poster.png", 6 * 1024 * 1024),
        ],
    );
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        json!("File size is too large. Maximum size is 5MB")
    );
    assert!(app.storage.written().is_empty());
}

#[tokio::test]
async fn test_body_limit_saturates_for_huge_file_limits() {
    assert_eq!(request_body_limit(5 * 1024 * 1024), 31 * 1024 * 1024);
    assert_eq!(request_body_limit(usize::MAX), usize::MAX);

    let app = TestApp::with_config(AppConfig {
        max_file_size: usize::MAX,
        ..AppConfig::default()
    });
    let (status, _) = app.send(get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_file_on_unexpected_field_is_rejected() {
    let app = TestApp::new();
    let request = admin_multipart(
        "POST",
        "/api/admin/gallery",
        vec![Part::Text("title", "T"), png("photo", "p.png", 8)],
    );
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Unexpected field `photo`"));
}

#[tokio::test]
async fn test_too_many_project_images_are_rejected() {
    let app = TestApp::new();
    let mut parts = vec![
        Part::Text("title", "T"),
        Part::Text("description", "D"),
        Part::Text("category", "C"),
    ];
    for _ in 0..6 {
        parts.push(png("images", "i.png", 8));
    }
    let (status, _) = app
        .send(admin_multipart("POST", "/api/admin/projects", parts))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_route_rules_run_before_the_service() {
    let app = TestApp::new();
    let (status, body) = app
        .send(admin_json(
            "POST",
            "/api/admin/people",
            json!({ "name": "N", "designation": "D", "category": "STAFF" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"],
        json!([{ "field": "category", "message": "Invalid category" }])
    );
}

// --- Admin CRUD envelope ---

#[tokio::test]
async fn test_admin_delete_returns_deleted_record() {
    let app = TestApp::new();
    let item = app
        .state
        .service::<GalleryItem>()
        .create(payload(json!({ "title": "T", "image": "/uploads/gallery/t.png" })))
        .await
        .unwrap();
    let uri = format!("/api/admin/gallery/{}", item.id);

    let request = as_admin(Request::builder().method("DELETE").uri(&uri))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Gallery item deleted successfully"));
    assert_eq!(body["data"]["id"], json!(item.id.to_string()));

    let (status, body) = app.send(admin_get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Gallery item not found"));
}

#[tokio::test]
async fn test_admin_update_unknown_id_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .send(admin_json(
            "PUT",
            &format!("/api/admin/people/{}", uuid::Uuid::new_v4()),
            json!({ "name": "N", "designation": "D", "category": "TEAM" }),
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Person not found"));

    let (_, listed) = app.send(admin_get("/api/admin/people")).await;
    assert_eq!(listed["count"], json!(0));
}

// --- Public surface ---

async fn seed_people(service: &ResourceService<Person>) {
    for (name, category, order, active) in [
        ("alum-2", "ALUMNI", 2, true),
        ("alum-hidden", "ALUMNI", 0, false),
        ("alum-1", "ALUMNI", 1, true),
        ("team-1", "TEAM", 0, true),
        ("team-hidden", "TEAM", 1, false),
    ] {
        service
            .create(payload(json!({
                "name": name, "designation": "D", "category": category,
                "order": order, "isActive": active
            })))
            .await
            .unwrap();
    }
}

fn names(body: &Value) -> Vec<&str> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_public_alumni_route() {
    let app = TestApp::new();
    seed_people(&app.state.service::<Person>()).await;

    let (status, body) = app.send(get("/api/public/people/alumni")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
    assert_eq!(names(&body), vec!["alum-1", "alum-2"]);
}

#[tokio::test]
async fn test_public_list_floor_overrides_query() {
    let app = TestApp::new();
    seed_people(&app.state.service::<Person>()).await;

    let (_, body) = app
        .send(get("/api/public/people?isActive=false&category=team"))
        .await;
    assert_eq!(names(&body), vec!["team-1"]);

    let (_, body) = app.send(admin_get("/api/admin/people?isActive=false")).await;
    assert_eq!(names(&body), vec!["alum-hidden", "team-hidden"]);
}

#[tokio::test]
async fn test_public_detail_hides_inactive_records() {
    let app = TestApp::new();
    let hidden = app
        .state
        .service::<Person>()
        .create(payload(json!({
            "name": "N", "designation": "D", "category": "TEAM", "isActive": false
        })))
        .await
        .unwrap();

    let (status, body) = app
        .send(get(&format!("/api/public/people/{}", hidden.id)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Person not found"));

    let (status, _) = app
        .send(admin_get(&format!("/api/admin/people/{}", hidden.id)))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_public_projects_are_completed_only() {
    let app = TestApp::new();
    let service = app.state.service::<Project>();
    for (title, status, featured) in [
        ("done", "COMPLETED", true),
        ("wip", "ONGOING", true),
        ("old", "ARCHIVED", false),
    ] {
        service
            .create(payload(json!({
                "title": title, "description": "D", "category": "C",
                "status": status, "isFeatured": featured
            })))
            .await
            .unwrap();
    }

    let (_, body) = app.send(get("/api/public/projects?status=ONGOING")).await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["done"]);

    let (_, featured) = app.send(get("/api/public/projects/featured")).await;
    assert_eq!(featured["count"], json!(1));
    assert_eq!(featured["data"][0]["title"], json!("done"));
}

#[tokio::test]
async fn test_malformed_query_is_bad_request() {
    let app = TestApp::new();
    let (status, body) = app.send(get("/api/public/people?isActive=maybe")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_served_over_tcp_with_cors() {
    let app = TestApp::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/health"))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], json!("Server is running"));
}
