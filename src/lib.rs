use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod response;
pub mod schema;
pub mod service;
pub mod storage;
pub mod store;
pub mod upload;
pub mod validation;

// Module for routing segregation (Public, Admin).
pub mod routes;
use auth::AdminUser;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use service::ResourceService;
pub use storage::{LocalStorage, MockStorageService, StorageState};
pub use store::{InMemoryDocumentStore, PostgresDocumentStore, StoreState};

/// Headroom for form fields and multipart framing on top of the file bytes.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// ApiDoc
///
/// Auto-generates the OpenAPI document served at `/api-docs/openapi.json`. The
/// generic CRUD handlers are instantiated per record kind and are covered by the
/// record schemas below rather than by individual paths.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::team, handlers::faculty, handlers::alumni,
        handlers::golden_alumni, handlers::featured_projects, handlers::submit_contact
    ),
    components(
        schemas(
            models::Person, models::Project, models::Testimonial, models::GalleryItem,
            models::ContactMessage, models::PersonCategory, models::ProjectStatus,
            models::GalleryCategory, models::ContactStatus, error::FieldError,
            handlers::HealthResponse,
        )
    ),
    tags(
        (name = "sdc-backend", description = "Website content management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: the single, immutable container of
/// services and configuration shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Document Store: Postgres in production, in-memory locally and in tests.
    pub store: StoreState,
    /// Upload Storage: where classified files are written.
    pub storage: StorageState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// The resource service for one record kind over the shared store.
    pub fn service<E: schema::Entity>(&self) -> ResourceService<E> {
        ResourceService::new(self.store.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// admin_gate
///
/// Middleware guarding every `/api/admin` route. Extracting `AdminUser` either
/// resolves an ADMIN identity or rejects the request (401 / 403) before any
/// payload is read or any upload is written.
async fn admin_gate(_admin: AdminUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// The transport limit for request bodies. It leaves room for a full multi-file
/// upload so that oversize files are reported by the upload classifier as
/// FileTooLarge. Saturates for very large per-file limits.
pub fn request_body_limit(max_file_size: usize) -> usize {
    max_file_size
        .saturating_mul(admin::MAX_PROJECT_IMAGES + 1)
        .saturating_add(FORM_OVERHEAD_BYTES)
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration (credentials allowed, so origins are listed explicitly)
    let cors = cors_layer(&state.config);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let body_limit = request_body_limit(state.config.max_file_size);

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(handlers::health))
        // Public Routes: No middleware applied.
        .nest("/api/public", public::public_routes())
        // Admin Routes: every matched route passes the admin gate first.
        .nest(
            "/api/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate)),
        )
        // Uploaded files, laid out as `<subfolder>/<filename>` under the upload root.
        .nest_service("/uploads", ServeDir::new(&state.config.upload_path))
        .fallback(handlers::route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (outermost)
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the `TraceLayer` span: method, URI and the `x-request-id`, so every
/// log line for a single request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
