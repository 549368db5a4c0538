use std::env;
use std::path::PathBuf;

/// Default upload ceiling per file (5 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

const LOCAL_JWT_SECRET: &str = "sdc-local-development-secret";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only through the application state (pulled out with `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls logging format and the local auth bypass.
    pub env: Env,
    // TCP port the HTTP server binds on.
    pub port: u16,
    // Document store connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Origins accepted by the CORS layer.
    pub allowed_origins: Vec<String>,
    // Maximum accepted size of a single uploaded file, in bytes.
    pub max_file_size: usize,
    // Root directory for uploaded files; served back under `/uploads`.
    pub upload_path: PathBuf,
    // Secret used to validate identity tokens.
    pub jwt_secret: String,
}

/// Env
///
/// The runtime context. Local enables developer conveniences (pretty logs, header
/// bypass, in-memory store); Production demands every secret explicitly.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Env {
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Local => "local",
            Env::Production => "production",
        }
    }
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for tests and state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 5000,
            db_url: None,
            allowed_origins: default_origins(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            upload_path: PathBuf::from("./uploads"),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `JWT_SECRET` is missing, so the
    /// process never starts against a volatile store or a guessable secret.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_else(|_| default_origins());

        let max_file_size = env::var("MAX_FILE_SIZE")
            .ok()
            .and_then(|size| size.parse().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let upload_path = env::var("UPLOAD_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production")),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        Self {
            env,
            port,
            db_url,
            allowed_origins,
            max_file_size,
            upload_path,
            jwt_secret,
        }
    }
}
