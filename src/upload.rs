//! Upload classification.
//!
//! Every file-bearing request passes through the `UploadClassifier` before any
//! service runs: files are type-checked, size-limited, given a collision
//! resistant name, written through the `StorageService`, and replaced in the
//! payload by their public `/uploads/...` URL.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, multipart::Field},
    http::header,
};
use chrono::Utc;
use rand::Rng;
use serde_json::{Map, Value};
use std::path::Path;

use crate::{AppState, error::AppError, storage::StorageState, validation::FieldRule};

/// File types accepted for upload, checked against both extension and MIME type.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// Public URL prefix under which the upload root is served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// UploadDestination
///
/// The subfolder of the upload root a file lands in. Routes pass this explicitly;
/// it is never inferred from the request at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDestination {
    Gallery,
    People,
    Projects,
    Misc,
}

impl UploadDestination {
    pub const ALL: [UploadDestination; 4] = [
        UploadDestination::Gallery,
        UploadDestination::People,
        UploadDestination::Projects,
        UploadDestination::Misc,
    ];

    pub fn subfolder(self) -> &'static str {
        match self {
            UploadDestination::Gallery => "gallery",
            UploadDestination::People => "people",
            UploadDestination::Projects => "projects",
            UploadDestination::Misc => "misc",
        }
    }

    /// The legacy routing rule, keyed on a mount path such as `/api/admin/gallery`.
    /// Route registration uses explicit destinations; this is kept so the served
    /// layout can be checked against it.
    pub fn from_base_path(base_path: &str) -> Self {
        if base_path.contains("gallery") {
            UploadDestination::Gallery
        } else if base_path.contains("people") {
            UploadDestination::People
        } else if base_path.contains("project") {
            UploadDestination::Projects
        } else {
            UploadDestination::Misc
        }
    }
}

/// UploadField
///
/// The one multipart field a route accepts files on, how many files it takes,
/// and where they go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadField {
    pub name: &'static str,
    pub max_count: usize,
    pub destination: UploadDestination,
}

impl UploadField {
    pub const fn single(name: &'static str, destination: UploadDestination) -> Self {
        Self {
            name,
            max_count: 1,
            destination,
        }
    }

    /// A multi-file field. The payload receives an ordered list of URLs even
    /// when a single file is sent.
    pub const fn multiple(
        name: &'static str,
        max_count: usize,
        destination: UploadDestination,
    ) -> Self {
        Self {
            name,
            max_count,
            destination,
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.max_count > 1
    }
}

/// check_file_type
///
/// Both the extension of the original file name and the declared MIME type must
/// name an allowed image type. Returns the original extension (with its dot, or
/// empty) for reuse in the generated name.
pub fn check_file_type(file_name: &str, content_type: &str) -> Result<String, AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    let extension_ok = ALLOWED_IMAGE_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(extension));
    let mime = content_type.to_ascii_lowercase();
    let mime_ok = ALLOWED_IMAGE_TYPES.iter().any(|allowed| mime.contains(allowed));

    if extension_ok && mime_ok {
        Ok(format!(".{}", extension))
    } else {
        tracing::debug!(file_name, content_type, "upload rejected by type filter");
        Err(AppError::InvalidFileType)
    }
}

pub fn check_file_size(size: usize, max_bytes: usize) -> Result<(), AppError> {
    if size > max_bytes {
        Err(AppError::FileTooLarge { max_bytes })
    } else {
        Ok(())
    }
}

/// `<field>-<millis>-<suffix><extension>`
pub fn filename_with(field: &str, extension: &str, millis: i64, suffix: u32) -> String {
    format!("{}-{}-{}{}", field, millis, suffix, extension)
}

pub fn generate_filename(field: &str, extension: &str) -> String {
    let suffix = rand::thread_rng().gen_range(0..1_000_000_000);
    filename_with(field, extension, Utc::now().timestamp_millis(), suffix)
}

pub fn public_url(destination: UploadDestination, filename: &str) -> String {
    format!("{}/{}/{}", UPLOADS_URL_PREFIX, destination.subfolder(), filename)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub destination: UploadDestination,
    pub url: String,
}

/// UploadClassifier
///
/// Validates and persists incoming files. Constructed per request from the
/// shared storage handle and the configured size limit.
#[derive(Clone)]
pub struct UploadClassifier {
    storage: StorageState,
    max_file_size: usize,
}

impl UploadClassifier {
    pub fn new(storage: StorageState, max_file_size: usize) -> Self {
        Self {
            storage,
            max_file_size,
        }
    }

    async fn store(
        &self,
        field: UploadField,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, AppError> {
        let filename = generate_filename(field.name, extension);
        self.storage
            .put(field.destination, &filename, bytes)
            .await
            .map_err(AppError::Internal)?;

        tracing::info!(
            destination = field.destination.subfolder(),
            %filename,
            size = bytes.len(),
            "file uploaded"
        );

        Ok(StoredFile {
            url: public_url(field.destination, &filename),
            filename,
            destination: field.destination,
        })
    }

    /// Reads one file part chunk by chunk, failing as soon as it outgrows the limit.
    async fn read_limited(&self, field: &mut Field<'_>) -> Result<Vec<u8>, AppError> {
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            check_file_size(bytes.len() + chunk.len(), self.max_file_size)?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    /// read_form
    ///
    /// Turns a multipart body into a flat payload. Text parts become string
    /// values (a repeated name becomes a list). File parts are only accepted on
    /// the route's upload field; their URLs are assigned to that field, as a
    /// single string or as an ordered list for multi-file fields.
    pub async fn read_form(
        &self,
        mut multipart: Multipart,
        upload: Option<UploadField>,
    ) -> Result<Map<String, Value>, AppError> {
        let mut payload = Map::new();
        let mut urls: Vec<String> = Vec::new();

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                append_text(&mut payload, name, text);
                continue;
            };

            // Browsers send an empty part when no file was chosen.
            if file_name.is_empty() {
                continue;
            }

            let upload = upload
                .filter(|u| u.name == name)
                .ok_or_else(|| AppError::BadRequest(format!("Unexpected field `{}`", name)))?;
            if urls.len() >= upload.max_count {
                return Err(AppError::BadRequest(format!(
                    "Too many files for field `{}` (maximum {})",
                    name, upload.max_count
                )));
            }

            let content_type = field.content_type().unwrap_or_default().to_string();
            let extension = check_file_type(&file_name, &content_type)?;
            let bytes = self.read_limited(&mut field).await?;
            let stored = self.store(upload, &extension, &bytes).await?;
            urls.push(stored.url);
        }

        if let Some(upload) = upload.filter(|_| !urls.is_empty()) {
            let value = if upload.is_multiple() {
                Value::from(urls)
            } else {
                Value::from(urls.remove(0))
            };
            payload.insert(upload.name.to_string(), value);
        }

        Ok(payload)
    }
}

fn append_text(payload: &mut Map<String, Value>, name: String, text: String) {
    match payload.get_mut(&name) {
        Some(Value::Array(items)) => items.push(Value::String(text)),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(text)]);
        }
        None => {
            payload.insert(name, Value::String(text));
        }
    }
}

// --- Request Extraction ---

/// ResourceRoute
///
/// Per-route configuration installed as a request extension by the router: the
/// accepted upload field (if any) and the validation rules for create and update.
#[derive(Debug, Clone, Copy)]
pub struct ResourceRoute {
    pub upload: Option<UploadField>,
    pub create_rules: &'static [FieldRule],
    pub update_rules: &'static [FieldRule],
}

impl ResourceRoute {
    /// A route whose create and update share one rule list.
    pub const fn new(upload: Option<UploadField>, rules: &'static [FieldRule]) -> Self {
        Self {
            upload,
            create_rules: rules,
            update_rules: rules,
        }
    }
}

/// ResourcePayload
///
/// The request body as a JSON object, whether it arrived as multipart form data
/// (files already classified and stored) or as JSON. An empty body is an empty
/// payload. Malformed bodies are rejected with `BadRequest`.
#[derive(Debug, Clone, Default)]
pub struct ResourcePayload(pub Map<String, Value>);

impl FromRequest<AppState> for ResourcePayload {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let upload = req
            .extensions()
            .get::<ResourceRoute>()
            .and_then(|route| route.upload);

        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            let classifier = UploadClassifier::new(state.storage.clone(), state.config.max_file_size);
            return classifier.read_form(multipart, upload).await.map(ResourcePayload);
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ResourcePayload::default());
        }

        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => Ok(ResourcePayload(map)),
            Ok(_) => Err(AppError::BadRequest(
                "Request body must be a JSON object".to_string(),
            )),
            Err(e) => Err(AppError::BadRequest(format!("Invalid JSON body: {}", e))),
        }
    }
}
