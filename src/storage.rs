use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::upload::UploadDestination;

// 1. StorageService Contract
/// StorageService
///
/// Defines the abstract contract for persisting uploaded image bytes. Handlers and
/// the upload classifier only talk to this trait, so the concrete backend can be
/// swapped from the on-disk implementation (LocalStorage) to the in-memory Mock
/// (MockStorageService) during testing.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates every destination subfolder. Called once at startup; idempotent.
    async fn prepare(&self) -> Result<(), String>;

    /// Writes `bytes` as `<destination>/<filename>`.
    ///
    /// # Arguments
    /// * `destination`: The subfolder chosen by the upload classifier.
    /// * `filename`: The generated, collision-resistant file name.
    async fn put(
        &self,
        destination: UploadDestination,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), String>;
}

// 2. The Real Implementation (Local Filesystem)
/// LocalStorage
///
/// Writes uploads beneath the configured upload root. The same root is mounted by
/// the router under `/uploads`, so a stored file is immediately reachable at the
/// URL the classifier handed back.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, destination: UploadDestination, filename: &str) -> PathBuf {
        self.root
            .join(destination.subfolder())
            .join(sanitize_filename(filename))
    }
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn prepare(&self) -> Result<(), String> {
        for destination in UploadDestination::ALL {
            let dir = self.root.join(destination.subfolder());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| format!("failed to create {}: {}", dir.display(), e))?;
        }
        tracing::debug!(root = %self.root.display(), "upload directories ready");
        Ok(())
    }

    async fn put(
        &self,
        destination: UploadDestination,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), String> {
        let path = self.path_for(destination, filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "upload stored");
        Ok(())
    }
}

/// sanitize_filename
///
/// Reduces a name to its final path segment so that nothing can escape the
/// destination folder (e.g. `../../etc/passwd` becomes `passwd`).
fn sanitize_filename(name: &str) -> String {
    name.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .last()
        .unwrap_or("upload")
        .to_string()
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// An in-memory `StorageService` used by the test suite. It records the
/// `<subfolder>/<filename>` of every write so tests can assert on routing without
/// touching the disk, and can be told to fail every operation.
#[derive(Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    writes: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Every path written so far, in write order.
    pub fn written(&self) -> Vec<String> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn prepare(&self) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(())
    }

    async fn put(
        &self,
        destination: UploadDestination,
        filename: &str,
        _bytes: &[u8],
    ) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }

        let key = format!("{}/{}", destination.subfolder(), sanitize_filename(filename));
        self.writes
            .lock()
            .map_err(|_| "Mock Storage Error: poisoned".to_string())?
            .push(key);
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
