//! Durable snapshot storage
//!
//! The whole persistent state is written as one JSON document. The actor
//! hands serialized snapshots to a background `Persister` task so that
//! disk I/O never blocks event processing; when snapshots arrive faster
//! than they can be written, only the newest one is kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Durable store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Writer task failed: {0}")]
    Task(String),
}

/// Opaque key-value style durable store holding one snapshot
pub trait SnapshotStore: Send + Sync + 'static {
    /// Load the last saved snapshot, if any
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &str) -> Result<(), StoreError>;
}

/// Snapshot stored in a JSON file, replaced atomically via rename
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, snapshot: &str) -> Result<(), StoreError> {
        let temp = self.temp_path();
        fs::write(&temp, snapshot).map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))
    }
}

/// In-memory store, for tests and ephemeral deployments
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Arc<Mutex<Option<String>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved snapshot
    pub fn snapshot(&self) -> Option<String> {
        self.snapshot.lock().clone()
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, snapshot: &str) -> Result<(), StoreError> {
        *self.snapshot.lock() = Some(snapshot.to_string());
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// Handle to the background snapshot writer
///
/// Dropping every handle lets the writer finish the pending snapshot and
/// exit.
#[derive(Debug, Clone)]
pub struct Persister {
    latest: watch::Sender<Option<Arc<String>>>,
}

impl Persister {
    /// Spawn the writer task on the current runtime
    pub fn spawn(store: Arc<dyn SnapshotStore>) -> (Self, JoinHandle<()>) {
        let (latest, mut rx) = watch::channel::<Option<Arc<String>>>(None);

        let task = tokio::spawn(async move {
            // `changed` errors once the sender is dropped and the last value seen
            while rx.changed().await.is_ok() {
                let Some(snapshot) = rx.borrow_and_update().clone() else {
                    continue;
                };
                let store = Arc::clone(&store);
                let result = tokio::task::spawn_blocking(move || store.save(&snapshot))
                    .await
                    .map_err(|e| StoreError::Task(e.to_string()))
                    .and_then(|r| r);

                match result {
                    Ok(()) => debug!("Snapshot written"),
                    Err(e) => error!("Failed to write snapshot: {}", e),
                }
            }
            debug!("Persister stopped");
        });

        (Self { latest }, task)
    }

    /// Queue a snapshot, replacing any not yet written
    pub fn submit(&self, snapshot: String) {
        // Only fails if the writer task is gone; state stays authoritative in memory
        if self.latest.send(Some(Arc::new(snapshot))).is_err() {
            error!("Persister is not running; snapshot dropped");
        }
    }
}
