/*!
 * Session bookkeeping and artifact persistence.
 *
 * A session is one run of the pipeline over one document. Each stage's
 * output model is stored under the session so runs can be inspected and
 * resumed stage by stage:
 * - `models`: session ids, status and manifest
 * - `store`: the `ArtifactStore` seam plus file and in-memory backends
 * - `sqlite`: SQLite backend
 */

use std::sync::Arc;

use crate::app_config::{StorageBackend, StorageConfig};
use crate::errors::PipelineError;

pub mod models;
pub mod sqlite;
pub mod store;

pub use models::{SessionId, SessionManifest, SessionStatus, artifact_name};
pub use sqlite::SqliteArtifactStore;
pub use store::{ArtifactStore, FileArtifactStore, MANIFEST_FILE, MemoryArtifactStore};

/// Build the store selected in the configuration
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn ArtifactStore>, PipelineError> {
    Ok(match config.backend {
        StorageBackend::File => Arc::new(FileArtifactStore::new(
            config.root.clone().unwrap_or_else(FileArtifactStore::default_root),
        )),
        StorageBackend::Sqlite => match &config.root {
            Some(path) => Arc::new(SqliteArtifactStore::open(path)?),
            None => Arc::new(SqliteArtifactStore::open_default()?),
        },
        StorageBackend::Memory => Arc::new(MemoryArtifactStore::new()),
    })
}
