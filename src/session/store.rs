/*!
 * Artifact stores.
 *
 * Every stage output is persisted per session so a run can be inspected or
 * resumed from any stage. Loaded artifacts are validated before any stage
 * sees them.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::document::{DocumentModel, ModelStage};
use crate::errors::PipelineError;

use super::models::{SessionId, SessionManifest, artifact_name};

/// Manifest file inside a session directory
pub const MANIFEST_FILE: &str = "session_manifest.json";

/// Persistence collaborator for stage artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store the model a stage produced
    async fn save(&self, session: &SessionId, stage: ModelStage, model: &DocumentModel) -> Result<(), PipelineError>;

    /// Load and validate a stage's model; `StageInputMissing` when absent
    async fn load(&self, session: &SessionId, stage: ModelStage) -> Result<DocumentModel, PipelineError>;

    async fn exists(&self, session: &SessionId, stage: ModelStage) -> Result<bool, PipelineError>;

    async fn save_manifest(&self, manifest: &SessionManifest) -> Result<(), PipelineError>;

    async fn load_manifest(&self, session: &SessionId) -> Result<Option<SessionManifest>, PipelineError>;

    /// Manifests of every known session, oldest first
    async fn list_sessions(&self) -> Result<Vec<SessionManifest>, PipelineError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

pub(crate) fn missing(session: &SessionId, stage: ModelStage) -> PipelineError {
    PipelineError::StageInputMissing {
        session: session.to_string(),
        stage: stage.to_string(),
    }
}

pub(crate) fn persistence(error: impl std::fmt::Display) -> PipelineError {
    PipelineError::Persistence(error.to_string())
}

/// Parse a stored artifact and check it belongs to the requested stage
pub(crate) fn decode_artifact(json: &str, stage: ModelStage) -> Result<DocumentModel, PipelineError> {
    let model = DocumentModel::from_json(json)?;
    if model.metadata.stage != stage {
        return Err(PipelineError::InvalidArtifact(format!(
            "expected a {} artifact, found {}",
            stage, model.metadata.stage
        )));
    }
    Ok(model)
}

/// One directory per session under a root directory
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<data dir>/docbabel/sessions`, or `./sessions` when no data dir exists
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .map(|d| d.join("docbabel").join("sessions"))
            .unwrap_or_else(|| PathBuf::from("sessions"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(session.as_str())
    }

    pub fn artifact_path(&self, session: &SessionId, stage: ModelStage) -> PathBuf {
        self.session_dir(session).join(artifact_name(stage))
    }

    /// Write through a temporary file so readers never see a partial artifact
    async fn write_atomic(&self, path: &Path, contents: String) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(persistence)?;
        }

        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, contents).await.map_err(persistence)?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(persistence(e));
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn save(&self, session: &SessionId, stage: ModelStage, model: &DocumentModel) -> Result<(), PipelineError> {
        model.validate()?;
        let path = self.artifact_path(session, stage);
        self.write_atomic(&path, model.to_json()?).await?;
        debug!("Saved {} artifact to {:?}", stage, path);
        Ok(())
    }

    async fn load(&self, session: &SessionId, stage: ModelStage) -> Result<DocumentModel, PipelineError> {
        let path = self.artifact_path(session, stage);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(missing(session, stage)),
            Err(e) => return Err(persistence(e)),
        };
        decode_artifact(&json, stage)
    }

    async fn exists(&self, session: &SessionId, stage: ModelStage) -> Result<bool, PipelineError> {
        tokio::fs::try_exists(self.artifact_path(session, stage))
            .await
            .map_err(persistence)
    }

    async fn save_manifest(&self, manifest: &SessionManifest) -> Result<(), PipelineError> {
        let path = self.session_dir(&manifest.session_id).join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(manifest).map_err(persistence)?;
        self.write_atomic(&path, json).await
    }

    async fn load_manifest(&self, session: &SessionId) -> Result<Option<SessionManifest>, PipelineError> {
        let path = self.session_dir(session).join(MANIFEST_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json).map_err(|e| {
                PipelineError::InvalidArtifact(format!("{:?}: {}", path, e))
            })?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence(e)),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<SessionManifest>, PipelineError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence(e)),
        };

        let mut manifests = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(persistence)? {
            let manifest_path = entry.path().join(MANIFEST_FILE);
            let Ok(json) = tokio::fs::read_to_string(&manifest_path).await else {
                continue;
            };
            match serde_json::from_str::<SessionManifest>(&json) {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => warn!("Skipping unreadable manifest {:?}: {}", manifest_path, e),
            }
        }

        manifests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(manifests)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Keeps serialized artifacts in memory; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<(SessionId, ModelStage), String>>,
    manifests: RwLock<HashMap<SessionId, SessionManifest>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stored artifact with raw JSON
    pub fn put_raw(&self, session: &SessionId, stage: ModelStage, json: impl Into<String>) {
        self.artifacts.write().insert((session.clone(), stage), json.into());
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn save(&self, session: &SessionId, stage: ModelStage, model: &DocumentModel) -> Result<(), PipelineError> {
        model.validate()?;
        // Serialized so loads go through the same validation as other backends
        let json = model.to_json()?;
        self.artifacts.write().insert((session.clone(), stage), json);
        Ok(())
    }

    async fn load(&self, session: &SessionId, stage: ModelStage) -> Result<DocumentModel, PipelineError> {
        let json = self
            .artifacts
            .read()
            .get(&(session.clone(), stage))
            .cloned()
            .ok_or_else(|| missing(session, stage))?;
        decode_artifact(&json, stage)
    }

    async fn exists(&self, session: &SessionId, stage: ModelStage) -> Result<bool, PipelineError> {
        Ok(self.artifacts.read().contains_key(&(session.clone(), stage)))
    }

    async fn save_manifest(&self, manifest: &SessionManifest) -> Result<(), PipelineError> {
        self.manifests
            .write()
            .insert(manifest.session_id.clone(), manifest.clone());
        Ok(())
    }

    async fn load_manifest(&self, session: &SessionId) -> Result<Option<SessionManifest>, PipelineError> {
        Ok(self.manifests.read().get(session).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionManifest>, PipelineError> {
        let mut manifests: Vec<SessionManifest> = self.manifests.read().values().cloned().collect();
        manifests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(manifests)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
