/*!
 * SQLite-backed artifact store.
 */

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use rusqlite::{OptionalExtension, params};

use crate::database::DatabaseConnection;
use crate::document::{DocumentModel, ModelStage};
use crate::errors::PipelineError;

use super::models::{SessionId, SessionManifest, SessionStatus};
use super::store::{ArtifactStore, decode_artifact, missing};

/// Stores artifacts in the `artifacts` table and manifests in `sessions`
#[derive(Debug, Clone)]
pub struct SqliteArtifactStore {
    db: DatabaseConnection,
}

fn persistence(error: anyhow::Error) -> PipelineError {
    PipelineError::Persistence(format!("{:#}", error))
}

impl SqliteArtifactStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        DatabaseConnection::new(path).map(Self::new).map_err(persistence)
    }

    pub fn open_default() -> Result<Self, PipelineError> {
        DatabaseConnection::new_default().map(Self::new).map_err(persistence)
    }

    pub fn in_memory() -> Result<Self, PipelineError> {
        DatabaseConnection::new_in_memory().map(Self::new).map_err(persistence)
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl ArtifactStore for SqliteArtifactStore {
    async fn save(&self, session: &SessionId, stage: ModelStage, model: &DocumentModel) -> Result<(), PipelineError> {
        model.validate()?;
        let payload = model.to_json()?;
        let session_id = session.to_string();
        let source_file = model.metadata.source_file.clone();

        self.db
            .transaction_async(move |tx| {
                let now = Utc::now().to_rfc3339();
                // Artifacts may be stored before the first manifest
                tx.execute(
                    "INSERT OR IGNORE INTO sessions (id, source_file, status, manifest, created_at, updated_at)
                     VALUES (?1, ?2, ?3, NULL, ?4, ?4)",
                    params![session_id, source_file, SessionStatus::InProgress.to_string(), now],
                )?;
                tx.execute(
                    "INSERT OR REPLACE INTO artifacts (session_id, stage, payload, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![session_id, stage.as_str(), payload, now],
                )?;
                Ok(())
            })
            .await
            .map_err(persistence)?;

        debug!("Saved {} artifact for session {}", stage, session.short());
        Ok(())
    }

    async fn load(&self, session: &SessionId, stage: ModelStage) -> Result<DocumentModel, PipelineError> {
        let session_id = session.to_string();

        let payload: Option<String> = self
            .db
            .execute_async(move |conn| {
                conn.query_row(
                    "SELECT payload FROM artifacts WHERE session_id = ?1 AND stage = ?2",
                    params![session_id, stage.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to query artifact")
            })
            .await
            .map_err(persistence)?;

        let payload = payload.ok_or_else(|| missing(session, stage))?;
        decode_artifact(&payload, stage)
    }

    async fn exists(&self, session: &SessionId, stage: ModelStage) -> Result<bool, PipelineError> {
        let session_id = session.to_string();

        self.db
            .execute_async(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM artifacts WHERE session_id = ?1 AND stage = ?2",
                    params![session_id, stage.as_str()],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(persistence)
    }

    async fn save_manifest(&self, manifest: &SessionManifest) -> Result<(), PipelineError> {
        let json = serde_json::to_string(manifest).map_err(|e| PipelineError::Persistence(e.to_string()))?;
        let manifest = manifest.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO sessions (id, source_file, status, manifest, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                        status = excluded.status,
                        manifest = excluded.manifest,
                        updated_at = excluded.updated_at",
                    params![
                        manifest.session_id.to_string(),
                        manifest.source_file,
                        manifest.status.to_string(),
                        json,
                        manifest.created_at.to_rfc3339(),
                        manifest.updated_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(persistence)
    }

    async fn load_manifest(&self, session: &SessionId) -> Result<Option<SessionManifest>, PipelineError> {
        let session_id = session.to_string();

        let json: Option<Option<String>> = self
            .db
            .execute_async(move |conn| {
                conn.query_row(
                    "SELECT manifest FROM sessions WHERE id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to query session")
            })
            .await
            .map_err(persistence)?;

        match json.flatten() {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| PipelineError::InvalidArtifact(format!("manifest of {}: {}", session, e))),
            None => Ok(None),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<SessionManifest>, PipelineError> {
        let rows: Vec<String> = self
            .db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT manifest FROM sessions WHERE manifest IS NOT NULL ORDER BY created_at",
                )?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(persistence)?;

        Ok(rows
            .iter()
            .filter_map(|json| match serde_json::from_str::<SessionManifest>(json) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    warn!("Skipping unreadable session manifest: {}", e);
                    None
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
