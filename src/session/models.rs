/*!
 * Session identifiers and manifests.
 */

use chrono::{DateTime, Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::document::ModelStage;

static SESSION_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{12}_\d{8}_\d{6}$").unwrap());

/// Identifier of one document run: `<12 hex>_<YYYYMMDD>_<HHMMSS>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// New id for a source file, stamped with the current local time.
    ///
    /// A random nonce keeps runs of the same file within one second apart.
    pub fn generate(file_name: &str) -> Self {
        Self::generate_at(file_name, Local::now(), &Uuid::new_v4().simple().to_string())
    }

    /// Id for a source file at a given time; equal inputs give equal ids
    pub fn generate_at(file_name: &str, at: DateTime<Local>, nonce: &str) -> Self {
        let timestamp = at.format("%Y%m%d_%H%M%S").to_string();

        let mut hasher = Sha256::new();
        hasher.update(format!("{}_{}_{}", file_name, timestamp, nonce).as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        Self(format!("{}_{}", &digest[..12], timestamp))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if SESSION_ID_PATTERN.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(anyhow::anyhow!("Invalid session id: {}", s))
        }
    }
}

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Stages still running
    #[default]
    InProgress,
    /// Output document written
    Completed,
    /// A document-level error stopped the run
    Failed,
    /// Stopped through the cancellation token
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::InProgress => write!(f, "in_progress"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid session status: {}", s)),
        }
    }
}

/// Artifact name a stage's model is stored under
pub fn artifact_name(stage: ModelStage) -> &'static str {
    match stage {
        ModelStage::Extracted => "01_extracted_structure.json",
        ModelStage::Translated => "02_translated_content.json",
        ModelStage::Styled => "03_styled_content.json",
    }
}

/// Bookkeeping record of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub session_id: SessionId,
    pub source_file: String,
    #[serde(default)]
    pub source_language: String,
    #[serde(default)]
    pub target_language: String,
    /// Last stage whose artifact was stored
    #[serde(default)]
    pub stage: Option<ModelStage>,
    #[serde(default)]
    pub status: SessionStatus,
    /// Stage name to artifact name
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
    #[serde(default)]
    pub degraded_elements: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionManifest {
    pub fn new(
        session_id: SessionId,
        source_file: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            source_file: source_file.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            stage: None,
            status: SessionStatus::InProgress,
            artifacts: BTreeMap::new(),
            degraded_elements: 0,
            output_path: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record that a stage's artifact was stored
    pub fn record_stage(&mut self, stage: ModelStage) {
        self.stage = Some(stage);
        self.artifacts
            .insert(stage.as_str().to_string(), artifact_name(stage).to_string());
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, output_path: impl Into<String>) {
        self.status = SessionStatus::Completed;
        self.output_path = Some(output_path.into());
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = SessionStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    pub fn mark_cancelled(&mut self) {
        self.status = SessionStatus::Cancelled;
        self.updated_at = Utc::now();
    }
}
