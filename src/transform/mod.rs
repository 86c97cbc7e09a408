/*!
 * Role-based transform stages.
 *
 * A stage consumes a `DocumentModel` and returns a new one with the same
 * blocks, kinds and positions. Two variants exist:
 * - `translate`: replaces text through a `Translator`
 * - `style`: applies a `StyleProfile` and `LanguagePolicy`
 */

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{DocumentModel, ElementKind, ModelStage};
use crate::errors::PipelineError;

pub mod profile;
pub mod style;
pub mod translate;

pub use profile::{KindStyle, LanguagePolicy, StyleProfile, WritingDirection};
pub use style::StyleStage;
pub use translate::{TranslationStage, TranslationStageConfig};

/// An element that fell back to its input during a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub position: Option<usize>,
    pub kind: ElementKind,
    pub reason: String,
}

/// What a stage did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: ModelStage,
    /// Elements (or table cells) the stage changed
    pub processed: usize,
    /// Elements passed through untouched
    pub skipped: usize,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl StageReport {
    pub fn new(stage: ModelStage) -> Self {
        Self {
            stage,
            processed: 0,
            skipped: 0,
            degradations: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} processed, {} skipped, {} degraded in {}ms",
            self.stage,
            self.processed,
            self.skipped,
            self.degradations.len(),
            self.duration_ms
        )
    }
}

/// Output model plus report
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub model: DocumentModel,
    pub report: StageReport,
}

/// A document-to-document transformation
#[async_trait]
pub trait TransformStage: Send + Sync {
    /// Stage label of the produced model
    fn stage(&self) -> ModelStage;

    async fn transform(&self, model: &DocumentModel) -> Result<StageOutput, PipelineError>;
}

/// Fail if a stage changed the block sequence it was handed
pub(crate) fn ensure_structure_preserved(
    input: &DocumentModel,
    output: &DocumentModel,
) -> Result<(), PipelineError> {
    if input.positions() != output.positions() || input.kinds() != output.kinds() {
        return Err(PipelineError::MissingPositionInvariant(format!(
            "stage output for {} does not keep the input block sequence",
            input.metadata.source_file
        )));
    }
    Ok(())
}
