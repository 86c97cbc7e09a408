/*!
 * Pipeline orchestrator.
 *
 * Runs one document through Extract → Translate → Style → Reconstruct.
 * Every stage output is stored in the session's artifact store and the next
 * stage reads its input back from there, so a run can be resumed from the
 * last stored stage.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{error, info, warn};
use thiserror::Error;

use crate::document::{ModelStage, Outline};
use crate::errors::PipelineError;
use crate::extraction::Extractor;
use crate::reconstruct::{Reconstructor, writer_for_path};
use crate::session::{ArtifactStore, SessionId, SessionManifest};
use crate::transform::{StageReport, TransformStage};

/// Document-level cancellation flag, checked before each stage
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Extraction,
    Translation,
    Styling,
    Reconstruction,
}

impl PipelinePhase {
    /// Phase that produces a stage's artifact
    pub fn for_stage(stage: ModelStage) -> Self {
        match stage {
            ModelStage::Extracted => Self::Extraction,
            ModelStage::Translated => Self::Translation,
            ModelStage::Styled => Self::Styling,
        }
    }

    /// Share of the overall run finished when this phase starts and ends
    fn progress_span(&self) -> (f32, f32) {
        match self {
            Self::Extraction => (0.0, 0.1),
            Self::Translation => (0.1, 0.8),
            Self::Styling => (0.8, 0.9),
            Self::Reconstruction => (0.9, 1.0),
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extraction => "extraction",
            Self::Translation => "translation",
            Self::Styling => "styling",
            Self::Reconstruction => "reconstruction",
        };
        f.write_str(name)
    }
}

/// Progress information passed to the callback
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineProgress {
    pub phase: PipelinePhase,
    /// 0.0 - 1.0
    pub overall_progress: f32,
    pub status: String,
}

impl PipelineProgress {
    fn at(phase: PipelinePhase, finished: bool, status: impl Into<String>) -> Self {
        let (start, end) = phase.progress_span();
        Self {
            phase,
            overall_progress: if finished { end } else { start },
            status: status.into(),
        }
    }
}

pub type ProgressCallback = Box<dyn Fn(&PipelineProgress) + Send + Sync>;

/// A document-level failure and the phase it happened in
#[derive(Error, Debug)]
#[error("{phase} failed: {error}")]
pub struct PipelineFailure {
    pub phase: PipelinePhase,
    #[source]
    pub error: PipelineError,
    /// Session the failure was recorded under, if one was created
    pub session_id: Option<SessionId>,
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub session_id: SessionId,
    pub output_path: PathBuf,
    /// Present when the run started from the source document
    pub outline: Option<Outline>,
    pub reports: Vec<StageReport>,
    pub duration: Duration,
}

impl PipelineResult {
    /// Elements that kept their input because a transform failed on them
    pub fn degraded_elements(&self) -> usize {
        self.reports.iter().map(|r| r.degradations.len()).sum()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded_elements() > 0
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![format!("Duration: {:.2}s", self.duration.as_secs_f32())];
        parts.extend(self.reports.iter().map(StageReport::summary));
        parts.push(format!("Output: {}", self.output_path.display()));
        parts.join(" | ")
    }
}

/// Runs documents through the stages against one artifact store.
pub struct DocumentPipeline {
    extractor: Extractor,
    stages: Vec<Arc<dyn TransformStage>>,
    reconstructor: Reconstructor,
    store: Arc<dyn ArtifactStore>,
    cancellation: CancellationToken,
    progress: Option<ProgressCallback>,
    source_language: String,
    target_language: String,
}

impl DocumentPipeline {
    /// `translation` and `style` run in that order after extraction
    pub fn new(
        extractor: Extractor,
        translation: Arc<dyn TransformStage>,
        style: Arc<dyn TransformStage>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            extractor,
            stages: vec![translation, style],
            reconstructor: Reconstructor::new(),
            store,
            cancellation: CancellationToken::new(),
            progress: None,
            source_language: String::new(),
            target_language: String::new(),
        }
    }

    /// Languages recorded in session manifests
    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_language = source.into();
        self.target_language = target.into();
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Run every stage on `input` and write the result to `output`
    pub async fn run(&self, input: &Path, output: &Path) -> Result<PipelineResult, PipelineFailure> {
        let started = Instant::now();
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| input.display().to_string());

        let session = SessionId::generate(&file_name);
        let mut manifest = SessionManifest::new(
            session.clone(),
            file_name.as_str(),
            self.source_language.as_str(),
            self.target_language.as_str(),
        );
        info!("Session {} started for {}", session, input.display());

        let result = self.run_from_source(&session, &mut manifest, input, output).await;
        self.finish(started, &session, &mut manifest, output, result).await
    }

    /// Continue a stored session from the stage after the last stored one
    pub async fn resume(&self, session: &SessionId, output: &Path) -> Result<PipelineResult, PipelineFailure> {
        let started = Instant::now();
        let fail = |phase, error| PipelineFailure {
            phase,
            error,
            session_id: Some(session.clone()),
        };

        let mut manifest = self
            .store
            .load_manifest(session)
            .await
            .map_err(|e| fail(PipelinePhase::Extraction, e))?
            .ok_or_else(|| {
                fail(
                    PipelinePhase::Extraction,
                    PipelineError::StageInputMissing {
                        session: session.to_string(),
                        stage: ModelStage::Extracted.to_string(),
                    },
                )
            })?;
        info!("Resuming session {} after stage {:?}", session, manifest.stage);

        let result = self
            .run_remaining(session, &mut manifest, output)
            .await
            .map(|reports| (None, reports));
        self.finish(started, session, &mut manifest, output, result).await
    }

    /// Run one transform stage of a stored session, reading the previous
    /// stage's artifact and storing the result
    pub async fn run_stage(&self, session: &SessionId, stage: ModelStage) -> Result<StageReport, PipelineError> {
        let transform = self
            .stages
            .iter()
            .find(|s| s.stage() == stage)
            .ok_or_else(|| PipelineError::InvalidArtifact(format!("no transform produces the {} stage", stage)))?;
        let previous = stage
            .previous()
            .ok_or_else(|| PipelineError::InvalidArtifact(format!("{} is not a transform stage", stage)))?;

        let input = self.store.load(session, previous).await?;
        let output = transform.transform(&input).await?;
        self.store.save(session, stage, &output.model).await?;

        info!("Session {}: {}", session.short(), output.report.summary());
        Ok(output.report)
    }

    /// Rebuild the output document from a session's styled artifact
    pub async fn reconstruct(&self, session: &SessionId, output: &Path) -> Result<(), PipelineError> {
        let writer = writer_for_path(output)?;
        let model = self.store.load(session, ModelStage::Styled).await?;
        let document = self.reconstructor.reconstruct(&model)?;
        writer.write(&document, output)
    }

    async fn run_from_source(
        &self,
        session: &SessionId,
        manifest: &mut SessionManifest,
        input: &Path,
        output: &Path,
    ) -> Result<(Option<Outline>, Vec<StageReport>), (PipelinePhase, PipelineError)> {
        let phase = PipelinePhase::Extraction;
        self.persist_manifest(manifest).await.map_err(|e| (phase, e))?;
        self.check_cancelled(phase)?;
        self.report(PipelineProgress::at(phase, false, format!("Extracting {}", input.display())));

        let extraction = self.extractor.extract_path(input).map_err(|e| (phase, e))?;
        self.store
            .save(session, ModelStage::Extracted, &extraction.model)
            .await
            .map_err(|e| (phase, e))?;
        manifest.record_stage(ModelStage::Extracted);
        self.persist_manifest(manifest).await.map_err(|e| (phase, e))?;

        self.report(PipelineProgress::at(
            phase,
            true,
            format!("Extracted {} blocks", extraction.model.len()),
        ));

        let reports = self.run_remaining(session, manifest, output).await?;
        Ok((Some(extraction.outline), reports))
    }

    async fn run_remaining(
        &self,
        session: &SessionId,
        manifest: &mut SessionManifest,
        output: &Path,
    ) -> Result<Vec<StageReport>, (PipelinePhase, PipelineError)> {
        let mut reports = Vec::new();

        for transform in &self.stages {
            let stage = transform.stage();
            if manifest.stage.is_some_and(|done| done >= stage) {
                continue;
            }

            let phase = PipelinePhase::for_stage(stage);
            self.check_cancelled(phase)?;
            self.report(PipelineProgress::at(phase, false, format!("Running {} stage", stage)));

            let report = self.run_stage(session, stage).await.map_err(|e| (phase, e))?;
            manifest.record_stage(stage);
            manifest.degraded_elements += report.degradations.len();
            self.persist_manifest(manifest).await.map_err(|e| (phase, e))?;

            self.report(PipelineProgress::at(phase, true, report.summary()));
            reports.push(report);
        }

        let phase = PipelinePhase::Reconstruction;
        self.check_cancelled(phase)?;
        self.report(PipelineProgress::at(phase, false, format!("Writing {}", output.display())));
        self.reconstruct(session, output).await.map_err(|e| (phase, e))?;
        self.report(PipelineProgress::at(phase, true, "Done"));

        Ok(reports)
    }

    async fn finish(
        &self,
        started: Instant,
        session: &SessionId,
        manifest: &mut SessionManifest,
        output: &Path,
        result: Result<(Option<Outline>, Vec<StageReport>), (PipelinePhase, PipelineError)>,
    ) -> Result<PipelineResult, PipelineFailure> {
        match result {
            Ok((outline, reports)) => {
                manifest.mark_completed(output.display().to_string());
                if let Err(e) = self.persist_manifest(manifest).await {
                    warn!("Failed to update manifest of session {}: {}", session, e);
                }

                let result = PipelineResult {
                    session_id: session.clone(),
                    output_path: output.to_path_buf(),
                    outline,
                    reports,
                    duration: started.elapsed(),
                };
                info!("Session {} completed: {}", session.short(), result.summary());
                Ok(result)
            }
            Err((phase, error)) => {
                if matches!(error, PipelineError::Cancelled) {
                    warn!("Session {} cancelled before {}", session, phase);
                    manifest.mark_cancelled();
                } else {
                    error!("Session {} failed during {}: {}", session, phase, error);
                    manifest.mark_failed(error.to_string());
                }
                if let Err(e) = self.persist_manifest(manifest).await {
                    warn!("Failed to update manifest of session {}: {}", session, e);
                }

                Err(PipelineFailure {
                    phase,
                    error,
                    session_id: Some(session.clone()),
                })
            }
        }
    }

    async fn persist_manifest(&self, manifest: &SessionManifest) -> Result<(), PipelineError> {
        self.store.save_manifest(manifest).await
    }

    fn check_cancelled(&self, phase: PipelinePhase) -> Result<(), (PipelinePhase, PipelineError)> {
        if self.cancellation.is_cancelled() {
            Err((phase, PipelineError::Cancelled))
        } else {
            Ok(())
        }
    }

    fn report(&self, progress: PipelineProgress) {
        if let Some(callback) = &self.progress {
            callback(&progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryArtifactStore, SessionStatus};
    use crate::transform::{StyleStage, TranslationStage, TranslationStageConfig};
    use crate::translation::MockTranslator;
    use parking_lot::Mutex;

    fn pipeline(translator: MockTranslator, store: Arc<MemoryArtifactStore>) -> DocumentPipeline {
        let translation = TranslationStage::new(Arc::new(translator), TranslationStageConfig::new("en", "es"));
        DocumentPipeline::new(
            Extractor::default(),
            Arc::new(translation),
            Arc::new(StyleStage::default()),
            store,
        )
        .with_languages("en", "es")
    }

    fn write_input(dir: &Path) -> PathBuf {
        let input = dir.join("notes.txt");
        std::fs::write(&input, "Hello there.\n\nSecond paragraph.\n").unwrap();
        input
    }

    #[tokio::test]
    async fn test_run_shouldStoreEveryStageAndWriteOutput() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path());
        let output = dir.path().join("notes_es.txt");
        let store = Arc::new(MemoryArtifactStore::new());

        let result = pipeline(MockTranslator::working(), store.clone())
            .run(&input, &output)
            .await
            .unwrap();

        for stage in [ModelStage::Extracted, ModelStage::Translated, ModelStage::Styled] {
            assert!(store.exists(&result.session_id, stage).await.unwrap());
        }
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "[ES] Hello there.\n\n[ES] Second paragraph.\n"
        );
        let manifest = store.load_manifest(&result.session_id).await.unwrap().unwrap();
        assert_eq!(manifest.status, SessionStatus::Completed);
        assert_eq!(result.reports.len(), 2);
        assert!(!result.is_degraded());
    }

    #[tokio::test]
    async fn test_run_cancelledBeforeStart_shouldFailWithoutArtifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path());
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = pipeline(MockTranslator::working(), store.clone());
        pipeline.cancellation_token().cancel();

        let failure = pipeline.run(&input, &dir.path().join("out.txt")).await.unwrap_err();

        assert!(matches!(failure.error, PipelineError::Cancelled));
        assert_eq!(failure.phase, PipelinePhase::Extraction);
        let session = failure.session_id.unwrap();
        assert!(!store.exists(&session, ModelStage::Extracted).await.unwrap());
        let manifest = store.load_manifest(&session).await.unwrap().unwrap();
        assert_eq!(manifest.status, SessionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_run_unsupportedInput_shouldFailInExtraction() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slides.pptx");
        std::fs::write(&input, "x").unwrap();
        let store = Arc::new(MemoryArtifactStore::new());

        let failure = pipeline(MockTranslator::working(), store.clone())
            .run(&input, &dir.path().join("out.txt"))
            .await
            .unwrap_err();

        assert_eq!(failure.phase, PipelinePhase::Extraction);
        assert!(matches!(failure.error, PipelineError::UnsupportedFormat(_)));
        let manifest = store.load_manifest(&failure.session_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(manifest.status, SessionStatus::Failed);
    }

    #[tokio::test]
    async fn test_run_failingTranslator_shouldDegradeNotFail() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path());
        let output = dir.path().join("out.txt");

        let result = pipeline(MockTranslator::failing_on(["Hello there."]), Arc::new(MemoryArtifactStore::new()))
            .run(&input, &output)
            .await
            .unwrap();

        assert_eq!(result.degraded_elements(), 1);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "Hello there.\n\n[ES] Second paragraph.\n"
        );
    }

    #[tokio::test]
    async fn test_runStage_missingInput_shouldReportStageInputMissing() {
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = pipeline(MockTranslator::working(), store);
        let session = SessionId::generate("ghost.docx");

        let result = pipeline.run_stage(&session, ModelStage::Styled).await;
        assert!(matches!(result, Err(PipelineError::StageInputMissing { .. })));
    }

    #[tokio::test]
    async fn test_resume_shouldSkipStoredStages() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path());
        let store = Arc::new(MemoryArtifactStore::new());
        let first = pipeline(MockTranslator::working(), store.clone())
            .run(&input, &dir.path().join("first.txt"))
            .await
            .unwrap();

        let translator = MockTranslator::working();
        let resumed = pipeline(translator.clone(), store)
            .resume(&first.session_id, &dir.path().join("second.txt"))
            .await
            .unwrap();

        assert_eq!(translator.request_count(), 0);
        assert!(resumed.reports.is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("first.txt")).unwrap(),
            std::fs::read_to_string(dir.path().join("second.txt")).unwrap()
        );
    }

    #[tokio::test]
    async fn test_progress_shouldReachCompletion() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        pipeline(MockTranslator::working(), Arc::new(MemoryArtifactStore::new()))
            .with_progress(Box::new(move |p: &PipelineProgress| sink.lock().push(p.overall_progress)))
            .run(&input, &dir.path().join("out.txt"))
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.first().copied(), Some(0.0));
        assert_eq!(seen.last().copied(), Some(1.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }
}
