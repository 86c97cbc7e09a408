/*!
 * Tests for session persistence across runs
 */

use anyhow::Result;
use std::sync::Arc;

use crate::common;
use docbabel::document::ModelStage;
use docbabel::errors::PipelineError;
use docbabel::extraction::Extractor;
use docbabel::pipeline::PipelinePhase;
use docbabel::session::{
    ArtifactStore, FileArtifactStore, MANIFEST_FILE, SessionId, SessionManifest, SessionStatus,
    SqliteArtifactStore, artifact_name,
};
use docbabel::translation::MockTranslator;

#[tokio::test]
async fn test_fileStore_run_shouldWriteOneArtifactPerStage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture().write_to(temp_dir.path(), "report.docx")?;
    let store = Arc::new(FileArtifactStore::new(temp_dir.path().join("sessions")));

    let result = common::spanish_pipeline(Arc::new(MockTranslator::working()), store.clone())
        .run(&input, &temp_dir.path().join("report.es.docx"))
        .await?;

    let session_dir = store.session_dir(&result.session_id);
    for stage in [ModelStage::Extracted, ModelStage::Translated, ModelStage::Styled] {
        assert!(session_dir.join(artifact_name(stage)).is_file(), "{}", stage);
    }
    assert!(session_dir.join(MANIFEST_FILE).is_file());

    let manifest = store.load_manifest(&result.session_id).await?.expect("manifest");
    assert_eq!(manifest.status, SessionStatus::Completed);
    assert_eq!(manifest.artifacts.len(), 3);
    Ok(())
}

/// Store an extracted artifact, then let a later process finish the session
async fn resume_after_extraction(store: Arc<dyn ArtifactStore>) -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture().write_to(temp_dir.path(), "report.docx")?;
    let output = temp_dir.path().join("report.es.txt");

    let session = SessionId::generate("report.docx");
    let extracted = Extractor::default().extract_path(&input)?.model;
    store.save(&session, ModelStage::Extracted, &extracted).await?;
    let mut manifest = SessionManifest::new(session.clone(), "report.docx", "en", "es");
    manifest.record_stage(ModelStage::Extracted);
    store.save_manifest(&manifest).await?;

    let translator = Arc::new(MockTranslator::working());
    let result = common::spanish_pipeline(translator.clone(), store.clone())
        .resume(&session, &output)
        .await?;

    assert_eq!(translator.request_count(), 3);
    assert!(result.outline.is_none());
    assert_eq!(
        std::fs::read_to_string(&output)?,
        "[ES] Report\n\n[ES] Summary\n\n[ES] All good.\n"
    );

    let manifest = store.load_manifest(&session).await?.expect("manifest");
    assert_eq!(manifest.status, SessionStatus::Completed);
    assert_eq!(manifest.stage, Some(ModelStage::Styled));
    Ok(())
}

#[tokio::test]
async fn test_resume_fileStore_shouldFinishFromExtractedArtifact() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    resume_after_extraction(Arc::new(FileArtifactStore::new(temp_dir.path()))).await
}

#[tokio::test]
async fn test_resume_sqliteStore_shouldFinishFromExtractedArtifact() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = SqliteArtifactStore::open(&temp_dir.path().join("sessions.db"))?;
    resume_after_extraction(Arc::new(store)).await
}

/// A corrupted artifact is rejected before the next stage runs
#[tokio::test]
async fn test_resume_corruptArtifact_shouldFailWithInvalidArtifact() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = Arc::new(FileArtifactStore::new(temp_dir.path().join("sessions")));

    let session = SessionId::generate("report.docx");
    let mut manifest = SessionManifest::new(session.clone(), "report.docx", "en", "es");
    manifest.record_stage(ModelStage::Extracted);
    store.save_manifest(&manifest).await?;
    std::fs::write(store.artifact_path(&session, ModelStage::Extracted), "{\"blocks\": 42}")?;

    let translator = Arc::new(MockTranslator::working());
    let failure = common::spanish_pipeline(translator.clone(), store.clone())
        .resume(&session, &temp_dir.path().join("out.docx"))
        .await
        .expect_err("corrupt artifact");

    assert!(matches!(failure.error, PipelineError::InvalidArtifact(_)));
    assert_eq!(failure.phase, PipelinePhase::Translation);
    assert_eq!(translator.request_count(), 0);

    let manifest = store.load_manifest(&session).await?.expect("manifest");
    assert_eq!(manifest.status, SessionStatus::Failed);
    assert!(manifest.error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_resume_unknownSession_shouldReportMissingInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = Arc::new(FileArtifactStore::new(temp_dir.path()));
    let session = SessionId::generate("ghost.docx");

    let failure = common::spanish_pipeline(Arc::new(MockTranslator::working()), store)
        .resume(&session, &temp_dir.path().join("out.docx"))
        .await
        .expect_err("unknown session");

    assert!(matches!(failure.error, PipelineError::StageInputMissing { .. }));
    Ok(())
}
