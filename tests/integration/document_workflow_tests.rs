/*!
 * End-to-end tests of the extract, translate, style and reconstruct stages
 */

use anyhow::Result;
use std::sync::Arc;

use crate::common::{self, DocxFixture};
use docbabel::document::{Alignment, ElementKind, ModelStage, TranslationStatus};
use docbabel::errors::PipelineError;
use docbabel::extraction::Extractor;
use docbabel::pipeline::{CancellationToken, PipelinePhase};
use docbabel::session::{ArtifactStore, MemoryArtifactStore, SessionStatus};
use docbabel::transform::{LanguagePolicy, StyleProfile, StyleStage, TransformStage};
use docbabel::translation::MockTranslator;

#[tokio::test]
async fn test_run_reportFixture_shouldTranslateStyleAndRebuildInOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture().write_to(temp_dir.path(), "report.docx")?;
    let output = temp_dir.path().join("report.es.docx");
    let store = Arc::new(MemoryArtifactStore::new());

    let result = common::spanish_pipeline(Arc::new(MockTranslator::working()), store.clone())
        .run(&input, &output)
        .await?;

    assert!(!result.is_degraded());
    assert!(output.exists());

    // Stored translated model
    let translated = store.load(&result.session_id, ModelStage::Translated).await?;
    let texts: Vec<&str> = translated.elements().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["[ES] Report", "[ES] Summary", "[ES] All good."]);
    assert!(translated
        .elements()
        .all(|e| e.translation.status == TranslationStatus::Translated));

    // Stored styled model
    let styled = store.load(&result.session_id, ModelStage::Styled).await?;
    let elements: Vec<_> = styled.elements().collect();
    assert_eq!(elements[0].alignment, Alignment::Center);
    assert!(elements[0].runs.iter().all(|r| r.bold));
    assert_eq!(elements[1].alignment, Alignment::Left);
    assert!(elements[1].runs.iter().all(|r| r.bold));
    assert_eq!(elements[2].alignment, Alignment::Justify);
    assert!(elements[2].runs.iter().all(|r| !r.bold));

    // Written document
    let rebuilt = Extractor::default().extract_path(&output)?.model;
    assert_eq!(
        rebuilt.kinds(),
        vec![ElementKind::Title, ElementKind::MainHeader, ElementKind::BodyText]
    );
    let texts: Vec<&str> = rebuilt.elements().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["[ES] Report", "[ES] Summary", "[ES] All good."]);

    let manifest = store.load_manifest(&result.session_id).await?.expect("manifest");
    assert_eq!(manifest.status, SessionStatus::Completed);
    assert_eq!(manifest.stage, Some(ModelStage::Styled));
    Ok(())
}

#[tokio::test]
async fn test_run_tableAtPositionOne_shouldStayBetweenParagraphs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = DocxFixture::new()
        .unstyled("Intro")
        .table(&[&["Item", "Qty"], &["Bolts", "4"]])
        .unstyled("Outro")
        .write_to(temp_dir.path(), "table.docx")?;
    let output = temp_dir.path().join("table.es.txt");

    common::spanish_pipeline(Arc::new(MockTranslator::working()), Arc::new(MemoryArtifactStore::new()))
        .run(&input, &output)
        .await?;

    assert_eq!(
        std::fs::read_to_string(&output)?,
        "[ES] Intro\n\n[ES] Item\t[ES] Qty\n[ES] Bolts\t[ES] 4\n\n[ES] Outro\n"
    );
    Ok(())
}

/// Centered body text keeps its centering under a justify default
#[tokio::test]
async fn test_run_centeredBodyParagraph_shouldStayCentered() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = DocxFixture::new()
        .aligned("Normal", "center", "Signed in Madrid")
        .paragraph("Normal", "Regular text")
        .write_to(temp_dir.path(), "signed.docx")?;
    let store = Arc::new(MemoryArtifactStore::new());

    let result = common::spanish_pipeline(Arc::new(MockTranslator::working()), store.clone())
        .run(&input, &temp_dir.path().join("signed.es.docx"))
        .await?;

    let styled = store.load(&result.session_id, ModelStage::Styled).await?;
    let alignments: Vec<Alignment> = styled.elements().map(|e| e.alignment).collect();
    assert_eq!(alignments, vec![Alignment::Center, Alignment::Justify]);
    Ok(())
}

/// A failing element keeps its source text; the document still completes
#[tokio::test]
async fn test_run_oneElementFails_shouldDegradeAndKeepSourceText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture().write_to(temp_dir.path(), "report.docx")?;
    let output = temp_dir.path().join("report.es.txt");
    let store = Arc::new(MemoryArtifactStore::new());

    let result = common::spanish_pipeline(Arc::new(MockTranslator::failing_on(["Summary"])), store.clone())
        .run(&input, &output)
        .await?;

    assert_eq!(result.degraded_elements(), 1);
    assert_eq!(
        std::fs::read_to_string(&output)?,
        "[ES] Report\n\nSummary\n\n[ES] All good.\n"
    );

    let translated = store.load(&result.session_id, ModelStage::Translated).await?;
    let header = translated.elements().nth(1).expect("header");
    assert_eq!(header.translation.status, TranslationStatus::Untranslated);
    assert!(header.translation.note.is_some());
    Ok(())
}

#[tokio::test]
async fn test_run_everyStage_shouldKeepPositions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture()
        .table(&[&["x"]])
        .style("Fancy", "Fancy")
        .paragraph("Fancy", "Unmapped style")
        .write_to(temp_dir.path(), "report.docx")?;
    let store = Arc::new(MemoryArtifactStore::new());

    let result = common::spanish_pipeline(Arc::new(MockTranslator::working()), store.clone())
        .run(&input, &temp_dir.path().join("report.es.docx"))
        .await?;

    let extracted = store.load(&result.session_id, ModelStage::Extracted).await?;
    for stage in [ModelStage::Translated, ModelStage::Styled] {
        let model = store.load(&result.session_id, stage).await?;
        assert_eq!(model.positions(), extracted.positions(), "{}", stage);
        assert_eq!(model.kinds(), extracted.kinds(), "{}", stage);
    }
    assert_eq!(extracted.kinds().last(), Some(&ElementKind::BodyText));
    Ok(())
}

#[tokio::test]
async fn test_styleStage_appliedTwice_shouldBeIdempotent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture()
        .aligned("Normal", "center", "Centered")
        .write_to(temp_dir.path(), "report.docx")?;
    let model = Extractor::default().extract_path(&input)?.model;
    let stage = StyleStage::new(StyleProfile::professional(), LanguagePolicy::for_language("spanish"));

    let once = stage.transform(&model).await?.model;
    let twice = stage.transform(&once).await?.model;

    assert_eq!(once.blocks, twice.blocks);
    Ok(())
}

#[tokio::test]
async fn test_run_cancelled_shouldRecordCancelledSession() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture().write_to(temp_dir.path(), "report.docx")?;
    let output = temp_dir.path().join("report.es.docx");
    let store = Arc::new(MemoryArtifactStore::new());
    let token = CancellationToken::new();
    token.cancel();

    let failure = common::spanish_pipeline(Arc::new(MockTranslator::working()), store.clone())
        .with_cancellation(token)
        .run(&input, &output)
        .await
        .expect_err("cancelled run");

    assert!(matches!(failure.error, PipelineError::Cancelled));
    assert_eq!(failure.phase, PipelinePhase::Extraction);
    assert!(!output.exists());

    let sessions = store.list_sessions().await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Cancelled);
    Ok(())
}
