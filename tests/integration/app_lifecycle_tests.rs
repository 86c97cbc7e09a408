/*!
 * Tests for the application controller running offline
 */

use anyhow::Result;

use crate::common;
use docbabel::app_config::StorageBackend;
use docbabel::app_controller::{Controller, FolderSummary};
use docbabel::document::ElementKind;

#[tokio::test]
async fn test_run_offlineTextFile_shouldWriteStubTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", "Hello.\n\nWorld.\n")?;
    let controller = Controller::with_config(common::offline_config("fr"))?.offline(true);

    let result = controller
        .run(input, temp_dir.path().to_path_buf(), false)
        .await?
        .expect("document processed");

    assert_eq!(result.output_path, temp_dir.path().join("notes.fr.txt"));
    assert_eq!(
        std::fs::read_to_string(&result.output_path)?,
        "[FR] Hello.\n\n[FR] World.\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_run_existingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", "Hello.\n")?;
    let existing = common::create_test_file(temp_dir.path(), "notes.es.txt", "keep me")?;
    let controller = Controller::with_config(common::offline_config("es"))?.offline(true);

    let skipped = controller
        .run(input.clone(), temp_dir.path().to_path_buf(), false)
        .await?;
    assert!(skipped.is_none());
    assert_eq!(std::fs::read_to_string(&existing)?, "keep me");

    let forced = controller.run(input, temp_dir.path().to_path_buf(), true).await?;
    assert!(forced.is_some());
    assert_eq!(std::fs::read_to_string(&existing)?, "[ES] Hello.\n");
    Ok(())
}

/// One broken document does not stop the others
#[tokio::test]
async fn test_runFolder_mixedDocuments_shouldCountOutcomes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("in");
    let output_dir = temp_dir.path().join("out");
    std::fs::create_dir(&input_dir)?;

    common::report_fixture().write_to(&input_dir, "report.docx")?;
    common::create_test_file(&input_dir, "notes.txt", "Hello.\n")?;
    common::create_test_file(&input_dir, "broken.docx", "not a zip")?;
    common::create_test_file(&input_dir, "ignored.pdf", "")?;

    let controller = Controller::with_config(common::offline_config("es"))?.offline(true);
    let summary = controller
        .run_folder(input_dir.clone(), Some(output_dir.clone()), false)
        .await?;

    assert_eq!(
        summary,
        FolderSummary {
            processed: 2,
            skipped: 0,
            failed: 1,
            degraded: 0,
        }
    );
    assert!(output_dir.join("report.es.docx").is_file());
    assert!(output_dir.join("notes.es.txt").is_file());
    Ok(())
}

#[tokio::test]
async fn test_runFolder_emptyDirectory_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(common::offline_config("es"))?.offline(true);

    let result = controller.run_folder(temp_dir.path().to_path_buf(), None, false).await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_sqliteStorage_shouldPersistSession() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", "Hello.\n")?;
    let mut config = common::offline_config("es");
    config.storage.backend = StorageBackend::Sqlite;
    config.storage.root = Some(temp_dir.path().join("sessions.db"));

    let controller = Controller::with_config(config)?.offline(true);
    let result = controller
        .run(input, temp_dir.path().to_path_buf(), false)
        .await?
        .expect("document processed");

    let pipeline = controller.build_pipeline()?;
    let manifest = pipeline.store().load_manifest(&result.session_id).await?;
    assert!(manifest.is_some());
    Ok(())
}

#[test]
fn test_extract_shouldReturnModelAndOutline() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture().write_to(temp_dir.path(), "report.docx")?;
    let controller = Controller::with_config(common::offline_config("es"))?;

    let extraction = controller.extract(&input)?;

    assert_eq!(extraction.model.kinds()[0], ElementKind::Title);
    assert!(extraction.outline.render().contains("Summary"));
    Ok(())
}

#[test]
fn test_formatDuration_shouldPickUnits() {
    use std::time::Duration;

    assert_eq!(Controller::format_duration(Duration::from_millis(1500)), "1.500s");
    assert_eq!(Controller::format_duration(Duration::from_secs(125)), "2m 5s");
    assert_eq!(Controller::format_duration(Duration::from_secs(3725)), "1h 2m 5s");
}
