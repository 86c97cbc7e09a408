/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::Path;

use crate::common;
use docbabel::document::SourceFormat;
use docbabel::file_utils::FileManager;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "notes.txt", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}

#[test]
fn test_generate_output_path_shouldInsertLanguageBeforeExtension() {
    let output_path = FileManager::generate_output_path(
        Path::new("/tmp/input/report.DOCX"),
        Path::new("/tmp/output"),
        "fr",
    );

    assert_eq!(output_path, Path::new("/tmp/output/report.fr.docx"));
}

#[test]
fn test_is_translated_output_shouldMatchLanguageSuffix() {
    assert!(FileManager::is_translated_output("report.es.docx", "es"));
    assert!(FileManager::is_translated_output("report.ES.txt", "es"));
    assert!(!FileManager::is_translated_output("report.docx", "es"));
    assert!(!FileManager::is_translated_output("notes.txt", "es"));
}

#[test]
fn test_detect_file_type_shouldUseExtension() {
    assert_eq!(FileManager::detect_file_type("a.docx"), Some(SourceFormat::Docx));
    assert_eq!(FileManager::detect_file_type("a.txt"), Some(SourceFormat::Text));
    assert_eq!(FileManager::detect_file_type("a.pptx"), None);
}

/// Supported files are found recursively; earlier outputs and lock files are ignored
#[test]
fn test_find_documents_shouldSkipOutputsAndUnsupportedFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    std::fs::create_dir(root.join("nested"))?;

    common::create_test_file(root, "b.txt", "b")?;
    common::create_test_file(root, "b.es.txt", "[ES] b")?;
    common::create_test_file(root, "~$lock.docx", "")?;
    common::create_test_file(root, "slides.pptx", "")?;
    common::report_fixture().write_to(&root.join("nested"), "a.docx")?;

    let found = FileManager::find_documents(root, "es")?;

    assert_eq!(found, vec![root.join("b.txt"), root.join("nested").join("a.docx")]);
    Ok(())
}

#[test]
fn test_write_json_shouldCreateParentDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("value.json");

    FileManager::write_json(&path, &vec![1, 2, 3])?;

    let content = std::fs::read_to_string(&path)?;
    let value: Vec<i32> = serde_json::from_str(&content)?;
    assert_eq!(value, vec![1, 2, 3]);
    Ok(())
}
