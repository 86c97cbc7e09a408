/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;

use crate::common;
use docbabel::app_config::{Config, StorageBackend, TranslationProvider};
use docbabel::document::ElementKind;

#[test]
fn test_loadOrCreate_missingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.target_language, "es");
    assert_eq!(config.style.profile, "professional");
    assert_eq!(config.storage.backend, StorageBackend::File);
    Ok(())
}

/// Sections left out of the file fall back to their defaults
#[test]
fn test_fromFile_partialConfig_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "source_language": "en",
            "target_language": "ja",
            "style": { "profile": "minimal" },
            "roles": {
                "mappings": { "Disclaimer": { "kind": "special_content" } },
                "excluded": ["Code"]
            },
            "storage": { "backend": "sqlite" }
        }"#,
    )?;

    let config = Config::from_file(&path)?;

    assert_eq!(config.target_language, "ja");
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    config.validate()?;

    let roles = config.roles.build_table();
    assert_eq!(roles.resolve("Disclaimer").kind, ElementKind::SpecialContent);
    assert!(!roles.resolve("Code").translatable);
    Ok(())
}

#[test]
fn test_fromFile_malformedJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}

/// Offline runs do not need provider credentials
#[test]
fn test_validateDocumentSettings_hostedProviderWithoutKey_shouldPass() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;

    assert!(config.validate().is_err());
    assert!(config.validate_document_settings().is_ok());
}

#[test]
fn test_validateDocumentSettings_unknownTarget_shouldFail() {
    let mut config = Config::default();
    config.target_language = "xx-not-a-language".to_string();

    assert!(config.validate_document_settings().is_err());
}
