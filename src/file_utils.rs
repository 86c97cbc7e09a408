use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::document::SourceFormat;
use crate::extraction::source::detect_format;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output path for a translated document, `<stem>.<lang>.<ext>`
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
        let extension = input_file
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "txt".to_string());

        output_dir
            .as_ref()
            .join(format!("{}.{}.{}", stem, target_language, extension))
    }

    /// Whether a file looks like an earlier output for `target_language`
    pub fn is_translated_output<P: AsRef<Path>>(path: P, target_language: &str) -> bool {
        let suffix = format!(".{}", target_language.to_lowercase());
        path.as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase().ends_with(&suffix))
            .unwrap_or(false)
    }

    /// Find supported documents under a directory, sorted by path.
    ///
    /// Earlier outputs for `target_language` are skipped so a second run over
    /// the same folder does not translate its own results.
    pub fn find_documents<P: AsRef<Path>>(dir: P, target_language: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !path.is_file() || Self::is_translated_output(path, target_language) {
                continue;
            }
            // Office lock files
            if path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("~$"))
            {
                continue;
            }
            if Self::detect_file_type(path).is_some() {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Detect the document format from the extension
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Option<SourceFormat> {
        detect_format(path.as_ref()).ok()
    }

    /// Write a value as pretty JSON, creating parent directories
    pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Self::ensure_dir(parent)?;
        }

        let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write to file: {:?}", path))
    }
}
