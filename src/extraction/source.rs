/*!
 * Source document abstraction.
 *
 * A `SourceProvider` turns a file into an ordered list of raw paragraphs and
 * tables. It knows nothing about roles or positions; the extractor assigns
 * those.
 */

use std::path::Path;

use crate::document::{Alignment, Run, SourceFormat, TableRow};
use crate::errors::PipelineError;

use super::docx::DocxSource;
use super::text::TextSource;

/// Paragraph as read from the source, before role mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceParagraph {
    /// Style display name, e.g. "Heading 1"
    pub style: String,
    pub alignment: Alignment,
    pub runs: Vec<Run>,
}

impl SourceParagraph {
    pub fn new(style: impl Into<String>, alignment: Alignment, runs: Vec<Run>) -> Self {
        Self {
            style: style.into(),
            alignment,
            runs,
        }
    }

    /// Concatenated run text
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceTable {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceBlock {
    Paragraph(SourceParagraph),
    Table(SourceTable),
}

/// Ordered content of one source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub file_name: String,
    pub format: SourceFormat,
    pub blocks: Vec<SourceBlock>,
}

impl SourceDocument {
    pub fn new(file_name: impl Into<String>, format: SourceFormat, blocks: Vec<SourceBlock>) -> Self {
        Self {
            file_name: file_name.into(),
            format,
            blocks,
        }
    }

    /// Paragraphs with visible text plus all tables
    pub fn non_empty_block_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| match b {
                SourceBlock::Paragraph(p) => !p.text().trim().is_empty(),
                SourceBlock::Table(_) => true,
            })
            .count()
    }
}

/// Reads a concrete file format into a `SourceDocument`
pub trait SourceProvider: Send + Sync {
    fn format(&self) -> SourceFormat;

    fn read(&self, path: &Path) -> Result<SourceDocument, PipelineError>;
}

/// Detect the source format from a path's extension
pub fn detect_format(path: &Path) -> Result<SourceFormat, PipelineError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "docx" => Ok(SourceFormat::Docx),
        "txt" | "text" => Ok(SourceFormat::Text),
        _ => Err(PipelineError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Pick the provider for a path
pub fn provider_for_path(path: &Path) -> Result<Box<dyn SourceProvider>, PipelineError> {
    match detect_format(path)? {
        SourceFormat::Docx => Ok(Box::new(DocxSource::new())),
        SourceFormat::Text => Ok(Box::new(TextSource::new())),
    }
}

/// File name component used in metadata
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
