/*!
 * Plain-text source reader.
 *
 * Paragraphs are separated by blank lines; lines inside a paragraph are
 * soft-wrapped and joined with single spaces. Every paragraph gets the
 * `Normal` style, left alignment and one default run.
 */

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Alignment, Run, SourceFormat};
use crate::errors::PipelineError;

use super::source::{SourceBlock, SourceDocument, SourceParagraph, SourceProvider, file_name_of};

/// One or more blank lines
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\r?\n[ \t]*\r?\n").unwrap()
});

#[derive(Debug, Clone, Default)]
pub struct TextSource;

impl TextSource {
    pub fn new() -> Self {
        Self
    }

    /// Split already-loaded text into paragraphs
    pub fn parse(&self, file_name: &str, content: &str) -> SourceDocument {
        let blocks = PARAGRAPH_BREAK
            .split(content)
            .map(|chunk| {
                chunk
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .map(|text| {
                let runs = if text.is_empty() { Vec::new() } else { vec![Run::new(text)] };
                SourceBlock::Paragraph(SourceParagraph::new("Normal", Alignment::Left, runs))
            })
            .collect();

        SourceDocument::new(file_name, SourceFormat::Text, blocks)
    }
}

impl SourceProvider for TextSource {
    fn format(&self) -> SourceFormat {
        SourceFormat::Text
    }

    fn read(&self, path: &Path) -> Result<SourceDocument, PipelineError> {
        let bytes = std::fs::read(path).map_err(|e| PipelineError::source_read(path, e))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| PipelineError::source_read(path, format!("not valid UTF-8: {}", e)))?;
        Ok(self.parse(&file_name_of(path), content.trim_start_matches('\u{feff}')))
    }
}
