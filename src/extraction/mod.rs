/*!
 * Structural extraction.
 *
 * Turns a source document into a positioned `DocumentModel`:
 * - `source`: the `SourceProvider` seam and raw block types
 * - `docx`: .docx reader (zip + XML)
 * - `text`: plain-text reader
 * - `roles`: style label to semantic role table
 */

use std::path::Path;

use log::{debug, info};

use crate::document::{
    Block, DocumentMetadata, DocumentModel, Element, Outline, Table,
};
use crate::errors::PipelineError;

pub mod docx;
pub mod roles;
pub mod source;
pub mod text;

pub use docx::DocxSource;
pub use roles::{RoleSpec, RoleTable};
pub use source::{
    SourceBlock, SourceDocument, SourceParagraph, SourceProvider, SourceTable, detect_format,
    provider_for_path,
};
pub use text::TextSource;

/// Result of extracting one document
#[derive(Debug, Clone)]
pub struct Extraction {
    pub model: DocumentModel,
    pub outline: Outline,
}

/// Assigns roles and positions to source blocks.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    roles: RoleTable,
}

impl Extractor {
    pub fn new(roles: RoleTable) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    /// Read a file with the provider matching its extension and extract it
    pub fn extract_path(&self, path: &Path) -> Result<Extraction, PipelineError> {
        let provider = provider_for_path(path)?;
        if !path.is_file() {
            return Err(PipelineError::source_read(path, "file does not exist"));
        }
        let source = provider.read(path)?;
        self.extract(&source)
    }

    /// Build the model from already-read source blocks.
    ///
    /// Whitespace-only paragraphs are dropped and consume no position; every
    /// table consumes exactly one.
    pub fn extract(&self, source: &SourceDocument) -> Result<Extraction, PipelineError> {
        let mut blocks = Vec::with_capacity(source.blocks.len());
        let mut position = 0usize;
        let mut skipped = 0usize;

        for block in &source.blocks {
            match block {
                SourceBlock::Paragraph(paragraph) => {
                    let text = paragraph.text();
                    if text.trim().is_empty() {
                        skipped += 1;
                        continue;
                    }

                    let role = self.roles.resolve(&paragraph.style);
                    let element = Element::new(role.kind, text)
                        .with_position(position)
                        .with_runs(paragraph.runs.clone())
                        .with_alignment(paragraph.alignment)
                        .with_style_name(paragraph.style.clone())
                        .with_hierarchy_level(role.hierarchy_level)
                        .with_translatable(role.translatable);

                    blocks.push(Block::Element(element));
                }
                SourceBlock::Table(table) => {
                    blocks.push(Block::Table(Table::new(table.rows.clone()).with_position(position)));
                }
            }
            position += 1;
        }

        debug!("Skipped {} empty paragraphs in {}", skipped, source.file_name);

        let metadata = DocumentMetadata::new(source.file_name.clone(), source.format);
        let model = DocumentModel::new(metadata, blocks);
        model.validate()?;

        let outline = Outline::build(&model);

        info!(
            "Extracted {} blocks ({} tables) from {}",
            model.len(),
            model.tables().count(),
            source.file_name
        );

        Ok(Extraction { model, outline })
    }
}
