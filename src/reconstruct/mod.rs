/*!
 * Document reconstruction.
 *
 * The reconstructor is the only place where blocks are put back in document
 * order: everything is sorted by the position assigned at extraction and
 * turned into writer-neutral output items. Writers then serialize those
 * items into a concrete container.
 */

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::document::{
    Alignment, Block, DocumentModel, Element, ElementKind, Run, Spacing, TableRow,
};
use crate::errors::PipelineError;

pub mod docx_writer;
pub mod text_writer;

pub use docx_writer::DocxWriter;
pub use text_writer::TextWriter;

/// One paragraph ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputParagraph {
    pub kind: ElementKind,
    pub hierarchy_level: Option<u8>,
    pub alignment: Alignment,
    pub spacing: Spacing,
    /// Never empty; an element without runs gets one default run
    pub runs: Vec<Run>,
}

impl OutputParagraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// One table ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub rows: Vec<TableRow>,
    /// First row is emitted bold
    pub header_bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    Paragraph(OutputParagraph),
    Table(OutputTable),
}

/// Items in document order
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDocument {
    pub source_file: String,
    pub target_language: Option<String>,
    pub items: Vec<OutputItem>,
}

impl OutputDocument {
    pub fn paragraphs(&self) -> impl Iterator<Item = &OutputParagraph> {
        self.items.iter().filter_map(|item| match item {
            OutputItem::Paragraph(p) => Some(p),
            OutputItem::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &OutputTable> {
        self.items.iter().filter_map(|item| match item {
            OutputItem::Table(t) => Some(t),
            OutputItem::Paragraph(_) => None,
        })
    }
}

/// Serializes an `OutputDocument` into a concrete file format
pub trait DocumentWriter: Send + Sync {
    /// File extension this writer produces, without the dot
    fn extension(&self) -> &'static str;

    /// Serialize to bytes
    fn render(&self, document: &OutputDocument) -> Result<Vec<u8>, PipelineError>;

    /// Serialize and write to `path`, creating parent directories
    fn write(&self, document: &OutputDocument, path: &Path) -> Result<(), PipelineError> {
        let bytes = self.render(document)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::write(path, e))?;
        }
        fs::write(path, bytes).map_err(|e| PipelineError::write(path, e))?;

        info!("Wrote {} items to {:?}", document.items.len(), path);
        Ok(())
    }
}

/// Pick a writer by the output file extension
pub fn writer_for_path(path: &Path) -> Result<Box<dyn DocumentWriter>, PipelineError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "docx" => Ok(Box::new(DocxWriter::new())),
        "txt" => Ok(Box::new(TextWriter::new())),
        _ => Err(PipelineError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Rebuilds document order from positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconstructor;

impl Reconstructor {
    pub fn new() -> Self {
        Self
    }

    /// Sort every block by position and convert it to an output item.
    ///
    /// Fails with `MissingPositionInvariant` when a block has no position or
    /// two blocks share one; no partial document is produced.
    pub fn reconstruct(&self, model: &DocumentModel) -> Result<OutputDocument, PipelineError> {
        let mut positioned: Vec<(usize, &Block)> = Vec::with_capacity(model.blocks.len());
        let mut seen = HashSet::with_capacity(model.blocks.len());

        for (index, block) in model.blocks.iter().enumerate() {
            let position = block.position().ok_or_else(|| {
                PipelineError::MissingPositionInvariant(format!(
                    "block #{} ({}) has no position",
                    index,
                    block.kind()
                ))
            })?;
            if !seen.insert(position) {
                return Err(PipelineError::MissingPositionInvariant(format!(
                    "position {} is claimed by more than one block",
                    position
                )));
            }
            positioned.push((position, block));
        }

        positioned.sort_by_key(|(position, _)| *position);

        let items: Vec<OutputItem> = positioned
            .into_iter()
            .map(|(_, block)| match block {
                Block::Element(element) => OutputItem::Paragraph(paragraph_for(element)),
                Block::Table(table) => OutputItem::Table(OutputTable {
                    rows: table.rows.clone(),
                    header_bold: true,
                }),
            })
            .collect();

        debug!("Reconstructed {} items from {}", items.len(), model.metadata.source_file);

        Ok(OutputDocument {
            source_file: model.metadata.source_file.clone(),
            target_language: model.metadata.target_language.clone(),
            items,
        })
    }
}

fn paragraph_for(element: &Element) -> OutputParagraph {
    let runs = if element.runs.is_empty() {
        vec![Run::new(element.text.clone())]
    } else {
        element.runs.clone()
    };

    OutputParagraph {
        kind: element.kind,
        hierarchy_level: element.hierarchy_level,
        alignment: element.alignment,
        spacing: element.spacing,
        runs,
    }
}
