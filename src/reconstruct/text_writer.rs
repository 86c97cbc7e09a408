/*!
 * Plain-text writer.
 *
 * Paragraphs are separated by a blank line; each table row becomes one line
 * of tab-separated cells.
 */

use crate::errors::PipelineError;

use super::{DocumentWriter, OutputDocument, OutputItem, OutputTable};

#[derive(Debug, Clone, Copy, Default)]
pub struct TextWriter;

impl TextWriter {
    pub fn new() -> Self {
        Self
    }

    /// Text rendition of a document
    pub fn render_text(&self, document: &OutputDocument) -> String {
        let blocks: Vec<String> = document
            .items
            .iter()
            .map(|item| match item {
                OutputItem::Paragraph(paragraph) => paragraph.text(),
                OutputItem::Table(table) => table_text(table),
            })
            .collect();

        let mut text = blocks.join("\n\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

fn table_text(table: &OutputTable) -> String {
    table
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                // multi-paragraph cells stay on one line
                .map(|cell| cell.text().replace(['\n', '\t'], " "))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl DocumentWriter for TextWriter {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, document: &OutputDocument) -> Result<Vec<u8>, PipelineError> {
        Ok(self.render_text(document).into_bytes())
    }
}
