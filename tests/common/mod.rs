/*!
 * Common test utilities for the docbabel test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use std::sync::Arc;

use docbabel::app_config::{Config, StorageBackend};
use docbabel::extraction::Extractor;
use docbabel::pipeline::DocumentPipeline;
use docbabel::session::ArtifactStore;
use docbabel::transform::{
    LanguagePolicy, StyleProfile, StyleStage, TranslationStage, TranslationStageConfig,
};
use docbabel::translation::Translator;

/// Route library logs to the test harness; repeated calls are ignored
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Configuration for offline runs that keep artifacts in memory
pub fn offline_config(target_language: &str) -> Config {
    init_test_logging();
    let mut config = Config::default();
    config.target_language = target_language.to_string();
    config.storage.backend = StorageBackend::Memory;
    config
}

/// English to Spanish pipeline with the professional profile
pub fn spanish_pipeline(translator: Arc<dyn Translator>, store: Arc<dyn ArtifactStore>) -> DocumentPipeline {
    init_test_logging();
    let translation = TranslationStage::new(
        translator,
        TranslationStageConfig::new("en", "es").with_table_cells(true),
    );
    let style = StyleStage::new(StyleProfile::professional(), LanguagePolicy::for_language("spanish"));

    DocumentPipeline::new(Extractor::default(), Arc::new(translation), Arc::new(style), store)
        .with_languages("en", "es")
}

enum FixtureBlock {
    Paragraph {
        style: Option<String>,
        alignment: Option<String>,
        runs: Vec<String>,
    },
    Table(Vec<Vec<String>>),
}

/// Builds minimal .docx containers for extraction tests
#[derive(Default)]
pub struct DocxFixture {
    styles: Vec<(String, String)>,
    blocks: Vec<FixtureBlock>,
}

impl DocxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a paragraph style in styles.xml
    pub fn style(mut self, id: &str, name: &str) -> Self {
        self.styles.push((id.to_string(), name.to_string()));
        self
    }

    /// Paragraph with one plain run
    pub fn paragraph(self, style: &str, text: &str) -> Self {
        self.paragraph_runs(Some(style), None, &[&run_xml(text)])
    }

    /// Paragraph with no pStyle
    pub fn unstyled(self, text: &str) -> Self {
        self.paragraph_runs(None, None, &[&run_xml(text)])
    }

    pub fn aligned(self, style: &str, alignment: &str, text: &str) -> Self {
        self.paragraph_runs(Some(style), Some(alignment), &[&run_xml(text)])
    }

    /// Paragraph from raw `<w:r>` elements
    pub fn paragraph_runs(mut self, style: Option<&str>, alignment: Option<&str>, runs: &[&str]) -> Self {
        self.blocks.push(FixtureBlock::Paragraph {
            style: style.map(str::to_string),
            alignment: alignment.map(str::to_string),
            runs: runs.iter().map(|r| r.to_string()).collect(),
        });
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.blocks.push(FixtureBlock::Table(
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        ));
        self
    }

    fn document_xml(&self) -> String {
        let mut body = String::new();
        for block in &self.blocks {
            match block {
                FixtureBlock::Paragraph { style, alignment, runs } => {
                    body.push_str("<w:p>");
                    if style.is_some() || alignment.is_some() {
                        body.push_str("<w:pPr>");
                        if let Some(style) = style {
                            body.push_str(&format!("<w:pStyle w:val=\"{}\"/>", style));
                        }
                        if let Some(alignment) = alignment {
                            body.push_str(&format!("<w:jc w:val=\"{}\"/>", alignment));
                        }
                        body.push_str("</w:pPr>");
                    }
                    for run in runs {
                        body.push_str(run);
                    }
                    body.push_str("</w:p>");
                }
                FixtureBlock::Table(rows) => {
                    body.push_str("<w:tbl>");
                    for row in rows {
                        body.push_str("<w:tr>");
                        for cell in row {
                            body.push_str(&format!("<w:tc><w:p>{}</w:p></w:tc>", run_xml(cell)));
                        }
                        body.push_str("</w:tr>");
                    }
                    body.push_str("</w:tbl>");
                }
            }
        }

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{}</w:body></w:document>",
            body
        )
    }

    fn styles_xml(&self) -> String {
        let styles: String = self
            .styles
            .iter()
            .map(|(id, name)| {
                format!(
                    "<w:style w:type=\"paragraph\" w:styleId=\"{}\"><w:name w:val=\"{}\"/></w:style>",
                    id, name
                )
            })
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">{}</w:styles>",
            styles
        )
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
              <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"/>",
        )?;
        zip.start_file("word/document.xml", options)?;
        zip.write_all(self.document_xml().as_bytes())?;
        if !self.styles.is_empty() {
            zip.start_file("word/styles.xml", options)?;
            zip.write_all(self.styles_xml().as_bytes())?;
        }

        Ok(zip.finish()?.into_inner())
    }

    pub fn write_to(&self, dir: &Path, filename: &str) -> Result<PathBuf> {
        let path = dir.join(filename);
        fs::write(&path, self.build()?)?;
        Ok(path)
    }
}

/// A plain `<w:r>` element
pub fn run_xml(text: &str) -> String {
    format!(
        "<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r>",
        quick_xml::escape::escape(text)
    )
}

/// The title / heading / body document used across scenarios
pub fn report_fixture() -> DocxFixture {
    DocxFixture::new()
        .style("CustomTitle", "CustomTitle")
        .style("Heading1", "heading 1")
        .style("Normal", "Normal")
        .paragraph("CustomTitle", "Report")
        .paragraph("Heading1", "Summary")
        .paragraph("Normal", "All good.")
}
