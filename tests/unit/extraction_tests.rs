/*!
 * Tests for reading source documents into the document model
 */

use anyhow::Result;

use crate::common::{self, DocxFixture};
use docbabel::document::{Alignment, ElementKind};
use docbabel::errors::PipelineError;
use docbabel::extraction::{DocxSource, Extractor, RoleTable};

#[test]
fn test_extract_reportFixture_shouldAssignKindsAndPositions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::report_fixture().write_to(temp_dir.path(), "report.docx")?;

    let extraction = Extractor::new(RoleTable::default()).extract_path(&path)?;
    let model = &extraction.model;

    assert_eq!(
        model.kinds(),
        vec![ElementKind::Title, ElementKind::MainHeader, ElementKind::BodyText]
    );
    assert_eq!(model.positions(), vec![Some(0), Some(1), Some(2)]);
    assert_eq!(model.metadata.source_file, "report.docx");

    let texts: Vec<&str> = model.elements().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Report", "Summary", "All good."]);

    assert_eq!(extraction.outline.node_count(), 3);
    Ok(())
}

/// One element per non-empty paragraph; blank paragraphs consume no position
#[test]
fn test_extract_blankParagraphs_shouldNotConsumePositions() -> Result<()> {
    let bytes = DocxFixture::new()
        .unstyled("First")
        .unstyled("   ")
        .paragraph_runs(None, None, &[])
        .unstyled("Second")
        .build()?;

    let source = DocxSource::new().read_bytes("blank.docx", &bytes).map_err(anyhow::Error::msg)?;
    let extraction = Extractor::default().extract(&source)?;

    assert_eq!(extraction.model.len(), source.non_empty_block_count());
    assert_eq!(extraction.model.positions(), vec![Some(0), Some(1)]);
    Ok(())
}

/// Text-box content inside a run does not replace the enclosing paragraph
#[test]
fn test_extract_paragraphWithTextBox_shouldKeepOuterText() -> Result<()> {
    let text_box = format!(
        "<w:r><w:pict><w:txbxContent><w:p>{}</w:p></w:txbxContent></w:pict></w:r>",
        common::run_xml("Inside box")
    );
    let bytes = DocxFixture::new()
        .paragraph_runs(
            None,
            None,
            &[&common::run_xml("Outer before"), &text_box, &common::run_xml(" outer after")],
        )
        .unstyled("Next")
        .build()?;

    let source = DocxSource::new().read_bytes("boxed.docx", &bytes).map_err(anyhow::Error::msg)?;
    let extraction = Extractor::default().extract(&source)?;

    let texts: Vec<&str> = extraction.model.elements().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Outer before outer after", "Next"]);
    assert_eq!(extraction.model.positions(), vec![Some(0), Some(1)]);
    Ok(())
}

#[test]
fn test_extract_tableBetweenParagraphs_shouldTakeMiddlePosition() -> Result<()> {
    let bytes = DocxFixture::new()
        .unstyled("Before")
        .table(&[&["Name", "Value"], &["a", "1"]])
        .unstyled("After")
        .build()?;

    let source = DocxSource::new().read_bytes("table.docx", &bytes).map_err(anyhow::Error::msg)?;
    let model = Extractor::default().extract(&source)?.model;

    assert_eq!(
        model.kinds(),
        vec![ElementKind::BodyText, ElementKind::Table, ElementKind::BodyText]
    );
    let table = model.block_at(1).and_then(|b| b.as_table()).expect("table at position 1");
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_count(), 2);
    assert_eq!(table.rows[1].cells[0].text(), "a");
    Ok(())
}

#[test]
fn test_extract_unmappedStyle_shouldFallBackToTranslatableBodyText() -> Result<()> {
    let bytes = DocxFixture::new()
        .style("Fancy", "Fancy Marketing Style")
        .paragraph("Fancy", "Buy now")
        .build()?;

    let source = DocxSource::new().read_bytes("fancy.docx", &bytes).map_err(anyhow::Error::msg)?;
    let model = Extractor::default().extract(&source)?.model;
    let element = model.elements().next().expect("one element");

    assert_eq!(element.kind, ElementKind::BodyText);
    assert_eq!(element.style_name, "Fancy Marketing Style");
    assert!(element.translatable);
    Ok(())
}

#[test]
fn test_extract_runFormattingAndAlignment_shouldBeKept() -> Result<()> {
    let bytes = DocxFixture::new()
        .paragraph_runs(
            Some("Normal"),
            Some("center"),
            &[
                "<w:r><w:rPr><w:b/><w:sz w:val=\"28\"/><w:color w:val=\"FF0000\"/></w:rPr><w:t>Bold</w:t></w:r>",
                "<w:r><w:t xml:space=\"preserve\"> plain</w:t></w:r>",
            ],
        )
        .build()?;

    let source = DocxSource::new().read_bytes("runs.docx", &bytes).map_err(anyhow::Error::msg)?;
    let model = Extractor::default().extract(&source)?.model;
    let element = model.elements().next().expect("one element");

    assert_eq!(element.text, "Bold plain");
    assert_eq!(element.alignment, Alignment::Center);
    assert_eq!(element.runs.len(), 2);
    assert!(element.runs[0].bold);
    assert_eq!(element.runs[0].font_size, "14pt");
    assert!(!element.runs[1].bold);
    Ok(())
}

#[test]
fn test_extractPath_unsupportedExtension_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "slides.pptx", "")?;

    let result = Extractor::default().extract_path(&path);
    assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    Ok(())
}

#[test]
fn test_extractPath_corruptDocx_shouldReportSourceReadError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.docx", "not a zip")?;

    let result = Extractor::default().extract_path(&path);
    assert!(matches!(result, Err(PipelineError::SourceReadError { .. })));
    Ok(())
}

#[test]
fn test_extractPath_textFile_shouldSplitOnBlankLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "notes.txt",
        "First paragraph\nstill first.\n\n\nSecond paragraph.\n",
    )?;

    let model = Extractor::default().extract_path(&path)?.model;

    assert_eq!(model.len(), 2);
    assert_eq!(model.positions(), vec![Some(0), Some(1)]);
    Ok(())
}
