/*!
 * Tests for rebuilding output documents from the model
 */

use anyhow::Result;

use crate::common::{self, DocxFixture};
use docbabel::document::{Block, DocumentMetadata, DocumentModel, Element, ElementKind, SourceFormat};
use docbabel::errors::PipelineError;
use docbabel::extraction::Extractor;
use docbabel::reconstruct::{Reconstructor, writer_for_path};

/// Extract, reconstruct without transforms, re-extract: same sequence
#[test]
fn test_identityRoundTrip_docx_shouldPreserveOrderKindsAndText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::report_fixture()
        .table(&[&["Key", "Value"], &["tabs", "a & b"]])
        .paragraph("Normal", "Closing <remarks>.")
        .write_to(temp_dir.path(), "report.docx")?;
    let output = temp_dir.path().join("out").join("report.docx");

    let extractor = Extractor::default();
    let original = extractor.extract_path(&input)?.model;

    let document = Reconstructor::new().reconstruct(&original)?;
    writer_for_path(&output)?.write(&document, &output)?;

    let rebuilt = extractor.extract_path(&output)?.model;

    assert_eq!(rebuilt.positions(), original.positions());
    assert_eq!(rebuilt.kinds(), original.kinds());
    let texts = |model: &DocumentModel| -> Vec<String> {
        model
            .blocks
            .iter()
            .map(|block| match block {
                Block::Element(e) => e.text.clone(),
                Block::Table(t) => t.rows.iter().flat_map(|r| r.cells.iter().map(|c| c.text())).collect(),
            })
            .collect()
    };
    assert_eq!(texts(&rebuilt), texts(&original));
    Ok(())
}

#[test]
fn test_identityRoundTrip_text_shouldPreserveParagraphs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", "One.\n\nTwo.\n\nThree.\n")?;
    let output = temp_dir.path().join("notes.out.txt");

    let extractor = Extractor::default();
    let original = extractor.extract_path(&input)?.model;
    let document = Reconstructor::new().reconstruct(&original)?;
    writer_for_path(&output)?.write(&document, &output)?;

    assert_eq!(std::fs::read_to_string(&output)?, "One.\n\nTwo.\n\nThree.\n");
    Ok(())
}

/// Blocks stored out of order are written in position order
#[test]
fn test_reconstruct_shuffledBlocks_shouldFollowPositions() -> Result<()> {
    let bytes = DocxFixture::new()
        .unstyled("zero")
        .table(&[&["one"]])
        .unstyled("two")
        .build()?;
    let source = docbabel::extraction::DocxSource::new()
        .read_bytes("t.docx", &bytes)
        .map_err(anyhow::Error::msg)?;
    let mut model = Extractor::default().extract(&source)?.model;
    model.blocks.reverse();

    let document = Reconstructor::new().reconstruct(&model)?;
    let text = String::from_utf8(writer_for_path(std::path::Path::new("t.txt"))?.render(&document)?)?;

    assert_eq!(text, "zero\n\none\n\ntwo\n");
    Ok(())
}

#[test]
fn test_reconstruct_unpositionedElement_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("never.docx");
    let model = DocumentModel::new(
        DocumentMetadata::new("a.docx", SourceFormat::Docx),
        vec![
            Block::from(Element::new(ElementKind::Title, "T").with_position(0)),
            Block::from(Element::new(ElementKind::BodyText, "lost")),
        ],
    );

    let result = Reconstructor::new().reconstruct(&model);

    assert!(matches!(result, Err(PipelineError::MissingPositionInvariant(_))));
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_writerForPath_unknownExtension_shouldBeUnsupported() {
    let result = writer_for_path(std::path::Path::new("out.pdf"));
    assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
}
