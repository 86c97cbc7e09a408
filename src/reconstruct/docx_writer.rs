/*!
 * Word-processor (.docx) writer.
 *
 * Emits the minimal set of parts Word needs, always in the same order and
 * with a fixed zip timestamp so the same document yields the same bytes.
 * Paragraph style ids are chosen so that reading the output back maps every
 * paragraph onto the kind it was written from.
 */

use std::fmt::Write as _;
use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::document::{Alignment, ElementKind, Run, Spacing, TableRow, DEFAULT_RUN_VALUE};
use crate::errors::PipelineError;

use super::{DocumentWriter, OutputDocument, OutputItem, OutputParagraph, OutputTable};

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

const DOCUMENT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#
);

/// (style id, style name, bold, size in half-points)
const PARAGRAPH_STYLES: [(&str, &str, bool, Option<u32>); 9] = [
    ("Normal", "Normal", false, None),
    ("Title", "Title", true, Some(48)),
    ("Heading1", "heading 1", true, Some(32)),
    ("Heading2", "heading 2", true, Some(28)),
    ("Heading3", "heading 3", true, Some(24)),
    ("FixedContent", "FixedContent", false, None),
    ("ListParagraph", "List Paragraph", false, None),
    ("Quote", "Quote", false, None),
    ("Caption", "Caption", false, Some(18)),
];

/// Fixed container part order
pub const PART_ORDER: [&str; 5] = [
    "[Content_Types].xml",
    "_rels/.rels",
    "word/_rels/document.xml.rels",
    "word/document.xml",
    "word/styles.xml",
];

/// Writes .docx containers
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxWriter;

impl DocxWriter {
    pub fn new() -> Self {
        Self
    }

    /// `word/document.xml` for a document
    pub fn document_xml(&self, document: &OutputDocument) -> String {
        let mut xml = String::with_capacity(4096);
        xml.push_str(XML_DECLARATION);
        let _ = write!(xml, r#"<w:document xmlns:w="{}" xmlns:r="{}"><w:body>"#, WORDML_NS, RELATIONSHIPS_NS);

        for item in &document.items {
            match item {
                OutputItem::Paragraph(paragraph) => write_paragraph(&mut xml, paragraph),
                OutputItem::Table(table) => write_table(&mut xml, table),
            }
        }

        // A4 portrait with one inch margins
        xml.push_str(r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#);
        xml.push_str("</w:body></w:document>");
        xml
    }

    /// `word/styles.xml`
    pub fn styles_xml(&self) -> String {
        let mut xml = String::with_capacity(2048);
        xml.push_str(XML_DECLARATION);
        let _ = write!(xml, r#"<w:styles xmlns:w="{}">"#, WORDML_NS);
        xml.push_str(r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults>"#);

        for (id, name, bold, size) in PARAGRAPH_STYLES {
            let default = if id == "Normal" { r#" w:default="1""# } else { "" };
            let _ = write!(
                xml,
                r#"<w:style w:type="paragraph"{} w:styleId="{}"><w:name w:val="{}"/>"#,
                default, id, name
            );
            if id != "Normal" {
                xml.push_str(r#"<w:basedOn w:val="Normal"/><w:qFormat/>"#);
            }
            if bold || size.is_some() {
                xml.push_str("<w:rPr>");
                if bold {
                    xml.push_str("<w:b/>");
                }
                if let Some(size) = size {
                    let _ = write!(xml, r#"<w:sz w:val="{}"/>"#, size);
                }
                xml.push_str("</w:rPr>");
            }
            xml.push_str("</w:style>");
        }

        xml.push_str("</w:styles>");
        xml
    }
}

impl DocumentWriter for DocxWriter {
    fn extension(&self) -> &'static str {
        "docx"
    }

    fn render(&self, document: &OutputDocument) -> Result<Vec<u8>, PipelineError> {
        let document_xml = self.document_xml(document);
        let styles_xml = self.styles_xml();
        let contents: [&str; 5] = [CONTENT_TYPES, PACKAGE_RELS, DOCUMENT_RELS, &document_xml, &styles_xml];

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in PART_ORDER.iter().zip(contents) {
            zip.start_file(*name, options)
                .map_err(|e| PipelineError::write(*name, e))?;
            zip.write_all(content.as_bytes())
                .map_err(|e| PipelineError::write(*name, e))?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| PipelineError::write(document.source_file.as_str(), e))?;
        Ok(cursor.into_inner())
    }
}

/// Paragraph style id a kind is written with; `None` means the default style
pub fn style_id_for(kind: ElementKind, hierarchy_level: Option<u8>) -> Option<&'static str> {
    match kind {
        ElementKind::Title => Some("Title"),
        ElementKind::MainHeader => Some("Heading1"),
        ElementKind::SubHeader => match hierarchy_level {
            Some(level) if level >= 3 => Some("Heading3"),
            _ => Some("Heading2"),
        },
        ElementKind::SpecialContent => Some("FixedContent"),
        ElementKind::ListItem => Some("ListParagraph"),
        ElementKind::Quote => Some("Quote"),
        ElementKind::Caption => Some("Caption"),
        ElementKind::BodyText | ElementKind::Unknown | ElementKind::Table => None,
    }
}

/// `w:jc` value for an alignment
pub fn jc_value(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justify => "both",
    }
}

/// Parse "11pt" or "10.5pt" into half-points
pub fn size_to_half_points(size: &str) -> Option<u32> {
    let points: f32 = size.trim().trim_end_matches("pt").trim().parse().ok()?;
    if points > 0.0 {
        Some((points * 2.0).round() as u32)
    } else {
        None
    }
}

/// "#2c5aa0" to "2C5AA0"; anything that is not a six digit hex color is dropped
pub fn color_value(color: &str) -> Option<String> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hex.to_uppercase())
    } else {
        None
    }
}

fn is_set(value: &str) -> bool {
    !value.is_empty() && value != DEFAULT_RUN_VALUE
}

fn write_paragraph(xml: &mut String, paragraph: &OutputParagraph) {
    xml.push_str("<w:p>");
    write_paragraph_properties(
        xml,
        style_id_for(paragraph.kind, paragraph.hierarchy_level),
        paragraph.spacing,
        paragraph.alignment,
    );
    for run in &paragraph.runs {
        write_run(xml, run, false);
    }
    xml.push_str("</w:p>");
}

fn write_paragraph_properties(xml: &mut String, style_id: Option<&str>, spacing: Spacing, alignment: Alignment) {
    xml.push_str("<w:pPr>");
    if let Some(id) = style_id {
        let _ = write!(xml, r#"<w:pStyle w:val="{}"/>"#, id);
    }
    if !spacing.is_zero() {
        // twentieths of a point
        let _ = write!(
            xml,
            r#"<w:spacing w:before="{}" w:after="{}""#,
            (spacing.before_pt * 20.0).round() as u32,
            (spacing.after_pt * 20.0).round() as u32
        );
        if let Some(multiple) = spacing.line_multiple {
            // 240ths of a line
            let _ = write!(xml, r#" w:line="{}" w:lineRule="auto""#, (multiple * 240.0).round() as u32);
        }
        xml.push_str("/>");
    }
    let _ = write!(xml, r#"<w:jc w:val="{}"/>"#, jc_value(alignment));
    xml.push_str("</w:pPr>");
}

fn write_run(xml: &mut String, run: &Run, force_bold: bool) {
    if run.text.is_empty() {
        return;
    }

    xml.push_str("<w:r><w:rPr>");
    if is_set(&run.font_name) {
        let font = xml_safe(&run.font_name);
        let font = escape(font.as_str());
        let _ = write!(
            xml,
            r#"<w:rFonts w:ascii="{0}" w:hAnsi="{0}" w:eastAsia="{0}" w:cs="{0}"/>"#,
            font
        );
    }
    if run.bold || force_bold {
        xml.push_str("<w:b/>");
    }
    if run.italic {
        xml.push_str("<w:i/>");
    }
    if let Some(color) = is_set(&run.font_color).then(|| color_value(&run.font_color)).flatten() {
        let _ = write!(xml, r#"<w:color w:val="{}"/>"#, color);
    }
    if let Some(size) = is_set(&run.font_size).then(|| size_to_half_points(&run.font_size)).flatten() {
        let _ = write!(xml, r#"<w:sz w:val="{}"/>"#, size);
    }
    if run.underline {
        xml.push_str(r#"<w:u w:val="single"/>"#);
    }
    xml.push_str("</w:rPr>");

    write_run_text(xml, &run.text);
    xml.push_str("</w:r>");
}

/// Characters XML 1.0 allows in content; `\r` is dropped as well
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

fn xml_safe(text: &str) -> String {
    text.chars().filter(|&c| is_xml_char(c)).collect()
}

/// Tabs and line breaks are separate elements in WordprocessingML
fn write_run_text(xml: &mut String, text: &str) {
    let mut segment = String::new();
    let flush = |xml: &mut String, segment: &mut String| {
        if !segment.is_empty() {
            let _ = write!(xml, r#"<w:t xml:space="preserve">{}</w:t>"#, escape(segment.as_str()));
            segment.clear();
        }
    };

    for c in text.chars() {
        match c {
            '\t' => {
                flush(xml, &mut segment);
                xml.push_str("<w:tab/>");
            }
            '\n' | '\u{000B}' => {
                flush(xml, &mut segment);
                xml.push_str("<w:br/>");
            }
            '\u{000C}' => {
                flush(xml, &mut segment);
                xml.push_str(r#"<w:br w:type="page"/>"#);
            }
            _ if is_xml_char(c) => segment.push(c),
            _ => {}
        }
    }
    flush(xml, &mut segment);
}

fn write_table(xml: &mut String, table: &OutputTable) {
    let columns = table.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);

    xml.push_str(r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/><w:tblBorders>"#);
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        let _ = write!(xml, r#"<w:{} w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#, side);
    }
    xml.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
    for _ in 0..columns {
        xml.push_str(r#"<w:gridCol w:w="2000"/>"#);
    }
    xml.push_str("</w:tblGrid>");

    for (index, row) in table.rows.iter().enumerate() {
        write_row(xml, row, table.header_bold && index == 0);
    }

    xml.push_str("</w:tbl>");
}

fn write_row(xml: &mut String, row: &TableRow, bold: bool) {
    xml.push_str("<w:tr>");
    for cell in &row.cells {
        xml.push_str(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr>"#);
        if cell.paragraphs.is_empty() {
            // every cell needs at least one paragraph
            xml.push_str("<w:p/>");
        }
        for paragraph in &cell.paragraphs {
            xml.push_str("<w:p>");
            write_paragraph_properties(xml, None, Spacing::default(), paragraph.alignment);
            if paragraph.runs.is_empty() {
                write_run(xml, &Run::new(paragraph.text.clone()), bold);
            } else {
                for run in &paragraph.runs {
                    write_run(xml, run, bold);
                }
            }
            xml.push_str("</w:p>");
        }
        xml.push_str("</w:tc>");
    }
    xml.push_str("</w:tr>");
}
