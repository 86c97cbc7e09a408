/*!
 * Word-processor (.docx) source reader.
 *
 * A .docx file is a zip container. Body content lives in
 * `word/document.xml`; paragraphs reference styles by id, and the display
 * names the role table works with come from `word/styles.xml`.
 */

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::document::{Alignment, CellParagraph, Run, SourceFormat, TableCell, TableRow};
use crate::errors::PipelineError;

use super::source::{
    SourceBlock, SourceDocument, SourceParagraph, SourceProvider, SourceTable, file_name_of,
};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

/// Reads .docx files
#[derive(Debug, Clone, Default)]
pub struct DocxSource;

impl DocxSource {
    pub fn new() -> Self {
        Self
    }

    /// Parse an in-memory .docx container
    pub fn read_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<SourceDocument, String> {
        read_container(file_name, Cursor::new(bytes))
    }
}

impl SourceProvider for DocxSource {
    fn format(&self) -> SourceFormat {
        SourceFormat::Docx
    }

    fn read(&self, path: &Path) -> Result<SourceDocument, PipelineError> {
        let file = File::open(path).map_err(|e| PipelineError::source_read(path, e))?;
        read_container(&file_name_of(path), file).map_err(|reason| PipelineError::source_read(path, reason))
    }
}

fn read_container<R: Read + Seek>(file_name: &str, reader: R) -> Result<SourceDocument, String> {
    let mut archive = ZipArchive::new(reader).map_err(|e| format!("not a valid docx container: {}", e))?;

    let styles = match read_part(&mut archive, STYLES_PART)? {
        Some(xml) => parse_styles(&xml).map_err(|e| format!("malformed {}: {}", STYLES_PART, e))?,
        None => HashMap::new(),
    };

    let document_xml = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| format!("missing {}", DOCUMENT_PART))?;

    let blocks = parse_document(&document_xml, &styles)
        .map_err(|e| format!("malformed {}: {}", DOCUMENT_PART, e))?;

    debug!("Read {} blocks and {} styles from {}", blocks.len(), styles.len(), file_name);

    Ok(SourceDocument::new(file_name, SourceFormat::Docx, blocks))
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>, String> {
    match archive.by_name(name) {
        Ok(mut part) => {
            let mut xml = String::new();
            part.read_to_string(&mut xml)
                .map_err(|e| format!("failed to read {}: {}", name, e))?;
            Ok(Some(xml))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(format!("failed to open {}: {}", name, e)),
    }
}

/// Extract an attribute value by key from an element
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Toggle properties are on unless `w:val` says otherwise
fn toggle_on(e: &BytesStart) -> bool {
    !matches!(get_attr(e, b"w:val").as_deref(), Some("0" | "false" | "off"))
}

/// Map `w:jc` values onto the four supported alignments
pub fn alignment_from_jc(value: &str) -> Alignment {
    match value {
        "center" => Alignment::Center,
        "right" | "end" => Alignment::Right,
        "both" | "distribute" | "justify" => Alignment::Justify,
        _ => Alignment::Left,
    }
}

/// Render a `w:sz` half-point value as points
pub fn half_points_to_size(value: &str) -> Option<String> {
    let half_points: u32 = value.trim().parse().ok()?;
    if half_points % 2 == 0 {
        Some(format!("{}pt", half_points / 2))
    } else {
        Some(format!("{}.5pt", half_points / 2))
    }
}

/// Built-in styles are stored lowercase in styles.xml but shown capitalized
pub fn display_style_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    if let Some(level) = lowered.strip_prefix("heading ") {
        if level.chars().all(|c| c.is_ascii_digit()) && !level.is_empty() {
            return format!("Heading {}", level);
        }
    }

    match lowered.as_str() {
        "title" => "Title".to_string(),
        "subtitle" => "Subtitle".to_string(),
        "caption" => "Caption".to_string(),
        "normal" => "Normal".to_string(),
        "quote" => "Quote".to_string(),
        "list paragraph" => "List Paragraph".to_string(),
        "header" => "Header".to_string(),
        "footer" => "Footer".to_string(),
        "body text" => "Body Text".to_string(),
        _ => name.to_string(),
    }
}

/// Map paragraph style ids to display names
pub fn parse_styles(xml: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut styles = HashMap::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:style" => {
                current_id = get_attr(&e, b"w:styleId");
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"w:name" => {
                if let (Some(id), Some(name)) = (&current_id, get_attr(&e, b"w:val")) {
                    styles.insert(id.clone(), display_style_name(&name));
                }
            }
            Event::End(e) if e.name().as_ref() == b"w:style" => current_id = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(styles)
}

/// Parse the body of `word/document.xml` into ordered source blocks.
pub fn parse_document(
    xml: &str,
    styles: &HashMap<String, String>,
) -> Result<Vec<SourceBlock>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut walker = BodyWalker::new(styles);

    loop {
        match reader.read_event()? {
            Event::Start(e) => walker.handle_start(&e),
            Event::Empty(e) => {
                walker.handle_start(&e);
                walker.handle_end(e.name().as_ref());
            }
            Event::Text(t) => {
                if walker.in_text {
                    let text = t.unescape()?;
                    walker.handle_text(&text);
                }
            }
            Event::End(e) => walker.handle_end(e.name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(walker.blocks)
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<TableRow>,
    row: Option<TableRow>,
    cell: Option<TableCell>,
}

#[derive(Default)]
struct ParagraphBuilder {
    style: Option<String>,
    alignment: Alignment,
    runs: Vec<Run>,
}

/// Streaming state while walking the document body
struct BodyWalker<'s> {
    styles: &'s HashMap<String, String>,
    blocks: Vec<SourceBlock>,
    table_depth: usize,
    table: Option<TableBuilder>,
    paragraph: Option<ParagraphBuilder>,
    run: Option<Run>,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
    /// Depth inside text-box content, which is not part of the enclosing paragraph
    text_box_depth: usize,
}

impl<'s> BodyWalker<'s> {
    fn new(styles: &'s HashMap<String, String>) -> Self {
        Self {
            styles,
            blocks: Vec::new(),
            table_depth: 0,
            table: None,
            paragraph: None,
            run: None,
            in_paragraph_props: false,
            in_run_props: false,
            in_text: false,
            text_box_depth: 0,
        }
    }

    fn handle_start(&mut self, e: &BytesStart) {
        if e.name().as_ref() == b"w:txbxContent" {
            self.text_box_depth += 1;
            return;
        }
        if self.text_box_depth > 0 {
            return;
        }

        match e.name().as_ref() {
            b"w:tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table = Some(TableBuilder::default());
                }
            }
            b"w:tr" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    table.row = Some(TableRow::default());
                }
            }
            b"w:tc" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    table.cell = Some(TableCell::default());
                }
            }
            b"w:p" => self.paragraph = Some(ParagraphBuilder::default()),
            b"w:pPr" => self.in_paragraph_props = true,
            b"w:pStyle" if self.in_paragraph_props => {
                if let (Some(paragraph), Some(id)) = (&mut self.paragraph, get_attr(e, b"w:val")) {
                    let name = self.styles.get(&id).cloned().unwrap_or(id);
                    paragraph.style = Some(name);
                }
            }
            b"w:jc" if self.in_paragraph_props => {
                if let (Some(paragraph), Some(value)) = (&mut self.paragraph, get_attr(e, b"w:val")) {
                    paragraph.alignment = alignment_from_jc(&value);
                }
            }
            b"w:r" if self.paragraph.is_some() => self.run = Some(Run::new("")),
            b"w:rPr" if self.run.is_some() => self.in_run_props = true,
            b"w:t" if self.run.is_some() => self.in_text = true,
            b"w:tab" if self.run.is_some() && !self.in_run_props => self.handle_text("\t"),
            b"w:br" | b"w:cr" if self.run.is_some() && !self.in_run_props => self.handle_text("\n"),
            _ if self.in_run_props => self.handle_run_property(e),
            _ => {}
        }
    }

    fn handle_run_property(&mut self, e: &BytesStart) {
        let Some(run) = &mut self.run else {
            return;
        };

        match e.name().as_ref() {
            b"w:b" => run.bold = toggle_on(e),
            b"w:i" => run.italic = toggle_on(e),
            b"w:u" => {
                run.underline = !matches!(get_attr(e, b"w:val").as_deref(), Some("none" | "0" | "false"));
            }
            b"w:rFonts" => {
                let font = get_attr(e, b"w:ascii")
                    .or_else(|| get_attr(e, b"w:hAnsi"))
                    .or_else(|| get_attr(e, b"w:eastAsia"))
                    .or_else(|| get_attr(e, b"w:cs"));
                if let Some(font) = font {
                    run.font_name = font;
                }
            }
            b"w:sz" => {
                if let Some(size) = get_attr(e, b"w:val").and_then(|v| half_points_to_size(&v)) {
                    run.font_size = size;
                }
            }
            b"w:color" => {
                if let Some(value) = get_attr(e, b"w:val") {
                    if !value.eq_ignore_ascii_case("auto") {
                        run.font_color = format!("#{}", value.trim_start_matches('#').to_lowercase());
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_text(&mut self, text: &str) {
        if let Some(run) = &mut self.run {
            run.text.push_str(text);
        }
    }

    fn handle_end(&mut self, name: &[u8]) {
        if name == b"w:txbxContent" {
            self.text_box_depth = self.text_box_depth.saturating_sub(1);
            return;
        }
        if self.text_box_depth > 0 {
            return;
        }

        match name {
            b"w:t" => self.in_text = false,
            b"w:rPr" => self.in_run_props = false,
            b"w:pPr" => self.in_paragraph_props = false,
            b"w:r" => {
                if let (Some(run), Some(paragraph)) = (self.run.take(), &mut self.paragraph) {
                    if !run.text.is_empty() {
                        paragraph.runs.push(run);
                    }
                }
                self.in_run_props = false;
                self.in_text = false;
            }
            b"w:p" => self.finish_paragraph(),
            b"w:tc" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    if let (Some(cell), Some(row)) = (table.cell.take(), &mut table.row) {
                        row.cells.push(cell);
                    }
                }
            }
            b"w:tr" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    if let Some(row) = table.row.take() {
                        table.rows.push(row);
                    }
                }
            }
            b"w:tbl" => {
                self.table_depth = self.table_depth.saturating_sub(1);
                if self.table_depth == 0 {
                    if let Some(table) = self.table.take() {
                        self.blocks.push(SourceBlock::Table(SourceTable { rows: table.rows }));
                    }
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        self.in_paragraph_props = false;

        let style = paragraph.style.unwrap_or_else(|| "Normal".to_string());

        if self.table_depth > 0 {
            if let Some(cell) = self.table.as_mut().and_then(|t| t.cell.as_mut()) {
                let text = paragraph.runs.iter().map(|r| r.text.as_str()).collect();
                cell.paragraphs.push(CellParagraph {
                    text,
                    runs: paragraph.runs,
                    alignment: paragraph.alignment,
                    style_name: style,
                });
            }
            return;
        }

        self.blocks.push(SourceBlock::Paragraph(SourceParagraph::new(
            style,
            paragraph.alignment,
            paragraph.runs,
        )));
    }
}
