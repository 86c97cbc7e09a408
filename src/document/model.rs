/*!
 * Core document model types.
 *
 * A `DocumentModel` is the ordered, typed intermediate representation every
 * pipeline stage consumes and produces. Blocks are either text elements or
 * tables; both carry the position assigned at extraction, which is the only
 * ordering key used when a document is rebuilt.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::errors::PipelineError;

/// Sentinel used for run attributes that inherit the paragraph defaults
pub const DEFAULT_RUN_VALUE: &str = "Default";

fn default_run_value() -> String {
    DEFAULT_RUN_VALUE.to_string()
}

fn default_true() -> bool {
    true
}

/// Semantic role of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Title,
    MainHeader,
    SubHeader,
    BodyText,
    SpecialContent,
    ListItem,
    Quote,
    Caption,
    Table,
    Unknown,
}

impl ElementKind {
    /// Kinds in the canonical processing order used by transform stages
    pub const CANONICAL_ORDER: [ElementKind; 10] = [
        ElementKind::Title,
        ElementKind::MainHeader,
        ElementKind::SubHeader,
        ElementKind::BodyText,
        ElementKind::SpecialContent,
        ElementKind::ListItem,
        ElementKind::Quote,
        ElementKind::Caption,
        ElementKind::Unknown,
        ElementKind::Table,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::MainHeader => "main_header",
            Self::SubHeader => "sub_header",
            Self::BodyText => "body_text",
            Self::SpecialContent => "special_content",
            Self::ListItem => "list_item",
            Self::Quote => "quote",
            Self::Caption => "caption",
            Self::Table => "table",
            Self::Unknown => "unknown",
        }
    }

    /// Title and both header levels
    pub fn is_heading(&self) -> bool {
        matches!(self, Self::Title | Self::MainHeader | Self::SubHeader)
    }

    /// Kinds that hang below a heading in the outline
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            Self::BodyText | Self::SpecialContent | Self::ListItem | Self::Quote | Self::Caption
        )
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CANONICAL_ORDER
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown element kind: {}", s))
    }
}

/// Paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }
}

/// Paragraph spacing in points, plus an optional line height multiple
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spacing {
    #[serde(default)]
    pub before_pt: f32,
    #[serde(default)]
    pub after_pt: f32,
    /// `None` keeps single line spacing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_multiple: Option<f32>,
}

impl Spacing {
    pub fn new(before_pt: f32, after_pt: f32) -> Self {
        Self {
            before_pt,
            after_pt,
            line_multiple: None,
        }
    }

    /// Set the line height multiple; 1.0 means single spacing
    pub fn with_line_multiple(mut self, multiple: f32) -> Self {
        self.line_multiple = (multiple > 0.0 && multiple != 1.0).then_some(multiple);
        self
    }

    /// Scale before and after by a multiplier
    pub fn scaled(&self, multiplier: f32) -> Self {
        Self {
            before_pt: self.before_pt * multiplier,
            after_pt: self.after_pt * multiplier,
            line_multiple: self.line_multiple,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.before_pt == 0.0 && self.after_pt == 0.0 && self.line_multiple.is_none()
    }
}

/// A span of text sharing one set of character formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,

    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    pub italic: bool,

    #[serde(default)]
    pub underline: bool,

    /// Font family, or `"Default"`
    #[serde(default = "default_run_value")]
    pub font_name: String,

    /// Size such as `"12pt"`, or `"Default"`
    #[serde(default = "default_run_value")]
    pub font_size: String,

    /// Lowercase `#rrggbb`, or `"Default"`
    #[serde(default = "default_run_value")]
    pub font_color: String,
}

impl Default for Run {
    fn default() -> Self {
        Self::new("")
    }
}

impl Run {
    /// Create a run with default formatting
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            underline: false,
            font_name: default_run_value(),
            font_size: default_run_value(),
            font_color: default_run_value(),
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn font_name(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self
    }

    pub fn font_size(mut self, font_size: impl Into<String>) -> Self {
        self.font_size = font_size.into();
        self
    }

    pub fn font_color(mut self, font_color: impl Into<String>) -> Self {
        self.font_color = font_color.into();
        self
    }

    /// Bold, italic, or explicitly colored
    pub fn is_emphasized(&self) -> bool {
        self.bold || self.italic || self.font_color != DEFAULT_RUN_VALUE
    }

    /// Any attribute differs from the defaults
    pub fn has_formatting(&self) -> bool {
        self.bold
            || self.italic
            || self.underline
            || self.font_name != DEFAULT_RUN_VALUE
            || self.font_size != DEFAULT_RUN_VALUE
            || self.font_color != DEFAULT_RUN_VALUE
    }

    /// Same formatting, different text
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// Pick the run whose formatting represents a whole paragraph.
///
/// First run carrying bold, italic or a non-default color wins; otherwise the
/// first run. `None` for an empty slice.
pub fn primary_run(runs: &[Run]) -> Option<&Run> {
    runs.iter().find(|run| run.is_emphasized()).or_else(|| runs.first())
}

/// Outcome of the translation stage for one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    #[default]
    Pending,
    Translated,
    Untranslated,
    Skipped,
}

/// What the translation stage did to an element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranslationState {
    /// Text before translation, kept once translation ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,

    #[serde(default)]
    pub status: TranslationStatus,

    /// Register the text was translated with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<String>,

    /// Failure reason when the element fell back to its source text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Atomic unit of text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,

    /// Assigned once at extraction, never recomputed
    #[serde(default)]
    pub position: Option<usize>,

    pub text: String,

    #[serde(default)]
    pub runs: Vec<Run>,

    #[serde(default)]
    pub alignment: Alignment,

    #[serde(default)]
    pub spacing: Spacing,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy_level: Option<u8>,

    #[serde(default)]
    pub style_name: String,

    #[serde(default = "default_true")]
    pub translatable: bool,

    #[serde(default)]
    pub translation: TranslationState,
}

impl Element {
    /// Create an unpositioned element with no runs
    pub fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            position: None,
            text: text.into(),
            runs: Vec::new(),
            alignment: Alignment::default(),
            spacing: Spacing::default(),
            hierarchy_level: None,
            style_name: String::new(),
            translatable: true,
            translation: TranslationState::default(),
        }
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_runs(mut self, runs: Vec<Run>) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_style_name(mut self, style_name: impl Into<String>) -> Self {
        self.style_name = style_name.into();
        self
    }

    pub fn with_hierarchy_level(mut self, level: Option<u8>) -> Self {
        self.hierarchy_level = level;
        self
    }

    pub fn with_translatable(mut self, translatable: bool) -> Self {
        self.translatable = translatable;
        self
    }

    pub fn primary_run(&self) -> Option<&Run> {
        primary_run(&self.runs)
    }
}

/// One paragraph inside a table cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellParagraph {
    pub text: String,

    #[serde(default)]
    pub runs: Vec<Run>,

    #[serde(default)]
    pub alignment: Alignment,

    #[serde(default)]
    pub style_name: String,
}

impl CellParagraph {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            runs: vec![Run::new(text.clone())],
            text,
            alignment: Alignment::Left,
            style_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub paragraphs: Vec<CellParagraph>,
}

impl TableCell {
    /// Cell with a single plain paragraph
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![CellParagraph::new(text)],
        }
    }

    /// Paragraph texts joined by newlines
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self {
            cells: texts.iter().map(|t| TableCell::from_text(t.as_ref())).collect(),
        }
    }
}

/// A table is atomic for ordering: one position, rows and cells kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub position: Option<usize>,

    #[serde(default)]
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self { position: None, rows }
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    pub fn cell_paragraphs(&self) -> impl Iterator<Item = &CellParagraph> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .flat_map(|c| c.paragraphs.iter())
    }
}

/// Either a text element or a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Element(Element),
    Table(Table),
}

impl Block {
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Element(e) => e.position,
            Self::Table(t) => t.position,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Element(e) => e.kind,
            Self::Table(_) => ElementKind::Table,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            Self::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            Self::Element(_) => None,
        }
    }
}

impl From<Element> for Block {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Table> for Block {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

/// Source container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Docx,
    Text,
}

impl SourceFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Text => "txt",
        }
    }
}

/// Which stage produced a model, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStage {
    #[default]
    Extracted,
    Translated,
    Styled,
}

impl ModelStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::Translated => "translated",
            Self::Styled => "styled",
        }
    }

    /// Stage whose output this stage consumes
    pub fn previous(&self) -> Option<ModelStage> {
        match self {
            Self::Extracted => None,
            Self::Translated => Some(Self::Extracted),
            Self::Styled => Some(Self::Translated),
        }
    }
}

impl std::fmt::Display for ModelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File name of the source document
    pub source_file: String,

    #[serde(default)]
    pub source_format: SourceFormat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,

    #[serde(default)]
    pub stage: ModelStage,

    #[serde(default)]
    pub styles_used: Vec<String>,

    #[serde(default)]
    pub fonts_used: Vec<String>,

    #[serde(default)]
    pub has_formatting: bool,

    /// Number of blocks per kind, tables under `table`
    #[serde(default)]
    pub kind_counts: BTreeMap<ElementKind, usize>,

    pub created_at: DateTime<Utc>,
}

impl DocumentMetadata {
    pub fn new(source_file: impl Into<String>, source_format: SourceFormat) -> Self {
        Self {
            source_file: source_file.into(),
            source_format,
            source_language: None,
            target_language: None,
            stage: ModelStage::Extracted,
            styles_used: Vec::new(),
            fonts_used: Vec::new(),
            has_formatting: false,
            kind_counts: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered blocks plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub metadata: DocumentMetadata,
    pub blocks: Vec<Block>,
}

impl DocumentModel {
    /// Build a model and derive its metadata summaries from the blocks
    pub fn new(metadata: DocumentMetadata, blocks: Vec<Block>) -> Self {
        let mut model = Self { metadata, blocks };
        model.refresh_metadata();
        model
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.blocks.iter().filter_map(Block::as_element)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(Block::as_table)
    }

    /// Positions in block order
    pub fn positions(&self) -> Vec<Option<usize>> {
        self.blocks.iter().map(Block::position).collect()
    }

    pub fn kinds(&self) -> Vec<ElementKind> {
        self.blocks.iter().map(Block::kind).collect()
    }

    pub fn block_at(&self, position: usize) -> Option<&Block> {
        self.blocks.iter().find(|b| b.position() == Some(position))
    }

    /// Copy of the metadata relabelled for the next stage
    pub fn metadata_for(&self, stage: ModelStage) -> DocumentMetadata {
        DocumentMetadata {
            stage,
            created_at: Utc::now(),
            ..self.metadata.clone()
        }
    }

    /// Recompute counts, style and font inventories from the blocks
    pub fn refresh_metadata(&mut self) {
        self.metadata.kind_counts = count_kinds(&self.blocks);

        let mut styles = BTreeSet::new();
        let mut fonts = BTreeSet::new();
        let mut has_formatting = false;

        let mut visit_runs = |runs: &[Run]| {
            for run in runs {
                if run.font_name != DEFAULT_RUN_VALUE {
                    fonts.insert(run.font_name.clone());
                }
                has_formatting |= run.has_formatting();
            }
        };

        for block in &self.blocks {
            match block {
                Block::Element(element) => {
                    if !element.style_name.is_empty() {
                        styles.insert(element.style_name.clone());
                    }
                    visit_runs(&element.runs);
                }
                Block::Table(table) => {
                    for paragraph in table.cell_paragraphs() {
                        if !paragraph.style_name.is_empty() {
                            styles.insert(paragraph.style_name.clone());
                        }
                        visit_runs(&paragraph.runs);
                    }
                }
            }
        }

        self.metadata.styles_used = styles.into_iter().collect();
        self.metadata.fonts_used = fonts.into_iter().collect();
        self.metadata.has_formatting = has_formatting;
    }

    /// Check the structural contract of the model.
    ///
    /// Every block must carry a position, positions must be unique, elements
    /// must not claim the `table` kind and the recorded per-kind counts must
    /// match the blocks.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut seen = HashSet::with_capacity(self.blocks.len());

        for (index, block) in self.blocks.iter().enumerate() {
            let position = block.position().ok_or_else(|| {
                PipelineError::InvalidArtifact(format!(
                    "block #{} ({}) has no position",
                    index,
                    block.kind()
                ))
            })?;

            if !seen.insert(position) {
                return Err(PipelineError::InvalidArtifact(format!(
                    "position {} appears more than once",
                    position
                )));
            }

            if let Block::Element(element) = block {
                if element.kind == ElementKind::Table {
                    return Err(PipelineError::InvalidArtifact(format!(
                        "element at position {} is labelled as a table",
                        position
                    )));
                }
            }
        }

        let actual = count_kinds(&self.blocks);
        if actual != self.metadata.kind_counts {
            return Err(PipelineError::InvalidArtifact(format!(
                "kind counts {:?} do not match blocks {:?}",
                self.metadata.kind_counts, actual
            )));
        }

        Ok(())
    }

    /// Parse and validate a serialized model
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let model: DocumentModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn count_kinds(blocks: &[Block]) -> BTreeMap<ElementKind, usize> {
    let mut counts = BTreeMap::new();
    for block in blocks {
        *counts.entry(block.kind()).or_insert(0) += 1;
    }
    counts
}
