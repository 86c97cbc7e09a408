/*!
 * Hierarchical outline derived from a document model.
 *
 * The outline is informational only: it is rebuilt on demand from kinds and
 * block order and never feeds back into the model.
 */

use serde::{Deserialize, Serialize};

use super::model::{Block, DocumentModel, ElementKind};

/// Maximum characters of content text kept in an outline node
pub const OUTLINE_TEXT_LIMIT: usize = 100;

/// One node of the outline tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub kind: ElementKind,
    pub position: Option<usize>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn leaf(kind: ElementKind, position: Option<usize>, text: String, level: Option<u8>) -> Self {
        Self {
            kind,
            position,
            text,
            level,
            children: Vec::new(),
        }
    }

    /// This node plus all descendants
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::node_count).sum::<usize>()
    }
}

/// Title, sections, subsections and their content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outline {
    pub nodes: Vec<OutlineNode>,
}

/// Where the currently open subsection lives
#[derive(Clone, Copy)]
enum Slot {
    TopLevel(usize),
    InSection(usize, usize),
}

impl Outline {
    /// Build the outline with a single left-to-right scan.
    pub fn build(model: &DocumentModel) -> Self {
        let mut nodes: Vec<OutlineNode> = Vec::new();
        let mut section: Option<usize> = None;
        let mut subsection: Option<Slot> = None;

        for block in &model.blocks {
            let Block::Element(element) = block else {
                continue;
            };

            match element.kind {
                ElementKind::Title => {
                    nodes.push(OutlineNode::leaf(
                        element.kind,
                        element.position,
                        element.text.clone(),
                        element.hierarchy_level,
                    ));
                    section = None;
                    subsection = None;
                }
                ElementKind::MainHeader => {
                    nodes.push(OutlineNode::leaf(
                        element.kind,
                        element.position,
                        element.text.clone(),
                        element.hierarchy_level,
                    ));
                    section = Some(nodes.len() - 1);
                    subsection = None;
                }
                ElementKind::SubHeader => {
                    let node = OutlineNode::leaf(
                        element.kind,
                        element.position,
                        element.text.clone(),
                        element.hierarchy_level,
                    );
                    subsection = Some(match section {
                        Some(s) => {
                            nodes[s].children.push(node);
                            Slot::InSection(s, nodes[s].children.len() - 1)
                        }
                        None => {
                            nodes.push(node);
                            Slot::TopLevel(nodes.len() - 1)
                        }
                    });
                }
                kind if kind.is_content() => {
                    let node = OutlineNode::leaf(
                        kind,
                        element.position,
                        truncate_for_display(&element.text, OUTLINE_TEXT_LIMIT),
                        None,
                    );
                    match (subsection, section) {
                        (Some(Slot::InSection(s, c)), _) => nodes[s].children[c].children.push(node),
                        (Some(Slot::TopLevel(t)), _) => nodes[t].children.push(node),
                        (None, Some(s)) => nodes[s].children.push(node),
                        (None, None) => nodes.push(node),
                    }
                }
                _ => {}
            }
        }

        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total nodes in the tree
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(OutlineNode::node_count).sum()
    }

    /// Indented plain-text rendering, one node per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            render_node(node, 0, &mut out);
        }
        out
    }
}

fn render_node(node: &OutlineNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&format!("[{}] {}\n", node.kind, node.text));
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// Truncate on a character boundary, appending "..." when text was cut
pub fn truncate_for_display(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{DocumentMetadata, Element, SourceFormat, Table};

    fn model_of(kinds: &[(ElementKind, &str)]) -> DocumentModel {
        let blocks = kinds
            .iter()
            .enumerate()
            .map(|(i, (kind, text))| {
                if *kind == ElementKind::Table {
                    Block::from(Table::default().with_position(i))
                } else {
                    Block::from(Element::new(*kind, *text).with_position(i))
                }
            })
            .collect();
        DocumentModel::new(DocumentMetadata::new("t.docx", SourceFormat::Docx), blocks)
    }

    #[test]
    fn test_build_shouldNestSubsectionsUnderSections() {
        let model = model_of(&[
            (ElementKind::Title, "Report"),
            (ElementKind::MainHeader, "Intro"),
            (ElementKind::BodyText, "p1"),
            (ElementKind::SubHeader, "Detail"),
            (ElementKind::BodyText, "p2"),
            (ElementKind::MainHeader, "Next"),
            (ElementKind::ListItem, "item"),
        ]);
        let outline = Outline::build(&model);

        assert_eq!(outline.nodes.len(), 3);
        assert_eq!(outline.nodes[0].kind, ElementKind::Title);
        let intro = &outline.nodes[1];
        assert_eq!(intro.children.len(), 2);
        assert_eq!(intro.children[0].text, "p1");
        assert_eq!(intro.children[1].children[0].text, "p2");
        assert_eq!(outline.nodes[2].children[0].text, "item");
    }

    #[test]
    fn test_build_orphanContent_shouldFloatAtTopLevel() {
        let model = model_of(&[(ElementKind::BodyText, "lonely"), (ElementKind::SubHeader, "Sub")]);
        let outline = Outline::build(&model);
        assert_eq!(outline.nodes.len(), 2);
        assert_eq!(outline.nodes[1].kind, ElementKind::SubHeader);
    }

    #[test]
    fn test_build_shouldSkipTablesAndUnknown() {
        let model = model_of(&[
            (ElementKind::MainHeader, "H"),
            (ElementKind::Table, ""),
            (ElementKind::Unknown, "?"),
        ]);
        let outline = Outline::build(&model);
        assert_eq!(outline.node_count(), 1);
    }

    #[test]
    fn test_build_longContent_shouldBeTruncated() {
        let long = "x".repeat(150);
        let model = model_of(&[(ElementKind::BodyText, long.as_str())]);
        let outline = Outline::build(&model);
        assert_eq!(outline.nodes[0].text.chars().count(), OUTLINE_TEXT_LIMIT + 3);
        assert!(outline.nodes[0].text.ends_with("..."));
    }

    #[test]
    fn test_truncateForDisplay_multibyte_shouldNotSplitChars() {
        assert_eq!(truncate_for_display("日本語テキスト", 3), "日本語...");
        assert_eq!(truncate_for_display("short", 10), "short");
    }

    #[test]
    fn test_render_shouldIndentChildren() {
        let model = model_of(&[(ElementKind::MainHeader, "H"), (ElementKind::BodyText, "b")]);
        let rendered = Outline::build(&model).render();
        assert_eq!(rendered, "[main_header] H\n  [body_text] b\n");
    }
}
