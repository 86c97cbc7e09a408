/*!
 * Grouping of blocks by kind.
 *
 * Transform stages walk a document kind by kind (titles first, tables last)
 * but must hand back blocks in the original order. `KindGroups` keeps block
 * indices, so callers can process in canonical order and write results back
 * into the slot each block came from.
 */

use std::collections::HashMap;

use super::model::{DocumentModel, ElementKind};

#[derive(Debug, Clone, Default)]
pub struct KindGroups {
    groups: HashMap<ElementKind, Vec<usize>>,
    total: usize,
}

impl KindGroups {
    /// Index every block of the model by its kind
    pub fn from_model(model: &DocumentModel) -> Self {
        let mut groups: HashMap<ElementKind, Vec<usize>> = HashMap::new();
        for (index, block) in model.blocks.iter().enumerate() {
            groups.entry(block.kind()).or_default().push(index);
        }
        Self {
            groups,
            total: model.blocks.len(),
        }
    }

    /// Block indices of one kind, in document order
    pub fn indices(&self, kind: ElementKind) -> &[usize] {
        self.groups.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty groups in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (ElementKind, &[usize])> + '_ {
        ElementKind::CANONICAL_ORDER
            .iter()
            .copied()
            .map(|kind| (kind, self.indices(kind)))
            .filter(|(_, indices)| !indices.is_empty())
    }

    /// All block indices flattened in canonical order
    pub fn canonical_indices(&self) -> Vec<usize> {
        self.iter().flat_map(|(_, indices)| indices.iter().copied()).collect()
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.indices(kind).len()
    }

    /// Number of blocks covered
    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Block, DocumentMetadata, Element, SourceFormat, Table};

    #[test]
    fn test_canonicalIndices_shouldVisitTitleFirstAndTablesLast() {
        let blocks = vec![
            Block::from(Table::default().with_position(0)),
            Block::from(Element::new(ElementKind::BodyText, "b").with_position(1)),
            Block::from(Element::new(ElementKind::MainHeader, "h").with_position(2)),
            Block::from(Element::new(ElementKind::Title, "t").with_position(3)),
        ];
        let model = DocumentModel::new(DocumentMetadata::new("x.docx", SourceFormat::Docx), blocks);
        let groups = KindGroups::from_model(&model);

        assert_eq!(groups.canonical_indices(), vec![3, 2, 1, 0]);
        assert_eq!(groups.count(ElementKind::Table), 1);
        assert_eq!(groups.total(), 4);
    }

    #[test]
    fn test_indices_missingKind_shouldBeEmpty() {
        let model = DocumentModel::new(DocumentMetadata::new("x.txt", SourceFormat::Text), Vec::new());
        let groups = KindGroups::from_model(&model);
        assert!(groups.indices(ElementKind::Quote).is_empty());
        assert_eq!(groups.iter().count(), 0);
    }
}
