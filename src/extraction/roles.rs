/*!
 * Style label to semantic role mapping.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::ElementKind;

fn default_true() -> bool {
    true
}

/// Role assigned to every paragraph carrying a given style label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub kind: ElementKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy_level: Option<u8>,

    #[serde(default = "default_true")]
    pub translatable: bool,
}

impl RoleSpec {
    pub fn new(kind: ElementKind, hierarchy_level: Option<u8>) -> Self {
        Self {
            kind,
            hierarchy_level,
            translatable: true,
        }
    }

    /// Default level for a kind when only the kind is known
    pub fn for_kind(kind: ElementKind) -> Self {
        let level = match kind {
            ElementKind::Title => Some(0),
            ElementKind::MainHeader => Some(1),
            ElementKind::SubHeader => Some(2),
            _ => None,
        };
        Self::new(kind, level)
    }
}

/// Total mapping from style label to role.
///
/// Lookup never fails: labels without an entry resolve to the fallback spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTable {
    mappings: BTreeMap<String, RoleSpec>,
    fallback: RoleSpec,
}

impl Default for RoleTable {
    fn default() -> Self {
        let entries = [
            ("CustomTitle", ElementKind::Title, Some(0)),
            ("Title", ElementKind::Title, Some(0)),
            ("CustomH1", ElementKind::MainHeader, Some(1)),
            ("Heading 1", ElementKind::MainHeader, Some(1)),
            ("CustomH2", ElementKind::SubHeader, Some(2)),
            ("Heading 2", ElementKind::SubHeader, Some(2)),
            ("CustomH3", ElementKind::SubHeader, Some(3)),
            ("Heading 3", ElementKind::SubHeader, Some(3)),
            ("Normal", ElementKind::BodyText, None),
            ("FixedContent", ElementKind::SpecialContent, None),
            ("List Paragraph", ElementKind::ListItem, None),
            ("Quote", ElementKind::Quote, None),
            ("Caption", ElementKind::Caption, None),
        ];

        let mappings = entries
            .into_iter()
            .map(|(style, kind, level)| (style.to_string(), RoleSpec::new(kind, level)))
            .collect();

        Self {
            mappings,
            fallback: RoleSpec::new(ElementKind::BodyText, None),
        }
    }
}

impl RoleTable {
    /// Table with no mappings at all
    pub fn empty(fallback: RoleSpec) -> Self {
        Self {
            mappings: BTreeMap::new(),
            fallback,
        }
    }

    /// Add or replace a mapping
    pub fn with_mapping(mut self, style: impl Into<String>, spec: RoleSpec) -> Self {
        self.mappings.insert(style.into(), spec);
        self
    }

    /// Replace the spec used for unmapped labels
    pub fn with_fallback(mut self, fallback: RoleSpec) -> Self {
        self.fallback = fallback;
        self
    }

    /// Mark a style as non-translatable, mapping it to the fallback kind if unmapped
    pub fn exclude(mut self, style: impl Into<String>) -> Self {
        let style = style.into();
        let mut spec = self.resolve(&style);
        spec.translatable = false;
        self.mappings.insert(style, spec);
        self
    }

    /// Resolve a style label.
    ///
    /// Exact match first, then a case-insensitive match, then the fallback.
    pub fn resolve(&self, style: &str) -> RoleSpec {
        if let Some(spec) = self.mappings.get(style) {
            return spec.clone();
        }

        let lowered = style.trim().to_lowercase();
        self.mappings
            .iter()
            .find(|(label, _)| label.to_lowercase() == lowered)
            .map(|(_, spec)| spec.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn fallback(&self) -> &RoleSpec {
        &self.fallback
    }

    pub fn is_mapped(&self, style: &str) -> bool {
        self.mappings.contains_key(style)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
