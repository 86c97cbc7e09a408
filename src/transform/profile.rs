/*!
 * Style profiles and language policies.
 *
 * A `StyleProfile` maps element kinds to visual attributes; a
 * `LanguagePolicy` carries the typographic conventions of the target
 * language. Both are plain immutable values handed to the style stage.
 */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{Alignment, ElementKind, Spacing};

/// Size used for kinds the profile does not list
pub const DEFAULT_FONT_SIZE: &str = "11pt";

/// Color used for kinds the profile does not list
pub const DEFAULT_FONT_COLOR: &str = "#000000";

/// Font used when neither the language policy nor the profile names one
pub const DEFAULT_FONT: &str = "Arial";

/// Visual attributes for one element kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindStyle {
    pub font_size: String,
    pub color: String,
    /// `None` defers to the language policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub spacing: Spacing,
}

impl Default for KindStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE.to_string(),
            color: DEFAULT_FONT_COLOR.to_string(),
            alignment: None,
            spacing: Spacing::new(0.0, 6.0),
        }
    }
}

impl KindStyle {
    pub fn new(font_size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            font_size: font_size.into(),
            color: color.into(),
            ..Default::default()
        }
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Set spacing from a description like "18pt before, 6pt after"
    pub fn spacing(mut self, description: &str) -> Self {
        self.spacing = parse_spacing(description);
        self
    }
}

/// Parse "Npt before, Mpt after" style descriptions; missing sides are zero
pub fn parse_spacing(description: &str) -> Spacing {
    let mut spacing = Spacing::default();

    for part in description.split(',') {
        let mut words = part.split_whitespace();
        let (Some(amount), Some(side)) = (words.next(), words.next()) else {
            continue;
        };
        let Ok(points) = amount.trim_end_matches("pt").parse::<f32>() else {
            continue;
        };
        match side {
            "before" => spacing.before_pt = points,
            "after" => spacing.after_pt = points,
            _ => {}
        }
    }

    spacing
}

/// Kind to attribute mapping plus font families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub font_families: Vec<String>,
    #[serde(default)]
    pub kinds: BTreeMap<ElementKind, KindStyle>,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self::professional()
    }
}

impl StyleProfile {
    /// Names accepted by `by_name`
    pub const BUILTIN: [&'static str; 2] = ["professional", "minimal"];

    /// Business document look with colored headings
    pub fn professional() -> Self {
        let kinds = BTreeMap::from([
            (
                ElementKind::Title,
                KindStyle::new("18pt", "#1f4e79")
                    .alignment(Alignment::Center)
                    .spacing("0pt before, 24pt after"),
            ),
            (
                ElementKind::MainHeader,
                KindStyle::new("14pt", "#2c5aa0")
                    .alignment(Alignment::Left)
                    .spacing("18pt before, 6pt after"),
            ),
            (
                ElementKind::SubHeader,
                KindStyle::new("12pt", "#365f91")
                    .alignment(Alignment::Left)
                    .spacing("12pt before, 3pt after"),
            ),
            (
                ElementKind::BodyText,
                KindStyle::new("11pt", "#1a1a1a")
                    .alignment(Alignment::Justify)
                    .spacing("0pt before, 6pt after"),
            ),
            (
                ElementKind::SpecialContent,
                KindStyle::new("10pt", "#5d6d7e")
                    .alignment(Alignment::Left)
                    .spacing("6pt before, 6pt after"),
            ),
        ]);

        Self {
            name: "professional".to_string(),
            description: "Clean, professional business document style".to_string(),
            font_families: vec!["Arial".into(), "Calibri".into(), "Times New Roman".into()],
            kinds,
        }
    }

    /// Monochrome profile with small size steps; body alignment follows the language
    pub fn minimal() -> Self {
        let kinds = BTreeMap::from([
            (
                ElementKind::Title,
                KindStyle::new("16pt", DEFAULT_FONT_COLOR)
                    .alignment(Alignment::Center)
                    .spacing("0pt before, 12pt after"),
            ),
            (
                ElementKind::MainHeader,
                KindStyle::new("13pt", DEFAULT_FONT_COLOR).spacing("12pt before, 4pt after"),
            ),
            (
                ElementKind::SubHeader,
                KindStyle::new("12pt", DEFAULT_FONT_COLOR).spacing("8pt before, 2pt after"),
            ),
            (
                ElementKind::BodyText,
                KindStyle::new("11pt", DEFAULT_FONT_COLOR).spacing("0pt before, 4pt after"),
            ),
        ]);

        Self {
            name: "minimal".to_string(),
            description: "Plain black text, alignment left to the language".to_string(),
            font_families: vec!["Calibri".into(), "Arial".into()],
            kinds,
        }
    }

    /// Look up a built-in profile
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "professional" => Some(Self::professional()),
            "minimal" => Some(Self::minimal()),
            _ => None,
        }
    }

    /// Replace or add the style for one kind
    pub fn with_override(mut self, kind: ElementKind, style: KindStyle) -> Self {
        self.kinds.insert(kind, style);
        self
    }

    /// Attributes for a kind, defaults when the profile is silent
    pub fn style_for(&self, kind: ElementKind) -> KindStyle {
        self.kinds.get(&kind).cloned().unwrap_or_default()
    }
}

/// Text direction recorded by a language policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Typographic conventions of a target language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguagePolicy {
    /// Lowercase English language name
    pub language: String,
    pub writing_direction: WritingDirection,
    pub preferred_fonts: Vec<String>,
    pub default_alignment: Alignment,
    pub header_alignment: Alignment,
    pub line_spacing: f32,
    pub paragraph_spacing: f32,
}

impl Default for LanguagePolicy {
    fn default() -> Self {
        Self::latin("english")
    }
}

impl LanguagePolicy {
    fn latin(language: &str) -> Self {
        Self {
            language: language.to_string(),
            writing_direction: WritingDirection::Ltr,
            preferred_fonts: vec!["Arial".into(), "Calibri".into(), "Times New Roman".into()],
            default_alignment: Alignment::Justify,
            header_alignment: Alignment::Left,
            line_spacing: 1.0,
            paragraph_spacing: 1.0,
        }
    }

    fn cjk(language: &str, fonts: [&str; 2]) -> Self {
        Self {
            language: language.to_string(),
            writing_direction: WritingDirection::Ltr,
            preferred_fonts: vec![fonts[0].into(), fonts[1].into(), "Arial Unicode MS".into()],
            default_alignment: Alignment::Left,
            header_alignment: Alignment::Left,
            line_spacing: 1.15,
            paragraph_spacing: 1.0,
        }
    }

    fn arabic() -> Self {
        Self {
            language: "arabic".to_string(),
            writing_direction: WritingDirection::Rtl,
            preferred_fonts: vec!["Arial".into(), "Traditional Arabic".into(), "Tahoma".into()],
            default_alignment: Alignment::Right,
            header_alignment: Alignment::Right,
            line_spacing: 1.0,
            paragraph_spacing: 1.0,
        }
    }

    /// Built-in policy for a lowercase English language name.
    ///
    /// Unknown languages get the english policy.
    pub fn for_language(language: &str) -> Self {
        let key = language.trim().to_lowercase();
        match key.as_str() {
            "english" | "spanish" | "french" | "german" | "italian" | "portuguese" | "russian" => {
                Self::latin(&key)
            }
            "chinese" => Self::cjk("chinese", ["Microsoft YaHei", "SimSun"]),
            "japanese" => Self::cjk("japanese", ["Yu Gothic", "MS Mincho"]),
            "korean" => Self::cjk("korean", ["Malgun Gothic", "Batang"]),
            "arabic" => Self::arabic(),
            _ => Self::latin("english"),
        }
    }

    /// Font applied to every styled run
    pub fn primary_font(&self) -> &str {
        self.preferred_fonts.first().map(String::as_str).unwrap_or(DEFAULT_FONT)
    }
}
