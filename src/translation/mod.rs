/*!
 * Translation collaborator.
 *
 * The pipeline only sees the `Translator` trait. Implementations:
 * - `provider`: prompts an LLM provider (Ollama, OpenAI-compatible, Anthropic)
 * - `cache`: memoizing wrapper around another translator
 * - `mock`: deterministic prefix stub for tests and offline runs
 *
 * `prompts` holds the register instructions and per-language examples.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::ElementKind;
use crate::errors::TranslationError;

pub mod cache;
pub mod mock;
pub mod prompts;
pub mod provider;

pub use cache::{CachedTranslator, TranslationCache};
pub use mock::{MockBehavior, MockTranslator};
pub use prompts::{TranslationPrompt, build_prompt, clean_response};
pub use provider::{ProviderClient, ProviderTranslator, RetryPolicy};

/// Tone and intent a text block is translated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Register {
    FormalTitle,
    Header,
    NaturalFlow,
    CarefulPreserveMeaning,
    ConciseClear,
    PreserveToneAndMeaning,
    DescriptiveAccurate,
}

impl Register {
    /// Register used for an element kind
    pub fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Title => Self::FormalTitle,
            ElementKind::MainHeader | ElementKind::SubHeader => Self::Header,
            ElementKind::SpecialContent => Self::CarefulPreserveMeaning,
            ElementKind::ListItem => Self::ConciseClear,
            ElementKind::Quote => Self::PreserveToneAndMeaning,
            ElementKind::Caption => Self::DescriptiveAccurate,
            ElementKind::BodyText | ElementKind::Unknown | ElementKind::Table => Self::NaturalFlow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormalTitle => "formal_title",
            Self::Header => "header",
            Self::NaturalFlow => "natural_flow",
            Self::CarefulPreserveMeaning => "careful_preserve_meaning",
            Self::ConciseClear => "concise_clear",
            Self::PreserveToneAndMeaning => "preserve_tone_and_meaning",
            Self::DescriptiveAccurate => "descriptive_accurate",
        }
    }

    /// Instruction sentence placed in the prompt
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::FormalTitle => {
                "Translate this document title in a formal, professional style suitable for business documents."
            }
            Self::Header => {
                "Translate this section header while preserving its structural meaning and keeping it concise."
            }
            Self::NaturalFlow => {
                "Translate this text naturally with smooth, readable flow while maintaining the original meaning."
            }
            Self::CarefulPreserveMeaning => {
                "Translate this text carefully, preserving all technical terms and specific meanings."
            }
            Self::ConciseClear => "Translate this text concisely and clearly, maintaining brevity.",
            Self::PreserveToneAndMeaning => {
                "Translate this text while carefully preserving the original tone and meaning."
            }
            Self::DescriptiveAccurate => {
                "Translate this descriptive text accurately while maintaining its descriptive nature."
            }
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns one text block into the target language
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        register: Register,
    ) -> Result<String, TranslationError>;

    /// Short label for logs
    fn name(&self) -> String {
        "translator".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forKind_shouldMapEveryKind() {
        assert_eq!(Register::for_kind(ElementKind::Title), Register::FormalTitle);
        assert_eq!(Register::for_kind(ElementKind::SubHeader), Register::Header);
        assert_eq!(Register::for_kind(ElementKind::Unknown), Register::NaturalFlow);
        assert_eq!(Register::for_kind(ElementKind::Caption), Register::DescriptiveAccurate);
        assert_eq!(Register::for_kind(ElementKind::ListItem).as_str(), "concise_clear");
    }

    #[test]
    fn test_register_serde_shouldUseSnakeCase() {
        let json = serde_json::to_string(&Register::PreserveToneAndMeaning).unwrap();
        assert_eq!(json, "\"preserve_tone_and_meaning\"");
    }
}
