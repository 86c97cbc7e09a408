use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Configuration accepts ISO 639-1 codes ("es"), ISO 639-2 codes ("spa",
/// "fre") and plain English names ("Spanish"). Everything downstream works
/// with a `ResolvedLanguage`.

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterparts
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// English names accepted in place of codes
const NAMED_LANGUAGES: [(&str, &str); 16] = [
    ("english", "en"),
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("italian", "it"),
    ("portuguese", "pt"),
    ("chinese", "zh"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("russian", "ru"),
    ("arabic", "ar"),
    ("dutch", "nl"),
    ("polish", "pl"),
    ("turkish", "tr"),
    ("hindi", "hi"),
    ("swedish", "sv"),
];

/// Language code type
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// A language identified by code and English name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLanguage {
    /// ISO 639-1 code when one exists, ISO 639-2/T otherwise
    pub code: String,
    /// English reference name, e.g. "Spanish"
    pub name: String,
}

impl ResolvedLanguage {
    /// Lowercase key used for policy and example lookups
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminology(&normalized_code).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(terminology) = bibliographic_to_terminology(&normalized_code) {
            return Ok(terminology.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(lang.to_639_1().map(str::to_string).unwrap_or(part2t))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(simplify_name(lang.to_name()))
}

/// Resolve a code or English name
pub fn resolve_language(input: &str) -> Result<ResolvedLanguage> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Language must not be empty"));
    }

    if let Ok(code) = normalize_to_part1_or_part2t(trimmed) {
        let name = get_language_name(&code)?;
        return Ok(ResolvedLanguage { code, name });
    }

    let lowered = trimmed.to_lowercase();
    NAMED_LANGUAGES
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, code)| {
            let name = get_language_name(code).unwrap_or_else(|_| trimmed.to_string());
            ResolvedLanguage {
                code: code.to_string(),
                name,
            }
        })
        .ok_or_else(|| anyhow!("Unknown language: {}", input))
}

/// Strip qualifiers such as "Modern Greek (1453-)" or "Spanish; Castilian"
fn simplify_name(name: &str) -> String {
    name.split([';', '(', ','])
        .next()
        .unwrap_or(name)
        .trim()
        .to_string()
}
