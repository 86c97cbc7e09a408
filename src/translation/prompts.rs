/*!
 * Prompt construction and reply cleanup.
 */

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::Register;

/// Few-shot pairs shown for well-known target languages, keyed by lowercase name
static LANGUAGE_EXAMPLES: Lazy<HashMap<&'static str, [(&'static str, &'static str); 3]>> =
    Lazy::new(|| {
        HashMap::from([
            ("spanish", [("Financial Report", "Informe Financiero"), ("Market Analysis", "Análisis de Mercado"), ("Hello", "Hola")]),
            ("french", [("Financial Report", "Rapport Financier"), ("Market Analysis", "Analyse du Marché"), ("Hello", "Bonjour")]),
            ("german", [("Financial Report", "Finanzbericht"), ("Market Analysis", "Marktanalyse"), ("Hello", "Hallo")]),
            ("italian", [("Financial Report", "Rapporto Finanziario"), ("Market Analysis", "Analisi di Mercato"), ("Hello", "Ciao")]),
            ("portuguese", [("Financial Report", "Relatório Financeiro"), ("Market Analysis", "Análise de Mercado"), ("Hello", "Olá")]),
            ("chinese", [("Financial Report", "财务报告"), ("Market Analysis", "市场分析"), ("Hello", "你好")]),
            ("japanese", [("Financial Report", "財務報告書"), ("Market Analysis", "市場分析"), ("Hello", "こんにちは")]),
            ("korean", [("Financial Report", "재무 보고서"), ("Market Analysis", "시장 분석"), ("Hello", "안녕하세요")]),
            ("russian", [("Financial Report", "Финансовый отчёт"), ("Market Analysis", "Анализ рынка"), ("Hello", "Привет")]),
            ("arabic", [("Financial Report", "التقرير المالي"), ("Market Analysis", "تحليل السوق"), ("Hello", "مرحبا")]),
        ])
    });

/// System and user parts of a translation request
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPrompt {
    pub system: String,
    pub user: String,
}

/// Example block for a target language, empty when none are known
pub fn examples_for(target_name: &str) -> String {
    match LANGUAGE_EXAMPLES.get(target_name.to_lowercase().as_str()) {
        Some(pairs) => {
            let mut text = format!("\nExamples for {}:\n", target_name);
            for (source, translated) in pairs {
                text.push_str(&format!("- Example: \"{}\" → \"{}\"\n", source, translated));
            }
            text
        }
        None => String::new(),
    }
}

/// Build the prompt for one text block
pub fn build_prompt(text: &str, source_name: &str, target_name: &str, register: Register) -> TranslationPrompt {
    let system = format!("You are a professional translator. {}", register.instruction());

    let user = format!(
        "Source Language: {source}\n\
         Target Language: {target}\n\
         \n\
         Text to translate: \"{text}\"\n\
         {examples}\n\
         Requirements:\n\
         - Provide ONLY the translated text, no explanations or additional text\n\
         - Do not add any prefixes like \"[{upper}]\" or similar markers\n\
         - Maintain the original meaning and context\n\
         - Use appropriate terminology for the target language\n\
         - If the text contains proper nouns or technical terms, handle them appropriately for the target language\n\
         \n\
         Translation:",
        source = source_name,
        target = target_name,
        text = text,
        examples = examples_for(target_name),
        upper = target_name.to_uppercase(),
    );

    TranslationPrompt { system, user }
}

/// Strip echoed labels and wrapping quotes from a model reply.
///
/// `labels` are the target language spellings (name, code) to look for as
/// `[LABEL]` or `Label:` prefixes.
pub fn clean_response(reply: &str, labels: &[&str]) -> String {
    let mut prefixes = Vec::with_capacity(labels.len() * 4 + 3);
    for label in labels.iter().filter(|l| !l.is_empty()) {
        prefixes.push(format!("[{}]", label.to_uppercase()));
        prefixes.push(format!("[{}]", label.to_lowercase()));
        prefixes.push(format!("{}:", label.to_uppercase()));
        prefixes.push(format!("{}:", label.to_lowercase()));
        prefixes.push(format!("{}:", label));
    }
    prefixes.extend(["Translation:", "Translated text:", "Result:"].map(String::from));

    let mut text = reply.trim();
    let mut changed = true;
    while changed {
        changed = false;
        for prefix in &prefixes {
            if let Some(rest) = text.strip_prefix(prefix.as_str()) {
                text = rest.trim_start();
                changed = true;
            }
        }
    }

    let text = text.trim();
    let unquoted = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .filter(|t| !t.contains('"'))
        .unwrap_or(text);

    unquoted.trim().to_string()
}
