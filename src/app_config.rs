use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::document::ElementKind;
use crate::extraction::{RoleSpec, RoleTable};
use crate::transform::{KindStyle, StyleProfile};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language (ISO code or English name)
    pub source_language: String,

    /// Target language (ISO code or English name)
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Output styling
    #[serde(default)]
    pub style: StyleConfig,

    /// Style label to role mapping adjustments
    #[serde(default)]
    pub roles: RolesConfig,

    /// Where stage artifacts are kept
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    #[default]
    Ollama,
    OpenAI,
    /// Azure OpenAI deployment; `model` names the deployment
    Azure,
    Anthropic,
    /// LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    pub const ALL: [TranslationProvider; 5] = [
        Self::Ollama,
        Self::OpenAI,
        Self::Azure,
        Self::Anthropic,
        Self::LMStudio,
    ];

    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Azure => "Azure OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Azure => "azure".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Hosted services refuse requests without a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Azure | Self::Anthropic)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "azure" => Ok(Self::Azure),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default = "String::new")]
    pub model: String,

    #[serde(default = "String::new")]
    pub api_key: String,

    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Azure REST API version
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Requests per minute
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    pub fn new(provider_type: TranslationProvider) -> Self {
        let base = Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(provider_type),
            api_version: default_azure_api_version(),
            timeout_secs: default_timeout_secs(),
            rate_limit: default_rate_limit(provider_type),
        };

        match provider_type {
            TranslationProvider::Anthropic => Self {
                timeout_secs: default_anthropic_timeout_secs(),
                ..base
            },
            _ => base,
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProvider,

    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Translation requests in flight per document; 1 is strictly sequential
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Translate table cell paragraphs as well
    #[serde(default)]
    pub translate_table_cells: bool,

    /// Reuse translations of identical text within a run
    #[serde(default = "default_true")]
    pub enable_cache: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_concurrent_requests: default_max_concurrent_requests(),
            translate_table_cells: false,
            enable_cache: true,
        }
    }
}

/// Output styling configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StyleConfig {
    /// Built-in profile name
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Per-kind replacements applied on top of the profile
    #[serde(default)]
    pub overrides: BTreeMap<ElementKind, KindStyle>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            overrides: BTreeMap::new(),
        }
    }
}

impl StyleConfig {
    /// Resolve the named profile and apply the overrides
    pub fn build_profile(&self) -> Result<StyleProfile> {
        let profile = StyleProfile::by_name(&self.profile).ok_or_else(|| {
            anyhow!(
                "Unknown style profile '{}', expected one of: {}",
                self.profile,
                StyleProfile::BUILTIN.join(", ")
            )
        })?;

        Ok(self
            .overrides
            .iter()
            .fold(profile, |profile, (kind, style)| profile.with_override(*kind, style.clone())))
    }
}

/// Adjustments to the default role table
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RolesConfig {
    /// Extra or replacement style mappings
    #[serde(default)]
    pub mappings: BTreeMap<String, RoleSpec>,

    /// Styles whose paragraphs are never translated
    #[serde(default)]
    pub excluded: Vec<String>,

    /// Kind for unmapped styles (body_text when absent)
    #[serde(default)]
    pub fallback: Option<ElementKind>,
}

impl RolesConfig {
    pub fn build_table(&self) -> RoleTable {
        let mut table = RoleTable::default();
        if let Some(kind) = self.fallback {
            table = table.with_fallback(RoleSpec::for_kind(kind));
        }
        for (style, spec) in &self.mappings {
            table = table.with_mapping(style.clone(), spec.clone());
        }
        for style in &self.excluded {
            table = table.exclude(style.clone());
        }
        table
    }
}

/// Artifact store backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Sqlite,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Session directory (file) or database file (sqlite); platform data dir when unset
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_anthropic_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_concurrent_requests() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_profile() -> String {
    "professional".to_string()
}

fn default_azure_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_endpoint(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "http://localhost:11434",
        TranslationProvider::OpenAI => "https://api.openai.com/v1",
        // Resource specific, e.g. https://my-resource.openai.azure.com
        TranslationProvider::Azure => "",
        TranslationProvider::Anthropic => "https://api.anthropic.com",
        TranslationProvider::LMStudio => "http://localhost:1234/v1",
    }
    .to_string()
}

fn default_model(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "llama3",
        TranslationProvider::OpenAI => "gpt-4o-mini",
        TranslationProvider::Azure => "gpt-4o",
        TranslationProvider::Anthropic => "claude-3-haiku-20240307",
        TranslationProvider::LMStudio => "local-model",
    }
    .to_string()
}

fn default_rate_limit(provider: TranslationProvider) -> Option<u32> {
    match provider {
        TranslationProvider::OpenAI | TranslationProvider::Azure => Some(60),
        TranslationProvider::Anthropic => Some(45),
        TranslationProvider::Ollama | TranslationProvider::LMStudio => None,
    }
}

impl Config {
    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Load the file, or create it with defaults when missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::from_file(path);
        }
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.validate_document_settings()?;

        let provider = self.translation.provider;
        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                provider.display_name()
            ));
        }
        if provider == TranslationProvider::Azure && self.translation.get_endpoint().is_empty() {
            return Err(anyhow!("Azure OpenAI requires an endpoint"));
        }

        Ok(())
    }

    /// Checks that do not involve the provider: languages, concurrency and
    /// the style profile. Offline runs only need these.
    pub fn validate_document_settings(&self) -> Result<()> {
        crate::language_utils::resolve_language(&self.source_language)
            .context("Invalid source language")?;
        crate::language_utils::resolve_language(&self.target_language)
            .context("Invalid target language")?;

        if self.translation.common.max_concurrent_requests == 0 {
            return Err(anyhow!("max_concurrent_requests must be at least 1"));
        }

        self.style.build_profile()?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "es".to_string(),
            translation: TranslationConfig::default(),
            style: StyleConfig::default(),
            roles: RolesConfig::default(),
            storage: StorageConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    fn active_field(&self, field: impl Fn(&ProviderConfig) -> &String) -> Option<String> {
        self.get_active_provider_config()
            .map(field)
            .filter(|value| !value.is_empty())
            .cloned()
    }

    pub fn get_model(&self) -> String {
        self.active_field(|p| &p.model)
            .unwrap_or_else(|| default_model(self.provider))
    }

    pub fn get_api_key(&self) -> String {
        self.active_field(|p| &p.api_key).unwrap_or_default()
    }

    pub fn get_endpoint(&self) -> String {
        self.active_field(|p| &p.endpoint)
            .unwrap_or_else(|| default_endpoint(self.provider))
    }

    pub fn get_api_version(&self) -> String {
        self.active_field(|p| &p.api_version)
            .unwrap_or_else(default_azure_api_version)
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    pub fn get_rate_limit(&self) -> Option<u32> {
        match self.get_active_provider_config() {
            Some(provider_config) => provider_config.rate_limit,
            None => default_rate_limit(self.provider),
        }
    }

    /// Point the active provider at a different model, adding its entry if needed
    pub fn set_model(&mut self, model: impl Into<String>) {
        let provider = self.provider;
        let provider_str = provider.to_lowercase_string();
        let model = model.into();

        match self
            .available_providers
            .iter_mut()
            .find(|p| p.provider_type == provider_str)
        {
            Some(entry) => entry.model = model,
            None => {
                let mut entry = ProviderConfig::new(provider);
                entry.model = model;
                self.available_providers.push(entry);
            }
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: TranslationProvider::ALL
                .iter()
                .copied()
                .map(ProviderConfig::new)
                .collect(),
            common: TranslationCommonConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shouldValidate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_hostedProviderWithoutKey_shouldFail() {
        let mut config = Config::default();
        config.translation.provider = TranslationProvider::Anthropic;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_validate_unknownProfile_shouldFail() {
        let mut config = Config::default();
        config.style.profile = "baroque".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_setModel_shouldUpdateActiveProvider() {
        let mut config = TranslationConfig::default();
        config.set_model("mistral");
        assert_eq!(config.get_model(), "mistral");

        config.available_providers.clear();
        config.set_model("qwen2");
        assert_eq!(config.get_model(), "qwen2");
        assert_eq!(config.available_providers.len(), 1);
    }

    #[test]
    fn test_rolesConfig_shouldExtendDefaultTable() {
        let roles = RolesConfig {
            mappings: BTreeMap::from([(
                "Sidebar".to_string(),
                RoleSpec::for_kind(ElementKind::Quote),
            )]),
            excluded: vec!["Normal".to_string()],
            fallback: Some(ElementKind::Unknown),
        };
        let table = roles.build_table();

        assert_eq!(table.resolve("Sidebar").kind, ElementKind::Quote);
        assert!(!table.resolve("Normal").translatable);
        assert_eq!(table.resolve("Whatever").kind, ElementKind::Unknown);
    }

    #[test]
    fn test_styleConfig_overrides_shouldReplaceKindStyle() {
        let style = StyleConfig {
            profile: "minimal".to_string(),
            overrides: BTreeMap::from([(ElementKind::Quote, KindStyle::new("9pt", "#333333"))]),
        };
        let profile = style.build_profile().unwrap();
        assert_eq!(profile.style_for(ElementKind::Quote).font_size, "9pt");
    }
}
