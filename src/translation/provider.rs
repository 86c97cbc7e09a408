/*!
 * LLM-backed translator.
 *
 * Builds the register-specific prompt, sends it to the configured provider
 * with retries, and cleans the reply.
 */

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIFlavor, OpenAIRequest};
use crate::providers::{Provider, is_retryable};

use super::prompts::{TranslationPrompt, build_prompt, clean_response};
use super::{Register, Translator};

/// Tokens allowed for a single block reply
const MAX_REPLY_TOKENS: u32 = 2048;

/// Exponential backoff with jitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            base_backoff_ms,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_backoff_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
        let jitter = if base >= 4 {
            rand::rng().random_range(0..=base / 4)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}

/// Concrete provider client
#[derive(Debug)]
pub enum ProviderClient {
    Ollama(Ollama),
    /// OpenAI, Azure OpenAI and LM Studio
    OpenAI(OpenAI),
    Anthropic(Anthropic),
}

impl ProviderClient {
    /// Build the client for the active provider
    pub fn from_config(config: &TranslationConfig) -> Result<Self, ProviderError> {
        let endpoint = config.get_endpoint();
        let model = config.get_model();
        let timeout = config.get_timeout_secs();
        let rate_limit = config.get_rate_limit();

        Ok(match config.provider {
            TranslationProvider::Ollama => Self::Ollama(Ollama::new(&endpoint, timeout, rate_limit)?),
            TranslationProvider::OpenAI => Self::OpenAI(OpenAI::new(
                config.get_api_key(),
                endpoint,
                model,
                OpenAIFlavor::Standard,
                timeout,
                rate_limit,
            )),
            TranslationProvider::Azure => Self::OpenAI(OpenAI::new(
                config.get_api_key(),
                endpoint,
                model,
                OpenAIFlavor::Azure {
                    api_version: config.get_api_version(),
                },
                timeout,
                rate_limit,
            )),
            TranslationProvider::LMStudio => {
                // LM Studio ignores the key but some builds reject an empty one
                let api_key = Some(config.get_api_key())
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| "lm-studio".to_string());
                Self::OpenAI(OpenAI::new(
                    api_key,
                    endpoint,
                    model,
                    OpenAIFlavor::Standard,
                    timeout,
                    rate_limit,
                ))
            }
            TranslationProvider::Anthropic => Self::Anthropic(Anthropic::new(
                config.get_api_key(),
                endpoint,
                model,
                timeout,
                rate_limit,
            )),
        })
    }

    /// Send one prompt and return the raw reply text
    pub async fn send(&self, model: &str, prompt: &TranslationPrompt, temperature: f32) -> Result<String, ProviderError> {
        match self {
            Self::Ollama(client) => {
                let request = GenerationRequest::new(model, prompt.user.clone())
                    .system(prompt.system.clone())
                    .temperature(temperature)
                    .num_predict(MAX_REPLY_TOKENS);
                let response = client.complete(request).await?;
                Ok(Ollama::extract_text(&response))
            }
            Self::OpenAI(client) => {
                let request = OpenAIRequest::new(model)
                    .add_message("system", prompt.system.clone())
                    .add_message("user", prompt.user.clone())
                    .temperature(temperature)
                    .max_tokens(MAX_REPLY_TOKENS);
                let response = client.complete(request).await?;
                Ok(OpenAI::extract_text(&response))
            }
            Self::Anthropic(client) => {
                let request = AnthropicRequest::new(model, MAX_REPLY_TOKENS)
                    .system(prompt.system.clone())
                    .add_message("user", prompt.user.clone())
                    .temperature(temperature);
                let response = client.complete(request).await?;
                Ok(Anthropic::extract_text(&response))
            }
        }
    }

    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match self {
            Self::Ollama(client) => client.test_connection().await,
            Self::OpenAI(client) => client.test_connection().await,
            Self::Anthropic(client) => client.test_connection().await,
        }
    }
}

/// `Translator` backed by an LLM provider
#[derive(Debug)]
pub struct ProviderTranslator {
    client: ProviderClient,
    provider: TranslationProvider,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl ProviderTranslator {
    pub fn new(client: ProviderClient, provider: TranslationProvider, model: impl Into<String>) -> Self {
        Self {
            client,
            provider,
            model: model.into(),
            temperature: 0.3,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Result<Self, ProviderError> {
        let client = ProviderClient::from_config(config)?;
        Ok(Self::new(client, config.provider, config.get_model())
            .with_temperature(config.common.temperature)
            .with_retry(RetryPolicy::new(config.common.retry_count, config.common.retry_backoff_ms)))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.client.test_connection().await
    }

    async fn send_with_retry(&self, prompt: &TranslationPrompt) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.client.send(&self.model, prompt, self.temperature).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.retry.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "{} request failed ({}), retry {}/{} in {:?}",
                        self.provider.display_name(),
                        e,
                        attempt,
                        self.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Name used in prompts; raw input when it is not a known language
fn display_language(language: &str) -> (String, Option<String>) {
    match language_utils::resolve_language(language) {
        Ok(resolved) => (resolved.name, Some(resolved.code)),
        Err(_) => (language.to_string(), None),
    }
}

#[async_trait]
impl Translator for ProviderTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        register: Register,
    ) -> Result<String, TranslationError> {
        let (source_name, _) = display_language(source_language);
        let (target_name, target_code) = display_language(target_language);
        let prompt = build_prompt(text, &source_name, &target_name, register);

        let started = Instant::now();
        let reply = self.send_with_retry(&prompt).await?;
        debug!(
            "{} answered {} chars in {:?}",
            self.provider.display_name(),
            reply.len(),
            started.elapsed()
        );

        let mut labels = vec![target_name.as_str(), target_language];
        if let Some(code) = target_code.as_deref() {
            labels.push(code);
        }

        let cleaned = clean_response(&reply, &labels);
        if cleaned.is_empty() {
            return Err(TranslationError::EmptyResponse(text.chars().count()));
        }
        Ok(cleaned)
    }

    fn name(&self) -> String {
        format!("{} ({})", self.provider.display_name(), self.model)
    }
}
