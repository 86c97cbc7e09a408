use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;

use super::{Provider, RateLimiter, send_error, status_error};

/// Which dialect of the chat completions API to speak
#[derive(Debug, Clone, PartialEq)]
pub enum OpenAIFlavor {
    /// api.openai.com and compatible servers such as LM Studio
    Standard,
    /// Azure OpenAI; the request model names the deployment
    Azure { api_version: String },
}

/// OpenAI chat completions client
#[derive(Debug)]
pub struct OpenAI {
    client: Client,
    api_key: String,
    endpoint: String,
    flavor: OpenAIFlavor,
    /// Model used for connection probes
    model: String,
    limiter: RateLimiter,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

/// Chat completions request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Chat completions response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

impl OpenAIRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl OpenAI {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        flavor: OpenAIFlavor,
        timeout_secs: u64,
        rate_limit: Option<u32>,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            flavor,
            model: model.into(),
            limiter: RateLimiter::new(rate_limit),
        }
    }

    /// Completions URL for a model or deployment
    pub fn completions_url(&self, model: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        match &self.flavor {
            OpenAIFlavor::Standard if base.is_empty() => {
                "https://api.openai.com/v1/chat/completions".to_string()
            }
            OpenAIFlavor::Standard => format!("{}/chat/completions", base),
            OpenAIFlavor::Azure { api_version } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base, model, api_version
            ),
        }
    }

    pub async fn chat(&self, request: OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let url = self.completions_url(&request.model);
        self.limiter.acquire().await;

        let builder = self.client.post(&url).json(&request);
        let builder = match self.flavor {
            OpenAIFlavor::Standard => builder.bearer_auth(&self.api_key),
            OpenAIFlavor::Azure { .. } => builder.header("api-key", &self.api_key),
        };

        let response = builder.send().await.map_err(|e| send_error("OpenAI", e))?;
        if !response.status().is_success() {
            return Err(status_error("OpenAI", response).await);
        }

        response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse OpenAI response: {}", e)))
    }
}

#[async_trait]
impl Provider for OpenAI {
    type Request = OpenAIRequest;
    type Response = OpenAIResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        self.chat(request).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = OpenAIRequest::new(self.model.clone())
            .add_message("user", "Hello")
            .max_tokens(5);
        self.chat(request).await.map(|_| ())
    }

    fn extract_text(response: &Self::Response) -> String {
        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}
