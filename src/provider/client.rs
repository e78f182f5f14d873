//! Provider descriptor and completion client.
//!
//! # Responsibilities
//! - Represent one configured external completion service
//! - Speak the provider's API dialect (OpenAI, Anthropic, Google)
//! - Offer a lightweight health probe
//!
//! # Design Decisions
//! - Providers are immutable after construction; mutable call state
//!   (failures, cooldowns) lives in the circuit breaker, not here
//! - No retry logic here; the orchestrator advances to the next candidate
//! - Upstream error bodies are sanitized before logging

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ApiFlavor;
use crate::council::roles::Role;
use crate::provider::types::{sanitize, Completion, CompletionRequest, ProviderError, ProviderResult};

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One configured external completion service.
#[derive(Debug, Clone)]
pub struct Provider {
    name: String,
    endpoint: Url,
    api_key: String,
    default_model: String,
    flavor: ApiFlavor,
    roles: Vec<Role>,
    client: reqwest::Client,
}

impl Provider {
    pub(crate) fn new(
        name: String,
        endpoint: Url,
        api_key: String,
        default_model: String,
        flavor: ApiFlavor,
        roles: Vec<Role>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name,
            endpoint,
            api_key,
            default_model,
            flavor,
            roles,
            client,
        }
    }

    /// Stable provider identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model used when a request does not specify one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Council roles this provider can fill.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Whether this provider is tagged for `role`.
    pub fn fills(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn flavor(&self) -> ApiFlavor {
        self.flavor
    }

    /// Run one completion request against the provider.
    pub async fn complete(&self, request: &CompletionRequest) -> ProviderResult<Completion> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let text = match self.flavor {
            ApiFlavor::OpenAi => self.complete_openai(model, request).await?,
            ApiFlavor::Anthropic => self.complete_anthropic(model, request).await?,
            ApiFlavor::Google => self.complete_google(model, request).await?,
        };

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }

        Ok(Completion {
            text,
            model: model.to_string(),
            provider: self.name.clone(),
        })
    }

    /// Lightweight health probe: list models (or equivalent) without paying
    /// for a completion.
    pub async fn probe(&self) -> ProviderResult<()> {
        let response = match self.flavor {
            ApiFlavor::OpenAi => {
                self.client
                    .get(self.url("/v1/models"))
                    .bearer_auth(&self.api_key)
                    .send()
                    .await?
            }
            ApiFlavor::Anthropic => {
                self.client
                    .get(self.url("/v1/models"))
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .send()
                    .await?
            }
            ApiFlavor::Google => {
                self.client
                    .get(self.url("/v1beta/models"))
                    .query(&[("key", self.api_key.as_str())])
                    .send()
                    .await?
            }
        };

        self.check_status(response).await.map(|_| ())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.as_str().trim_end_matches('/'), path)
    }

    /// Convert a non-2xx response into a typed API error with a sanitized
    /// message.
    async fn check_status(&self, response: reqwest::Response) -> ProviderResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Api {
            status: status.as_u16(),
            message: sanitize(&body),
        })
    }

    async fn complete_openai(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> ProviderResult<String> {
        let mut messages = Vec::new();
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = OpenAiRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(sanitize(&e.to_string())))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Malformed("no choices in response".to_string()))
    }

    async fn complete_anthropic(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> ProviderResult<String> {
        let body = AnthropicRequest {
            model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(self.url("/v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(sanitize(&e.to_string())))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::Malformed("no text blocks in response".to_string()));
        }
        Ok(text)
    }

    async fn complete_google(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> ProviderResult<String> {
        // The generateContent API has no separate system slot in its minimal
        // form; fold the instruction into the prompt.
        let text = match request.system.as_deref() {
            Some(system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };

        let body = GoogleRequest {
            contents: vec![GoogleContent {
                parts: vec![GooglePart { text }],
            }],
            generation_config: GoogleGenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let path = format!("/v1beta/models/{}:generateContent", model);
        let response = self
            .client
            .post(self.url(&path))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let parsed: GoogleResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(sanitize(&e.to_string())))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::Malformed("no candidates in response".to_string()));
        }
        Ok(text)
    }
}

// --- Wire shapes ---

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRequest {
    contents: Vec<GoogleContent>,
    generation_config: GoogleGenerationConfig,
}

#[derive(Serialize)]
struct GoogleContent {
    parts: Vec<GooglePart>,
}

#[derive(Serialize)]
struct GooglePart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: GoogleCandidateContent,
}

#[derive(Deserialize)]
struct GoogleCandidateContent {
    #[serde(default)]
    parts: Vec<GoogleResponsePart>,
}

#[derive(Deserialize)]
struct GoogleResponsePart {
    text: Option<String>,
}
