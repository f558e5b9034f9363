//! Azure OpenAI chat-completions provider.
//!
//! Wire structs mirror the chat-completions payload. Content is always sent
//! in the array-of-parts form (`[{"type": "text", "text": ...}]`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{
    ChatCompletions, ChatError, ChatRole, Choice, ChoiceMessage, Completion, GenerationConfig,
    HttpClient, HttpClientConfig, Message, Usage,
};
use crate::provider::constants::azure;

/// Connection parameters for an Azure OpenAI deployment.
#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub deployment: String,
    pub api_key: String,
    pub api_version: String,
    pub http_config: HttpClientConfig,
    pub generation_config: Option<GenerationConfig>,
}

impl AzureOpenAiConfig {
    pub fn new(endpoint: String, deployment: String, api_key: String) -> Self {
        Self {
            endpoint,
            deployment,
            api_key,
            api_version: azure::API_VERSION.to_string(),
            http_config: HttpClientConfig::default(),
            generation_config: None,
        }
    }

    /// Load from the process environment, falling back to placeholders.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names. Nothing is validated:
    /// placeholder values only fail once a request is sent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint =
            lookup(azure::ENDPOINT_ENV_VAR).unwrap_or_else(|| azure::DEFAULT_ENDPOINT.to_string());
        let deployment = lookup(azure::DEPLOYMENT_ENV_VAR)
            .unwrap_or_else(|| azure::DEFAULT_DEPLOYMENT.to_string());
        let api_key =
            lookup(azure::API_KEY_ENV_VAR).unwrap_or_else(|| azure::DEFAULT_API_KEY.to_string());

        let mut http_config = HttpClientConfig::default();
        match parse_var::<u64>(&lookup, azure::TIMEOUT_ENV_VAR) {
            // A zero timeout would fail every request before it is sent.
            Some(0) => warn!(
                variable = azure::TIMEOUT_ENV_VAR,
                "Ignoring zero timeout, requests will not time out"
            ),
            Some(secs) => http_config.timeout = Some(Duration::from_secs(secs)),
            None => {}
        }
        if let Some(retries) = parse_var::<u32>(&lookup, azure::MAX_RETRIES_ENV_VAR) {
            http_config.max_retries = retries;
        }

        Self::new(endpoint, deployment, api_key).with_http_config(http_config)
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_api_version(mut self, api_version: String) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn with_http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = config;
        self
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// Full chat-completions URL for `deployment`.
    pub fn completions_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            deployment,
            self.api_version
        )
    }

    fn auth_header(&self) -> (String, String) {
        (azure::API_KEY_HEADER.to_string(), self.api_key.clone())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}

/// Reusable handle for a single Azure OpenAI resource.
pub struct AzureOpenAiClient {
    config: AzureOpenAiConfig,
    http: HttpClient,
}

impl AzureOpenAiClient {
    /// Build the client. Credentials and endpoint are not checked here.
    pub fn new(config: AzureOpenAiConfig) -> Result<Self, ChatError> {
        let http = HttpClient::new(config.http_config.clone(), None)?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl ChatCompletions for AzureOpenAiClient {
    #[tracing::instrument(
        name = "chat_completion",
        skip(self, model, messages),
        fields(model = %model, messages = messages.len()),
        err
    )]
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<Completion, ChatError> {
        let request = create_request(model, messages, self.config.generation_config.as_ref());
        let url = self.config.completions_url(model);
        let headers = [self.config.auth_header()];

        let response: ChatCompletionResponse =
            self.http.post_json(&url, &headers, &request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }

        Ok(create_core_completion(response))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: WireRole,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireRole {
    System,
    User,
    #[default]
    Assistant,
    Tool,
}

impl From<ChatRole> for WireRole {
    fn from(role: ChatRole) -> Self {
        match role {
            ChatRole::System => WireRole::System,
            ChatRole::User => WireRole::User,
            ChatRole::Assistant => WireRole::Assistant,
        }
    }
}

fn create_request<'a>(
    model: &'a str,
    messages: &'a [Message],
    generation: Option<&'a GenerationConfig>,
) -> ChatCompletionRequest<'a> {
    let messages = messages
        .iter()
        .map(|m| RequestMessage {
            role: m.role.into(),
            content: vec![ContentPart::Text { text: &m.content }],
        })
        .collect();

    ChatCompletionRequest {
        model,
        messages,
        max_tokens: generation.and_then(|g| g.max_tokens),
        temperature: generation.and_then(|g| g.temperature),
        top_p: generation.and_then(|g| g.top_p),
        frequency_penalty: generation.and_then(|g| g.frequency_penalty),
        presence_penalty: generation.and_then(|g| g.presence_penalty),
        stop: generation.and_then(|g| g.stop.as_deref()),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    #[serde(default)]
    index: u32,
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    role: WireRole,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn create_core_completion(response: ChatCompletionResponse) -> Completion {
    let choices = response
        .choices
        .into_iter()
        .map(|choice| Choice {
            index: choice.index,
            message: ChoiceMessage {
                role: match choice.message.role {
                    WireRole::System => ChatRole::System,
                    WireRole::User => ChatRole::User,
                    WireRole::Assistant | WireRole::Tool => ChatRole::Assistant,
                },
                content: choice.message.content,
            },
            finish_reason: choice.finish_reason,
        })
        .collect();

    Completion {
        id: response.id,
        model: response.model,
        choices,
        usage: response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    }
}
