
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{ChatModel, EmbeddingModel};
use crate::config::{BEARER_TOKEN_ENV, Config};
use crate::prompt::{Message, Role};
use crate::{RagError, Result};

const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";
const THROTTLING_EXCEPTION: &str = "ThrottlingException";
const TOO_MANY_REQUESTS: u16 = 429;

/// Blocking HTTP client for the Bedrock Runtime API
#[derive(Debug, Clone)]
pub struct BedrockClient {
    base_url: Url,
    agent: ureq::Agent,
    bearer_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest {
    messages: Vec<ConverseMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<ContentBlock>,
    inference_config: InferenceConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConverseMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct InferenceConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: ConverseMessage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbedRequest<'a> {
    input_text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbedResponse {
    embedding: Vec<f32>,
    #[serde(default)]
    input_text_token_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "Message")]
    message: Option<String>,
    #[serde(default, rename = "__type")]
    error_type: Option<String>,
}

impl BedrockClient {
    /// Build a client from configuration, reading the API key from the environment
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .endpoint_url()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let bearer_token = std::env::var(BEARER_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty());
        if bearer_token.is_none() {
            warn!(
                "{} is not set, Bedrock requests will be unauthenticated",
                BEARER_TOKEN_ENV
            );
        }

        Ok(Self {
            base_url,
            agent: build_agent(config.bedrock.timeout()),
            bearer_token,
        })
    }

    #[inline]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[inline]
    pub fn has_credentials(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// `{base}/model/{model_id}/{action}` with the model id as a single path segment
    fn model_url(&self, model_id: &str, action: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RagError::Config(format!("Endpoint cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["model", model_id, action]);
        Ok(url)
    }

    fn post_json<T: Serialize>(&self, model_id: &str, action: &str, body: &T) -> Result<String> {
        let url = self.model_url(model_id, action)?;
        let request_json = serde_json::to_string(body).context("Failed to serialize request")?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        let mut request = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        if let Some(token) = &self.bearer_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let mut response = request
            .send(&request_json)
            .map_err(|e| RagError::Provider(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let error_type = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RagError::Provider(format!("Failed to read response body: {}", e)))?;

        if (200..300).contains(&status) {
            return Ok(body);
        }

        Err(classify_error(status, error_type.as_deref(), &body))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Map a non-success Bedrock response onto the crate's error kinds
pub(crate) fn classify_error(status: u16, error_type: Option<&str>, body: &str) -> RagError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let error_type = error_type
        .map(str::to_string)
        .or(parsed.error_type)
        .unwrap_or_default();
    // Header values look like "ThrottlingException:http://internal.amazon.com/..."
    let short_type = error_type.split(':').next().unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| body.trim().to_string());

    if status == TOO_MANY_REQUESTS || short_type.ends_with(THROTTLING_EXCEPTION) {
        warn!("Bedrock throttled the request: {}", message);
        return RagError::ProviderRateLimited(message);
    }

    if short_type.is_empty() {
        RagError::Provider(format!("HTTP {}: {}", status, message))
    } else {
        RagError::Provider(format!("HTTP {} {}: {}", status, short_type, message))
    }
}

fn to_converse_request(messages: &[Message], temperature: f32) -> ConverseRequest {
    let mut system = Vec::new();
    let mut turns = Vec::new();

    for message in messages {
        let block = ContentBlock {
            text: Some(message.content.clone()),
        };
        match message.role {
            Role::System => system.push(block),
            Role::User => turns.push(ConverseMessage {
                role: "user".to_string(),
                content: vec![block],
            }),
            Role::Assistant => turns.push(ConverseMessage {
                role: "assistant".to_string(),
                content: vec![block],
            }),
        }
    }

    ConverseRequest {
        messages: turns,
        system,
        inference_config: InferenceConfig { temperature },
    }
}

fn parse_converse_response(body: &str) -> Result<String> {
    let response: ConverseResponse =
        serde_json::from_str(body).context("Failed to parse Converse response")?;

    let text: String = response
        .output
        .message
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect();

    if let Some(usage) = response.usage {
        debug!(
            "Converse usage: {} input, {} output, {} total tokens (stop reason {:?})",
            usage.input_tokens, usage.output_tokens, usage.total_tokens, response.stop_reason
        );
    }

    Ok(text)
}

/// Chat through the Converse API
#[derive(Debug, Clone)]
pub struct BedrockChat {
    client: BedrockClient,
    model_id: String,
    temperature: f32,
}

impl BedrockChat {
    #[inline]
    pub fn new(client: BedrockClient, model_id: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model_id: model_id.into(),
            temperature,
        }
    }

    #[inline]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

impl ChatModel for BedrockChat {
    #[inline]
    fn model_id(&self) -> &str {
        &self.model_id
    }

    #[inline]
    fn chat(&self, messages: &[Message]) -> Result<String> {
        debug!(
            "Sending {} messages to {} (temperature {})",
            messages.len(),
            self.model_id,
            self.temperature
        );

        let request = to_converse_request(messages, self.temperature);
        let body = self.client.post_json(&self.model_id, "converse", &request)?;
        let text = parse_converse_response(&body)?;

        info!("Received {} characters from {}", text.len(), self.model_id);
        Ok(text)
    }
}

/// Titan text embeddings, one request per text
#[derive(Debug, Clone)]
pub struct BedrockEmbeddings {
    client: BedrockClient,
    model_id: String,
}

impl BedrockEmbeddings {
    #[inline]
    pub fn new(client: BedrockClient, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let body = self.client.post_json(
            &self.model_id,
            "invoke",
            &TitanEmbedRequest { input_text: text },
        )?;
        let response: TitanEmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;

        if response.embedding.is_empty() {
            return Err(RagError::Provider(format!(
                "{} returned an empty embedding",
                self.model_id
            )));
        }

        debug!(
            "Embedded {} tokens into {} dimensions",
            response.input_text_token_count.unwrap_or_default(),
            response.embedding.len()
        );
        Ok(response.embedding)
    }
}

impl EmbeddingModel for BedrockEmbeddings {
    #[inline]
    fn model_id(&self) -> &str {
        &self.model_id
    }

    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }
}
