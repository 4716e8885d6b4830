//! Gemini Provider
//!
//! Implementation of `LlmProvider` over the Gemini `generateContent` REST API.

use std::time::Duration;

use async_trait::async_trait;
use chat_core::{
    error::{ChatError, Result},
    message::{Content, Part, Role},
    provider::{
        Candidate, ChatRequest, ChatResponse, FinishReason, GenerationOptions, LlmProvider,
        TokenUsage,
    },
    tool::{ToolCall, ToolSchema},
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API credential sent as `x-goog-api-key`
    pub api_key: String,

    /// API root, without trailing `/models`
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Read `GOOGLE_API_KEY`, `GEMINI_BASE_URL` and `GEMINI_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ChatError::Config("GOOGLE_API_KEY is not set".into()))?;
        let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            api_key,
            base_url,
            timeout_secs,
        })
    }
}

/// Gemini reasoning service
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
    /// Model probed by `health_check`
    model: String,
}

impl GeminiProvider {
    /// Create from configuration
    pub fn from_config(config: GeminiConfig, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Config(e.to_string()))?;

        Ok(Self {
            client,
            config,
            model: model.into(),
        })
    }

    /// Create from environment variables (`GEMINI_MODEL` picks the probed model)
    pub fn from_env() -> Result<Self> {
        let model = std::env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| GenerationOptions::default().model);
        Self::from_config(GeminiConfig::from_env()?, model)
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.config.base_url.trim_end_matches('/'), model)
    }

    /// Build the REST body for a request
    fn build_body(request: &ChatRequest) -> GenerateContentRequest {
        let declarations: Vec<FunctionDeclaration> =
            request.tools.iter().map(FunctionDeclaration::from).collect();

        GenerateContentRequest {
            contents: request.contents.iter().map(WireContent::from).collect(),
            system_instruction: request.system_instruction.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart::text(text.clone())],
            }),
            tools: if declarations.is_empty() {
                Vec::new()
            } else {
                vec![WireTool {
                    function_declarations: declarations,
                }]
            },
            generation_config: WireGenerationConfig {
                temperature: request.options.temperature,
                max_output_tokens: request.options.max_tokens,
                top_p: request.options.top_p,
            },
        }
    }

    /// Convert the REST response into a chat response
    fn convert_response(response: GenerateContentResponse, model: &str) -> Result<ChatResponse> {
        if response.candidates.is_empty() {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".into());
            return Err(ChatError::Provider(format!("Gemini returned no answer: {reason}")));
        }

        let candidates = response
            .candidates
            .into_iter()
            .map(|c| Candidate {
                content: c.content.map_or_else(
                    || Content {
                        role: Role::Model,
                        parts: Vec::new(),
                    },
                    Content::from,
                ),
                finish_reason: c.finish_reason.as_deref().map(finish_reason),
            })
            .collect();

        Ok(ChatResponse {
            candidates,
            model: response.model_version.unwrap_or_else(|| model.to_string()),
            usage: response.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
        })
    }
}

fn finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => FinishReason::Safety,
        _ => FinishReason::Other,
    }
}

fn status_error(status: StatusCode, body: &str) -> ChatError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Auth(message),
        s if s.is_server_error() => ChatError::ProviderUnavailable(format!("{s}: {message}")),
        s => ChatError::Provider(format!("{s}: {message}")),
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let result = self
            .client
            .get(self.model_url(&self.model))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await;

        match result {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}:generateContent", self.model_url(&request.options.model));
        let body = Self::build_body(request);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::ProviderUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| ChatError::Parse(e.to_string()))?;

        Self::convert_response(parsed, &request.options.model)
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

impl WirePart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

impl From<&ToolSchema> for FunctionDeclaration {
    fn from(schema: &ToolSchema) -> Self {
        Self {
            name: schema.name.clone(),
            description: schema.description.clone(),
            parameters: schema.to_json_schema(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    usage_metadata: Option<WireUsage>,
    prompt_feedback: Option<WirePromptFeedback>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireUsage {
    prompt_token_count: u32,
    candidates_token_count: u32,
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        let parts = content
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart::text(text.clone()),
                Part::FunctionCall(call) => WirePart {
                    function_call: Some(WireFunctionCall {
                        name: call.name.clone(),
                        args: Some(call.arguments.clone().into_iter().collect()),
                    }),
                    ..Default::default()
                },
                Part::FunctionResponse { name, response } => WirePart {
                    function_response: Some(WireFunctionResponse {
                        name: name.clone(),
                        response: response.clone(),
                    }),
                    ..Default::default()
                },
            })
            .collect();

        Self {
            role: Some(content.role.to_string()),
            parts,
        }
    }
}

impl From<WireContent> for Content {
    fn from(wire: WireContent) -> Self {
        let role = match wire.role.as_deref() {
            Some("user") => Role::User,
            _ => Role::Model,
        };
        let parts = wire
            .parts
            .into_iter()
            .filter_map(|part| {
                if let Some(call) = part.function_call {
                    let mut tool_call = ToolCall::new(call.name);
                    tool_call.arguments = call.args.unwrap_or_default().into_iter().collect();
                    Some(Part::FunctionCall(tool_call))
                } else if let Some(response) = part.function_response {
                    Some(Part::FunctionResponse {
                        name: response.name,
                        response: response.response,
                    })
                } else {
                    part.text.map(Part::Text)
                }
            })
            .collect();

        Self { role, parts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::tool::ParameterSchema;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config = GeminiConfig::new("k");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.api_key, "k");
    }

    #[test]
    fn test_request_body() {
        let request = ChatRequest {
            system_instruction: Some("Eres un asistente.".into()),
            contents: vec![
                Content::user("hola"),
                Content::model("¡Hola!"),
                Content::function_response(
                    "get_service_categories",
                    json!({ "content": ["plomeria"] }),
                ),
            ],
            tools: vec![
                ToolSchema {
                    name: "get_service_categories".into(),
                    description: "Categorías".into(),
                    parameters: vec![],
                    category: None,
                },
                ToolSchema {
                    name: "get_providers_by_category".into(),
                    description: "Proveedores".into(),
                    parameters: vec![ParameterSchema::string("tag", "categoría")],
                    category: None,
                },
            ],
            options: GenerationOptions::default(),
        };

        let body = serde_json::to_value(GeminiProvider::build_body(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Eres un asistente.");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["content"][0],
            "plomeria"
        );
        let declarations = &body["tools"][0]["functionDeclarations"];
        assert!(declarations[0].get("parameters").is_none());
        assert_eq!(declarations[1]["parameters"]["required"][0], "tag");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_function_call_response() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "get_providers_by_category",
                            "args": { "tag": "plomeria" }
                        }
                    }]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 10,
                "candidatesTokenCount": 3,
                "totalTokenCount": 13
            }
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let response = GeminiProvider::convert_response(parsed, "gemini-1.5-pro-001").unwrap();

        let call = response.function_call().unwrap();
        assert_eq!(call.name, "get_providers_by_category");
        assert_eq!(call.str_arg("tag"), Some("plomeria"));
        assert_eq!(response.usage.unwrap().total_tokens, 13);
        assert_eq!(response.model, "gemini-1.5-pro-001");
    }

    #[test]
    fn test_parameterless_call_has_empty_arguments() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "functionCall": { "name": "get_service_categories" } }]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let response = GeminiProvider::convert_response(parsed, "m").unwrap();
        assert!(response.function_call().unwrap().arguments.is_empty());
    }

    #[test]
    fn test_blocked_prompt() {
        let raw = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let err = GeminiProvider::convert_response(parsed, "m").unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_status_mapping() {
        let body = json!({
            "error": {
                "code": 429,
                "message": "Resource exhausted",
                "status": "RESOURCE_EXHAUSTED"
            }
        })
        .to_string();
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, &body),
            ChatError::RateLimited(m) if m == "Resource exhausted"
        ));
        assert!(matches!(status_error(StatusCode::FORBIDDEN, "nope"), ChatError::Auth(_)));
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(matches!(status_error(StatusCode::BAD_REQUEST, "bad"), ChatError::Provider(_)));
    }
}
