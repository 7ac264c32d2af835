//! Ollama provider
//!
//! Uses Ollama's OpenAI-compatible endpoint for completions
//! (`<base>/v1/chat/completions`) and its native API for the health check
//! and model listing (`<base>/api/tags`).

use super::*;
use gitpilot_error::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Provider for a local (or remote) Ollama server
pub struct OllamaProvider {
    client: Client,
    config: ProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            Error::config_invalid(format!("failed to create HTTP client: {}", e))
                .with_operation("ollama::new")
                .set_source(e)
        })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Check if the server is reachable
    pub async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let response = self.client
            .get(format!("{}/api/tags", self.base_url()))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    /// Models pulled on the server, e.g. `codellama:latest`
    pub async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let response = self.client
            .get(format!("{}/api/tags", self.base_url()))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let tags: TagsResponse = response.json().await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip_all, fields(model))]
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(self.default_model()).to_string();
        tracing::Span::current().record("model", model.as_str());

        let api_request = ChatRequest {
            model: model.clone(),
            messages: request.messages.into_iter().map(ApiMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            tools: request.tools.map(|tools| {
                tools.into_iter().map(|t| ApiTool {
                    r#type: "function".into(),
                    function: ApiFunction {
                        name: t.name,
                        description: Some(t.description),
                        parameters: Some(t.parameters),
                    },
                }).collect()
            }),
            stop: request.stop,
        };

        let response = self.client
            .post(format!("{}/v1/chat/completions", self.base_url()))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            debug!(status, body = %text, "completion failed");

            return Err(match status {
                404 => ProviderError::ModelNotFound(model),
                429 => ProviderError::RateLimited { retry_after },
                _ => ProviderError::Api { status, message: text },
            });
        }

        let api_response: ChatResponse = response.json().await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let choice = api_response.choices.into_iter().next()
            .ok_or_else(|| ProviderError::Other("No choices in response".into()))?;

        let tool_calls = choice.message.tool_calls
            .map(|tcs| tcs.into_iter().enumerate().map(|(i, tc)| ToolCall {
                id: tc.id.unwrap_or_else(|| format!("call_{}", i)),
                name: tc.function.name,
                arguments: tc.function.arguments,
            }).collect())
            .unwrap_or_default();

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }).unwrap_or_default();

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            content: choice.message.content,
            tool_calls,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<ChatMessage> for ApiMessage {
    fn from(msg: ChatMessage) -> Self {
        Self {
            role: match msg.role {
                Role::System => "system".into(),
                Role::User => "user".into(),
                Role::Assistant => "assistant".into(),
                Role::Tool => "tool".into(),
            },
            content: msg.content,
            tool_calls: msg.tool_calls.map(|tcs| {
                tcs.into_iter().map(|tc| ApiToolCall {
                    id: Some(tc.id),
                    r#type: Some("function".into()),
                    function: ApiFunctionCall {
                        name: tc.name,
                        arguments: tc.arguments,
                    },
                }).collect()
            }),
            tool_call_id: msg.tool_call_id,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiTool {
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r#type: Option<String>,
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
struct TagsModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response; resolves to the raw request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (base_url, handle)
    }

    fn provider_at(base_url: String) -> OllamaProvider {
        OllamaProvider::new(ProviderConfig::ollama().with_base_url(base_url)).unwrap()
    }

    #[tokio::test]
    async fn test_complete_parses_text_and_tool_calls() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{
                "id": "chatcmpl-1",
                "model": "codellama",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "",
                        "tool_calls": [{
                            "id": "call_abc",
                            "type": "function",
                            "function": {"name": "write_file", "arguments": "{\"file_path\":\"notes.txt\",\"content\":\"hello\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            }"#,
        )
        .await;

        let provider = provider_at(base_url);
        let request = CompletionRequest::new(vec![ChatMessage::user("create notes.txt")])
            .with_stop(vec!["\nObservation:".into()]);
        let response = provider.complete(request).await.unwrap();

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "call_abc");
        assert_eq!(response.tool_calls[0].name, "write_file");
        assert_eq!(response.usage.total_tokens, 15);

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /v1/chat/completions"));
        assert!(raw_request.contains(r#""model":"codellama""#));
        assert!(raw_request.contains(r#""stream":false"#));
        assert!(raw_request.contains(r#""stop":["\nObservation:"]"#));
    }

    #[tokio::test]
    async fn test_missing_model_maps_to_model_not_found() {
        let (base_url, _server) = serve_once(
            "404 Not Found",
            r#"{"error": {"message": "model \"nope\" not found, try pulling it first"}}"#,
        )
        .await;

        let provider = OllamaProvider::new(
            ProviderConfig::ollama().with_base_url(base_url).with_model("nope"),
        )
        .unwrap();
        let err = provider.prompt("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelNotFound(ref m) if m == "nope"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let provider = provider_at(base_url);
        let err = provider.prompt("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
        assert_eq!(err.into_error().kind(), gitpilot_error::ErrorKind::ProviderUnavailable);
    }

    #[tokio::test]
    async fn test_list_models() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"models": [{"name": "codellama:latest", "size": 1}, {"name": "llama3.1:8b"}]}"#,
        )
        .await;

        let provider = provider_at(base_url);
        let models = provider.list_models().await.unwrap();
        assert_eq!(models, vec!["codellama:latest", "llama3.1:8b"]);
        assert!(server.await.unwrap().starts_with("GET /api/tags"));
    }

    #[tokio::test]
    async fn test_health_check_reports_server_errors() {
        let (base_url, server) = serve_once("500 Internal Server Error", "{}").await;

        let provider = provider_at(base_url);
        assert!(!provider.health_check().await.unwrap());
        server.await.unwrap();
    }
}
