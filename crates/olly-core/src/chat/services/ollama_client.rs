use futures::future::BoxFuture;
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use tracing::debug;

use super::llm_service::{ByteStream, ChatBackend, ChatRequest, LlmError};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

/// HTTP client for a local Ollama server
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// # Arguments
    /// * `base_url` - The base URL of the Ollama API (e.g., "http://localhost:11434")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }
}

impl ChatBackend for OllamaClient {
    fn list_models(&self) -> BoxFuture<'static, Result<Vec<String>, LlmError>> {
        let client = self.client.clone();
        let url = format!("{}/api/tags", self.base_url);

        Box::pin(async move {
            let response = client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(LlmError::Status {
                    status: response.status().as_u16(),
                });
            }

            let tags: OllamaTagsResponse = response.json().await?;
            debug!(count = tags.models.len(), "Listed Ollama models");
            Ok(tags.models.into_iter().map(|m| m.name).collect())
        })
    }

    fn open_chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<ByteStream, LlmError>> {
        let client = self.client.clone();
        let url = format!("{}/api/chat", self.base_url);

        Box::pin(async move {
            debug!(model = %request.model, messages = request.messages.len(), "Opening chat stream");
            let response = client.post(&url).json(&request).send().await?;
            if !response.status().is_success() {
                return Err(LlmError::Status {
                    status: response.status().as_u16(),
                });
            }

            let body: ByteStream = response
                .bytes_stream()
                .map_err(|e| LlmError::Stream {
                    message: e.to_string(),
                })
                .boxed();
            Ok(body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::models::Message;
    use crate::chat::services::stream_decoder::{StreamEvent, decode_stream};
    use crate::settings::models::Settings;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    {"name": "llama3:8b", "model": "llama3:8b"},
                    {"name": "mistral:latest"}
                ]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(format!("{}/", server.uri()));
        let models = client.list_models().await.unwrap();

        assert_eq!(models, vec!["llama3:8b", "mistral:latest"]);
    }

    #[tokio::test]
    async fn test_list_models_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = OllamaClient::new(server.uri())
            .list_models()
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_open_chat_streams_body() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\" there\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama2",
                "stream": true,
                "messages": [{"role": "system"}, {"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri());
        let request = ChatRequest::build(&Settings::default(), &[Message::user("hello")]);
        let stream = client.open_chat(request).await.unwrap();

        let events: Vec<StreamEvent> = decode_stream(stream)
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::text("Hi"),
                StreamEvent::text(" there"),
                StreamEvent::done()
            ]
        );
    }

    #[tokio::test]
    async fn test_open_chat_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let request = ChatRequest::build(&Settings::default(), &[Message::user("hello")]);
        let result = OllamaClient::new(server.uri()).open_chat(request).await;

        assert!(matches!(result, Err(LlmError::Status { status: 404 })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) is essentially never bound on test hosts
        let result = OllamaClient::new("http://127.0.0.1:9").list_models().await;
        assert!(matches!(result, Err(LlmError::Transport(_))));
    }
}
