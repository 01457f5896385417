//! Thin wrapper around the remote text-generation service.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use careerflow_core::prelude::{Message, Role};
use futures::stream::{self, BoxStream, StreamExt};
use genai::{
    Client, ModelIden, ServiceTarget,
    adapter::AdapterKind,
    chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent},
    resolver::{AuthData, Endpoint, ServiceTargetResolver},
};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    agent_types::ModelConfig,
    error::{AgentError, Result},
};

/// Text fragments of one streamed completion. Finite, not restartable.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Contract every model backend fulfils: messages in, text (or fragments) out.
#[async_trait]
pub trait ModelBackend: Send + Sync + Debug {
    /// One-shot completion.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Streamed completion. Errors may surface when opening the stream or
    /// from any individual fragment.
    async fn stream_complete(&self, messages: &[Message]) -> Result<TextStream>;
}

/// genai-backed model client speaking to an OpenAI-compatible endpoint.
pub struct ModelClient {
    config: ModelConfig,
    client: Client,
    options: ChatOptions,
}

impl Debug for ModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClient")
            .field("config", &self.config)
            .finish()
    }
}

impl ModelClient {
    /// Create a client; the configuration is validated here, not on first use.
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;

        let client = build_client(&config);
        let options = ChatOptions::default()
            .with_temperature(f64::from(config.parameters.temperature))
            .with_max_tokens(config.parameters.max_tokens);

        Ok(Self {
            config,
            client,
            options,
        })
    }

    /// Get the model configuration
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

fn build_client(config: &ModelConfig) -> Client {
    let api_key = config.api_key.clone().unwrap_or_default();
    let base_url = config.base_url.clone();

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |service_target: ServiceTarget| -> std::result::Result<ServiceTarget, genai::resolver::Error> {
            let ServiceTarget {
                endpoint, model, ..
            } = service_target;
            let (endpoint, model) = match &base_url {
                Some(url) => (
                    Endpoint::from_owned(url.clone()),
                    ModelIden::new(AdapterKind::OpenAI, model.model_name),
                ),
                None => (endpoint, model),
            };
            Ok(ServiceTarget {
                endpoint,
                auth: AuthData::from_single(api_key.clone()),
                model,
            })
        },
    );

    Client::builder()
        .with_service_target_resolver(target_resolver)
        .build()
}

fn to_chat_request(messages: &[Message]) -> ChatRequest {
    let messages = messages
        .iter()
        .map(|message| match message.role {
            Role::System => ChatMessage::system(message.content.clone()),
            Role::User => ChatMessage::user(message.content.clone()),
            Role::Assistant => ChatMessage::assistant(message.content.clone()),
        })
        .collect::<Vec<_>>();
    ChatRequest::new(messages)
}

#[async_trait]
impl ModelBackend for ModelClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        debug!(
            model = %self.config.model_name,
            messages = messages.len(),
            "Requesting completion"
        );

        let request = to_chat_request(messages);
        let response = timeout(
            self.config.timeout,
            self.client
                .exec_chat(&self.config.model_name, request, Some(&self.options)),
        )
        .await
        .map_err(|_| AgentError::backend("completion request timed out"))??;

        Ok(response.content_text_into_string().unwrap_or_default())
    }

    async fn stream_complete(&self, messages: &[Message]) -> Result<TextStream> {
        debug!(
            model = %self.config.model_name,
            messages = messages.len(),
            "Opening completion stream"
        );

        let request = to_chat_request(messages);
        let response = timeout(
            self.config.timeout,
            self.client
                .exec_chat_stream(&self.config.model_name, request, Some(&self.options)),
        )
        .await
        .map_err(|_| AgentError::backend("stream request timed out"))??;

        let fragments = response.stream.filter_map(|event| async move {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) if !chunk.content.is_empty() => {
                    Some(Ok(chunk.content))
                }
                Ok(_) => None,
                Err(err) => Some(Err(AgentError::from(err))),
            }
        });

        Ok(with_fragment_timeout(fragments.boxed(), self.config.timeout))
    }
}

/// End `fragments` with a streaming error if the gap before any fragment
/// exceeds `limit`.
fn with_fragment_timeout(fragments: TextStream, limit: Duration) -> TextStream {
    stream::unfold(Some(fragments), move |fragments| async move {
        let mut fragments = fragments?;
        match timeout(limit, fragments.next()).await {
            Ok(Some(item)) => Some((item, Some(fragments))),
            Ok(None) => None,
            Err(_) => {
                warn!(limit_ms = limit.as_millis() as u64, "Model stream stalled");
                Some((
                    Err(AgentError::streaming("no fragment received before timeout")),
                    None,
                ))
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_credential() {
        let err = ModelClient::new(ModelConfig::new("gpt-4o-mini")).unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_client_rejects_out_of_range_parameters() {
        let config = ModelConfig::new("gpt-4o-mini")
            .with_api_key("sk-test")
            .with_temperature(3.0);
        assert!(ModelClient::new(config).is_err());
    }

    #[test]
    fn test_client_construction() {
        let config = ModelConfig::new("deepseek-chat")
            .with_api_key("sk-test")
            .with_base_url("https://api.example.com/v1/");
        let client = ModelClient::new(config).unwrap();
        assert_eq!(client.config().model_name, "deepseek-chat");
        assert!(!format!("{client:?}").contains("sk-test"));
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        let stalled = stream::iter(vec![Ok("部分".to_string())])
            .chain(stream::pending())
            .boxed();

        let items: Vec<Result<String>> = with_fragment_timeout(stalled, Duration::from_millis(20))
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "部分");
        assert_eq!(items[1].as_ref().unwrap_err().category(), "streaming");
    }

    #[tokio::test]
    async fn test_fragment_timeout_passes_finished_stream_through() {
        let fragments = stream::iter(vec![Ok("a".to_string()), Ok("b".to_string())]).boxed();

        let items: Vec<Result<String>> = with_fragment_timeout(fragments, Duration::from_secs(5))
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.is_ok()));
    }

    #[test]
    fn test_chat_request_preserves_order() {
        let request = to_chat_request(&[
            Message::system("sys"),
            Message::user("hi"),
            Message::assistant("hello"),
        ]);
        assert_eq!(request.messages.len(), 3);
    }
}
