//! Synchronous chat-completion backend (OpenRouter). One round-trip, no task.

use async_trait::async_trait;
use generation::{
    diagnostic_prefix, BackendKind, GenerationBackend, GenerationError, GenerationOutcome,
    GenerationRequest, Submission,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::{
    http::{http_client, join_url, response_json_or_error, string_at, transport_error},
    ProviderSettings,
};

const BACKEND: BackendKind = BackendKind::OpenRouter;

/// Shown when the model answered with neither an image nor text.
pub const EMPTY_RESPONSE_TEXT: &str = "The model returned no usable content";

const DATA_IMAGE_PREFIX: &str = "data:image/";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

/// What the first choice's message carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// An image, with any non-empty accompanying text.
    Image { url: String, text: Option<String> },
    /// Text only; the placeholder when the model said nothing at all.
    Text(String),
}

/// Reads the first choice of a chat-completion response.
///
/// The image comes from `message.images[0].image_url.url`, or from `content`
/// when the content itself is a `data:image/...` URL.
pub fn parse_reply(payload: &Value) -> ChatReply {
    let message = payload.pointer("/choices/0/message");
    let content = message
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty());

    if let Some(url) = message.and_then(|m| string_at(m, "/images/0/image_url/url")) {
        return ChatReply::Image {
            url,
            text: content.map(str::to_string),
        };
    }
    match content {
        Some(c) if c.starts_with(DATA_IMAGE_PREFIX) => ChatReply::Image {
            url: c.to_string(),
            text: None,
        },
        Some(c) => ChatReply::Text(c.to_string()),
        None => ChatReply::Text(EMPTY_RESPONSE_TEXT.to_string()),
    }
}

#[derive(Debug)]
pub struct OpenRouterBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenRouterBackend {
    pub fn new(
        api_key: impl Into<String>,
        settings: &ProviderSettings,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(BACKEND)?,
            base_url: settings.openrouter_base_url.clone(),
            model: settings.openrouter_model.clone(),
            api_key: api_key.into(),
        })
    }

    fn chat_request<'a>(&'a self, prompt: &'a str, images: &'a [String]) -> ChatRequest<'a> {
        let mut content = vec![ContentPart::Text { text: prompt }];
        content.extend(images.iter().map(|url| ContentPart::ImageUrl {
            image_url: ImageUrl { url },
        }));
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenRouterBackend {
    fn kind(&self) -> BackendKind {
        BACKEND
    }

    #[instrument(skip_all, fields(backend = %BACKEND))]
    async fn submit(&self, request: &GenerationRequest) -> Result<Submission, GenerationError> {
        let prompt = request
            .prompt
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| GenerationError::validation("Prompt is required."))?;
        let images = request.images.as_deref().unwrap_or_default();

        info!(
            api_key = %diagnostic_prefix(&self.api_key),
            model = %self.model,
            images = images.len(),
            "sending chat completion"
        );
        let response = self
            .client
            .post(join_url(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&self.chat_request(prompt, images))
            .send()
            .await
            .map_err(|e| transport_error(BACKEND, &e))?;
        let payload = response_json_or_error(BACKEND, response).await?;

        match parse_reply(&payload) {
            ChatReply::Image { url, text } => {
                debug!(data_url = url.starts_with(DATA_IMAGE_PREFIX), "image returned");
                Ok(Submission::Completed(GenerationOutcome {
                    image_url: url,
                    content: text,
                }))
            }
            ChatReply::Text(text) => Err(GenerationError::validation(format!(
                "Model returned text instead of an image: \"{text}\""
            ))),
        }
    }

    async fn await_result(
        &self,
        submission: Submission,
    ) -> Result<GenerationOutcome, GenerationError> {
        match submission {
            Submission::Completed(outcome) => Ok(outcome),
            Submission::Accepted(task) => Err(GenerationError::protocol(
                BACKEND,
                format!("unexpected asynchronous task {}", task.id()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn backend(base_url: &str) -> OpenRouterBackend {
        let settings = ProviderSettings {
            openrouter_base_url: base_url.to_string(),
            ..Default::default()
        };
        OpenRouterBackend::new("sk-or-test", &settings).unwrap()
    }

    fn request(prompt: Option<&str>, images: Option<Vec<String>>) -> GenerationRequest {
        GenerationRequest {
            model: "nanobanana".into(),
            prompt: prompt.map(str::to_string),
            images,
            ..Default::default()
        }
    }

    #[test]
    fn chat_request_appends_reference_images() {
        let backend = backend("http://unused");
        let images = vec!["https://x/ref.png".to_string()];
        let body = serde_json::to_value(backend.chat_request("make it blue", &images)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "google/gemini-2.5-flash-image-preview",
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "make it blue" },
                        { "type": "image_url", "image_url": { "url": "https://x/ref.png" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn reply_shapes() {
        let with_images = json!({ "choices": [{ "message": {
            "content": "Here you go",
            "images": [{ "type": "image_url", "image_url": { "url": "data:image/png;base64,AAA" } }]
        } }] });
        assert_eq!(
            parse_reply(&with_images),
            ChatReply::Image {
                url: "data:image/png;base64,AAA".into(),
                text: Some("Here you go".into())
            }
        );

        let data_content =
            json!({ "choices": [{ "message": { "content": "data:image/jpeg;base64,BBB" } }] });
        assert_eq!(
            parse_reply(&data_content),
            ChatReply::Image { url: "data:image/jpeg;base64,BBB".into(), text: None }
        );

        let text_only = json!({ "choices": [{ "message": { "content": "I cannot draw that." } }] });
        assert_eq!(parse_reply(&text_only), ChatReply::Text("I cannot draw that.".into()));

        assert_eq!(
            parse_reply(&json!({ "choices": [] })),
            ChatReply::Text(EMPTY_RESPONSE_TEXT.into())
        );
    }

    #[tokio::test]
    async fn image_reply_completes_in_one_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let chat = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-or-test")
            .match_body(Matcher::PartialJson(
                json!({ "model": "google/gemini-2.5-flash-image-preview" }),
            ))
            .with_status(200)
            .with_body(
                json!({ "choices": [{ "message": {
                    "content": "",
                    "images": [{ "image_url": { "url": "data:image/png;base64,AAA" } }]
                } }] })
                .to_string(),
            )
            .create_async()
            .await;

        let outcome = backend(&server.url())
            .generate(&request(Some("a banana"), None))
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::image("data:image/png;base64,AAA"));
        chat.assert_async().await;
    }

    #[tokio::test]
    async fn text_reply_is_a_validation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"No."}}]}"#)
            .create_async()
            .await;

        let err = backend(&server.url())
            .generate(&request(Some("a banana"), None))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Model returned text instead of an image: \"No.\"");
    }

    #[tokio::test]
    async fn upstream_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(402)
            .with_body("insufficient credits")
            .create_async()
            .await;

        let err = backend(&server.url())
            .generate(&request(Some("a banana"), None))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "OpenRouter API error: 402 - insufficient credits");
    }

    #[tokio::test]
    async fn missing_prompt_never_reaches_the_network() {
        let mut server = mockito::Server::new_async().await;
        let chat = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = backend(&server.url())
            .generate(&request(None, Some(vec!["https://x/ref.png".into()])))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Prompt is required.");
        chat.assert_async().await;
    }
}
