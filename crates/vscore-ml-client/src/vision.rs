//! Vision chat-completions client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::VisionConfig;
use crate::error::{status_error, MlError, MlResult};

/// An inline image attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }

    /// `data:` URL with base64 body.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// One multimodal request: a system instruction, a user instruction and
/// images in the order they should be seen.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub system: String,
    pub user: String,
    pub images: Vec<ImagePayload>,
}

/// A model that turns instructions plus images into raw completion text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(&self, request: &VisionRequest) -> MlResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Azure OpenAI chat-completions client.
#[derive(Clone)]
pub struct AzureVisionClient {
    client: Client,
    url: String,
    api_key: String,
    deployment: String,
}

impl AzureVisionClient {
    /// Build the client. Fails with [`MlError::Config`] when the endpoint or
    /// key is blank, without touching the network.
    pub fn new(config: VisionConfig) -> MlResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MlError::config_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: config.completions_url(),
            client,
            api_key: config.api_key,
            deployment: config.deployment,
        })
    }

    pub fn from_env() -> MlResult<Self> {
        Self::new(VisionConfig::from_env()?)
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    fn build_body<'a>(request: &'a VisionRequest) -> ChatRequest<'a> {
        let mut parts = Vec::with_capacity(request.images.len() + 1);
        parts.push(ContentPart::Text {
            text: &request.user,
        });
        parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.to_data_url(),
            },
        }));

        ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(&request.system),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(parts),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait]
impl VisionModel for AzureVisionClient {
    async fn complete(&self, request: &VisionRequest) -> MlResult<String> {
        debug!(
            deployment = %self.deployment,
            images = request.images.len(),
            "Sending vision completion request"
        );

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&Self::build_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| MlError::invalid_response(format!("failed to parse completion: {e}")))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(MlError::EmptyCompletion)?;

        info!(
            deployment = %self.deployment,
            chars = text.len(),
            "Received vision completion"
        );
        Ok(text)
    }
}
