use crate::{InlineImage, VisionModel};
use async_trait::async_trait;
use bon::bon;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error (status {status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type VisionResult<T> = Result<T, VisionError>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum MessagePart {
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatFullResponse {
    pub choices: Vec<FullChoice>,
}

#[derive(Deserialize)]
pub struct FullChoice {
    pub message: FullMessage,
}

#[derive(Deserialize)]
pub struct FullMessage {
    pub content: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub reasoning_effort: Option<String>,
}

/// Base url of the OpenAI compatible chat endpoint Vertex AI exposes for a project.
#[must_use]
pub fn vertex_base_url(project: &str, region: &str) -> String {
    let host = if region == "global" {
        "aiplatform.googleapis.com".to_string()
    } else {
        format!("{region}-aiplatform.googleapis.com")
    };
    format!("https://{host}/v1/projects/{project}/locations/{region}/endpoints/openapi")
}

/// Client for an OpenAI compatible `/chat/completions` endpoint that accepts image parts.
#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    access_token: Option<String>,
    config: SamplingConfig,
}

#[bon]
impl VisionClient {
    #[builder(start_fn = with_base_url)]
    #[must_use]
    pub fn new(
        #[builder(start_fn)] base_url: &str,
        model: Option<String>,
        access_token: Option<String>,
        temperature: Option<f32>,
        top_p: Option<f32>,
        reasoning_effort: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.unwrap_or_default(),
            access_token,
            config: SamplingConfig {
                temperature: temperature.unwrap_or(0.5),
                top_p: top_p.unwrap_or(0.95),
                reasoning_effort,
            },
        }
    }

    #[must_use]
    pub fn prepare_message(&self, prompt: &str, images: &[InlineImage]) -> Message {
        // Images first, the instruction refers to them.
        let mut parts: Vec<MessagePart> = images
            .iter()
            .map(|image| MessagePart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            })
            .collect();
        parts.push(MessagePart::Text {
            text: prompt.to_string(),
        });
        Message {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        }
    }

    #[builder]
    pub async fn chat(
        &self,
        #[builder(start_fn)] prompt: &str,
        images: Option<&[InlineImage]>,
    ) -> VisionResult<String> {
        let msg = self.prepare_message(prompt, images.unwrap_or_default());
        self.call(vec![msg]).await
    }

    pub async fn call(&self, messages: Vec<Message>) -> VisionResult<String> {
        let req_body = self.build_request(messages);
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {url} (model {})", self.model);
        let mut request = self.http.post(url).json(&req_body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(VisionError::Api {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let full: ChatFullResponse = response.json().await?;
        Ok(full
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }

    fn build_request(&self, messages: Vec<Message>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            reasoning_effort: self.config.reasoning_effort.clone(),
        }
    }
}

#[async_trait]
impl VisionModel for VisionClient {
    async fn generate(&self, prompt: &str, images: &[InlineImage]) -> VisionResult<String> {
        self.chat(prompt).images(images).call().await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
