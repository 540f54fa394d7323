use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::provider::{ChatModel, Embedder, LlmError};
use super::types::{ChatMessage, ChatRequest};
use crate::core::http::http_client;
use crate::secrets::Credential;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Shared HTTP plumbing for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    client: Client,
    credential: Credential,
}

impl GeminiClient {
    pub fn new(base_url: &str, credential: Credential, timeout: Duration) -> Self {
        let client = http_client("Gemini", timeout);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credential,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/{}:{}", self.base_url, model, method)
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let res = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.credential.value())
            .json(body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(LlmError::Api {
                provider: "gemini",
                status,
                message,
            });
        }

        Ok(res.json().await?)
    }
}

/// Model ids are addressed as `models/<name>` in the REST paths.
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct GeminiEmbeddings {
    client: GeminiClient,
    model: String,
}

impl GeminiEmbeddings {
    pub fn new(client: GeminiClient, model: &str) -> Self {
        Self {
            client,
            model: qualified_model(model),
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbeddings {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let url = self.client.endpoint(&self.model, "embedContent");
        let body = EmbedContentRequest {
            model: self.model.clone(),
            content: Content::text(None, text),
            task_type: "RETRIEVAL_QUERY",
        };

        let response: EmbedContentResponse = self.client.post(&url, &body).await?;
        let values = response
            .embedding
            .map(|embedding| embedding.values)
            .ok_or_else(|| LlmError::InvalidResponse("missing embedding".to_string()))?;
        if values.is_empty() {
            return Err(LlmError::InvalidResponse("empty embedding".to_string()));
        }
        Ok(values)
    }
}

pub struct GeminiChat {
    client: GeminiClient,
    model: String,
    temperature: f64,
}

impl GeminiChat {
    pub fn new(client: GeminiClient, model: &str, temperature: f64) -> Self {
        Self {
            client,
            model: qualified_model(model),
            temperature,
        }
    }

    fn build_request(&self, request: ChatRequest) -> GenerateContentRequest {
        let contents = request
            .messages
            .iter()
            .map(|ChatMessage { role, content }| Content::text(Some(role.as_str()), content))
            .collect();

        GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<Option<String>, LlmError> {
        let url = self.client.endpoint(&self.model, "generateContent");
        let body = self.build_request(request);

        let response: GenerateContentResponse = self.client.post(&url, &body).await?;
        Ok(first_candidate_text(response))
    }
}

fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates?.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
