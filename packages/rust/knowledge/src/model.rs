//! Text-completion model service and the OpenAI-compatible client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use docgraph_shared::{DocGraphError, ModelConfig, Result, Triple};

use crate::schema::KgSchema;

/// A model able to answer prompts and extract `(subject, predicate, object)` paths.
pub trait ModelService: Send + Sync {
    /// Free-form completion of `prompt`.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;

    /// Triples found in `document`, restricted to the vocabulary of `schema`.
    ///
    /// Returned triples are not filtered; blank elements may be present.
    fn extract_paths(
        &self,
        document: &str,
        schema: &KgSchema,
    ) -> impl Future<Output = Result<Vec<Triple>>> + Send;

    fn model_name(&self) -> &str;
}

const EXTRACTION_SYSTEM_PROMPT: &str = "You extract knowledge graph triples from component \
documentation. Respond with a JSON object of the form \
{\"triples\": [{\"subject\": \"...\", \"predicate\": \"...\", \"object\": \"...\"}]}. \
Use the predicate \"type\" to state an entity's type. Use only the entity and relation \
types listed by the user. Never leave a field empty.";

const COMPLETION_SYSTEM_PROMPT: &str = "You are a precise technical assistant.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TriplePayload {
    Wrapped { triples: Vec<RawTriple> },
    Bare(Vec<RawTriple>),
}

/// Lenient triple shape: missing fields become blanks and are filtered later.
#[derive(Debug, Deserialize)]
struct RawTriple {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    predicate: String,
    #[serde(default)]
    object: String,
}

/// Chat-completions client for OpenAI-compatible endpoints.
///
/// In-flight requests are capped by a shared semaphore, so clones share the limit.
#[derive(Clone)]
pub struct OpenAiModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl OpenAiModel {
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DocGraphError::Model(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            timeout,
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
        })
    }

    async fn chat(&self, system: &str, user: &str, json_output: bool) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DocGraphError::Model("request limiter closed".into()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: 0.0,
            response_format: json_output.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DocGraphError::timeout("model request", self.timeout)
                } else {
                    DocGraphError::Model(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocGraphError::Model(format!("HTTP {status}: {body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocGraphError::Model(format!("invalid response body: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DocGraphError::Model("response contained no message".into()))
    }
}

impl ModelService for OpenAiModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(COMPLETION_SYSTEM_PROMPT, prompt, false).await
    }

    #[instrument(skip_all, fields(model = %self.model, document_len = document.len()))]
    async fn extract_paths(&self, document: &str, schema: &KgSchema) -> Result<Vec<Triple>> {
        let user = format!("{}\n{document}", schema.describe());
        let reply = self.chat(EXTRACTION_SYSTEM_PROMPT, &user, true).await?;
        let triples = parse_triples(&reply)?;
        debug!(count = triples.len(), "model returned triples");
        Ok(triples)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Parse a model reply into triples, tolerating a surrounding Markdown code fence.
///
/// Accepts `{"triples": [...]}` or a bare array.
pub fn parse_triples(reply: &str) -> Result<Vec<Triple>> {
    let body = strip_code_fence(reply);
    let payload: TriplePayload = serde_json::from_str(body)
        .map_err(|e| DocGraphError::Model(format!("reply is not a triple list: {e}")))?;
    let raw = match payload {
        TriplePayload::Wrapped { triples } | TriplePayload::Bare(triples) => triples,
    };
    Ok(raw
        .into_iter()
        .map(|t| Triple::new(t.subject, t.predicate, t.object))
        .collect())
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`, ...) on the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
