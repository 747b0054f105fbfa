use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::sse::{SseParser, extract_text_delta};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("assistant API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed assistant payload: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

/// Thin client for an OpenAI-style assistants API. One instance is shared
/// across the whole server; construction does not touch the network.
#[derive(Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AssistantClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Provision an assistant and return its id.
    pub async fn create_assistant(&self, instructions: &str) -> Result<String, AssistantError> {
        let resp = self
            .http
            .post(format!("{}/assistants", self.base_url))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .json(&json!({ "model": self.model, "instructions": instructions }))
            .send()
            .await?;
        let object: ObjectId = check(resp).await?.json().await?;
        debug!("created assistant {}", object.id);
        Ok(object.id)
    }

    /// Provision an empty thread and return its id.
    pub async fn create_thread(&self) -> Result<String, AssistantError> {
        let resp = self
            .http
            .post(format!("{}/threads", self.base_url))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .json(&json!({}))
            .send()
            .await?;
        let object: ObjectId = check(resp).await?.json().await?;
        debug!("created thread {}", object.id);
        Ok(object.id)
    }

    /// Append a user message to a thread.
    pub async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AssistantError> {
        let resp = self
            .http
            .post(format!("{}/threads/{}/messages", self.base_url, thread_id))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .json(&json!({ "role": "user", "content": content }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Start a streamed run on a thread and yield its text deltas. The
    /// stream ends at the `[DONE]` terminator; any transport or parse
    /// failure ends it with an error.
    pub fn stream_run(
        &self,
        thread_id: String,
        assistant_id: String,
    ) -> impl Stream<Item = Result<String, AssistantError>> + Send + 'static {
        let http = self.http.clone();
        let api_key = self.api_key.clone();
        let url = format!("{}/threads/{}/runs", self.base_url, thread_id);

        try_stream! {
            let resp = http
                .post(&url)
                .bearer_auth(&api_key)
                .header("OpenAI-Beta", "assistants=v2")
                .json(&json!({ "assistant_id": assistant_id, "stream": true }))
                .send()
                .await?;
            let resp = check(resp).await?;

            let mut body = resp.bytes_stream();
            let mut parser = SseParser::new();
            'stream: while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                for event in parser.push(&chunk) {
                    if event.data == "[DONE]" {
                        break 'stream;
                    }
                    if event.event.as_deref() == Some("thread.message.delta") {
                        if let Some(text) = extract_text_delta(&event.data)? {
                            yield text;
                        }
                    }
                }
            }
        }
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, AssistantError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AssistantError::Api {
        status: status.as_u16(),
        body,
    })
}
