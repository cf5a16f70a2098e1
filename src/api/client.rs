use anyhow::{Context, Result};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use std::collections::VecDeque;
use tracing::{debug, error};
use uuid::Uuid;

use super::http::send_with_retry;
use super::sse::{SseDecoder, SseEvent};
use super::types::{ApiError, ChatMessage, GenerateRequest};
use crate::config::GeneratorConfig;

/// Client for the relay's streaming generate endpoint.
pub struct CompletionClient {
    client: Client,
    config: GeneratorConfig,
    session_id: String,
}

impl CompletionClient {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            session_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Open a completion stream for `messages`.
    ///
    /// Fails with an [`ApiError`] (inside the `anyhow` chain) when the relay
    /// answers with a non-2xx status.
    pub async fn stream(&self, messages: Vec<ChatMessage>) -> Result<TokenStream> {
        let url = self.config.api_url.clone();
        let request_id = Uuid::new_v4().to_string();
        let body = GenerateRequest {
            model: self.config.model.clone(),
            messages,
            referer: self.config.referer.clone(),
        };

        debug!("=== Generate Request ===");
        debug!("URL: {}", url);
        debug!("Model: {}", body.model);
        debug!("Timeout: {:?}", self.config.timeout);

        let response = send_with_retry(self.config.retry, || {
            let mut request = self
                .client
                .post(url.clone())
                .header("Content-Type", "application/json")
                .header("Accept", "text/event-stream")
                .header("User-Agent", &self.config.user_agent)
                .header("x-request-id", &request_id)
                .header("x-request-session-id", &self.session_id);

            if let Some(key) = &self.config.api_key {
                request = request.header("Authorization", format!("Bearer {}", key));
            }

            request.json(&body)
        })
        .await
        .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        debug!("=== Generate Response ===");
        debug!("Status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let api_error =
                ApiError::from_http_response(status.as_u16(), &error_text, Some(request_id));
            error!("Generate request failed: {}", api_error);
            return Err(api_error.into());
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();
        Ok(TokenStream::new(bytes))
    }
}

/// Tokens decoded from a live completion response, in arrival order.
pub struct TokenStream {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl TokenStream {
    fn new(bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> Self {
        Self {
            bytes,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn queue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Token(token) => self.pending.push_back(token),
                SseEvent::Done => self.finished = true,
            }
        }
    }

    /// Next token, or `None` once the stream ended or `[DONE]` arrived.
    pub async fn next_token(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            if self.finished {
                return Ok(None);
            }

            match self.bytes.next().await {
                Some(chunk) => {
                    let chunk = chunk.context("Failed to read response chunk")?;
                    let events = self.decoder.push(&chunk);
                    self.queue(events);
                }
                None => {
                    let events = self.decoder.finish();
                    self.queue(events);
                    self.finished = true;
                }
            }
        }
    }
}
