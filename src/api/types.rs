//! Wire types for the completion relay.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of the relay's generate endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub referer: String,
}

// ============================================================================
// Streamed response
// ============================================================================

/// One decoded `data:` event of an OpenAI-style chat completion stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionChunk {
    /// Text fragment carried by the first choice, if any.
    pub fn into_token(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { message: String },
    Plain(String),
}

// ============================================================================
// API Error Type
// ============================================================================

/// Coarse classification of a failed relay response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    /// Malformed request (missing model or messages)
    InvalidArgument,
    /// Bad or missing API key
    Unauthenticated,
    /// Key valid but not allowed to use the model
    PermissionDenied,
    /// Relay endpoint not found
    NotFound,
    /// Rate limit or credits exhausted
    ResourceExhausted,
    /// Upstream timed out
    DeadlineExceeded,
    /// Relay or provider failure - retryable
    Unavailable,
    Unknown,
}

impl ApiStatus {
    /// Convert from HTTP status code to internal API status
    pub fn from_http_status(http_status: u16) -> Self {
        match http_status {
            400 | 422 => ApiStatus::InvalidArgument,
            401 => ApiStatus::Unauthenticated,
            402 | 429 => ApiStatus::ResourceExhausted,
            403 => ApiStatus::PermissionDenied,
            404 => ApiStatus::NotFound,
            408 | 504 => ApiStatus::DeadlineExceeded,
            500..=599 => ApiStatus::Unavailable,
            _ => ApiStatus::Unknown,
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            ApiStatus::InvalidArgument => "Invalid request",
            ApiStatus::Unauthenticated => "Authentication failed",
            ApiStatus::PermissionDenied => "Permission denied",
            ApiStatus::NotFound => "Endpoint not found",
            ApiStatus::ResourceExhausted => "Rate limit exceeded. Please wait and try again",
            ApiStatus::DeadlineExceeded => "Request timed out",
            ApiStatus::Unavailable => "Service temporarily unavailable",
            ApiStatus::Unknown => "API request failed",
        }
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error_message())
    }
}

/// Relay error with status code and details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: ApiStatus,
    pub http_status: u16,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    /// Create from HTTP status code and response body.
    ///
    /// The message is the body's `error.message` (or `error` string) when the
    /// body is JSON, the trimmed raw body otherwise, and the status text when
    /// the body is empty.
    pub fn from_http_response(http_status: u16, body: &str, request_id: Option<String>) -> Self {
        let status = ApiStatus::from_http_status(http_status);
        let message = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error: ErrorBody::Detailed { message },
            })
            | Ok(ErrorEnvelope {
                error: ErrorBody::Plain(message),
            }) => message,
            Err(_) if body.trim().is_empty() => status.error_message().to_string(),
            Err(_) => body.trim().to_string(),
        };

        Self {
            status,
            http_status,
            message,
            request_id,
        }
    }

    pub fn user_hint(&self) -> &'static str {
        match self.status {
            ApiStatus::Unauthenticated | ApiStatus::PermissionDenied => {
                "Check SITECRAFT_API_KEY or the relay's provider key."
            }
            ApiStatus::NotFound => "Check SITECRAFT_API_URL points at the generate endpoint.",
            ApiStatus::ResourceExhausted => {
                "You have exceeded the rate limit. Please wait a moment and try again."
            }
            ApiStatus::Unavailable | ApiStatus::DeadlineExceeded => {
                "The model provider is having trouble. Try again or pick another model."
            }
            ApiStatus::InvalidArgument | ApiStatus::Unknown => "",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API error (HTTP {}): {}", self.http_status, self.message)
    }
}

impl std::error::Error for ApiError {}
