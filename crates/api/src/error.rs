//! Errors raised while talking to the recommendation server.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API url: {0}")]
    Url(#[from] url::ParseError),

    #[error("API url cannot be used as a base: {0}")]
    BaseUrl(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; `message` is the server's `error` field when present.
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid image: {0}")]
    Image(#[from] image::ImageError),

    #[error("degenerate image {width}x{height}")]
    DegenerateImage { width: u32, height: u32 },
}

impl ApiError {
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }

    /// Text suitable for a notification: the server's message, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}
