//! HTTP client for the assistant backend
//!
//! The backend exposes two endpoints: `POST /chat`, which takes the new user
//! message plus the API history and returns the reply with the updated
//! history, and `GET /health`. Requests are sent once; failed calls are
//! reported to the caller, never retried.

use crate::error::{ChatkeepError, Result};
use crate::settings::normalize_backend_url;
use crate::storage::HistoryItem;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default request timeout for chat turns
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// An image already captured on the device, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Where the image came from (kept on the chat message)
    pub uri: String,
    /// Base64-encoded image bytes
    pub data_base64: String,
    /// MIME type, e.g. `image/jpeg`
    pub mime_type: String,
}

impl ImageAttachment {
    /// Build an attachment from raw bytes
    pub fn from_bytes(uri: impl Into<String>, bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            data_base64: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// Read an image file and encode it
    ///
    /// The MIME type is inferred from the file extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ChatkeepError::Client(format!("Failed to read image {}: {}", path.display(), e))
        })?;
        let uri = format!("file://{}", path.display());
        Ok(Self::from_bytes(uri, &bytes, mime_type_for(path)))
    }
}

/// Guess an image MIME type from a file extension, defaulting to JPEG
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}

/// Body of `POST /chat`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [HistoryItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base64: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_mime_type: Option<&'a str>,
}

/// Successful answer from `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    /// Assistant reply (markdown)
    pub reply: String,
    /// Full API history after this turn
    pub history: Vec<HistoryItem>,
}

/// Something that can answer a chat turn
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one user message with the conversation's API history
    async fn send_message(
        &self,
        message: &str,
        history: &[HistoryItem],
        image: Option<&ImageAttachment>,
    ) -> Result<ChatReply>;
}

/// reqwest-based client for the assistant backend
///
/// # Examples
///
/// ```
/// use chatkeep::client::ChatClient;
/// use std::time::Duration;
///
/// let client = ChatClient::new("http://localhost:8000/", Duration::from_secs(30)).unwrap();
/// assert_eq!(client.base_url(), "http://localhost:8000");
/// ```
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client for `base_url`
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::InvalidUrl` for a malformed base URL and
    /// `ChatkeepError::Client` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_backend_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chatkeep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatkeepError::Client(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!("Initialized chat client for {}", base_url);
        Ok(Self { client, base_url })
    }

    /// Normalized base URL (no trailing slash)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether `GET /health` answers with a success status
    ///
    /// Connection failures count as unhealthy rather than errors.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                tracing::debug!("Health check {} -> {}", url, response.status());
                healthy
            }
            Err(e) => {
                tracing::warn!("Health check against {} failed: {}", url, e);
                false
            }
        }
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn send_message(
        &self,
        message: &str,
        history: &[HistoryItem],
        image: Option<&ImageAttachment>,
    ) -> Result<ChatReply> {
        let url = format!("{}/chat", self.base_url);
        let request = ChatRequest {
            message,
            history,
            image_base64: image.map(|i| i.data_base64.as_str()),
            image_mime_type: image.map(|i| i.mime_type.as_str()),
        };

        tracing::debug!(
            "Sending chat turn: {} history items, image={}",
            history.len(),
            image.is_some()
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Chat request failed: {}", e);
                ChatkeepError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Backend returned error {}: {}", status, body);
            return Err(ChatkeepError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse chat response: {}", e);
            ChatkeepError::Client(format!("Failed to parse chat response: {}", e))
        })?;

        tracing::debug!("Received reply; history now {} items", reply.history.len());
        Ok(reply)
    }
}
