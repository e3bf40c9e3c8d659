//! Persisted client settings
//!
//! The configured backend base URL lives under its own key on the same
//! key-value substrate as the conversation history.

use crate::error::{ChatkeepError, Result};
use crate::kv::KeyValueStore;
use std::sync::Arc;
use url::Url;

/// Key holding the backend base URL
pub const BACKEND_URL_KEY: &str = "BACKEND_URL";

/// Validate and normalize a backend base URL
///
/// Accepts only `http` and `https` URLs with a host. Surrounding
/// whitespace and trailing slashes are removed.
///
/// # Examples
///
/// ```
/// use chatkeep::settings::normalize_backend_url;
///
/// assert_eq!(
///     normalize_backend_url(" http://192.168.1.20:8000/ ").unwrap(),
///     "http://192.168.1.20:8000"
/// );
/// assert!(normalize_backend_url("ftp://example.com").is_err());
/// ```
pub fn normalize_backend_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed =
        Url::parse(trimmed).map_err(|e| ChatkeepError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ChatkeepError::InvalidUrl(format!(
            "{} (scheme must be http or https)",
            raw.trim()
        ))
        .into());
    }
    if parsed.host_str().is_none() {
        return Err(ChatkeepError::InvalidUrl(format!("{} (missing host)", raw.trim())).into());
    }

    Ok(trimmed.to_string())
}

/// Settings stored alongside the conversation history
pub struct Settings<S: KeyValueStore> {
    kv: Arc<S>,
}

impl<S: KeyValueStore> Settings<S> {
    /// Create a settings view over `kv`
    pub fn new(kv: Arc<S>) -> Self {
        Self { kv }
    }

    /// The saved backend URL, if one was configured
    pub async fn backend_url(&self) -> Result<Option<String>> {
        Ok(self
            .kv
            .get(BACKEND_URL_KEY)
            .await?
            .filter(|url| !url.trim().is_empty()))
    }

    /// Validate and save the backend URL, returning the stored form
    pub async fn set_backend_url(&self, url: &str) -> Result<String> {
        let normalized = normalize_backend_url(url)?;
        self.kv.set(BACKEND_URL_KEY, &normalized).await?;
        tracing::info!(url = %normalized, "Saved backend URL");
        Ok(normalized)
    }

    /// Forget the backend URL
    pub async fn clear_backend_url(&self) -> Result<()> {
        self.kv.remove(BACKEND_URL_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn test_normalize_strips_trailing_slashes() {
        assert_eq!(
            normalize_backend_url("https://assistant.example.com//").unwrap(),
            "https://assistant.example.com"
        );
    }

    #[test]
    fn test_normalize_keeps_path() {
        assert_eq!(
            normalize_backend_url("http://host:8000/api/").unwrap(),
            "http://host:8000/api"
        );
    }

    #[test]
    fn test_normalize_rejects_garbage_and_other_schemes() {
        for bad in ["", "not a url", "ftp://host", "file:///tmp/x"] {
            let err = normalize_backend_url(bad).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<ChatkeepError>(),
                    Some(ChatkeepError::InvalidUrl(_))
                ),
                "expected InvalidUrl for {:?}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_backend_url_round_trip() {
        let settings = Settings::new(Arc::new(MemoryStore::new()));
        assert_eq!(settings.backend_url().await.unwrap(), None);

        let stored = settings
            .set_backend_url("http://10.0.0.5:8000/")
            .await
            .unwrap();
        assert_eq!(stored, "http://10.0.0.5:8000");
        assert_eq!(
            settings.backend_url().await.unwrap(),
            Some("http://10.0.0.5:8000".to_string())
        );

        settings.clear_backend_url().await.unwrap();
        assert_eq!(settings.backend_url().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_saved() {
        let kv = Arc::new(MemoryStore::new());
        let settings = Settings::new(kv.clone());

        // Parses as a URL with scheme "localhost", which is rejected
        assert!(settings.set_backend_url("localhost:8000").await.is_err());
        assert!(settings.set_backend_url("ftp://x").await.is_err());
        assert!(kv.is_empty().await);
    }
}
