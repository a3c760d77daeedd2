use super::{ItemSource, SourceError};
use crate::item::{ItemId, ItemPayload};
use crate::store::FeedType;
use futures::StreamExt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// JSON-over-HTTP item source.
///
/// Endpoints, relative to the base URL:
/// - `GET stories/{type}?offset={o}&limit={l}`
/// - `GET items/{id}/children?max={n}`
///
/// Both answer with a JSON array of [`ItemPayload`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
    max_response_bytes: usize,
}

impl HttpSource {
    /// The base URL must use HTTPS; plain HTTP is accepted for localhost and
    /// 127.0.0.1 only (local bridges and tests).
    pub fn new(
        base_url: &str,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<Self, SourceError> {
        let base =
            Url::parse(base_url).map_err(|e| SourceError::InvalidBaseUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(SourceError::InvalidBaseUrl(base_url.to_string()));
        }
        match base.scheme() {
            "https" => {}
            "http" if matches!(base.host_str(), Some("localhost") | Some("127.0.0.1")) => {
                tracing::warn!(base_url = %base, "Using non-HTTPS item API (localhost only)");
            }
            "http" => {
                tracing::error!(base_url = %base, "Rejecting non-HTTPS item API base URL");
                return Err(SourceError::InsecureBaseUrl);
            }
            other => {
                return Err(SourceError::InvalidBaseUrl(format!(
                    "unsupported scheme '{other}'"
                )));
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("threadline/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base,
            timeout,
            max_response_bytes,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_payloads(&self, url: Url) -> Result<Vec<ItemPayload>, SourceError> {
        tracing::debug!(url = %url, "Requesting items");
        let bytes = tokio::time::timeout(self.timeout, self.send_and_read(url.clone()))
            .await
            .map_err(|_| SourceError::Timeout)??;

        let payloads: Vec<ItemPayload> = serde_json::from_slice(&bytes)?;
        tracing::debug!(url = %url, count = payloads.len(), "Received items");
        Ok(payloads)
    }

    async fn send_and_read(&self, url: Url) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()));
        }
        read_limited_bytes(response, self.max_response_bytes).await
    }
}

impl ItemSource for HttpSource {
    async fn fetch_page(
        &self,
        feed_type: FeedType,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ItemPayload>, SourceError> {
        let mut url = self.endpoint(&["stories", feed_type.as_str()]);
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());
        self.get_payloads(url).await
    }

    async fn fetch_children(
        &self,
        id: &ItemId,
        max_count: usize,
    ) -> Result<Vec<ItemPayload>, SourceError> {
        let mut url = self.endpoint(&["items", id.as_str(), "children"]);
        url.query_pairs_mut()
            .append_pair("max", &max_count.to_string());
        self.get_payloads(url).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, SourceError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(SourceError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(SourceError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
