//! Network collaborators the store fetches through.
//!
//! The store never talks to the network directly; it is generic over an
//! [`ItemSource`]. [`HttpSource`] is the production implementation, tests
//! substitute scripted fakes.

mod http;

pub use http::{HttpSource, DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_TIMEOUT};

use crate::item::{ItemId, ItemPayload};
use crate::store::FeedType;
use std::future::Future;
use thiserror::Error;

/// Transport-level failures. The store surfaces these and never retries.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Body was not a JSON array of item payloads
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure base URL: HTTPS required (except localhost)")]
    InsecureBaseUrl,
}

impl SourceError {
    /// True for failures a later user-initiated retry may get past.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Timeout | SourceError::Network(_) => true,
            SourceError::HttpStatus(status) => *status >= 500 || *status == 429,
            SourceError::ResponseTooLarge(_)
            | SourceError::Decode(_)
            | SourceError::InvalidBaseUrl(_)
            | SourceError::InsecureBaseUrl => false,
        }
    }
}

/// Where stories and comments come from.
///
/// Both calls return payloads in server (display) order.
pub trait ItemSource: Send + Sync {
    /// Page `[offset, offset + limit)` of the feed.
    fn fetch_page(
        &self,
        feed_type: FeedType,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ItemPayload>, SourceError>> + Send;

    /// Up to `max_count` hidden direct children of `id`.
    fn fetch_children(
        &self,
        id: &ItemId,
        max_count: usize,
    ) -> impl Future<Output = Result<Vec<ItemPayload>, SourceError>> + Send;
}
