//! Metadata provider clients
//!
//! - `MetadataProvider`: the contract the playback session consumes
//! - TMDB: the production implementation over HTTP

pub mod tmdb;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{MediaItem, MediaType, SeasonDetail};

pub use tmdb::TmdbClient;

/// Metadata provider error types
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Resource not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Read-only source of item and season metadata.
///
/// Both calls are plain GETs; any non-2xx answer is an error.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Full details for one movie or series
    async fn details(&self, media_type: MediaType, id: &str) -> Result<MediaItem, ProviderError>;

    /// Episode list for one season of a series
    async fn season(&self, id: &str, season_number: u32) -> Result<SeasonDetail, ProviderError>;
}
