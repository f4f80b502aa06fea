//! Media session resolution engine
//!
//! - `detail`: loads item metadata once per (type, id)
//! - `season`: tracks season/episode selection, last request wins
//! - `controller`: the playback state machine the UI drives
//! - `driver`: runs fetches on tokio and feeds results back in
//!
//! The state machine itself never awaits. Every fetch it wants is returned
//! as a tagged request; the host performs it and hands the tagged result
//! back, which is where stale responses are detected and dropped.

pub mod controller;
pub mod detail;
pub mod driver;
pub mod season;

use thiserror::Error;

use crate::api::ProviderError;

pub use controller::{FailoverOutcome, PlaybackSelection, PlaybackSession, PlayerStatus, SessionState};
pub use detail::{DetailLoader, DetailPhase, DetailRequest};
pub use driver::{load_session, perform, settle, SessionDriver, SessionEvent};
pub use season::{SeasonContext, SeasonOutcome, SeasonPhase, SeasonRequest};

/// Errors surfaced by a playback session. All of them are state, never panics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Not found")]
    NotFound,

    #[error("Network error: {0}")]
    NetworkError(String),

    /// Internal only; stale responses are discarded silently
    #[error("Stale response discarded")]
    StaleResponse,

    #[error("No server available, pick one manually")]
    NoServerAvailable,
}

impl From<&ProviderError> for SessionError {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::NotFound => SessionError::NotFound,
            other => SessionError::NetworkError(other.to_string()),
        }
    }
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        SessionError::from(&err)
    }
}

/// A fetch the session wants performed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    Details(DetailRequest),
    Season(SeasonRequest),
}

impl From<DetailRequest> for Fetch {
    fn from(req: DetailRequest) -> Self {
        Fetch::Details(req)
    }
}

impl From<SeasonRequest> for Fetch {
    fn from(req: SeasonRequest) -> Self {
        Fetch::Season(req)
    }
}
