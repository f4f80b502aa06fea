//! Media detail loading
//!
//! One fresh load per distinct (media type, id). Failures are terminal for
//! the current view until the caller asks again.

use tracing::{debug, info, warn};

use super::SessionError;
use crate::api::ProviderError;
use crate::models::{MediaItem, MediaType};

/// Tagged details fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub seq: u64,
    pub media_type: MediaType,
    pub id: String,
}

/// Where the details load currently stands
#[derive(Debug, Clone, Default)]
pub enum DetailPhase {
    #[default]
    Idle,
    Loading,
    Ready(MediaItem),
    Failed(SessionError),
}

/// Detail loader state
#[derive(Debug, Default)]
pub struct DetailLoader {
    phase: DetailPhase,
    key: Option<(MediaType, String)>,
    pending: Option<DetailRequest>,
    next_seq: u64,
}

impl DetailLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start loading `(media_type, id)`.
    ///
    /// Returns `None` when that pair is already loading or loaded, or when
    /// the id is blank (which fails immediately as `NotFound`).
    pub fn load(&mut self, media_type: MediaType, id: &str) -> Option<DetailRequest> {
        let id = id.trim();
        if id.is_empty() {
            warn!("refusing to load details for a blank id");
            self.key = None;
            self.pending = None;
            self.phase = DetailPhase::Failed(SessionError::NotFound);
            return None;
        }

        let same_key = self
            .key
            .as_ref()
            .is_some_and(|(t, k)| *t == media_type && k == id);
        if same_key && matches!(self.phase, DetailPhase::Loading | DetailPhase::Ready(_)) {
            debug!(%media_type, id, "details already requested");
            return None;
        }

        Some(self.issue(media_type, id.to_string()))
    }

    /// Re-issue the request for the current item (explicit retry)
    pub fn reload(&mut self) -> Option<DetailRequest> {
        let (media_type, id) = self.key.clone()?;
        Some(self.issue(media_type, id))
    }

    fn issue(&mut self, media_type: MediaType, id: String) -> DetailRequest {
        self.next_seq += 1;
        self.key = Some((media_type, id.clone()));
        let req = DetailRequest {
            seq: self.next_seq,
            media_type,
            id,
        };
        info!(seq = req.seq, media_type = %req.media_type, id = %req.id, "loading details");
        self.pending = Some(req.clone());
        self.phase = DetailPhase::Loading;
        req
    }

    /// Apply a finished fetch. Responses for anything but the latest
    /// request are rejected as `StaleResponse` and change nothing.
    pub fn complete(
        &mut self,
        req: &DetailRequest,
        result: Result<MediaItem, ProviderError>,
    ) -> Result<(), SessionError> {
        if self.pending.as_ref() != Some(req) {
            debug!(seq = req.seq, id = %req.id, "discarding stale details response");
            return Err(SessionError::StaleResponse);
        }
        self.pending = None;

        match result {
            Ok(item) => {
                info!(id = %item.id, title = %item.title, seasons = item.seasons.len(), "details ready");
                self.phase = DetailPhase::Ready(item);
                Ok(())
            }
            Err(e) => {
                let err = SessionError::from(&e);
                warn!(id = %req.id, error = %e, "details failed");
                self.phase = DetailPhase::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Forget the current item. Sequence numbers keep counting, so answers
    /// to requests issued before the clear are still recognised as stale.
    pub fn clear(&mut self) {
        self.phase = DetailPhase::Idle;
        self.key = None;
        self.pending = None;
    }

    pub fn phase(&self) -> &DetailPhase {
        &self.phase
    }

    pub fn item(&self) -> Option<&MediaItem> {
        match &self.phase {
            DetailPhase::Ready(item) => Some(item),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SessionError> {
        match &self.phase {
            DetailPhase::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, DetailPhase::Loading)
    }

    /// The (type, id) currently shown, if any
    pub fn key(&self) -> Option<(MediaType, &str)> {
        self.key.as_ref().map(|(t, id)| (*t, id.as_str()))
    }
}
