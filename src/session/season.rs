//! Season and episode context for episodic media
//!
//! Every season fetch carries a sequence number. A response is accepted
//! only if it answers the newest request *and* that request's season is
//! still the selected one; everything else is dropped on arrival.

use tracing::{debug, info, warn};

use super::SessionError;
use crate::api::ProviderError;
use crate::models::SeasonDetail;

/// Tagged season fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonRequest {
    pub seq: u64,
    pub id: String,
    pub season: u32,
}

/// Season data state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SeasonPhase {
    /// Not an episodic item, or nothing requested yet
    #[default]
    Inactive,
    Loading,
    Ready(SeasonDetail),
    /// Previous data is cleared; re-selecting the season retries
    Failed(SessionError),
}

/// Result of applying a finished season fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonOutcome {
    Applied,
    Stale,
    Failed(SessionError),
}

/// Season/episode selection plus the loaded season
#[derive(Debug)]
pub struct SeasonContext {
    id: Option<String>,
    selected_season: u32,
    selected_episode: u32,
    phase: SeasonPhase,
    pending: Option<SeasonRequest>,
    next_seq: u64,
}

impl Default for SeasonContext {
    fn default() -> Self {
        Self {
            id: None,
            selected_season: 1,
            selected_episode: 1,
            phase: SeasonPhase::Inactive,
            pending: None,
            next_seq: 0,
        }
    }
}

impl SeasonContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to a freshly loaded series and request its initial season
    pub fn activate(&mut self, id: &str, season: u32) -> SeasonRequest {
        self.id = Some(id.to_string());
        self.issue(season)
    }

    /// Detach (movie loaded, or a new item is on its way)
    pub fn deactivate(&mut self) {
        self.id = None;
        self.selected_season = 1;
        self.selected_episode = 1;
        self.phase = SeasonPhase::Inactive;
        self.pending = None;
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    /// Select a season. Resets the episode to 1 and drops the current
    /// season data; returns the fetch to perform.
    pub fn select(&mut self, season: u32) -> Option<SeasonRequest> {
        if !self.is_active() {
            return None;
        }
        Some(self.issue(season))
    }

    /// Re-request the selected season
    pub fn retry(&mut self) -> Option<SeasonRequest> {
        self.select(self.selected_season)
    }

    fn issue(&mut self, season: u32) -> SeasonRequest {
        self.next_seq += 1;
        self.selected_season = season;
        self.selected_episode = 1;
        self.phase = SeasonPhase::Loading;

        let req = SeasonRequest {
            seq: self.next_seq,
            id: self.id.clone().unwrap_or_default(),
            season,
        };
        info!(seq = req.seq, id = %req.id, season, "loading season");
        self.pending = Some(req.clone());
        req
    }

    /// Apply a finished fetch under the last-request-wins rule
    pub fn complete(
        &mut self,
        req: &SeasonRequest,
        result: Result<SeasonDetail, ProviderError>,
    ) -> SeasonOutcome {
        let current = self.pending.as_ref() == Some(req)
            && req.season == self.selected_season
            && self.id.as_deref() == Some(req.id.as_str());
        if !current {
            debug!(
                seq = req.seq,
                season = req.season,
                selected = self.selected_season,
                "discarding stale season response"
            );
            return SeasonOutcome::Stale;
        }
        self.pending = None;

        let result = result.map_err(SessionError::from).and_then(|detail| {
            if detail.season_number == req.season {
                Ok(detail)
            } else {
                Err(SessionError::NetworkError(format!(
                    "asked for season {}, got season {}",
                    req.season, detail.season_number
                )))
            }
        });

        match result {
            Ok(detail) => {
                info!(season = req.season, episodes = detail.episodes.len(), "season ready");
                self.selected_episode = 1;
                self.phase = SeasonPhase::Ready(detail);
                SeasonOutcome::Applied
            }
            Err(err) => {
                warn!(season = req.season, error = %err, "season failed");
                self.phase = SeasonPhase::Failed(err.clone());
                SeasonOutcome::Failed(err)
            }
        }
    }

    /// Pick an episode of the loaded season. Out-of-range picks, or picks
    /// while nothing is loaded, change nothing.
    pub fn select_episode(&mut self, episode: u32) -> bool {
        match &self.phase {
            SeasonPhase::Ready(detail) if detail.contains_episode(episode) => {
                self.selected_episode = episode;
                true
            }
            _ => {
                debug!(episode, "ignoring out-of-range episode");
                false
            }
        }
    }

    pub fn selected_season(&self) -> u32 {
        self.selected_season
    }

    pub fn selected_episode(&self) -> u32 {
        self.selected_episode
    }

    pub fn phase(&self) -> &SeasonPhase {
        &self.phase
    }

    pub fn detail(&self) -> Option<&SeasonDetail> {
        match &self.phase {
            SeasonPhase::Ready(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SessionError> {
        match &self.phase {
            SeasonPhase::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SeasonPhase::Loading)
    }
}
