//! Playback session controller
//!
//! Composes the detail loader, the season context and the server catalog
//! into the one state machine a hosting surface drives. Everything here is
//! synchronous; fetches come back out as [`Fetch`] values.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::detail::{DetailLoader, DetailPhase, DetailRequest};
use super::driver::SessionEvent;
use super::season::{SeasonContext, SeasonOutcome, SeasonPhase, SeasonRequest};
use super::{Fetch, SessionError};
use crate::api::ProviderError;
use crate::models::{MediaItem, MediaType, SeasonDetail};
use crate::stream::servers::{Catalog, ServerDescriptor, StreamTarget};
use crate::watchlist::WatchlistSnapshot;

/// Coarse session state, derived from the loaders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    DetailsLoading,
    /// Series details loaded but no season requested (only specials listed)
    DetailsReady,
    SeasonLoading,
    SeasonReady,
    /// Season fetch failed; recoverable by re-selecting
    SeasonFailed(SessionError),
    /// Movie details loaded
    Ready,
    /// Details failed; terminal for this view
    Failed(SessionError),
}

/// Snapshot of the user's current choices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSelection {
    pub selected_server_id: &'static str,
    pub selected_season: u32,
    pub selected_episode: u32,
    pub player_visible: bool,
    pub trailer_visible: bool,
}

/// What a playback error report did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverOutcome {
    Switched {
        from: &'static str,
        to: &'static str,
    },
    /// Every server failed once since the last explicit play action
    Exhausted,
    /// Player hidden, or already exhausted
    Ignored,
}

/// What the embedded player should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    Hidden,
    /// Visible but nothing playable yet: details loading, or a series
    /// with no season picked
    Pending,
    Playing(String),
    NoServerAvailable,
}

/// One viewing of one media item
#[derive(Debug)]
pub struct PlaybackSession {
    catalog: Arc<Catalog>,
    detail: DetailLoader,
    season: SeasonContext,
    server_id: &'static str,
    player_visible: bool,
    trailer_visible: bool,
    failed_attempts: usize,
    exhausted: bool,
    watchlist: WatchlistSnapshot,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::with_catalog(Catalog::shared())
    }

    pub fn with_catalog(catalog: Arc<Catalog>) -> Self {
        let server_id = catalog.first().id;
        Self {
            catalog,
            detail: DetailLoader::new(),
            season: SeasonContext::new(),
            server_id,
            player_visible: false,
            trailer_visible: false,
            failed_attempts: 0,
            exhausted: false,
            watchlist: WatchlistSnapshot::default(),
        }
    }

    /// Start on a given server (normalized through the catalog)
    pub fn with_server(mut self, server_id: &str) -> Self {
        self.server_id = self.catalog.normalize(server_id);
        self
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Show `(media_type, id)`. A different item resets the selection;
    /// the same item is not fetched twice.
    pub fn open(&mut self, media_type: MediaType, id: &str) -> Option<Fetch> {
        if self.detail.key() != Some((media_type, id.trim())) {
            self.reset_view();
        }
        self.detail.load(media_type, id).map(Fetch::from)
    }

    /// Leave the item. Everything is discarded; reopening fetches again.
    pub fn close(&mut self) {
        self.detail.clear();
        self.reset_view();
    }

    fn reset_view(&mut self) {
        self.season.deactivate();
        self.player_visible = false;
        self.trailer_visible = false;
        self.reset_failover();
    }

    /// Apply finished details; returns the initial season fetch for series
    pub fn apply_details(
        &mut self,
        req: &DetailRequest,
        result: Result<MediaItem, ProviderError>,
    ) -> Option<Fetch> {
        match self.detail.complete(req, result) {
            Ok(()) => {}
            Err(SessionError::StaleResponse) => return None,
            Err(_) => {
                self.season.deactivate();
                return None;
            }
        }

        let item = self.detail.item()?;
        let initial = item.first_regular_season();
        let id = item.id.clone();
        match initial {
            Some(season) => Some(self.season.activate(&id, season).into()),
            None => {
                self.season.deactivate();
                None
            }
        }
    }

    pub fn apply_season(
        &mut self,
        req: &SeasonRequest,
        result: Result<SeasonDetail, ProviderError>,
    ) -> SeasonOutcome {
        self.season.complete(req, result)
    }

    /// Route a completed fetch to the loader that asked for it
    pub fn handle(&mut self, event: SessionEvent) -> Option<Fetch> {
        match event {
            SessionEvent::Details(req, result) => self.apply_details(&req, result),
            SessionEvent::Season(req, result) => {
                self.apply_season(&req, result);
                None
            }
        }
    }

    /// Explicit retry: failed details, then a failed season, then a
    /// "no server available" stop
    pub fn retry(&mut self) -> Option<Fetch> {
        if matches!(self.detail.phase(), DetailPhase::Failed(_)) {
            return self.detail.reload().map(Fetch::from);
        }
        if matches!(self.season.phase(), SeasonPhase::Failed(_)) {
            return self.season.retry().map(Fetch::from);
        }
        if self.exhausted {
            info!(server = self.server_id, "retrying playback after failover stop");
            self.reset_failover();
        }
        None
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Pick a season of the loaded series. No-op for movies, unknown
    /// seasons, or before details are ready.
    pub fn select_season(&mut self, season: u32) -> Option<Fetch> {
        let item = self.detail.item()?;
        if !item.is_episodic() || item.season(season).is_none() {
            debug!(season, "season selection ignored");
            return None;
        }

        if self.season.is_active() {
            self.season.select(season).map(Fetch::from)
        } else {
            let id = item.id.clone();
            Some(self.season.activate(&id, season).into())
        }
    }

    pub fn select_episode(&mut self, episode: u32) -> bool {
        self.season.select_episode(episode)
    }

    /// Pick a server. Always valid; unknown ids land on the first entry.
    /// Counts as an explicit action, so failover starts over.
    pub fn select_server(&mut self, server_id: &str) {
        let id = self.catalog.normalize(server_id);
        if id != server_id {
            warn!(requested = server_id, using = id, "unknown server id");
        }
        info!(server = id, "server selected");
        self.server_id = id;
        self.reset_failover();
    }

    /// Hotkey selection by 1-based catalog position
    pub fn select_server_number(&mut self, number: usize) -> bool {
        match self.catalog.by_number(number).map(|s| s.id) {
            Some(id) => {
                self.select_server(id);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Overlays
    // =========================================================================

    /// Show the player. An explicit play action re-arms failover.
    pub fn play(&mut self) {
        self.player_visible = true;
        self.reset_failover();
    }

    pub fn toggle_player(&mut self) -> bool {
        if self.player_visible {
            self.player_visible = false;
        } else {
            self.play();
        }
        self.player_visible
    }

    pub fn toggle_trailer(&mut self) -> bool {
        self.trailer_visible = !self.trailer_visible;
        self.trailer_visible
    }

    // =========================================================================
    // Failover
    // =========================================================================

    /// The active source failed to load. Advance to the next server, at
    /// most once per catalog entry per play action.
    pub fn on_playback_error(&mut self) -> FailoverOutcome {
        if !self.player_visible || self.exhausted {
            return FailoverOutcome::Ignored;
        }

        self.failed_attempts += 1;
        if self.failed_attempts >= self.catalog.len() {
            self.exhausted = true;
            warn!(attempts = self.failed_attempts, "every server failed, stopping failover");
            return FailoverOutcome::Exhausted;
        }

        let from = self.server_id;
        let to = self.catalog.next_after(from).id;
        self.server_id = to;
        info!(from, to, attempt = self.failed_attempts, "playback failed, switching server");
        FailoverOutcome::Switched { from, to }
    }

    /// The active source loaded fine
    pub fn on_playback_loaded(&mut self) {
        if self.failed_attempts > 0 {
            debug!(server = self.server_id, "playback recovered");
        }
        self.reset_failover();
    }

    fn reset_failover(&mut self) {
        self.failed_attempts = 0;
        self.exhausted = false;
    }

    // =========================================================================
    // Watchlist
    // =========================================================================

    /// Replace the watchlist snapshot the saved flag is read from
    pub fn set_watchlist(&mut self, snapshot: WatchlistSnapshot) {
        self.watchlist = snapshot;
    }

    pub fn is_saved(&self) -> bool {
        self.detail
            .key()
            .is_some_and(|(_, id)| self.watchlist.contains(id))
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    pub fn state(&self) -> SessionState {
        match self.detail.phase() {
            DetailPhase::Idle => SessionState::Idle,
            DetailPhase::Loading => SessionState::DetailsLoading,
            DetailPhase::Failed(err) => SessionState::Failed(err.clone()),
            DetailPhase::Ready(item) if !item.is_episodic() => SessionState::Ready,
            DetailPhase::Ready(_) => match self.season.phase() {
                SeasonPhase::Inactive => SessionState::DetailsReady,
                SeasonPhase::Loading => SessionState::SeasonLoading,
                SeasonPhase::Ready(_) => SessionState::SeasonReady,
                SeasonPhase::Failed(err) => SessionState::SeasonFailed(err.clone()),
            },
        }
    }

    pub fn selection(&self) -> PlaybackSelection {
        PlaybackSelection {
            selected_server_id: self.server_id,
            selected_season: self.season.selected_season(),
            selected_episode: self.season.selected_episode(),
            player_visible: self.player_visible,
            trailer_visible: self.trailer_visible,
        }
    }

    /// Playback URL for the current selection. `None` until details load,
    /// and for a series until a season has been requested.
    pub fn current_stream_url(&self) -> Option<String> {
        let item = self.detail.item()?;
        if item.is_episodic() && !self.season.is_active() {
            return None;
        }
        let target = if item.is_episodic() {
            StreamTarget::episode(
                &item.id,
                self.season.selected_season(),
                self.season.selected_episode(),
            )
        } else {
            StreamTarget::movie(&item.id)
        };
        Some(self.catalog.resolve(self.server_id, &target))
    }

    pub fn player_status(&self) -> PlayerStatus {
        if !self.player_visible {
            return PlayerStatus::Hidden;
        }
        if self.exhausted {
            return PlayerStatus::NoServerAvailable;
        }
        match self.current_stream_url() {
            Some(url) => PlayerStatus::Playing(url),
            None => PlayerStatus::Pending,
        }
    }

    pub fn trailer_url(&self) -> Option<String> {
        self.detail
            .item()
            .and_then(|i| i.trailer.as_ref())
            .map(|t| t.embed_url())
    }

    /// Most relevant user-facing error, if any
    pub fn error(&self) -> Option<SessionError> {
        self.detail
            .error()
            .or_else(|| self.season.error())
            .cloned()
            .or_else(|| self.exhausted.then_some(SessionError::NoServerAvailable))
    }

    pub fn item(&self) -> Option<&MediaItem> {
        self.detail.item()
    }

    pub fn season_detail(&self) -> Option<&SeasonDetail> {
        self.season.detail()
    }

    pub fn server(&self) -> &ServerDescriptor {
        self.catalog.get(self.server_id).unwrap_or_else(|| self.catalog.first())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn failed_attempts(&self) -> usize {
        self.failed_attempts
    }

    pub fn is_loading(&self) -> bool {
        self.detail.is_loading() || self.season.is_loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Episode, Runtime, SeasonSummary};
    use std::collections::HashSet;

    fn item(id: &str, media_type: MediaType, seasons: &[(u32, u32)]) -> MediaItem {
        MediaItem {
            id: id.into(),
            media_type,
            title: "Title".into(),
            release_date: None,
            rating: 7.5,
            overview: String::new(),
            runtime: Runtime::Unknown,
            status: None,
            genres: vec![],
            production_companies: vec![],
            cast: vec![],
            trailer: None,
            poster_path: None,
            imdb_id: None,
            seasons: seasons
                .iter()
                .map(|(n, c)| SeasonSummary {
                    season_number: *n,
                    episode_count: *c,
                    name: None,
                    air_date: None,
                })
                .collect(),
        }
    }

    fn season(n: u32, count: u32) -> SeasonDetail {
        SeasonDetail {
            season_number: n,
            episodes: (1..=count)
                .map(|e| Episode {
                    season: n,
                    episode: e,
                    name: format!("Episode {}", e),
                    overview: String::new(),
                    runtime: None,
                    id: None,
                })
                .collect(),
        }
    }

    fn details_req(fetch: Option<Fetch>) -> DetailRequest {
        match fetch {
            Some(Fetch::Details(req)) => req,
            other => panic!("expected details fetch, got {:?}", other),
        }
    }

    fn season_req(fetch: Option<Fetch>) -> SeasonRequest {
        match fetch {
            Some(Fetch::Season(req)) => req,
            other => panic!("expected season fetch, got {:?}", other),
        }
    }

    fn loaded_series() -> PlaybackSession {
        let mut session = PlaybackSession::new();
        let req = details_req(session.open(MediaType::Tv, "1399"));
        let first = season_req(session.apply_details(&req, Ok(item("1399", MediaType::Tv, &[(1, 10), (2, 8)]))));
        session.apply_season(&first, Ok(season(1, 10)));
        session
    }

    #[test]
    fn test_movie_scenario() {
        let mut session = PlaybackSession::new();
        assert_eq!(session.state(), SessionState::Idle);

        let req = details_req(session.open(MediaType::Movie, "550"));
        assert_eq!(session.state(), SessionState::DetailsLoading);
        assert!(session.current_stream_url().is_none());

        assert!(session.apply_details(&req, Ok(item("550", MediaType::Movie, &[]))).is_none());
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.select_season(1).is_none());
        assert_eq!(
            session.current_stream_url().as_deref(),
            Some("https://www.2embed.cc/embed/movie/550")
        );
    }

    #[test]
    fn test_series_scenario() {
        let mut session = PlaybackSession::new();
        let req = details_req(session.open(MediaType::Tv, "1399"));
        let first = season_req(session.apply_details(&req, Ok(item("1399", MediaType::Tv, &[(1, 10), (2, 8)]))));
        assert_eq!(first.season, 1);
        assert_eq!(session.state(), SessionState::SeasonLoading);
        session.apply_season(&first, Ok(season(1, 10)));
        assert!(session.select_episode(4));

        let second = season_req(session.select_season(2));
        assert_eq!(second.season, 2);
        assert_eq!(session.selection().selected_episode, 1);

        assert_eq!(session.apply_season(&second, Ok(season(2, 8))), SeasonOutcome::Applied);
        assert_eq!(session.state(), SessionState::SeasonReady);
        assert_eq!(session.season_detail().map(|d| d.episodes.len()), Some(8));
        assert_eq!(
            session.current_stream_url().as_deref(),
            Some("https://www.2embed.cc/embedtv/1399/2/1")
        );
    }

    #[test]
    fn test_specials_not_auto_selected() {
        let mut session = PlaybackSession::new();
        let req = details_req(session.open(MediaType::Tv, "42"));
        let first = season_req(session.apply_details(&req, Ok(item("42", MediaType::Tv, &[(0, 3), (1, 6)]))));
        assert_eq!(first.season, 1);

        // ...but a user may still pick them
        let specials = season_req(session.select_season(0));
        assert_eq!(specials.season, 0);
    }

    #[test]
    fn test_only_specials_waits_for_pick() {
        let mut session = PlaybackSession::new();
        let req = details_req(session.open(MediaType::Tv, "42"));
        assert!(session.apply_details(&req, Ok(item("42", MediaType::Tv, &[(0, 3)]))).is_none());
        assert_eq!(session.state(), SessionState::DetailsReady);
        assert!(session.select_season(3).is_none());
        assert_eq!(season_req(session.select_season(0)).season, 0);
    }

    #[test]
    fn test_season_race_last_request_wins() {
        let mut session = loaded_series();
        let a = season_req(session.select_season(1));
        let b = season_req(session.select_season(2));

        session.apply_season(&b, Ok(season(2, 8)));
        assert_eq!(session.apply_season(&a, Ok(season(1, 10))), SeasonOutcome::Stale);
        assert_eq!(session.season_detail().map(|d| d.season_number), Some(2));
    }

    #[test]
    fn test_episode_out_of_range_rejected() {
        let mut session = loaded_series();
        assert!(!session.select_episode(11));
        assert!(!session.select_episode(0));
        assert_eq!(session.selection().selected_episode, 1);
    }

    #[test]
    fn test_failover_visits_each_server_once() {
        let mut session = PlaybackSession::new();
        let req = details_req(session.open(MediaType::Movie, "550"));
        session.apply_details(&req, Ok(item("550", MediaType::Movie, &[])));
        session.select_server("server3");
        session.play();

        let n = session.catalog().len();
        let mut visited = HashSet::from([session.selection().selected_server_id]);
        let mut outcomes = Vec::new();
        for _ in 0..n + 3 {
            let outcome = session.on_playback_error();
            if let FailoverOutcome::Switched { to, .. } = outcome {
                assert!(visited.insert(to), "{} visited twice", to);
            }
            outcomes.push(outcome);
        }

        assert_eq!(visited.len(), n);
        assert_eq!(outcomes[n - 1], FailoverOutcome::Exhausted);
        assert!(outcomes[n..].iter().all(|o| *o == FailoverOutcome::Ignored));
        assert_eq!(session.player_status(), PlayerStatus::NoServerAvailable);
        assert_eq!(session.error(), Some(SessionError::NoServerAvailable));

        // Manual pick re-arms
        session.select_server("server1");
        assert!(matches!(session.player_status(), PlayerStatus::Playing(_)));
        assert!(matches!(session.on_playback_error(), FailoverOutcome::Switched { .. }));
    }

    #[test]
    fn test_failover_reset_by_play_and_load() {
        let mut session = loaded_series();
        session.play();
        session.on_playback_error();
        session.on_playback_error();
        assert_eq!(session.failed_attempts(), 2);
        assert_eq!(session.selection().selected_server_id, "server3");

        session.on_playback_loaded();
        assert_eq!(session.failed_attempts(), 0);

        session.on_playback_error();
        session.toggle_player();
        session.toggle_player();
        assert_eq!(session.failed_attempts(), 0);
    }

    #[test]
    fn test_playback_error_ignored_when_hidden() {
        let mut session = loaded_series();
        assert_eq!(session.on_playback_error(), FailoverOutcome::Ignored);
        assert_eq!(session.selection().selected_server_id, "server1");
    }

    #[test]
    fn test_overlays_do_not_touch_fetch_state() {
        let mut session = loaded_series();
        let before = session.state();
        assert!(session.toggle_player());
        assert!(session.toggle_trailer());
        assert_eq!(session.state(), before);
        assert!(!session.toggle_player());
        assert_eq!(session.player_status(), PlayerStatus::Hidden);
        assert!(session.selection().trailer_visible);
    }

    #[test]
    fn test_unknown_server_normalized() {
        let mut session = PlaybackSession::new().with_server("server7");
        assert_eq!(session.selection().selected_server_id, "server7");
        session.select_server("bogus");
        assert_eq!(session.selection().selected_server_id, "server1");
        assert!(!session.select_server_number(9));
        assert!(session.select_server_number(8));
        assert_eq!(session.server().name, "EmbedSu");
    }

    #[test]
    fn test_details_failure_and_retry() {
        let mut session = PlaybackSession::new();
        let req = details_req(session.open(MediaType::Movie, "0"));
        assert!(session.apply_details(&req, Err(ProviderError::NotFound)).is_none());
        assert_eq!(session.state(), SessionState::Failed(SessionError::NotFound));

        let again = details_req(session.retry());
        assert!(again.seq > req.seq);
        assert_eq!(session.state(), SessionState::DetailsLoading);
    }

    #[test]
    fn test_season_failure_and_retry() {
        let mut session = loaded_series();
        let req = season_req(session.select_season(2));
        session.apply_season(&req, Err(ProviderError::ServerError(502)));
        assert!(matches!(session.state(), SessionState::SeasonFailed(_)));
        assert!(session.season_detail().is_none());

        let retry = season_req(session.retry());
        assert_eq!(retry.season, 2);
    }

    #[test]
    fn test_new_item_resets_selection() {
        let mut session = loaded_series();
        session.select_episode(5);
        session.play();
        session.toggle_trailer();

        let req = details_req(session.open(MediaType::Movie, "550"));
        let selection = session.selection();
        assert_eq!(selection.selected_episode, 1);
        assert!(!selection.player_visible);
        assert!(!selection.trailer_visible);

        // Late answer for the old series is dropped by the season context
        session.apply_details(&req, Ok(item("550", MediaType::Movie, &[])));
        assert!(session.season_detail().is_none());
    }

    #[test]
    fn test_same_item_not_refetched() {
        let mut session = loaded_series();
        assert!(session.open(MediaType::Tv, "1399").is_none());
        assert_eq!(session.season_detail().map(|d| d.season_number), Some(1));
    }

    #[test]
    fn test_close_discards_session() {
        let mut session = loaded_series();
        session.close();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.current_stream_url().is_none());
        assert!(session.open(MediaType::Tv, "1399").is_some());
    }

    #[test]
    fn test_saved_flag_from_snapshot() {
        let mut session = loaded_series();
        assert!(!session.is_saved());
        session.set_watchlist(WatchlistSnapshot::from_ids(["1399"]));
        assert!(session.is_saved());
        session.set_watchlist(WatchlistSnapshot::from_ids(["550"]));
        assert!(!session.is_saved());
    }
}
