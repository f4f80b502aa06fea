//! Playback session tests
//!
//! Drives full sessions through the async driver against a scripted
//! provider whose answers can arrive out of order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cinetui::api::{MetadataProvider, ProviderError};
use cinetui::models::{Episode, MediaItem, MediaType, Runtime, SeasonDetail, SeasonSummary, Trailer};
use cinetui::session::{
    load_session, FailoverOutcome, PlaybackSession, PlayerStatus, SessionDriver, SessionError,
    SessionEvent, SessionState,
};
use cinetui::stream::{resolve, StreamTarget};
use tokio::sync::mpsc::UnboundedReceiver;

// =============================================================================
// Scripted provider
// =============================================================================

#[derive(Default)]
struct ScriptedProvider {
    items: HashMap<String, MediaItem>,
    /// Episode count per season
    seasons: HashMap<u32, u32>,
    /// Artificial latency per item id or season number
    item_delay: HashMap<String, u64>,
    season_delay: HashMap<u32, u64>,
    failing_seasons: Vec<u32>,
    detail_calls: AtomicUsize,
    season_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn with_item(mut self, item: MediaItem) -> Self {
        self.items.insert(item.id.clone(), item);
        self
    }

    fn with_season(mut self, number: u32, episodes: u32) -> Self {
        self.seasons.insert(number, episodes);
        self
    }

    fn slow_item(mut self, id: &str, ms: u64) -> Self {
        self.item_delay.insert(id.to_string(), ms);
        self
    }

    fn slow_season(mut self, number: u32, ms: u64) -> Self {
        self.season_delay.insert(number, ms);
        self
    }

    fn failing_season(mut self, number: u32) -> Self {
        self.failing_seasons.push(number);
        self
    }
}

#[async_trait]
impl MetadataProvider for ScriptedProvider {
    async fn details(&self, _media_type: MediaType, id: &str) -> Result<MediaItem, ProviderError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ms) = self.item_delay.get(id) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.items.get(id).cloned().ok_or(ProviderError::NotFound)
    }

    async fn season(&self, _id: &str, season: u32) -> Result<SeasonDetail, ProviderError> {
        self.season_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ms) = self.season_delay.get(&season) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing_seasons.contains(&season) {
            return Err(ProviderError::ServerError(502));
        }
        let count = self.seasons.get(&season).copied().ok_or(ProviderError::NotFound)?;
        Ok(SeasonDetail {
            season_number: season,
            episodes: (1..=count)
                .map(|e| Episode {
                    season,
                    episode: e,
                    name: format!("Episode {}", e),
                    overview: String::new(),
                    runtime: Some(55),
                    id: None,
                })
                .collect(),
        })
    }
}

fn movie(id: &str, title: &str) -> MediaItem {
    MediaItem {
        id: id.into(),
        media_type: MediaType::Movie,
        title: title.into(),
        release_date: Some("1999-10-15".into()),
        rating: 8.4,
        overview: String::new(),
        runtime: Runtime::Minutes(139),
        status: Some("Released".into()),
        genres: vec!["Drama".into()],
        production_companies: vec![],
        cast: vec![],
        trailer: Some(Trailer {
            key: "qtRKdVHc-cE".into(),
            name: "Official Trailer".into(),
            site: "YouTube".into(),
        }),
        poster_path: None,
        imdb_id: Some("tt0137523".into()),
        seasons: vec![],
    }
}

fn series(id: &str, season_numbers: &[u32]) -> MediaItem {
    MediaItem {
        id: id.into(),
        media_type: MediaType::Tv,
        title: "Game of Thrones".into(),
        release_date: Some("2011-04-17".into()),
        rating: 8.4,
        overview: String::new(),
        runtime: Runtime::Unknown,
        status: None,
        genres: vec![],
        production_companies: vec![],
        cast: vec![],
        trailer: None,
        poster_path: None,
        imdb_id: None,
        seasons: season_numbers
            .iter()
            .map(|n| SeasonSummary {
                season_number: *n,
                episode_count: 10,
                name: None,
                air_date: None,
            })
            .collect(),
    }
}

/// Feed `count` events from the driver into the session, dispatching
/// whatever follow-up fetch each one asks for
async fn pump(
    count: usize,
    session: &mut PlaybackSession,
    driver: &SessionDriver,
    rx: &mut UnboundedReceiver<SessionEvent>,
) {
    for _ in 0..count {
        let event = rx.recv().await.expect("driver channel open");
        driver.dispatch_all(session.handle(event));
    }
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn test_movie_loads_and_resolves() {
    let provider = ScriptedProvider::default().with_item(movie("550", "Fight Club"));

    let session = load_session(&provider, MediaType::Movie, "550", None).await.unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(provider.season_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        session.current_stream_url(),
        Some(resolve("server1", &StreamTarget::movie("550")))
    );
    assert_eq!(
        session.trailer_url().as_deref(),
        Some("https://www.youtube.com/embed/qtRKdVHc-cE?rel=0&modestbranding=1")
    );
}

#[tokio::test]
async fn test_series_skips_specials_for_initial_season() {
    let provider = ScriptedProvider::default()
        .with_item(series("1399", &[0, 1, 2]))
        .with_season(0, 4)
        .with_season(1, 10)
        .with_season(2, 10);

    let session = load_session(&provider, MediaType::Tv, "1399", Some("server4"))
        .await
        .unwrap();

    let selection = session.selection();
    assert_eq!(session.state(), SessionState::SeasonReady);
    assert_eq!(selection.selected_season, 1);
    assert_eq!(selection.selected_episode, 1);
    assert_eq!(provider.season_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        session.current_stream_url(),
        Some(resolve("server4", &StreamTarget::episode("1399", 1, 1)))
    );
}

#[tokio::test]
async fn test_specials_only_series_waits_for_selection() {
    let provider = ScriptedProvider::default()
        .with_item(series("42", &[0]))
        .with_season(0, 3);

    let mut session = load_session(&provider, MediaType::Tv, "42", None).await.unwrap();
    assert_eq!(session.state(), SessionState::DetailsReady);
    assert_eq!(provider.season_calls.load(Ordering::SeqCst), 0);

    let fetch = session.select_season(0);
    cinetui::session::settle(&provider, &mut session, fetch).await;
    assert_eq!(session.state(), SessionState::SeasonReady);
    assert_eq!(session.season_detail().map(|d| d.episode_count()), Some(3));
}

#[tokio::test]
async fn test_specials_only_series_has_no_stream_until_picked() {
    let provider = ScriptedProvider::default()
        .with_item(series("42", &[0]))
        .with_season(0, 3);

    let mut session = load_session(&provider, MediaType::Tv, "42", None).await.unwrap();
    assert_eq!(session.state(), SessionState::DetailsReady);
    assert_eq!(session.current_stream_url(), None);

    session.play();
    assert_eq!(session.player_status(), PlayerStatus::Pending);

    let fetch = session.select_season(0);
    cinetui::session::settle(&provider, &mut session, fetch).await;
    let url = resolve("server1", &StreamTarget::episode("42", 0, 1));
    assert_eq!(session.current_stream_url(), Some(url.clone()));
    assert_eq!(session.player_status(), PlayerStatus::Playing(url));
}

#[tokio::test]
async fn test_missing_item_fails_session() {
    let provider = ScriptedProvider::default();
    let err = load_session(&provider, MediaType::Movie, "999", None).await.unwrap_err();
    assert_eq!(err, SessionError::NotFound);
}

#[test]
fn test_blocking_load_with_unknown_server_falls_back() {
    let provider = ScriptedProvider::default().with_item(movie("550", "Fight Club"));

    let session = tokio_test::block_on(load_session(&provider, MediaType::Movie, "550", Some("server99")));
    let session = tokio_test::assert_ok!(session);

    assert_eq!(session.selection().selected_server_id, "server1");
    assert_eq!(session.server().name, "2Embed");
}

// =============================================================================
// Out-of-order completions
// =============================================================================

#[tokio::test]
async fn test_rapid_season_switching_keeps_latest() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .with_item(series("1399", &[1, 2, 3]))
            .with_season(1, 10)
            .with_season(2, 10)
            .with_season(3, 7)
            .slow_season(1, 80)
            .slow_season(2, 40),
    );
    let (driver, mut rx) = SessionDriver::new(provider.clone());
    let mut session = PlaybackSession::new();

    driver.dispatch_all(session.open(MediaType::Tv, "1399"));
    pump(1, &mut session, &driver, &mut rx).await;
    assert_eq!(session.state(), SessionState::SeasonLoading);

    driver.dispatch_all(session.select_season(2));
    driver.dispatch_all(session.select_season(3));

    // Season 3 lands first, then the stale 2 and 1
    pump(3, &mut session, &driver, &mut rx).await;

    assert_eq!(provider.season_calls.load(Ordering::SeqCst), 3);
    assert_eq!(session.state(), SessionState::SeasonReady);
    assert_eq!(session.selection().selected_season, 3);
    assert_eq!(session.season_detail().map(|d| d.season_number), Some(3));
    assert_eq!(session.season_detail().map(|d| d.episode_count()), Some(7));
}

#[tokio::test]
async fn test_switching_items_ignores_late_details() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .with_item(movie("550", "Fight Club"))
            .with_item(movie("680", "Pulp Fiction"))
            .slow_item("550", 60),
    );
    let (driver, mut rx) = SessionDriver::new(provider.clone());
    let mut session = PlaybackSession::new();

    driver.dispatch_all(session.open(MediaType::Movie, "550"));
    driver.dispatch_all(session.open(MediaType::Movie, "680"));
    pump(2, &mut session, &driver, &mut rx).await;

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.item().map(|i| i.title.as_str()), Some("Pulp Fiction"));
    assert_eq!(
        session.current_stream_url(),
        Some(resolve("server1", &StreamTarget::movie("680")))
    );
}

#[tokio::test]
async fn test_closed_session_ignores_in_flight_details() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .with_item(movie("550", "Fight Club"))
            .slow_item("550", 30),
    );
    let (driver, mut rx) = SessionDriver::new(provider);
    let mut session = PlaybackSession::new();

    driver.dispatch_all(session.open(MediaType::Movie, "550"));
    session.close();
    pump(1, &mut session, &driver, &mut rx).await;

    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.item().is_none());
}

#[tokio::test]
async fn test_reopening_same_item_does_not_refetch() {
    let provider = ScriptedProvider::default().with_item(movie("550", "Fight Club"));
    let mut session = load_session(&provider, MediaType::Movie, "550", None).await.unwrap();

    assert!(session.open(MediaType::Movie, "550").is_none());
    assert_eq!(provider.detail_calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Season failure and recovery
// =============================================================================

#[tokio::test]
async fn test_season_failure_is_recoverable() {
    let provider = ScriptedProvider::default()
        .with_item(series("1399", &[1, 2]))
        .with_season(1, 10)
        .with_season(2, 10)
        .failing_season(1);

    let mut session = load_session(&provider, MediaType::Tv, "1399", None).await.unwrap();
    assert!(matches!(
        session.state(),
        SessionState::SeasonFailed(SessionError::NetworkError(_))
    ));
    assert!(session.season_detail().is_none());

    let fetch = session.select_season(2);
    cinetui::session::settle(&provider, &mut session, fetch).await;
    assert_eq!(session.state(), SessionState::SeasonReady);
    assert!(session.error().is_none());
}

// =============================================================================
// Failover
// =============================================================================

#[tokio::test]
async fn test_failover_walks_catalog_once() {
    let provider = ScriptedProvider::default().with_item(movie("550", "Fight Club"));
    let mut session = load_session(&provider, MediaType::Movie, "550", Some("server7"))
        .await
        .unwrap();
    session.play();

    let servers = session.catalog().len();
    let mut visited = vec![session.selection().selected_server_id];
    for _ in 0..servers - 1 {
        match session.on_playback_error() {
            FailoverOutcome::Switched { to, .. } => visited.push(to),
            other => panic!("expected a switch, got {:?}", other),
        }
    }
    assert_eq!(session.on_playback_error(), FailoverOutcome::Exhausted);

    visited.sort_unstable();
    visited.dedup();
    assert_eq!(visited.len(), servers);
    assert_eq!(session.player_status(), PlayerStatus::NoServerAvailable);
    assert_eq!(session.error(), Some(SessionError::NoServerAvailable));

    // Picking a server by hand re-arms playback
    session.select_server("server2");
    assert!(matches!(session.player_status(), PlayerStatus::Playing(_)));
}
