//! App state and core application logic
//!
//! Manages the screen state machine and navigation stack, and turns key
//! presses into playback session transitions. Anything with a side effect
//! (network, opening a player, writing the watchlist) is queued as an
//! [`Action`] for the event loop to perform.

use chrono::{Datelike, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use tracing::debug;

use crate::models::{DiscoverFilters, Genre, MediaType, SearchResult, SortOrder, WatchlistEntry};
use crate::session::{
    FailoverOutcome, Fetch, PlaybackSession, PlayerStatus, SeasonOutcome, SessionEvent,
};
use crate::watchlist::WatchlistSnapshot;

// =============================================================================
// App State Enum
// =============================================================================

/// Application state enum representing current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    /// Trending, top rated or discover results
    #[default]
    Home,
    /// Search results view
    Search,
    /// Playback session for one movie or series
    Detail,
    /// Saved titles
    Watchlist,
}

// =============================================================================
// Input Mode
// =============================================================================

/// Current input mode for keyboard handling
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Text input mode (search box focused)
    Editing,
}

// =============================================================================
// Loading State
// =============================================================================

/// Loading state for browse lists
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    Loading(Option<String>),
    Error(String),
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            LoadingState::Loading(Some(msg)) => Some(msg),
            LoadingState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

// =============================================================================
// Selection State (per-view)
// =============================================================================

/// Cursor over a list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    /// Currently selected index
    pub selected: usize,
    /// Scroll offset for viewport
    pub offset: usize,
    /// Total number of items
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self {
            selected: 0,
            offset: 0,
            len,
        }
    }

    pub fn up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.offset {
                self.offset = self.selected;
            }
        }
    }

    pub fn down(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    pub fn first(&mut self) {
        self.selected = 0;
        self.offset = 0;
    }

    pub fn last(&mut self) {
        if self.len > 0 {
            self.selected = self.len - 1;
        }
    }

    pub fn select(&mut self, index: usize) {
        if index < self.len {
            self.selected = index;
        }
    }

    /// Update offset to keep selected item visible
    pub fn scroll_into_view(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + visible_height {
            self.offset = self.selected + 1 - visible_height;
        }
    }

    /// Update length, clamping the cursor
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if len == 0 {
            self.selected = 0;
            self.offset = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

// =============================================================================
// View-Specific State
// =============================================================================

/// Results list shared by the home and search screens
#[derive(Debug, Clone, Default)]
pub struct BrowseState {
    pub results: Vec<SearchResult>,
    pub list: ListState,
    pub loading: LoadingState,
}

impl BrowseState {
    pub fn set_results(&mut self, results: Vec<SearchResult>) {
        self.list = ListState::new(results.len());
        self.results = results;
        self.loading = LoadingState::Idle;
    }

    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.results.get(self.list.selected)
    }
}

/// Search view state
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    /// Cursor position in query (in chars)
    pub cursor: usize,
    pub browse: BrowseState,
}

impl SearchState {
    fn byte_index(&self) -> usize {
        self.query
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.query.len())
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index();
        self.query.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index();
            self.query.remove(at);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.query.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.cursor = 0;
    }
}

/// Watchlist view state
#[derive(Debug, Clone, Default)]
pub struct WatchlistState {
    pub entries: Vec<WatchlistEntry>,
    pub list: ListState,
}

impl WatchlistState {
    pub fn selected_entry(&self) -> Option<&WatchlistEntry> {
        self.entries.get(self.list.selected)
    }
}

/// Focus areas in the detail view
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DetailFocus {
    Seasons,
    Episodes,
    #[default]
    Servers,
}

impl DetailFocus {
    /// Next panel; movies only have the server list
    pub fn next(self, episodic: bool) -> Self {
        if !episodic {
            return DetailFocus::Servers;
        }
        match self {
            DetailFocus::Seasons => DetailFocus::Episodes,
            DetailFocus::Episodes => DetailFocus::Servers,
            DetailFocus::Servers => DetailFocus::Seasons,
        }
    }
}

/// Cursor state of the detail panels
#[derive(Debug, Clone, Default)]
pub struct DetailView {
    pub focus: DetailFocus,
    pub seasons: ListState,
    pub episodes: ListState,
    pub servers: ListState,
}

// =============================================================================
// Home Feed & Discover Filters
// =============================================================================

/// What the home screen lists
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HomeFeed {
    #[default]
    Trending,
    TopRated(MediaType),
    Discover(DiscoverFilters),
}

impl HomeFeed {
    pub fn title(&self) -> String {
        match self {
            HomeFeed::Trending => "TRENDING".to_string(),
            HomeFeed::TopRated(MediaType::Movie) => "TOP RATED MOVIES".to_string(),
            HomeFeed::TopRated(MediaType::Tv) => "TOP RATED TV".to_string(),
            HomeFeed::Discover(filters) => match filters.active_count() {
                0 => "DISCOVER".to_string(),
                n => format!("DISCOVER ({} filters)", n),
            },
        }
    }

    /// Tab order of the fixed feeds; a discover feed goes back to trending
    pub fn next(&self) -> Self {
        match self {
            HomeFeed::Trending => HomeFeed::TopRated(MediaType::Movie),
            HomeFeed::TopRated(MediaType::Movie) => HomeFeed::TopRated(MediaType::Tv),
            HomeFeed::TopRated(MediaType::Tv) | HomeFeed::Discover(_) => HomeFeed::Trending,
        }
    }

    fn load_action(&self) -> Action {
        match self {
            HomeFeed::Trending => Action::LoadTrending,
            HomeFeed::TopRated(media_type) => Action::LoadTopRated(*media_type),
            HomeFeed::Discover(filters) => Action::Discover(filters.clone()),
        }
    }
}

/// Rows of the filter panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterField {
    #[default]
    MediaType,
    Genre,
    Sort,
    Year,
    Rating,
}

impl FilterField {
    pub const ALL: [FilterField; 5] = [
        FilterField::MediaType,
        FilterField::Genre,
        FilterField::Sort,
        FilterField::Year,
        FilterField::Rating,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterField::MediaType => "Type",
            FilterField::Genre => "Genre",
            FilterField::Sort => "Sort By",
            FilterField::Year => "Year",
            FilterField::Rating => "Min Rating",
        }
    }

    fn step(self, forward: bool) -> Self {
        cycle(&Self::ALL, &self, forward)
    }
}

/// Years offered by the year filter, counting back from the current one
const YEARS_LISTED: u16 = 50;
const RATING_STEPS: [f32; 3] = [7.0, 8.0, 9.0];

/// Discover filter panel on the home screen. Edits a draft that only takes
/// effect on apply.
#[derive(Debug, Clone, Default)]
pub struct FilterPanel {
    pub open: bool,
    pub field: FilterField,
    pub draft: DiscoverFilters,
    pub genres: Vec<Genre>,
    /// Newest year offered
    pub current_year: u16,
}

impl FilterPanel {
    pub fn new(current_year: u16) -> Self {
        Self {
            current_year,
            ..Self::default()
        }
    }

    /// Step the focused field to its next or previous option
    pub fn cycle(&mut self, forward: bool) {
        let draft = &mut self.draft;
        match self.field {
            FilterField::MediaType => {
                let options = [None, Some(MediaType::Movie), Some(MediaType::Tv)];
                draft.media_type = cycle(&options, &draft.media_type, forward);
            }
            FilterField::Genre => {
                let options: Vec<Option<u32>> = std::iter::once(None)
                    .chain(self.genres.iter().map(|g| Some(g.id)))
                    .collect();
                draft.genre = cycle(&options, &draft.genre, forward);
            }
            FilterField::Sort => draft.sort = cycle(&SortOrder::ALL, &draft.sort, forward),
            FilterField::Year => {
                let options: Vec<Option<u16>> = std::iter::once(None)
                    .chain((0..YEARS_LISTED).map(|i| Some(self.current_year.saturating_sub(i))))
                    .collect();
                draft.year = cycle(&options, &draft.year, forward);
            }
            FilterField::Rating => {
                let options: Vec<Option<f32>> = std::iter::once(None)
                    .chain(RATING_STEPS.iter().map(|r| Some(*r)))
                    .collect();
                draft.min_rating = cycle(&options, &draft.min_rating, forward);
            }
        }
    }

    pub fn value_label(&self, field: FilterField) -> String {
        let draft = &self.draft;
        match field {
            FilterField::MediaType => match draft.media_type {
                None => "All".to_string(),
                Some(MediaType::Movie) => "Movies".to_string(),
                Some(MediaType::Tv) => "TV Shows".to_string(),
            },
            FilterField::Genre => match draft.genre {
                None => "All Genres".to_string(),
                Some(id) => self
                    .genres
                    .iter()
                    .find(|g| g.id == id)
                    .map(|g| g.name.clone())
                    .unwrap_or_else(|| format!("#{}", id)),
            },
            FilterField::Sort => draft.sort.label().to_string(),
            FilterField::Year => draft
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "All Years".to_string()),
            FilterField::Rating => draft
                .min_rating
                .map(|r| format!("{}+ Stars", r))
                .unwrap_or_else(|| "Any Rating".to_string()),
        }
    }
}

/// Option after (or before) `current`, wrapping; unknown values restart at the first
fn cycle<T: PartialEq + Clone>(options: &[T], current: &T, forward: bool) -> T {
    let len = options.len();
    let next = match options.iter().position(|o| o == current) {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
    };
    options[next].clone()
}

// =============================================================================
// Actions
// =============================================================================

/// Side effects requested by the UI, performed by the event loop
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    LoadTrending,
    LoadTopRated(MediaType),
    Discover(DiscoverFilters),
    LoadGenres,
    Search(String),
    /// Session fetch, dispatched through the session driver
    Fetch(Fetch),
    /// Open a stream or trailer URL in the player
    Open(String),
    LoadWatchlist,
    AddToWatchlist(WatchlistEntry),
    RemoveFromWatchlist(String),
}

// =============================================================================
// Main Application State
// =============================================================================

/// Main application state
#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub nav_stack: Vec<AppState>,
    pub running: bool,
    pub input_mode: InputMode,
    /// Transient error line
    pub error: Option<String>,
    /// Transient info line
    pub message: Option<String>,

    pub home: BrowseState,
    /// Feed the home screen is showing
    pub feed: HomeFeed,
    pub filters: FilterPanel,
    pub search: SearchState,
    pub watchlist: WatchlistState,
    pub detail: DetailView,
    pub session: PlaybackSession,

    actions: VecDeque<Action>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(PlaybackSession::new())
    }
}

impl App {
    pub fn new(session: PlaybackSession) -> Self {
        let mut app = Self {
            state: AppState::Home,
            nav_stack: Vec::new(),
            running: true,
            input_mode: InputMode::Normal,
            error: None,
            message: None,
            home: BrowseState::default(),
            feed: HomeFeed::Trending,
            filters: FilterPanel::new(Utc::now().year().clamp(1900, 9999) as u16),
            search: SearchState::default(),
            watchlist: WatchlistState::default(),
            detail: DetailView::default(),
            session,
            actions: VecDeque::new(),
        };
        app.load_feed(HomeFeed::Trending);
        app.push(Action::LoadWatchlist);
        app
    }

    fn push(&mut self, action: Action) {
        self.actions.push_back(action);
    }

    fn push_fetch(&mut self, fetch: Option<Fetch>) {
        if let Some(fetch) = fetch {
            self.push(Action::Fetch(fetch));
        }
    }

    /// Drain queued side effects
    pub fn take_actions(&mut self) -> Vec<Action> {
        self.actions.drain(..).collect()
    }

    /// Navigate to a new state, pushing current to stack
    pub fn navigate(&mut self, state: AppState) {
        if self.state != state {
            self.nav_stack.push(self.state);
            self.state = state;
        }
        self.input_mode = InputMode::Normal;
    }

    /// Go back to previous state. Leaving the detail screen ends its session.
    pub fn back(&mut self) -> bool {
        if self.input_mode == InputMode::Editing {
            self.input_mode = InputMode::Normal;
            return true;
        }

        match self.nav_stack.pop() {
            Some(prev) => {
                if self.state == AppState::Detail {
                    self.session.close();
                }
                self.state = prev;
                true
            }
            None => false,
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
    }

    pub fn focus_search(&mut self) {
        if self.state != AppState::Search {
            self.navigate(AppState::Search);
        }
        self.input_mode = InputMode::Editing;
    }

    // -------------------------------------------------------------------------
    // Results from the event loop
    // -------------------------------------------------------------------------

    /// Switch the home screen to `feed` and request its results
    pub fn load_feed(&mut self, feed: HomeFeed) {
        self.home.loading =
            LoadingState::Loading(Some(format!("Loading {}...", feed.title().to_lowercase())));
        self.push(feed.load_action());
        self.feed = feed;
    }

    pub fn set_trending(&mut self, results: Vec<SearchResult>) {
        self.set_home_results(&HomeFeed::Trending, results);
    }

    /// Results for one home feed. Dropped if the user has since switched feeds.
    pub fn set_home_results(&mut self, feed: &HomeFeed, results: Vec<SearchResult>) {
        if *feed != self.feed {
            debug!(?feed, "dropping results for inactive home feed");
            return;
        }
        self.home.set_results(results);
    }

    pub fn set_home_error(&mut self, feed: &HomeFeed, msg: impl Into<String>) {
        if *feed == self.feed {
            self.home.loading = LoadingState::Error(msg.into());
        }
    }

    pub fn set_genres(&mut self, genres: Vec<Genre>) {
        self.filters.genres = genres;
    }

    pub fn set_search_results(&mut self, results: Vec<SearchResult>) {
        self.search.browse.set_results(results);
    }

    pub fn set_browse_error(&mut self, state: AppState, msg: impl Into<String>) {
        let msg = msg.into();
        match state {
            AppState::Search => self.search.browse.loading = LoadingState::Error(msg),
            _ => self.home.loading = LoadingState::Error(msg),
        }
    }

    /// New watchlist contents; refreshes the session's saved flag
    pub fn set_watchlist(&mut self, entries: Vec<WatchlistEntry>) {
        self.session.set_watchlist(WatchlistSnapshot::from_entries(&entries));
        self.watchlist.list.set_len(entries.len());
        self.watchlist.entries = entries;
    }

    /// Feed a finished fetch into the session. A season landing while the
    /// player is open reopens it on that season's episode.
    pub fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Season(req, result) => {
                let outcome = self.session.apply_season(&req, result);
                self.sync_detail_lists();
                if outcome == SeasonOutcome::Applied {
                    self.refresh_player();
                }
            }
            SessionEvent::Details(req, result) => {
                let next = self.session.apply_details(&req, result);
                self.push_fetch(next);
                self.sync_detail_lists();
            }
        }
    }

    fn sync_detail_lists(&mut self) {
        let selection = self.session.selection();

        let seasons: Vec<u32> = self
            .session
            .item()
            .map(|i| i.seasons.iter().map(|s| s.season_number).collect())
            .unwrap_or_default();
        if self.detail.seasons.len != seasons.len() {
            self.detail.seasons.set_len(seasons.len());
            if let Some(pos) = seasons.iter().position(|n| *n == selection.selected_season) {
                self.detail.seasons.select(pos);
            }
        }

        let episodes = self.session.season_detail().map(|d| d.episodes.len()).unwrap_or(0);
        self.detail.episodes.set_len(episodes);
        self.detail
            .episodes
            .select(selection.selected_episode.saturating_sub(1) as usize);

        let catalog = self.session.catalog();
        self.detail.servers.set_len(catalog.len());
        if let Some(pos) = catalog.position(selection.selected_server_id) {
            self.detail.servers.select(pos);
        }
    }

    /// Open the detail screen for one item
    pub fn open_detail(&mut self, media_type: MediaType, id: &str) {
        self.navigate(AppState::Detail);
        self.detail = DetailView {
            focus: if media_type.is_episodic() {
                DetailFocus::Seasons
            } else {
                DetailFocus::Servers
            },
            ..DetailView::default()
        };
        let fetch = self.session.open(media_type, id);
        self.push_fetch(fetch);
        self.sync_detail_lists();
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    /// Handle keyboard event, returns true if event was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.error = None;
        self.message = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return true;
        }

        if self.input_mode == InputMode::Editing {
            self.handle_editing_key(key)
        } else {
            self.handle_normal_key(key)
        }
    }

    fn handle_editing_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                true
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let query = self.search.query.trim().to_string();
                if !query.is_empty() {
                    self.search.browse.loading = LoadingState::Loading(Some(format!("Searching \"{}\"...", query)));
                    self.push(Action::Search(query));
                }
                true
            }
            KeyCode::Char(c) => {
                self.search.insert(c);
                true
            }
            KeyCode::Backspace => {
                self.search.backspace();
                true
            }
            KeyCode::Left => {
                self.search.cursor_left();
                true
            }
            KeyCode::Right => {
                self.search.cursor_right();
                true
            }
            _ => false,
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        if self.state == AppState::Home && self.filters.open {
            return self.handle_filter_key(key);
        }

        match key.code {
            KeyCode::Char('q') => {
                self.quit();
                return true;
            }
            KeyCode::Char('/') => {
                self.focus_search();
                return true;
            }
            KeyCode::Esc | KeyCode::Backspace => {
                return self.back();
            }
            _ => {}
        }

        match self.state {
            AppState::Home => self.handle_home_key(key),
            AppState::Search => self.handle_search_key(key),
            AppState::Detail => self.handle_detail_key(key),
            AppState::Watchlist => self.handle_watchlist_key(key),
        }
    }

    fn open_result(&mut self, result: Option<(MediaType, String)>) -> bool {
        match result {
            Some((media_type, id)) => {
                self.open_detail(media_type, &id);
                true
            }
            None => false,
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.home.list.up();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.home.list.down();
                true
            }
            KeyCode::Enter => {
                let result = self.home.selected_result().map(|r| (r.media_type, r.id.clone()));
                self.open_result(result)
            }
            KeyCode::Char('w') => {
                self.navigate(AppState::Watchlist);
                self.push(Action::LoadWatchlist);
                true
            }
            KeyCode::Char('r') => {
                self.load_feed(self.feed.clone());
                true
            }
            KeyCode::Tab => {
                self.load_feed(self.feed.next());
                true
            }
            KeyCode::Char('f') => {
                if let HomeFeed::Discover(filters) = &self.feed {
                    self.filters.draft = filters.clone();
                }
                self.filters.open = true;
                if self.filters.genres.is_empty() {
                    self.push(Action::LoadGenres);
                }
                true
            }
            _ => false,
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.filters.field = self.filters.field.step(false),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.filters.field = self.filters.field.step(true)
            }
            KeyCode::Left | KeyCode::Char('h') => self.filters.cycle(false),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => self.filters.cycle(true),
            KeyCode::Char('c') => self.filters.draft = DiscoverFilters::default(),
            KeyCode::Enter => {
                self.filters.open = false;
                let filters = self.filters.draft.clone();
                self.load_feed(HomeFeed::Discover(filters));
            }
            KeyCode::Esc | KeyCode::Char('f') => self.filters.open = false,
            KeyCode::Char('q') => self.quit(),
            _ => return false,
        }
        true
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        let list = &mut self.search.browse.list;
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                list.up();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                list.down();
                true
            }
            KeyCode::Home => {
                list.first();
                true
            }
            KeyCode::End => {
                list.last();
                true
            }
            KeyCode::Enter => {
                let result = self
                    .search
                    .browse
                    .selected_result()
                    .map(|r| (r.media_type, r.id.clone()));
                self.open_result(result)
            }
            _ => false,
        }
    }

    fn handle_watchlist_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.watchlist.list.up();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.watchlist.list.down();
                true
            }
            KeyCode::Enter => {
                let entry = self
                    .watchlist
                    .selected_entry()
                    .map(|e| (e.media_type, e.media_id.clone()));
                self.open_result(entry)
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(entry) = self.watchlist.selected_entry() {
                    let id = entry.media_id.clone();
                    self.set_message(format!("Removed {}", entry.title));
                    self.push(Action::RemoveFromWatchlist(id));
                }
                true
            }
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Detail screen: the playback session
    // -------------------------------------------------------------------------

    fn handle_detail_key(&mut self, key: KeyEvent) -> bool {
        let episodic = self.session.item().is_some_and(|i| i.is_episodic());

        match key.code {
            KeyCode::Tab => {
                self.detail.focus = self.detail.focus.next(episodic);
                true
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.focused_list().up();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.focused_list().down();
                true
            }
            KeyCode::Enter => {
                self.apply_focused();
                true
            }
            KeyCode::Char(c @ '1'..='9') => {
                let number = c as usize - '0' as usize;
                if self.session.select_server_number(number) {
                    self.sync_detail_lists();
                    self.refresh_player();
                }
                true
            }
            KeyCode::Char('p') => {
                if self.session.toggle_player() {
                    self.open_stream();
                }
                true
            }
            KeyCode::Char('x') => {
                self.report_playback_error();
                true
            }
            KeyCode::Char('o') => {
                self.session.on_playback_loaded();
                self.set_message(format!("Playing on {}", self.session.server().name));
                true
            }
            KeyCode::Char('t') => {
                if self.session.toggle_trailer() {
                    match self.session.trailer_url() {
                        Some(url) => self.push(Action::Open(url)),
                        None => self.set_message("No trailer available"),
                    }
                }
                true
            }
            KeyCode::Char('w') => {
                self.toggle_watchlist();
                true
            }
            KeyCode::Char('r') => {
                let fetch = self.session.retry();
                if fetch.is_some() {
                    self.set_message("Retrying...");
                }
                self.push_fetch(fetch);
                self.sync_detail_lists();
                true
            }
            _ => false,
        }
    }

    fn focused_list(&mut self) -> &mut ListState {
        match self.detail.focus {
            DetailFocus::Seasons => &mut self.detail.seasons,
            DetailFocus::Episodes => &mut self.detail.episodes,
            DetailFocus::Servers => &mut self.detail.servers,
        }
    }

    /// Enter: apply whatever the focused cursor points at
    fn apply_focused(&mut self) {
        match self.detail.focus {
            DetailFocus::Seasons => {
                let season = self
                    .session
                    .item()
                    .and_then(|i| i.seasons.get(self.detail.seasons.selected))
                    .map(|s| s.season_number);
                if let Some(season) = season {
                    let fetch = self.session.select_season(season);
                    self.push_fetch(fetch);
                    self.detail.episodes.first();
                }
            }
            DetailFocus::Episodes => {
                let episode = self.detail.episodes.selected as u32 + 1;
                if self.session.select_episode(episode) {
                    self.refresh_player();
                }
            }
            DetailFocus::Servers => {
                let id = self
                    .session
                    .catalog()
                    .servers()
                    .get(self.detail.servers.selected)
                    .map(|s| s.id);
                if let Some(id) = id {
                    self.session.select_server(id);
                    self.refresh_player();
                }
            }
        }
        self.sync_detail_lists();
    }

    /// Open the current stream URL, or explain why there is none
    fn open_stream(&mut self) {
        match self.session.player_status() {
            PlayerStatus::Playing(url) => self.push(Action::Open(url)),
            PlayerStatus::Pending if self.session.item().is_some() => {
                self.set_message("Pick a season to play")
            }
            PlayerStatus::Pending => self.set_message("Still loading details..."),
            PlayerStatus::NoServerAvailable => {
                self.set_error("No server available, pick one manually")
            }
            PlayerStatus::Hidden => {}
        }
    }

    /// Selection changed while playing: reopen on the new URL
    fn refresh_player(&mut self) {
        if self.session.selection().player_visible {
            self.open_stream();
        }
    }

    fn report_playback_error(&mut self) {
        match self.session.on_playback_error() {
            FailoverOutcome::Switched { to, .. } => {
                let name = self.session.catalog().get(to).map(|s| s.name).unwrap_or(to);
                self.set_message(format!("Source failed, trying {}", name));
                self.sync_detail_lists();
                self.open_stream();
            }
            FailoverOutcome::Exhausted => self.set_error("No server available, pick one manually"),
            FailoverOutcome::Ignored => {}
        }
    }

    fn toggle_watchlist(&mut self) {
        let Some(item) = self.session.item() else {
            return;
        };
        if self.session.is_saved() {
            let id = item.id.clone();
            self.set_message(format!("Removed {} from watchlist", item.title));
            self.push(Action::RemoveFromWatchlist(id));
        } else {
            let entry = WatchlistEntry::from_item(item);
            self.set_message(format!("Added {} to watchlist", item.title));
            self.push(Action::AddToWatchlist(entry));
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
