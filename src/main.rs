//! cinetui - terminal browser and launcher for movie and TV streams
//!
//! Search and browse TMDB, pick a season, episode and embed server, and
//! open the stream in a browser or mpv.
//!
//! # Usage
//!
//! ```bash
//! # Launch interactive TUI
//! cinetui
//!
//! # CLI mode (for automation)
//! cinetui search "the wire"
//! cinetui resolve 1399 -t tv --season 1 --episode 3 --server server2
//! cinetui play 550 --player mpv
//! cinetui discover -t movie --genre action --min-rating 7
//! ```

use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cinetui::api::tmdb::{TmdbClient, TrendingWindow};
use cinetui::api::{MetadataProvider, ProviderError};
use cinetui::app::{Action, App, AppState, HomeFeed, InputMode};
use cinetui::cli::{Cli, Command, ExitCode, Output};
use cinetui::commands;
use cinetui::config::{Config, API_KEY_ENV};
use cinetui::logging;
use cinetui::models::{Genre, SearchResult};
use cinetui::session::{PlaybackSession, SessionDriver};
use cinetui::stream::LocalPlayer;
use cinetui::ui::{self, BrowserView, Theme};
use cinetui::watchlist::{JsonWatchlist, WatchlistStore};

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    if cli.is_cli_mode() {
        // CLI mode: execute command and exit
        logging::init_cli(cli.verbose);
        let exit_code = run_cli(cli, &config).await;
        std::process::exit(exit_code.into());
    } else {
        // TUI mode: launch interactive interface
        let log_path = logging::init_tui(cli.verbose)?;
        debug!(log = ?log_path, "tui logging ready");
        run_tui(&config).await
    }
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: &Config) -> ExitCode {
    let output = Output::new(&cli);

    match cli.command {
        Some(Command::Search(cmd)) => commands::search_cmd(cmd, config, &output).await,
        Some(Command::Trending(cmd)) => commands::trending_cmd(cmd, config, &output).await,
        Some(Command::Discover(cmd)) => commands::discover_cmd(cmd, config, &output).await,
        Some(Command::TopRated(cmd)) => commands::top_rated_cmd(cmd, config, &output).await,
        Some(Command::Genres(cmd)) => commands::genres_cmd(cmd, config, &output).await,
        Some(Command::Info(cmd)) => commands::info_cmd(cmd, config, &output).await,
        Some(Command::Episodes(cmd)) => commands::episodes_cmd(cmd, config, &output).await,
        Some(Command::Servers(cmd)) => commands::servers_cmd(cmd, config, &output).await,
        Some(Command::Resolve(cmd)) => commands::resolve_cmd(cmd, config, &output).await,
        Some(Command::Play(cmd)) => commands::play_cmd(cmd, config, &output).await,
        Some(Command::Watchlist(cmd)) => commands::watchlist_cmd(cmd, config, &output).await,
        // Handled by the is_cli_mode check
        None => ExitCode::Success,
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Results of background work other than session fetches
enum Background {
    Home(HomeFeed, Result<Vec<SearchResult>, ProviderError>),
    Genres(Result<Vec<Genre>, ProviderError>),
    Search(Result<Vec<SearchResult>, ProviderError>),
    PlayerFailed(String),
}

/// Everything the event loop needs to perform actions
struct Runtime {
    client: Arc<TmdbClient>,
    driver: SessionDriver,
    background: mpsc::UnboundedSender<Background>,
    player: LocalPlayer,
    watchlist: JsonWatchlist,
    user: String,
}

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(config: &Config) -> Result<()> {
    let Some(api_key) = config.tmdb_api_key() else {
        eprintln!(
            "No TMDB API key. Set {} or tmdb_api_key in the config file.",
            API_KEY_ENV
        );
        std::process::exit(ExitCode::InvalidArgs.into());
    };

    let client = Arc::new(TmdbClient::with_base_url(api_key, config.tmdb_base_url()));
    let provider: Arc<dyn MetadataProvider> = client.clone();
    let (driver, mut session_rx) = SessionDriver::new(provider);
    let (background, mut background_rx) = mpsc::unbounded_channel();

    let runtime = Runtime {
        client,
        driver,
        background,
        player: LocalPlayer::default(),
        watchlist: JsonWatchlist::new(config.watchlist_path()),
        user: config.user().to_string(),
    };

    let session = PlaybackSession::new().with_server(config.default_server());
    let mut app = App::new(session);

    let mut terminal = init_terminal()?;
    info!("tui started");

    let result = run_event_loop(&mut terminal, &mut app, &runtime, &mut session_rx, &mut background_rx).await;

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;
    info!("tui stopped");

    result
}

/// Main event loop - handles input, drains finished work, renders UI
async fn run_event_loop(
    terminal: &mut Tui,
    app: &mut App,
    runtime: &Runtime,
    session_rx: &mut mpsc::UnboundedReceiver<cinetui::session::SessionEvent>,
    background_rx: &mut mpsc::UnboundedReceiver<Background>,
) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(100);

    while app.running {
        for action in app.take_actions() {
            perform(action, app, runtime);
        }

        terminal.draw(|frame| render_ui(frame, app))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (ignore releases on Windows)
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        while let Ok(event) = session_rx.try_recv() {
            app.on_session_event(event);
        }

        while let Ok(done) = background_rx.try_recv() {
            match done {
                Background::Home(feed, Ok(results)) => app.set_home_results(&feed, results),
                Background::Home(feed, Err(e)) => app.set_home_error(&feed, e.to_string()),
                Background::Genres(Ok(genres)) => app.set_genres(genres),
                Background::Genres(Err(e)) => {
                    warn!(error = %e, "genre list unavailable");
                    app.set_error(format!("Genres: {}", e));
                }
                Background::Search(Ok(results)) => app.set_search_results(results),
                Background::Search(Err(e)) => app.set_browse_error(AppState::Search, e.to_string()),
                Background::PlayerFailed(msg) => app.set_error(msg),
            }
        }
    }

    Ok(())
}

/// Fetch one home feed in the background
fn load_feed(runtime: &Runtime, feed: HomeFeed) {
    let client = runtime.client.clone();
    let tx = runtime.background.clone();
    tokio::spawn(async move {
        let result = match &feed {
            HomeFeed::Trending => client.trending(TrendingWindow::Week).await,
            HomeFeed::TopRated(media_type) => client.top_rated(*media_type).await,
            HomeFeed::Discover(filters) => client.discover(filters).await,
        };
        let _ = tx.send(Background::Home(feed, result));
    });
}

/// Perform one queued side effect
fn perform(action: Action, app: &mut App, runtime: &Runtime) {
    match action {
        Action::Fetch(fetch) => {
            runtime.driver.dispatch(fetch);
        }
        Action::LoadTrending => load_feed(runtime, HomeFeed::Trending),
        Action::LoadTopRated(media_type) => load_feed(runtime, HomeFeed::TopRated(media_type)),
        Action::Discover(filters) => load_feed(runtime, HomeFeed::Discover(filters)),
        Action::LoadGenres => {
            let client = runtime.client.clone();
            let tx = runtime.background.clone();
            tokio::spawn(async move {
                let _ = tx.send(Background::Genres(client.genres().await));
            });
        }
        Action::Search(query) => {
            let client = runtime.client.clone();
            let tx = runtime.background.clone();
            tokio::spawn(async move {
                let result = client.search(&query).await;
                let _ = tx.send(Background::Search(result));
            });
        }
        Action::Open(url) => {
            let player = runtime.player;
            let tx = runtime.background.clone();
            tokio::spawn(async move {
                if let Err(e) = player.open(&url).await {
                    warn!(error = %e, url, "player failed to start");
                    let _ = tx.send(Background::PlayerFailed(e.to_string()));
                }
            });
        }
        Action::LoadWatchlist => refresh_watchlist(app, runtime),
        Action::AddToWatchlist(entry) => {
            if let Err(e) = runtime.watchlist.add(&runtime.user, entry) {
                app.set_error(format!("Watchlist: {}", e));
            }
            refresh_watchlist(app, runtime);
        }
        Action::RemoveFromWatchlist(id) => {
            if let Err(e) = runtime.watchlist.remove(&runtime.user, &id) {
                app.set_error(format!("Watchlist: {}", e));
            }
            refresh_watchlist(app, runtime);
        }
    }
}

fn refresh_watchlist(app: &mut App, runtime: &Runtime) {
    match runtime.watchlist.list(&runtime.user) {
        Ok(entries) => app.set_watchlist(entries),
        Err(e) => {
            warn!(error = %e, path = %runtime.watchlist.path().display(), "could not read watchlist");
            app.set_error(format!("Watchlist: {}", e));
        }
    }
}

// =============================================================================
// UI Rendering
// =============================================================================

/// Main render function - dispatches to view-specific renderers
fn render_ui(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(Style::default().bg(Theme::BACKGROUND)), area);

    // Main layout: header, content, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_content(frame, chunks[1], app);
    render_status_bar(frame, chunks[2], app);

    if let Some(error) = app.error.clone() {
        render_error_popup(frame, area, &error);
    }
}

/// Render the header with title and search box
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(20), // Logo
            Constraint::Min(1),     // Search box
        ])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![
        Span::styled(
            "CINE",
            Style::default().fg(Theme::PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "TUI",
            Style::default().fg(Theme::SECONDARY).add_modifier(Modifier::BOLD),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Theme::border()),
    );
    frame.render_widget(logo, header_chunks[0]);

    let editing = app.input_mode == InputMode::Editing;
    let search_text = if editing {
        let query = &app.search.query;
        let split = query
            .char_indices()
            .nth(app.search.cursor)
            .map(|(i, _)| i)
            .unwrap_or(query.len());
        let (before, after) = query.split_at(split);
        format!("⌕ {}│{}", before, after)
    } else if app.search.query.is_empty() {
        "⌕ Type / to search...".to_string()
    } else {
        format!("⌕ {}", app.search.query)
    };

    let search_box = Paragraph::new(search_text)
        .style(if editing {
            Theme::input().fg(Theme::PRIMARY)
        } else {
            Theme::input()
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(if editing {
                    Theme::border_focused()
                } else {
                    Theme::border()
                })
                .title(Span::styled(" SEARCH ", Theme::title())),
        );
    frame.render_widget(search_box, header_chunks[1]);
}

/// Render the main content area based on current state
fn render_content(frame: &mut Frame, area: Rect, app: &mut App) {
    match app.state {
        AppState::Home => {
            let list_area = if app.filters.open {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(ui::filters::PANEL_HEIGHT), Constraint::Min(3)])
                    .split(area);
                ui::filters::render(frame, chunks[0], &app.filters);
                chunks[1]
            } else {
                area
            };
            let title = app.feed.title();
            BrowserView::new(&title, &app.home.results)
                .loading(&app.home.loading)
                .empty_message("Nothing matches these filters. Press f to change them.")
                .render(frame, list_area, &mut app.home.list)
        }
        AppState::Search => {
            let empty = if app.search.query.is_empty() {
                "Type / to search for movies and TV shows..."
            } else {
                "No results found"
            };
            BrowserView::new("RESULTS", &app.search.browse.results)
                .loading(&app.search.browse.loading)
                .empty_message(empty)
                .render(frame, area, &mut app.search.browse.list)
        }
        AppState::Watchlist => BrowserView::new("WATCHLIST", &app.watchlist.entries)
            .empty_message("Nothing saved yet. Press w on a title to save it.")
            .render(frame, area, &mut app.watchlist.list),
        AppState::Detail => ui::detail::render(frame, area, &app.session, &mut app.detail),
    }
}

/// Render status bar at bottom
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mode_indicator = match app.input_mode {
        InputMode::Normal => Span::styled(
            " NORMAL ",
            Style::default().fg(Theme::BACKGROUND).bg(Theme::PRIMARY),
        ),
        InputMode::Editing => Span::styled(
            " INSERT ",
            Style::default().fg(Theme::BACKGROUND).bg(Theme::ACCENT),
        ),
    };

    let state_indicator = Span::styled(
        format!(" {} ", format!("{:?}", app.state).to_uppercase()),
        Style::default().fg(Theme::DIM),
    );

    let help = match app.state {
        AppState::Detail => " tab:focus  ↵:select  1-8:server  p:play  x:source failed  t:trailer  w:save  r:retry ",
        AppState::Watchlist => " ↵:open  d:remove  esc:back ",
        AppState::Home if app.filters.open => " ↑↓:field  ←→:change  ↵:apply  c:clear  esc:close ",
        AppState::Home => " q:quit  /:search  tab:feed  f:filters  w:watchlist  r:reload ",
        _ => " q:quit  /:search  w:watchlist  esc:back ",
    };

    let mut spans = vec![mode_indicator, state_indicator];
    if let Some(message) = &app.message {
        spans.push(Span::styled(format!(" {} ", message), Theme::success()));
    }
    spans.push(Span::raw(" │ "));
    spans.push(Span::styled(help, Theme::dimmed()));

    let status = Paragraph::new(Line::from(spans)).style(Theme::status_bar());
    frame.render_widget(status, area);
}

/// Render error popup overlay
fn render_error_popup(frame: &mut Frame, area: Rect, error: &str) {
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_area = Rect {
        x: area.x + (area.width.saturating_sub(popup_width)) / 2,
        y: area.y + (area.height.saturating_sub(popup_height)) / 2,
        width: popup_width,
        height: popup_height,
    };

    frame.render_widget(Clear, popup_area);

    let error_block = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(error.to_string(), Theme::error())),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Theme::error())
            .title(Span::styled(" ✗ ERROR ", Theme::error()))
            .style(Style::default().bg(Theme::BACKGROUND)),
    );

    frame.render_widget(error_block, popup_area);
}
