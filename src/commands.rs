//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the appropriate backend services.
//! Each handler takes CLI args, the loaded config and Output, returns ExitCode.

use tracing::warn;

use crate::api::tmdb::TrendingWindow;
use crate::api::{ProviderError, TmdbClient};
use crate::cli::{
    DiscoverCmd, EpisodesCmd, ExitCode, GenresCmd, InfoCmd, InfoResponse, MediaTypeFilter, Output,
    PlayCmd, ResolveCmd, SearchCmd, SelectionArgs, ServersCmd, StatusOk, StreamResponse,
    TopRatedCmd, TrendingCmd, WatchlistAction, WatchlistCmd,
};
use crate::config::{Config, API_KEY_ENV};
use crate::models::{DiscoverFilters, Genre, MediaType, SearchResult, WatchlistEntry};
use crate::session::{load_session, settle, PlaybackSession, SessionError};
use crate::stream::{Catalog, LocalPlayer, StreamTarget};
use crate::watchlist::{JsonWatchlist, WatchlistSnapshot, WatchlistStore};

// =============================================================================
// Shared helpers
// =============================================================================

/// Build a TMDB client, or report the missing key
fn tmdb_client(config: &Config, output: &Output) -> Result<TmdbClient, ExitCode> {
    match config.tmdb_api_key() {
        Some(key) => Ok(TmdbClient::with_base_url(key, config.tmdb_base_url())),
        None => Err(output.error(
            format!(
                "No TMDB API key. Set {} or tmdb_api_key in the config file.",
                API_KEY_ENV
            ),
            ExitCode::InvalidArgs,
        )),
    }
}

fn provider_exit(err: &ProviderError) -> ExitCode {
    match err {
        ProviderError::NotFound => ExitCode::NotFound,
        _ => ExitCode::NetworkError,
    }
}

fn session_exit(err: &SessionError) -> ExitCode {
    match err {
        SessionError::NotFound => ExitCode::NotFound,
        SessionError::NoServerAvailable => ExitCode::PlayerFailed,
        SessionError::NetworkError(_) | SessionError::StaleResponse => ExitCode::NetworkError,
    }
}

fn validated_id<'a>(id: &'a str, output: &Output) -> Result<&'a str, ExitCode> {
    crate::cli::validate_media_id(id).map_err(|e| output.error(e, ExitCode::InvalidArgs))
}

fn filter_results(results: &mut Vec<SearchResult>, filter: Option<MediaTypeFilter>, limit: usize) {
    if let Some(filter) = filter {
        let wanted = MediaType::from(filter);
        results.retain(|r| r.media_type == wanted);
    }
    results.truncate(limit);
}

fn print_results(results: &[SearchResult], output: &Output) -> ExitCode {
    if output.json {
        if let Err(e) = output.print(results) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else if results.is_empty() {
        output.info("No results.");
    } else {
        for r in results {
            println!("{:>8}  {}  ⭐ {:.1}", r.id, r, r.vote_average);
        }
    }
    ExitCode::Success
}

fn watchlist_snapshot(config: &Config) -> WatchlistSnapshot {
    let store = JsonWatchlist::new(config.watchlist_path());
    store.snapshot(config.user()).unwrap_or_else(|e| {
        warn!(error = %e, "could not read watchlist");
        WatchlistSnapshot::default()
    })
}

// =============================================================================
// Search Command
// =============================================================================

pub async fn search_cmd(cmd: SearchCmd, config: &Config, output: &Output) -> ExitCode {
    let client = match tmdb_client(config, output) {
        Ok(c) => c,
        Err(code) => return code,
    };

    output.info(format!("Searching for: {}", cmd.query));

    match client.search(&cmd.query).await {
        Ok(mut results) => {
            filter_results(&mut results, cmd.media_type, cmd.limit);
            print_results(&results, output)
        }
        Err(e) => output.error(format!("Search failed: {}", e), provider_exit(&e)),
    }
}

// =============================================================================
// Trending Command
// =============================================================================

pub async fn trending_cmd(cmd: TrendingCmd, config: &Config, output: &Output) -> ExitCode {
    let client = match tmdb_client(config, output) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let window: TrendingWindow = cmd.window.into();
    output.info(format!("Fetching trending ({})...", window));

    match client.trending(window).await {
        Ok(mut results) => {
            filter_results(&mut results, cmd.media_type, cmd.limit);
            print_results(&results, output)
        }
        Err(e) => output.error(format!("Trending fetch failed: {}", e), provider_exit(&e)),
    }
}

// =============================================================================
// Discover / Top Rated / Genres Commands
// =============================================================================

/// Genre argument: a numeric id, or a name looked up case-insensitively
fn match_genre(arg: &str, genres: &[Genre]) -> Option<u32> {
    let arg = arg.trim();
    genres
        .iter()
        .find(|g| g.name.eq_ignore_ascii_case(arg))
        .map(|g| g.id)
}

pub async fn discover_cmd(cmd: DiscoverCmd, config: &Config, output: &Output) -> ExitCode {
    if let Some(rating) = cmd.min_rating {
        if !(0.0..=10.0).contains(&rating) {
            return output.error("Minimum rating must be between 0 and 10", ExitCode::InvalidArgs);
        }
    }
    let client = match tmdb_client(config, output) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let genre = match cmd.genre.as_deref() {
        None => None,
        Some(arg) => match arg.trim().parse::<u32>() {
            Ok(id) => Some(id),
            Err(_) => {
                let genres = match client.genres().await {
                    Ok(genres) => genres,
                    Err(e) => return output.error(format!("Genre lookup failed: {}", e), provider_exit(&e)),
                };
                match match_genre(arg, &genres) {
                    Some(id) => Some(id),
                    None => {
                        return output.error(
                            format!("Unknown genre '{}' (see `cinetui genres`)", arg),
                            ExitCode::InvalidArgs,
                        )
                    }
                }
            }
        },
    };

    let filters = DiscoverFilters {
        media_type: cmd.media_type.map(MediaType::from),
        genre,
        sort: cmd.sort.into(),
        year: cmd.year,
        min_rating: cmd.min_rating,
    };
    output.info(format!("Discovering ({})...", filters.sort));

    match client.discover(&filters).await {
        Ok(mut results) => {
            results.truncate(cmd.limit);
            print_results(&results, output)
        }
        Err(e) => output.error(format!("Discover failed: {}", e), provider_exit(&e)),
    }
}

pub async fn top_rated_cmd(cmd: TopRatedCmd, config: &Config, output: &Output) -> ExitCode {
    let client = match tmdb_client(config, output) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match client.top_rated(cmd.media_type.into()).await {
        Ok(mut results) => {
            results.truncate(cmd.limit);
            print_results(&results, output)
        }
        Err(e) => output.error(format!("Top rated fetch failed: {}", e), provider_exit(&e)),
    }
}

pub async fn genres_cmd(_cmd: GenresCmd, config: &Config, output: &Output) -> ExitCode {
    let client = match tmdb_client(config, output) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match client.genres().await {
        Ok(genres) => {
            if output.json {
                if let Err(e) = output.print(&genres) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                for genre in &genres {
                    println!("{:>6}  {}", genre.id, genre.name);
                }
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Genre fetch failed: {}", e), provider_exit(&e)),
    }
}

// =============================================================================
// Info Command
// =============================================================================

pub async fn info_cmd(cmd: InfoCmd, config: &Config, output: &Output) -> ExitCode {
    let id = match validated_id(&cmd.id, output) {
        Ok(id) => id,
        Err(code) => return code,
    };
    let client = match tmdb_client(config, output) {
        Ok(c) => c,
        Err(code) => return code,
    };

    output.info(format!("Getting info for: {}", id));

    let mut session = match load_session(&client, cmd.media_type.into(), id, None).await {
        Ok(session) => session,
        Err(e) => return output.error(format!("Info failed: {}", e), session_exit(&e)),
    };
    session.set_watchlist(watchlist_snapshot(config));

    let Some(item) = session.item() else {
        return output.error("Info failed: details missing", ExitCode::Error);
    };

    if output.json {
        let response = InfoResponse {
            item,
            poster_url: item.poster_url(),
            trailer_url: session.trailer_url(),
            saved: session.is_saved(),
        };
        if let Err(e) = output.print(response) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
        return ExitCode::Success;
    }

    println!("{}", item);
    println!("Type:     {}", item.media_type);
    if let Some(status) = &item.status {
        println!("Status:   {}", status);
    }
    if !item.genres.is_empty() {
        println!("Genres:   {}", item.genres.join(", "));
    }
    if !item.production_companies.is_empty() {
        println!("Studios:  {}", item.production_companies.join(", "));
    }
    if !item.cast.is_empty() {
        let names: Vec<&str> = item.cast.iter().map(|c| c.name.as_str()).collect();
        println!("Cast:     {}", names.join(", "));
    }
    if let Some(url) = session.trailer_url() {
        println!("Trailer:  {}", url);
    }
    println!("Saved:    {}", if session.is_saved() { "yes" } else { "no" });
    for season in &item.seasons {
        println!("  {}", season);
    }
    if !item.overview.is_empty() {
        println!();
        println!("{}", item.overview);
    }
    ExitCode::Success
}

// =============================================================================
// Episodes Command
// =============================================================================

pub async fn episodes_cmd(cmd: EpisodesCmd, config: &Config, output: &Output) -> ExitCode {
    let id = match validated_id(&cmd.id, output) {
        Ok(id) => id,
        Err(code) => return code,
    };
    let client = match tmdb_client(config, output) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match client.tv_season(id, cmd.season).await {
        Ok(season) => {
            if output.json {
                if let Err(e) = output.print(&season) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                for episode in &season.episodes {
                    println!("{}", episode);
                }
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Season fetch failed: {}", e), provider_exit(&e)),
    }
}

// =============================================================================
// Servers Command
// =============================================================================

pub async fn servers_cmd(_cmd: ServersCmd, config: &Config, output: &Output) -> ExitCode {
    let catalog = Catalog::shared();
    if output.json {
        if let Err(e) = output.print(catalog.servers()) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
        return ExitCode::Success;
    }

    let default = config.default_server();
    for (i, server) in catalog.servers().iter().enumerate() {
        let marker = if server.id == default { "*" } else { " " };
        println!("{} {}. {:<8} {}", marker, i + 1, server.id, server);
    }
    ExitCode::Success
}

// =============================================================================
// Resolve Command
// =============================================================================

pub async fn resolve_cmd(cmd: ResolveCmd, config: &Config, output: &Output) -> ExitCode {
    let sel = cmd.selection;
    let id = match validated_id(&sel.id, output) {
        Ok(id) => id,
        Err(code) => return code,
    };

    let catalog = Catalog::shared();
    let server = catalog.normalize(sel.server.as_deref().unwrap_or(config.default_server()));
    let media_type = MediaType::from(sel.media_type);
    let (season, episode) = match media_type {
        MediaType::Tv => (Some(sel.season.unwrap_or(1)), Some(sel.episode.unwrap_or(1))),
        MediaType::Movie => (None, None),
    };
    if episode == Some(0) {
        return output.error("Episode numbers start at 1", ExitCode::InvalidArgs);
    }

    let target = match media_type {
        MediaType::Tv => StreamTarget::episode(id, season.unwrap_or(1), episode.unwrap_or(1)),
        MediaType::Movie => StreamTarget::movie(id),
    };
    let url = catalog.resolve(server, &target);

    print_stream(
        StreamResponse {
            status: "resolved".to_string(),
            title: None,
            server: server.to_string(),
            media_type,
            season,
            episode,
            url,
        },
        output,
    )
}

fn print_stream(response: StreamResponse, output: &Output) -> ExitCode {
    if output.json {
        if let Err(e) = output.print(&response) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        println!("{}", response.url);
    }
    ExitCode::Success
}

// =============================================================================
// Play Command
// =============================================================================

/// Apply season/episode choices through the session so the same bounds
/// the TUI enforces apply here too.
async fn apply_selection(
    client: &TmdbClient,
    session: &mut PlaybackSession,
    sel: &SelectionArgs,
    output: &Output,
) -> Result<(), ExitCode> {
    let Some(item) = session.item() else {
        return Err(output.error("Details not loaded", ExitCode::Error));
    };

    if !item.is_episodic() {
        if sel.season.is_some() || sel.episode.is_some() {
            output.info("Season/episode ignored for movies");
        }
        return Ok(());
    }

    if let Some(season) = sel.season {
        let loaded = session.season_detail().map(|d| d.season_number);
        if loaded != Some(season) {
            match session.select_season(season) {
                Some(fetch) => settle(client, session, Some(fetch)).await,
                None => {
                    return Err(output.error(
                        format!("Season {} does not exist", season),
                        ExitCode::InvalidArgs,
                    ))
                }
            }
        }
    }

    let Some(detail) = session.season_detail() else {
        return Err(match session.error() {
            Some(err) => output.error(format!("Season fetch failed: {}", err), session_exit(&err)),
            None => output.error(
                "No regular season to play, pass --season",
                ExitCode::InvalidArgs,
            ),
        });
    };
    let count = detail.episode_count();

    if let Some(episode) = sel.episode {
        if !session.select_episode(episode) {
            return Err(output.error(
                format!("Episode {} out of range (1-{})", episode, count),
                ExitCode::InvalidArgs,
            ));
        }
    }
    Ok(())
}

pub async fn play_cmd(cmd: PlayCmd, config: &Config, output: &Output) -> ExitCode {
    let sel = &cmd.selection;
    let id = match validated_id(&sel.id, output) {
        Ok(id) => id,
        Err(code) => return code,
    };
    let client = match tmdb_client(config, output) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let server = sel.server.as_deref().unwrap_or(config.default_server());
    let media_type = MediaType::from(sel.media_type);

    output.info(format!("Loading {}...", id));
    let mut session = match load_session(&client, media_type, id, Some(server)).await {
        Ok(session) => session,
        Err(e) => return output.error(format!("Could not load {}: {}", id, e), session_exit(&e)),
    };

    if let Err(code) = apply_selection(&client, &mut session, sel, output).await {
        return code;
    }
    session.play();

    let url = if cmd.trailer {
        session.trailer_url()
    } else {
        session.current_stream_url()
    };
    let Some(url) = url else {
        let what = if cmd.trailer { "trailer" } else { "stream" };
        return output.error(format!("No {} available", what), ExitCode::NotFound);
    };

    let selection = session.selection();
    let episodic = media_type.is_episodic() && !cmd.trailer;
    let mut response = StreamResponse {
        status: "resolved".to_string(),
        title: session.item().map(|i| i.title.clone()),
        server: selection.selected_server_id.to_string(),
        media_type,
        season: episodic.then_some(selection.selected_season),
        episode: episodic.then_some(selection.selected_episode),
        url,
    };

    if !cmd.print {
        let player = LocalPlayer::new(cmd.player.into());
        output.info(format!("Opening in {}...", player.player_type()));
        if let Err(e) = player.open(&response.url).await {
            return output.error(format!("Could not open player: {}", e), ExitCode::PlayerFailed);
        }
        response.status = "opened".to_string();
    }

    print_stream(response, output)
}

// =============================================================================
// Watchlist Command
// =============================================================================

pub async fn watchlist_cmd(cmd: WatchlistCmd, config: &Config, output: &Output) -> ExitCode {
    let store = JsonWatchlist::new(config.watchlist_path());
    let user = config.user();

    match cmd.action {
        WatchlistAction::List => match store.list(user) {
            Ok(entries) => {
                if output.json {
                    if let Err(e) = output.print(&entries) {
                        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                    }
                } else if entries.is_empty() {
                    output.info("Watchlist is empty.");
                } else {
                    for entry in &entries {
                        println!("{:>8}  {}", entry.media_id, entry);
                    }
                }
                ExitCode::Success
            }
            Err(e) => output.error(format!("Watchlist read failed: {}", e), ExitCode::Error),
        },

        WatchlistAction::Add { id, media_type } => {
            let id = match validated_id(&id, output) {
                Ok(id) => id,
                Err(code) => return code,
            };
            let client = match tmdb_client(config, output) {
                Ok(c) => c,
                Err(code) => return code,
            };
            let item = match client.item_detail(media_type.into(), id).await {
                Ok(item) => item,
                Err(e) => return output.error(format!("Could not load {}: {}", id, e), provider_exit(&e)),
            };

            let entry = WatchlistEntry::from_item(&item);
            if let Err(e) = store.add(user, entry.clone()) {
                return output.error(format!("Watchlist write failed: {}", e), ExitCode::Error);
            }
            output.info(format!("Saved {}", item.title));
            if output.json {
                if let Err(e) = output.print(&entry) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            }
            ExitCode::Success
        }

        WatchlistAction::Remove { id } => match store.remove(user, id.trim()) {
            Ok(true) => {
                output.info(format!("Removed {}", id));
                if output.json {
                    if let Err(e) = output.print(StatusOk::default()) {
                        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                    }
                }
                ExitCode::Success
            }
            Ok(false) => output.error(format!("{} is not in the watchlist", id), ExitCode::NotFound),
            Err(e) => output.error(format!("Watchlist write failed: {}", e), ExitCode::Error),
        },
    }
}
