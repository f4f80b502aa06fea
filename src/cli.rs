//! CLI - Command Line Interface for cinetui
//!
//! Every TUI action is scriptable. All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Search for content
//! cinetui search "the bear" --json
//!
//! # Browse by filters
//! cinetui discover -t movie --genre drama --year 1999 --min-rating 8
//! cinetui top-rated -t tv
//!
//! # Inspect a series and one of its seasons
//! cinetui info 1399 -t tv
//! cinetui episodes 1399 2
//!
//! # Resolve or open a stream
//! cinetui resolve 550 -t movie --server server2
//! cinetui play 1399 -t tv -s 2 -e 5
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::{MediaItem, MediaType, SortOrder};
use crate::stream::PlayerType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments or missing configuration
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Media not found
    NotFound = 4,
    /// Player could not be opened
    PlayerFailed = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// cinetui - browse, resolve and play movies and series from the terminal
///
/// Run without arguments to launch interactive TUI.
/// Use subcommands for scriptable automation.
#[derive(Parser, Debug)]
#[command(
    name = "cinetui",
    version,
    author = "Gorka & Hermes",
    about = "Browse, resolve and play movies and series from the terminal",
    long_about = "A terminal interface for browsing movies and series, picking \
                  seasons and episodes, and opening them on a streaming server.\n\n\
                  Run without arguments to launch the interactive TUI.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  cinetui                              Launch interactive TUI\n\
                  cinetui search \"blade runner\"        Search for content\n\
                  cinetui play 1399 -t tv -s 1 -e 3    Open an episode\n\
                  cinetui servers --json               List streaming servers"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Debug-level logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run (omit for TUI mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search for movies and TV shows
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Get trending content
    #[command(visible_alias = "tr")]
    Trending(TrendingCmd),

    /// Browse by genre, year, rating and sort order
    #[command(visible_alias = "d")]
    Discover(DiscoverCmd),

    /// Highest rated movies or shows
    #[command(visible_alias = "top")]
    TopRated(TopRatedCmd),

    /// List genre ids and names
    Genres(GenresCmd),

    /// Get details for a movie or show
    #[command(visible_alias = "i")]
    Info(InfoCmd),

    /// List the episodes of one season
    #[command(visible_alias = "ep")]
    Episodes(EpisodesCmd),

    /// List streaming servers
    Servers(ServersCmd),

    /// Print the stream URL for a selection (no network)
    #[command(visible_alias = "r")]
    Resolve(ResolveCmd),

    /// Load a title and open its stream
    #[command(visible_alias = "p")]
    Play(PlayCmd),

    /// Manage the watchlist
    #[command(visible_alias = "wl")]
    Watchlist(WatchlistCmd),
}

/// Media type argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTypeFilter {
    /// Movies only
    Movie,
    /// TV shows only
    #[value(alias = "series")]
    Tv,
}

impl From<MediaTypeFilter> for MediaType {
    fn from(filter: MediaTypeFilter) -> Self {
        match filter {
            MediaTypeFilter::Movie => MediaType::Movie,
            MediaTypeFilter::Tv => MediaType::Tv,
        }
    }
}

// =============================================================================
// Browse Commands
// =============================================================================

/// Search for movies and TV shows by query
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title, keywords)
    #[arg(required = true)]
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,

    /// Filter by media type
    #[arg(long, short = 't', value_enum)]
    pub media_type: Option<MediaTypeFilter>,
}

/// Get trending movies and TV shows
#[derive(Args, Debug)]
pub struct TrendingCmd {
    /// Time window for trending
    #[arg(long, short = 'w', value_enum, default_value = "day")]
    pub window: TrendingWindow,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,

    /// Filter by media type
    #[arg(long, short = 't', value_enum)]
    pub media_type: Option<MediaTypeFilter>,
}

/// Time window for trending content
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendingWindow {
    /// Today's trending
    #[default]
    Day,
    /// This week's trending
    Week,
}

impl From<TrendingWindow> for crate::api::tmdb::TrendingWindow {
    fn from(window: TrendingWindow) -> Self {
        match window {
            TrendingWindow::Day => Self::Day,
            TrendingWindow::Week => Self::Week,
        }
    }
}

/// Browse without a query
#[derive(Args, Debug)]
pub struct DiscoverCmd {
    /// Restrict to one media type (both when omitted)
    #[arg(long, short = 't', value_enum)]
    pub media_type: Option<MediaTypeFilter>,

    /// Genre id or name (see `genres`)
    #[arg(long, short = 'g')]
    pub genre: Option<String>,

    /// Release year (first air year for shows)
    #[arg(long, short = 'y', value_parser = clap::value_parser!(u16).range(1870..=2100))]
    pub year: Option<u16>,

    /// Minimum average rating, 0-10
    #[arg(long, short = 'r')]
    pub min_rating: Option<f32>,

    /// Sort order
    #[arg(long, value_enum, default_value = "popularity-desc")]
    pub sort: SortArg,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

/// Discover sort order
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortArg {
    /// Most popular first
    #[default]
    PopularityDesc,
    /// Least popular first
    PopularityAsc,
    /// Highest rated first
    RatingDesc,
    /// Lowest rated first
    RatingAsc,
    /// Newest first
    Newest,
    /// Oldest first
    Oldest,
    /// Title A-Z
    TitleAsc,
    /// Title Z-A
    TitleDesc,
}

impl From<SortArg> for SortOrder {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::PopularityDesc => SortOrder::PopularityDesc,
            SortArg::PopularityAsc => SortOrder::PopularityAsc,
            SortArg::RatingDesc => SortOrder::RatingDesc,
            SortArg::RatingAsc => SortOrder::RatingAsc,
            SortArg::Newest => SortOrder::NewestFirst,
            SortArg::Oldest => SortOrder::OldestFirst,
            SortArg::TitleAsc => SortOrder::TitleAsc,
            SortArg::TitleDesc => SortOrder::TitleDesc,
        }
    }
}

/// Highest rated titles of one media type
#[derive(Args, Debug)]
pub struct TopRatedCmd {
    /// Media type to list
    #[arg(long, short = 't', value_enum, default_value = "movie")]
    pub media_type: MediaTypeFilter,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

/// List movie and series genres
#[derive(Args, Debug)]
pub struct GenresCmd {}

/// Get detailed information about a movie or TV show
#[derive(Args, Debug)]
pub struct InfoCmd {
    /// TMDB ID
    #[arg(required = true)]
    pub id: String,

    /// Media type of the ID
    #[arg(long, short = 't', value_enum, default_value = "movie")]
    pub media_type: MediaTypeFilter,
}

/// List the episodes of one season of a series
#[derive(Args, Debug)]
pub struct EpisodesCmd {
    /// TMDB series ID
    #[arg(required = true)]
    pub id: String,

    /// Season number (0 for specials)
    #[arg(required = true)]
    pub season: u32,
}

/// List the streaming server catalog
#[derive(Args, Debug)]
pub struct ServersCmd {}

// =============================================================================
// Playback Commands
// =============================================================================

/// Shared selection arguments for resolve/play
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// TMDB ID
    #[arg(required = true)]
    pub id: String,

    /// Media type of the ID
    #[arg(long, short = 't', value_enum, default_value = "movie")]
    pub media_type: MediaTypeFilter,

    /// Streaming server id (e.g. server2); defaults to the configured one
    #[arg(long)]
    pub server: Option<String>,

    /// Season number (for TV shows)
    #[arg(long, short = 's')]
    pub season: Option<u32>,

    /// Episode number (for TV shows)
    #[arg(long, short = 'e')]
    pub episode: Option<u32>,
}

/// Resolve a stream URL without touching the network
#[derive(Args, Debug)]
pub struct ResolveCmd {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Local player selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerChoice {
    /// System web browser (default)
    #[default]
    Browser,
    /// mpv media player
    Mpv,
}

impl From<PlayerChoice> for PlayerType {
    fn from(choice: PlayerChoice) -> Self {
        match choice {
            PlayerChoice::Browser => PlayerType::Browser,
            PlayerChoice::Mpv => PlayerType::Mpv,
        }
    }
}

/// Load a title, apply the selection and open the stream
#[derive(Args, Debug)]
pub struct PlayCmd {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Player to open the stream in
    #[arg(long, short = 'p', value_enum, default_value = "browser")]
    pub player: PlayerChoice,

    /// Print the URL instead of opening it
    #[arg(long)]
    pub print: bool,

    /// Open the trailer instead of the stream
    #[arg(long)]
    pub trailer: bool,
}

// =============================================================================
// Watchlist Commands
// =============================================================================

/// Manage the watchlist
#[derive(Args, Debug)]
pub struct WatchlistCmd {
    #[command(subcommand)]
    pub action: WatchlistAction,
}

#[derive(Subcommand, Debug)]
pub enum WatchlistAction {
    /// Show saved titles, newest first
    #[command(visible_alias = "ls")]
    List,

    /// Save a title (fetches its details)
    Add {
        /// TMDB ID
        id: String,
        /// Media type of the ID
        #[arg(long, short = 't', value_enum, default_value = "movie")]
        media_type: MediaTypeFilter,
    },

    /// Remove a saved title
    #[command(visible_alias = "rm")]
    Remove {
        /// TMDB ID
        id: String,
    },
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Status OK response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOk {
    pub status: &'static str,
}

impl Default for StatusOk {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

/// `info` response: details plus derived values
#[derive(Debug, Serialize)]
pub struct InfoResponse<'a> {
    #[serde(flatten)]
    pub item: &'a MediaItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer_url: Option<String>,
    pub saved: bool,
}

/// `resolve` / `play` response
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamResponse {
    pub status: String,
    pub title: Option<String>,
    pub server: String,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    pub url: String,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            // For non-JSON, caller should handle formatting
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// ID Validation
// =============================================================================

/// TMDB ids are non-empty runs of digits
pub fn validate_media_id(id: &str) -> Result<&str, &'static str> {
    let id = id.trim();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Ok(id)
    } else {
        Err("Invalid TMDB ID (expected digits, e.g. 550)")
    }
}

// =============================================================================
// Tests
// =============================================================================
