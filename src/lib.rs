//! cinetui - terminal browser and launcher for movie and TV streams
//!
//! # Modules
//!
//! - `models` - Data structures for browse results, details, seasons, watchlist
//! - `api` - Metadata provider trait and the TMDB client
//! - `stream` - Embed server catalog and local players
//! - `session` - Playback session state machine and its async driver
//! - `watchlist` - Per-user saved titles
//! - `ui` - TUI components
//! - `app` - Application state and navigation

pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod models;
pub mod session;
pub mod stream;
pub mod ui;
pub mod watchlist;

// Re-export commonly used types
pub use models::{
    Episode, MediaItem, MediaType, SearchResult, SeasonDetail, SeasonSummary, WatchlistEntry,
};

pub use api::{tmdb::TmdbClient, MetadataProvider, ProviderError};
pub use app::{App, AppState};
pub use session::{PlaybackSession, SessionDriver, SessionError, SessionState};
pub use stream::{resolve, Catalog, StreamTarget};
