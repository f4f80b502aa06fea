//! Data structures and types for cinetui
//!
//! Typed records for everything that crosses the metadata boundary:
//! - **Browse**: search/trending results
//! - **Details**: a fully resolved movie or series (`MediaItem`)
//! - **Seasons**: season summaries and loaded season detail
//! - **Watchlist**: entries saved by the user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base URL for TMDB poster/profile images
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

// =============================================================================
// Media Type
// =============================================================================

/// Media type discriminator. `Tv` is the episodic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Whether this kind of media is organised into seasons and episodes
    pub fn is_episodic(&self) -> bool {
        matches!(self, MediaType::Tv)
    }

    /// Path segment used by the metadata API and the embed servers
    pub fn as_path(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movie => write!(f, "Movie"),
            MediaType::Tv => write!(f, "TV Series"),
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "tv" | "series" | "show" => Ok(MediaType::Tv),
            other => Err(format!("unknown media type '{}'", other)),
        }
    }
}

// =============================================================================
// Browse Models
// =============================================================================

/// Search or trending result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<u16>,
    pub release_date: Option<String>,
    pub overview: String,
    pub poster_path: Option<String>,
    pub vote_average: f32,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year_str = self.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        write!(f, "{}{} [{}]", self.title, year_str, self.media_type)
    }
}

/// Genre as listed by the metadata provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Discover sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    PopularityDesc,
    PopularityAsc,
    RatingDesc,
    RatingAsc,
    NewestFirst,
    OldestFirst,
    TitleAsc,
    TitleDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 8] = [
        SortOrder::PopularityDesc,
        SortOrder::PopularityAsc,
        SortOrder::RatingDesc,
        SortOrder::RatingAsc,
        SortOrder::NewestFirst,
        SortOrder::OldestFirst,
        SortOrder::TitleAsc,
        SortOrder::TitleDesc,
    ];

    /// `sort_by` query value
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::PopularityDesc => "popularity.desc",
            SortOrder::PopularityAsc => "popularity.asc",
            SortOrder::RatingDesc => "vote_average.desc",
            SortOrder::RatingAsc => "vote_average.asc",
            SortOrder::NewestFirst => "release_date.desc",
            SortOrder::OldestFirst => "release_date.asc",
            SortOrder::TitleAsc => "title.asc",
            SortOrder::TitleDesc => "title.desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::PopularityDesc => "Most Popular",
            SortOrder::PopularityAsc => "Least Popular",
            SortOrder::RatingDesc => "Highest Rated",
            SortOrder::RatingAsc => "Lowest Rated",
            SortOrder::NewestFirst => "Newest First",
            SortOrder::OldestFirst => "Oldest First",
            SortOrder::TitleAsc => "A-Z",
            SortOrder::TitleDesc => "Z-A",
        }
    }

    pub fn is_popularity(&self) -> bool {
        matches!(self, SortOrder::PopularityDesc | SortOrder::PopularityAsc)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Filters for browsing the catalog without a query.
///
/// `media_type: None` means movies and series together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscoverFilters {
    pub media_type: Option<MediaType>,
    pub genre: Option<u32>,
    pub sort: SortOrder,
    pub year: Option<u16>,
    pub min_rating: Option<f32>,
}

impl DiscoverFilters {
    /// Number of filters that differ from the defaults
    pub fn active_count(&self) -> usize {
        [
            self.media_type.is_some(),
            self.genre.is_some(),
            self.sort != SortOrder::default(),
            self.year.is_some(),
            self.min_rating.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Query parameters for one `/discover/{movie|tv}` call.
    ///
    /// The year key differs: movies filter on `year`, series on
    /// `first_air_date_year`.
    pub fn query_params(&self, media_type: MediaType) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort_by", self.sort.as_param().to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(genre) = self.genre {
            params.push(("with_genres", genre.to_string()));
        }
        if let Some(rating) = self.min_rating {
            params.push(("vote_average.gte", rating.to_string()));
        }
        if let Some(year) = self.year {
            let key = match media_type {
                MediaType::Movie => "year",
                MediaType::Tv => "first_air_date_year",
            };
            params.push((key, year.to_string()));
        }
        params
    }
}

// =============================================================================
// Detail Models
// =============================================================================

/// Runtime in minutes, or unknown when the provider gave nothing usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Minutes(u32),
    #[default]
    Unknown,
}

impl Runtime {
    /// Pick the movie runtime, else the first per-episode runtime.
    /// Zero counts as missing.
    pub fn resolve(runtime: Option<u32>, episode_run_time: &[u32]) -> Self {
        runtime
            .filter(|m| *m > 0)
            .or_else(|| episode_run_time.first().copied().filter(|m| *m > 0))
            .map(Runtime::Minutes)
            .unwrap_or(Runtime::Unknown)
    }

    pub fn minutes(&self) -> Option<u32> {
        match self {
            Runtime::Minutes(m) => Some(*m),
            Runtime::Unknown => None,
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Runtime::Minutes(m) if *m >= 60 => write!(f, "{}h {}m", m / 60, m % 60),
            Runtime::Minutes(m) => write!(f, "{}m", m),
            Runtime::Unknown => write!(f, "N/A"),
        }
    }
}

/// A billed cast member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

impl CastMember {
    pub fn profile_url(&self) -> Option<String> {
        self.profile_path
            .as_ref()
            .map(|p| format!("{}/w185{}", IMAGE_BASE_URL, p))
    }
}

/// Trailer reference (YouTube video key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    pub key: String,
    pub name: String,
    pub site: String,
}

impl Trailer {
    /// Embeddable trailer URL
    pub fn embed_url(&self) -> String {
        format!(
            "https://www.youtube.com/embed/{}?rel=0&modestbranding=1",
            self.key
        )
    }
}

/// Summary of one season as listed in the series details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season_number: u32,
    pub episode_count: u32,
    pub name: Option<String>,
    pub air_date: Option<String>,
}

impl SeasonSummary {
    /// Season 0 holds specials
    pub fn is_specials(&self) -> bool {
        self.season_number == 0
    }
}

impl fmt::Display for SeasonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_specials() {
            write!(f, "Specials ({} episodes)", self.episode_count)
        } else {
            write!(
                f,
                "Season {} ({} episodes)",
                self.season_number, self.episode_count
            )
        }
    }
}

/// Full metadata for one movie or series.
///
/// Immutable once fetched; a new fetch replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub media_type: MediaType,
    pub title: String,
    pub release_date: Option<String>,
    pub rating: f32,
    pub overview: String,
    pub runtime: Runtime,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub production_companies: Vec<String>,
    pub cast: Vec<CastMember>,
    pub trailer: Option<Trailer>,
    pub poster_path: Option<String>,
    pub imdb_id: Option<String>,
    /// Ordered season list; empty for movies
    pub seasons: Vec<SeasonSummary>,
}

impl MediaItem {
    pub fn is_episodic(&self) -> bool {
        self.media_type.is_episodic()
    }

    /// First regular season; specials are never picked automatically
    pub fn first_regular_season(&self) -> Option<u32> {
        if !self.is_episodic() {
            return None;
        }
        self.seasons
            .iter()
            .find(|s| s.season_number > 0)
            .map(|s| s.season_number)
    }

    pub fn season(&self, season_number: u32) -> Option<&SeasonSummary> {
        self.seasons
            .iter()
            .find(|s| s.season_number == season_number)
    }

    pub fn year(&self) -> Option<u16> {
        self.release_date.as_deref().and_then(extract_year)
    }

    pub fn poster_url(&self) -> Option<String> {
        self.poster_path
            .as_ref()
            .map(|p| format!("{}/w500{}", IMAGE_BASE_URL, p))
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year_str = self.year().map(|y| format!(" ({})", y)).unwrap_or_default();
        write!(f, "{}{} - ", self.title, year_str)?;
        if self.is_episodic() {
            write!(f, "{} seasons", self.seasons.len())?;
        } else {
            write!(f, "{}", self.runtime)?;
        }
        write!(f, " - ⭐ {:.1}", self.rating)
    }
}

/// One episode of a loaded season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub season: u32,
    pub episode: u32,
    pub name: String,
    pub overview: String,
    pub runtime: Option<u32>,
    pub id: Option<u64>,
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02} - {}", self.season, self.episode, self.name)
    }
}

/// Episodes of one season of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonDetail {
    pub season_number: u32,
    pub episodes: Vec<Episode>,
}

impl SeasonDetail {
    pub fn episode_count(&self) -> u32 {
        self.episodes.len() as u32
    }

    /// Episode numbers are 1-based and bounded by the loaded count
    pub fn contains_episode(&self, episode: u32) -> bool {
        episode >= 1 && episode <= self.episode_count()
    }

    pub fn episode(&self, episode: u32) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.episode == episode)
    }
}

// =============================================================================
// Watchlist Models
// =============================================================================

/// A saved item in a user's watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub media_id: String,
    pub media_type: MediaType,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl WatchlistEntry {
    /// Build an entry from loaded details
    pub fn from_item(item: &MediaItem) -> Self {
        Self {
            media_id: item.id.clone(),
            media_type: item.media_type,
            title: item.title.clone(),
            poster_path: item.poster_path.clone(),
            release_date: item.release_date.clone(),
            added_at: Utc::now(),
        }
    }

    /// Build an entry from a browse result
    pub fn from_result(result: &SearchResult) -> Self {
        Self {
            media_id: result.id.clone(),
            media_type: result.media_type,
            title: result.title.clone(),
            poster_path: result.poster_path.clone(),
            release_date: result.release_date.clone(),
            added_at: Utc::now(),
        }
    }
}

impl fmt::Display for WatchlistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.release_date.as_deref().unwrap_or("Unknown");
        write!(f, "{} [{}] - {}", self.title, self.media_type, date)
    }
}

/// Extract year from a date string like "2022-03-04"
pub fn extract_year(date: &str) -> Option<u16> {
    date.get(..4).and_then(|y| y.parse().ok())
}

// =============================================================================
// Tests
// =============================================================================
