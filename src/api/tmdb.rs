//! TMDB (The Movie Database) API client
//!
//! Provides search, trending, discover, top rated, genres, item details
//! and season episode lists.
//! API docs: https://developer.themoviedb.org/docs

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{MetadataProvider, ProviderError};
use crate::models::{
    extract_year, CastMember, DiscoverFilters, Episode, Genre, MediaItem, MediaType, Runtime,
    SearchResult, SeasonDetail, SeasonSummary, Trailer,
};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Billed cast entries kept per item
const MAX_CAST: usize = 10;

/// Trending time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendingWindow {
    #[default]
    Day,
    Week,
}

impl TrendingWindow {
    fn as_path(&self) -> &'static str {
        match self {
            TrendingWindow::Day => "day",
            TrendingWindow::Week => "week",
        }
    }
}

impl std::fmt::Display for TrendingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_path())
    }
}

/// TMDB API client
#[derive(Clone)]
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl TmdbClient {
    /// Create a new TMDB client with the given API key (v4 read token)
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
        }
    }

    /// Make an authenticated GET request with retry logic for rate limits
    async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut retries = 0;

        loop {
            debug!(url = %url, "TMDB request");
            let response = self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Accept", "application/json")
                .send()
                .await?;

            match response.status() {
                status if status.is_success() => {
                    let body = response.text().await?;
                    return serde_json::from_str(&body).map_err(|e| {
                        ProviderError::InvalidResponse(format!("JSON parse error: {}", e))
                    });
                }
                StatusCode::NOT_FOUND => {
                    return Err(ProviderError::NotFound);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(ProviderError::RateLimited);
                    }

                    // Retry-After header or exponential backoff
                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2u64.pow(retries));

                    warn!(url = %url, wait_secs, "TMDB rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                }
                status => {
                    return Err(ProviderError::ServerError(status.as_u16()));
                }
            }
        }
    }

    /// Search for movies and TV shows
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let endpoint = format!(
            "/search/multi?query={}&page=1",
            urlencoding::encode(query)
        );

        let response: SearchResponse = self.get(&endpoint).await?;
        Ok(response.into_results())
    }

    /// Get trending content
    pub async fn trending(&self, window: TrendingWindow) -> Result<Vec<SearchResult>, ProviderError> {
        let endpoint = format!("/trending/all/{}", window.as_path());
        let response: SearchResponse = self.get(&endpoint).await?;
        Ok(response.into_results())
    }

    /// Highest rated titles of one media type
    pub async fn top_rated(&self, media_type: MediaType) -> Result<Vec<SearchResult>, ProviderError> {
        let endpoint = format!("/{}/top_rated?page=1", media_type.as_path());
        let response: SearchResponse = self.get(&endpoint).await?;
        Ok(response.into_results_as(media_type))
    }

    /// Browse by filters instead of a query.
    ///
    /// Without a media type both catalogs are queried and concatenated,
    /// movies first. A popularity sort is then reapplied across the merged
    /// list; other orders keep each catalog's own ordering.
    pub async fn discover(&self, filters: &DiscoverFilters) -> Result<Vec<SearchResult>, ProviderError> {
        if let Some(media_type) = filters.media_type {
            let response = self.discover_raw(filters, media_type).await?;
            return Ok(response.into_results_as(media_type));
        }

        let (movies, series) = tokio::join!(
            self.discover_raw(filters, MediaType::Movie),
            self.discover_raw(filters, MediaType::Tv),
        );
        let mut combined: Vec<(f32, SearchResult)> = movies?
            .into_ranked(MediaType::Movie)
            .chain(series?.into_ranked(MediaType::Tv))
            .collect();

        if filters.sort.is_popularity() {
            let descending = filters.sort.as_param().ends_with("desc");
            combined.sort_by(|(a, _), (b, _)| {
                let order = a.total_cmp(b);
                if descending {
                    order.reverse()
                } else {
                    order
                }
            });
        }

        Ok(combined.into_iter().map(|(_, r)| r).collect())
    }

    async fn discover_raw(
        &self,
        filters: &DiscoverFilters,
        media_type: MediaType,
    ) -> Result<SearchResponse, ProviderError> {
        let query = filters
            .query_params(media_type)
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let endpoint = format!("/discover/{}?{}", media_type.as_path(), query);
        self.get(&endpoint).await
    }

    /// Movie and series genres merged, first occurrence of an id wins
    pub async fn genres(&self) -> Result<Vec<Genre>, ProviderError> {
        let (movie, tv) = tokio::join!(
            self.get::<GenreResponse>("/genre/movie/list"),
            self.get::<GenreResponse>("/genre/tv/list"),
        );

        let mut genres: Vec<Genre> = Vec::new();
        for genre in movie?.genres.into_iter().chain(tv?.genres) {
            if !genres.iter().any(|g| g.id == genre.id) {
                genres.push(Genre {
                    id: genre.id,
                    name: genre.name,
                });
            }
        }
        Ok(genres)
    }

    /// Get full details for a movie or TV show
    pub async fn item_detail(&self, media_type: MediaType, id: &str) -> Result<MediaItem, ProviderError> {
        let endpoint = format!(
            "/{}/{}?append_to_response=videos,credits,external_ids",
            media_type.as_path(),
            urlencoding::encode(id)
        );
        let response: DetailResponse = self.get(&endpoint).await?;
        Ok(response.into_item(media_type, id))
    }

    /// Get episodes for a TV season
    pub async fn tv_season(&self, id: &str, season: u32) -> Result<SeasonDetail, ProviderError> {
        let endpoint = format!("/tv/{}/season/{}", urlencoding::encode(id), season);
        let response: SeasonResponse = self.get(&endpoint).await?;
        Ok(response.into_detail(season))
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn details(&self, media_type: MediaType, id: &str) -> Result<MediaItem, ProviderError> {
        self.item_detail(media_type, id).await
    }

    async fn season(&self, id: &str, season_number: u32) -> Result<SeasonDetail, ProviderError> {
        self.tv_season(id, season_number).await
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResultRaw>,
}

impl SearchResponse {
    fn into_results(self) -> Vec<SearchResult> {
        self.results
            .into_iter()
            .filter_map(|r| r.into_search_result())
            .collect()
    }

    /// Single-catalog endpoints omit `media_type`
    fn into_results_as(self, media_type: MediaType) -> Vec<SearchResult> {
        self.into_ranked(media_type).map(|(_, r)| r).collect()
    }

    fn into_ranked(self, media_type: MediaType) -> impl Iterator<Item = (f32, SearchResult)> {
        self.results.into_iter().filter_map(move |mut r| {
            let popularity = r.popularity.unwrap_or(0.0);
            r.media_type = media_type.as_path().to_string();
            r.into_search_result().map(|result| (popularity, result))
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenreResponse {
    #[serde(default)]
    genres: Vec<GenreRaw>,
}

#[derive(Debug, Deserialize)]
struct GenreRaw {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResultRaw {
    id: u64,
    #[serde(default)]
    media_type: String,
    // Movies use "title", TV uses "name"
    title: Option<String>,
    name: Option<String>,
    // Movies use "release_date", TV uses "first_air_date"
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f32>,
    popularity: Option<f32>,
}

impl SearchResultRaw {
    fn into_search_result(self) -> Option<SearchResult> {
        let media_type = match self.media_type.as_str() {
            "movie" => MediaType::Movie,
            "tv" => MediaType::Tv,
            _ => return None, // "person" and friends
        };

        let title = self.title.or(self.name).unwrap_or_default();
        let release_date = non_empty(self.release_date).or(non_empty(self.first_air_date));
        let year = release_date.as_deref().and_then(extract_year);

        Some(SearchResult {
            id: self.id.to_string(),
            media_type,
            title,
            year,
            release_date,
            overview: self.overview.unwrap_or_default(),
            poster_path: self.poster_path,
            vote_average: self.vote_average.unwrap_or(0.0),
        })
    }
}

/// Movie and TV detail share one shape; absent fields default.
#[derive(Debug, Deserialize)]
struct DetailResponse {
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f32>,
    overview: Option<String>,
    runtime: Option<u32>,
    #[serde(default)]
    episode_run_time: Vec<u32>,
    status: Option<String>,
    #[serde(default)]
    genres: Vec<NamedRaw>,
    #[serde(default)]
    production_companies: Vec<NamedRaw>,
    credits: Option<CreditsRaw>,
    videos: Option<VideosRaw>,
    poster_path: Option<String>,
    imdb_id: Option<String>,
    external_ids: Option<ExternalIds>,
    #[serde(default)]
    seasons: Vec<SeasonRaw>,
}

impl DetailResponse {
    fn into_item(self, media_type: MediaType, id: &str) -> MediaItem {
        let trailer = self.videos.and_then(|v| pick_trailer(v.results));

        let cast = self
            .credits
            .map(|c| {
                c.cast
                    .into_iter()
                    .take(MAX_CAST)
                    .map(|m| CastMember {
                        name: m.name,
                        character: non_empty(m.character),
                        profile_path: m.profile_path,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let imdb_id = non_empty(self.imdb_id)
            .or_else(|| self.external_ids.and_then(|e| non_empty(e.imdb_id)));

        let seasons = if media_type.is_episodic() {
            self.seasons.into_iter().map(SeasonRaw::into_summary).collect()
        } else {
            Vec::new()
        };

        MediaItem {
            id: id.to_string(),
            media_type,
            title: self.title.or(self.name).unwrap_or_default(),
            release_date: non_empty(self.release_date).or(non_empty(self.first_air_date)),
            rating: self.vote_average.unwrap_or(0.0),
            overview: self.overview.unwrap_or_default(),
            runtime: Runtime::resolve(self.runtime, &self.episode_run_time),
            status: non_empty(self.status),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            production_companies: self
                .production_companies
                .into_iter()
                .map(|c| c.name)
                .collect(),
            cast,
            trailer,
            poster_path: self.poster_path,
            imdb_id,
            seasons,
        }
    }
}

/// Prefer an official YouTube trailer, else any YouTube video
fn pick_trailer(videos: Vec<VideoRaw>) -> Option<Trailer> {
    let is_youtube = |v: &VideoRaw| v.site == "YouTube";
    let chosen = videos
        .iter()
        .position(|v| is_youtube(v) && v.kind == "Trailer")
        .or_else(|| videos.iter().position(is_youtube))?;

    videos.into_iter().nth(chosen).map(|v| Trailer {
        key: v.key,
        name: v.name,
        site: v.site,
    })
}

#[derive(Debug, Deserialize)]
struct SeasonResponse {
    season_number: Option<u32>,
    #[serde(default)]
    episodes: Vec<EpisodeRaw>,
}

impl SeasonResponse {
    fn into_detail(self, requested: u32) -> SeasonDetail {
        let season = self.season_number.unwrap_or(requested);
        SeasonDetail {
            season_number: season,
            episodes: self
                .episodes
                .into_iter()
                .map(|e| e.into_episode(season))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedRaw {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreditsRaw {
    #[serde(default)]
    cast: Vec<CastRaw>,
}

#[derive(Debug, Deserialize)]
struct CastRaw {
    name: String,
    character: Option<String>,
    profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosRaw {
    #[serde(default)]
    results: Vec<VideoRaw>,
}

#[derive(Debug, Deserialize)]
struct VideoRaw {
    key: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    site: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct SeasonRaw {
    season_number: u32,
    #[serde(default)]
    episode_count: u32,
    name: Option<String>,
    air_date: Option<String>,
}

impl SeasonRaw {
    fn into_summary(self) -> SeasonSummary {
        SeasonSummary {
            season_number: self.season_number,
            episode_count: self.episode_count,
            name: self.name,
            air_date: non_empty(self.air_date),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EpisodeRaw {
    id: Option<u64>,
    episode_number: u32,
    #[serde(default)]
    name: String,
    overview: Option<String>,
    runtime: Option<u32>,
}

impl EpisodeRaw {
    fn into_episode(self, season: u32) -> Episode {
        Episode {
            season,
            episode: self.episode_number,
            name: self.name,
            overview: self.overview.unwrap_or_default(),
            runtime: self.runtime,
            id: self.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(key: &str, site: &str, kind: &str) -> VideoRaw {
        VideoRaw {
            key: key.into(),
            name: key.into(),
            site: site.into(),
            kind: kind.into(),
        }
    }

    #[test]
    fn test_pick_trailer_prefers_youtube_trailer() {
        let videos = vec![
            video("teaser", "YouTube", "Teaser"),
            video("vimeo", "Vimeo", "Trailer"),
            video("official", "YouTube", "Trailer"),
        ];
        assert_eq!(pick_trailer(videos).map(|t| t.key).as_deref(), Some("official"));
    }

    #[test]
    fn test_pick_trailer_falls_back_to_any_youtube() {
        let videos = vec![
            video("vimeo", "Vimeo", "Trailer"),
            video("clip", "YouTube", "Clip"),
        ];
        assert_eq!(pick_trailer(videos).map(|t| t.key).as_deref(), Some("clip"));
        assert!(pick_trailer(vec![video("vimeo", "Vimeo", "Trailer")]).is_none());
    }

    #[test]
    fn test_media_type_filter() {
        let movie = SearchResultRaw {
            id: 1,
            media_type: "movie".to_string(),
            title: Some("Test".to_string()),
            name: None,
            release_date: Some("2022-01-01".to_string()),
            first_air_date: None,
            overview: None,
            poster_path: None,
            vote_average: None,
            popularity: None,
        };

        let person = SearchResultRaw {
            id: 2,
            media_type: "person".to_string(),
            title: None,
            name: Some("Actor".to_string()),
            release_date: None,
            first_air_date: None,
            overview: None,
            poster_path: None,
            vote_average: None,
            popularity: None,
        };

        assert!(movie.into_search_result().is_some());
        assert!(person.into_search_result().is_none());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("".into())), None);
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some("x".into())), Some("x".into()));
        assert_eq!(non_empty(None), None);
    }
}
