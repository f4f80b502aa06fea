//! TMDB API client tests
//!
//! Tests search, detail and season mapping, and error handling.

use cinetui::api::tmdb::{TmdbClient, TrendingWindow};
use cinetui::api::{MetadataProvider, ProviderError};
use cinetui::models::{DiscoverFilters, MediaType, Runtime, SortOrder};
use mockito::{Matcher, Server};

// =============================================================================
// Search Tests
// =============================================================================

#[tokio::test]
async fn test_search_parses_results() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/search/multi")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "the wire".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "page": 1,
                "results": [
                    {
                        "id": 1438,
                        "media_type": "tv",
                        "name": "The Wire",
                        "first_air_date": "2002-06-02",
                        "overview": "Told from the points of view of both the Baltimore homicide and narcotics detectives",
                        "poster_path": "/4lbclFySvugI51fwsyxBTOm4DqK.jpg",
                        "vote_average": 8.6
                    },
                    {
                        "id": 31,
                        "media_type": "person",
                        "name": "Tom Hanks"
                    },
                    {
                        "id": 550,
                        "media_type": "movie",
                        "title": "Fight Club",
                        "release_date": "",
                        "vote_average": 8.4
                    }
                ]
            }"#,
        )
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let results = client.search("the wire").await.unwrap();

    mock.assert_async().await;

    // People are dropped
    assert_eq!(results.len(), 2);

    assert_eq!(results[0].id, "1438");
    assert_eq!(results[0].media_type, MediaType::Tv);
    assert_eq!(results[0].title, "The Wire");
    assert_eq!(results[0].year, Some(2002));

    assert_eq!(results[1].media_type, MediaType::Movie);
    assert_eq!(results[1].release_date, None);
    assert_eq!(results[1].year, None);
    assert_eq!(results[1].overview, "");
}

#[tokio::test]
async fn test_trending_uses_window_path() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/trending/all/day")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": [{"id": 1399, "media_type": "tv", "name": "Game of Thrones", "vote_average": 8.4}]}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let results = client.trending(TrendingWindow::Day).await.unwrap();

    mock.assert_async().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Game of Thrones");
}

#[tokio::test]
async fn test_top_rated_tags_media_type() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/tv/top_rated")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": [{"id": 1396, "name": "Breaking Bad", "first_air_date": "2008-01-20", "vote_average": 8.9}]}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let results = client.top_rated(MediaType::Tv).await.unwrap();

    mock.assert_async().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].media_type, MediaType::Tv);
    assert_eq!(results[0].title, "Breaking Bad");
    assert_eq!(results[0].year, Some(2008));
}

// =============================================================================
// Discover Tests
// =============================================================================

#[tokio::test]
async fn test_discover_movies_sends_filters() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/discover/movie")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sort_by".into(), "vote_average.desc".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("with_genres".into(), "878".into()),
            Matcher::UrlEncoded("vote_average.gte".into(), "8".into()),
            Matcher::UrlEncoded("year".into(), "1999".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": [{"id": 603, "title": "The Matrix", "release_date": "1999-03-31", "vote_average": 8.2}]}"#)
        .create_async()
        .await;

    let filters = DiscoverFilters {
        media_type: Some(MediaType::Movie),
        genre: Some(878),
        sort: SortOrder::RatingDesc,
        year: Some(1999),
        min_rating: Some(8.0),
    };
    let client = TmdbClient::with_base_url("test_key", server.url());
    let results = client.discover(&filters).await.unwrap();

    mock.assert_async().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "603");
    assert_eq!(results[0].media_type, MediaType::Movie);
}

#[tokio::test]
async fn test_discover_series_uses_first_air_year() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/discover/tv")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("first_air_date_year".into(), "2008".into()),
            Matcher::UrlEncoded("sort_by".into(), "popularity.desc".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": [{"id": 1396, "name": "Breaking Bad", "first_air_date": "2008-01-20"}]}"#)
        .create_async()
        .await;

    let filters = DiscoverFilters {
        media_type: Some(MediaType::Tv),
        year: Some(2008),
        ..DiscoverFilters::default()
    };
    let client = TmdbClient::with_base_url("test_key", server.url());
    let results = client.discover(&filters).await.unwrap();

    mock.assert_async().await;
    assert_eq!(results[0].media_type, MediaType::Tv);
    assert_eq!(results[0].title, "Breaking Bad");
}

#[tokio::test]
async fn test_discover_all_merges_by_popularity() {
    let mut server = Server::new_async().await;

    let movies = server
        .mock("GET", "/discover/movie")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sort_by".into(), "popularity.desc".into()),
            Matcher::UrlEncoded("year".into(), "2010".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"page": 1, "results": [
                {"id": 27205, "title": "Inception", "popularity": 80.0},
                {"id": 10191, "title": "How to Train Your Dragon", "popularity": 20.0}
            ]}"#,
        )
        .create_async()
        .await;

    let series = server
        .mock("GET", "/discover/tv")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sort_by".into(), "popularity.desc".into()),
            Matcher::UrlEncoded("first_air_date_year".into(), "2010".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": [{"id": 1402, "name": "The Walking Dead", "popularity": 50.0}]}"#)
        .create_async()
        .await;

    let filters = DiscoverFilters {
        year: Some(2010),
        ..DiscoverFilters::default()
    };
    let client = TmdbClient::with_base_url("test_key", server.url());
    let results = client.discover(&filters).await.unwrap();

    movies.assert_async().await;
    series.assert_async().await;

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["27205", "1402", "10191"]);
    assert_eq!(results[1].media_type, MediaType::Tv);
}

#[tokio::test]
async fn test_discover_all_keeps_catalog_order_for_other_sorts() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/discover/movie")
        .match_query(Matcher::UrlEncoded("sort_by".into(), "title.asc".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": [{"id": 2, "title": "Zodiac", "popularity": 1.0}]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/discover/tv")
        .match_query(Matcher::UrlEncoded("sort_by".into(), "title.asc".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": [{"id": 1, "name": "Arcane", "popularity": 99.0}]}"#)
        .create_async()
        .await;

    let filters = DiscoverFilters {
        sort: SortOrder::TitleAsc,
        ..DiscoverFilters::default()
    };
    let client = TmdbClient::with_base_url("test_key", server.url());
    let results = client.discover(&filters).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
}

#[tokio::test]
async fn test_genres_are_merged_without_duplicates() {
    let mut server = Server::new_async().await;

    let movie = server
        .mock("GET", "/genre/movie/list")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"genres": [{"id": 18, "name": "Drama"}, {"id": 28, "name": "Action"}]}"#)
        .create_async()
        .await;
    let tv = server
        .mock("GET", "/genre/tv/list")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"genres": [{"id": 18, "name": "Drama"}, {"id": 10765, "name": "Sci-Fi & Fantasy"}]}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let genres = client.genres().await.unwrap();

    movie.assert_async().await;
    tv.assert_async().await;
    let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Drama", "Action", "Sci-Fi & Fantasy"]);
}

#[tokio::test]
async fn test_discover_failure_propagates() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/discover/movie")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": []}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/discover/tv")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let result = client.discover(&DiscoverFilters::default()).await;
    assert!(matches!(result, Err(ProviderError::ServerError(500))));
}

// =============================================================================
// Detail Tests
// =============================================================================

#[tokio::test]
async fn test_movie_details_mapping() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/movie/550")
        .match_query(Matcher::UrlEncoded(
            "append_to_response".into(),
            "videos,credits,external_ids".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "id": 550,
                "title": "Fight Club",
                "release_date": "1999-10-15",
                "vote_average": 8.433,
                "overview": "A ticking-time-bomb insomniac...",
                "runtime": 139,
                "status": "Released",
                "genres": [{"id": 18, "name": "Drama"}, {"id": 53, "name": "Thriller"}],
                "production_companies": [{"id": 508, "name": "Regency Enterprises"}],
                "imdb_id": "tt0137523",
                "poster_path": "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg",
                "credits": {"cast": [
                    {"name": "Edward Norton", "character": "Narrator", "profile_path": "/8nytsqL59SFJTVYVrN72k6qkGgJ.jpg"},
                    {"name": "Brad Pitt", "character": "", "profile_path": null}
                ]},
                "videos": {"results": [
                    {"key": "teaser1", "name": "Teaser", "site": "YouTube", "type": "Teaser"},
                    {"key": "qtRKdVHc-cE", "name": "Official Trailer", "site": "YouTube", "type": "Trailer"}
                ]}
            }"#,
        )
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let item = client.details(MediaType::Movie, "550").await.unwrap();

    mock.assert_async().await;

    assert_eq!(item.id, "550");
    assert_eq!(item.title, "Fight Club");
    assert_eq!(item.year(), Some(1999));
    assert_eq!(item.runtime, Runtime::Minutes(139));
    assert_eq!(item.genres, vec!["Drama", "Thriller"]);
    assert_eq!(item.imdb_id.as_deref(), Some("tt0137523"));
    assert_eq!(item.cast.len(), 2);
    assert_eq!(item.cast[1].character, None);
    assert!(item.seasons.is_empty());

    let trailer = item.trailer.expect("official trailer picked");
    assert_eq!(trailer.key, "qtRKdVHc-cE");
    assert!(trailer.embed_url().starts_with("https://www.youtube.com/embed/qtRKdVHc-cE"));
}

#[tokio::test]
async fn test_series_details_keep_season_order() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/tv/1399")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "id": 1399,
                "name": "Game of Thrones",
                "first_air_date": "2011-04-17",
                "vote_average": 8.4,
                "episode_run_time": [],
                "external_ids": {"imdb_id": "tt0944947"},
                "seasons": [
                    {"season_number": 0, "episode_count": 14, "name": "Specials"},
                    {"season_number": 1, "episode_count": 10, "name": "Season 1", "air_date": "2011-04-17"},
                    {"season_number": 2, "episode_count": 10, "name": "Season 2", "air_date": ""}
                ]
            }"#,
        )
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let item = client.details(MediaType::Tv, "1399").await.unwrap();

    mock.assert_async().await;

    assert_eq!(item.title, "Game of Thrones");
    assert_eq!(item.runtime, Runtime::Unknown);
    assert_eq!(item.imdb_id.as_deref(), Some("tt0944947"));
    let numbers: Vec<u32> = item.seasons.iter().map(|s| s.season_number).collect();
    assert_eq!(numbers, vec![0, 1, 2]);
    assert_eq!(item.first_regular_season(), Some(1));
    assert_eq!(item.seasons[2].air_date, None);
    assert!(item.trailer.is_none());
}

#[tokio::test]
async fn test_season_endpoint() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/tv/1399/season/2")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "season_number": 2,
                "episodes": [
                    {"id": 63066, "episode_number": 1, "name": "The North Remembers", "runtime": 53},
                    {"id": 63067, "episode_number": 2, "name": "The Night Lands"}
                ]
            }"#,
        )
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let season = client.season("1399", 2).await.unwrap();

    mock.assert_async().await;

    assert_eq!(season.season_number, 2);
    assert_eq!(season.episode_count(), 2);
    assert_eq!(season.episodes[0].name, "The North Remembers");
    assert_eq!(season.episodes[0].runtime, Some(53));
    assert_eq!(season.episodes[1].season, 2);
    assert!(season.contains_episode(2));
    assert!(!season.contains_episode(3));
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[tokio::test]
async fn test_handles_rate_limit() {
    let mut server = Server::new_async().await;

    // First request returns 429, second succeeds
    let mock_429 = server
        .mock("GET", "/search/multi")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("Retry-After", "0")
        .expect(1)
        .create_async()
        .await;

    let mock_200 = server
        .mock("GET", "/search/multi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": []}"#)
        .expect(1)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let result = client.search("test").await;

    assert!(result.is_ok());
    mock_429.assert_async().await;
    mock_200.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_gives_up() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/trending/all/week")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("Retry-After", "0")
        .expect(3)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let result = client.trending(TrendingWindow::Week).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(ProviderError::RateLimited)));
}

#[tokio::test]
async fn test_handles_not_found() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/movie/99999999")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"success": false, "status_code": 34, "status_message": "The resource could not be found."}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let result = client.details(MediaType::Movie, "99999999").await;

    mock.assert_async().await;
    assert!(matches!(result, Err(ProviderError::NotFound)));
}

#[tokio::test]
async fn test_handles_server_error() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/tv/1399/season/1")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("Service Unavailable")
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let result = client.season("1399", 1).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(ProviderError::ServerError(503))));
}

#[tokio::test]
async fn test_handles_invalid_json() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/search/multi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("not valid json {{{")
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let result = client.search("test").await;

    mock.assert_async().await;
    assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_sends_bearer_token() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/search/multi")
        .match_query(Matcher::Any)
        .match_header("Authorization", "Bearer read-token-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"page": 1, "results": []}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("read-token-123", format!("{}/", server.url()));
    client.search("anything").await.unwrap();

    mock.assert_async().await;
}
