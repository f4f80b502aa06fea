//! Streaming server catalog and source resolution
//!
//! Each server is a pure URL rule over `(id, media type, season, episode)`.
//! The catalog is ordered; its first entry is the fallback for unknown ids
//! and for rules that produce an unusable URL. Resolution never fails.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::models::MediaType;

/// Server selected when nothing else is configured
pub const DEFAULT_SERVER_ID: &str = "server1";

/// What to play: movies ignore season and episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTarget<'a> {
    pub id: &'a str,
    pub media_type: MediaType,
    pub season: u32,
    pub episode: u32,
}

impl<'a> StreamTarget<'a> {
    pub fn movie(id: &'a str) -> Self {
        Self {
            id,
            media_type: MediaType::Movie,
            season: 1,
            episode: 1,
        }
    }

    pub fn episode(id: &'a str, season: u32, episode: u32) -> Self {
        Self {
            id,
            media_type: MediaType::Tv,
            season,
            episode,
        }
    }
}

/// URL rule of a single server
pub type UrlTemplate = fn(&StreamTarget<'_>) -> String;

/// One third-party playback source
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServerDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub quality: &'static str,
    pub ads: &'static str,
    #[serde(skip_serializing)]
    template: UrlTemplate,
}

impl ServerDescriptor {
    pub const fn new(
        id: &'static str,
        name: &'static str,
        quality: &'static str,
        ads: &'static str,
        template: UrlTemplate,
    ) -> Self {
        Self {
            id,
            name,
            quality,
            ads,
            template,
        }
    }

    /// Run the rule and check that it produced an absolute URL. The rule's
    /// own string is returned, not the parser's normalized form.
    pub fn build(&self, target: &StreamTarget<'_>) -> Result<String, url::ParseError> {
        let raw = self.raw(target);
        Url::parse(&raw)?;
        Ok(raw)
    }

    /// Unchecked rule output
    pub fn raw(&self, target: &StreamTarget<'_>) -> String {
        (self.template)(target)
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} • {} ads)", self.name, self.quality, self.ads)
    }
}

/// Catalog construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("server catalog must contain at least one server")]
    Empty,
    #[error("duplicate server id '{0}'")]
    DuplicateId(&'static str),
}

/// Ordered, immutable list of servers
#[derive(Debug, Clone)]
pub struct Catalog {
    servers: Vec<ServerDescriptor>,
}

static DEFAULT_CATALOG: Lazy<Arc<Catalog>> = Lazy::new(|| {
    Arc::new(Catalog {
        servers: DEFAULT_SERVERS.to_vec(),
    })
});

impl Catalog {
    pub fn new(servers: Vec<ServerDescriptor>) -> Result<Self, CatalogError> {
        if servers.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for server in &servers {
            if !seen.insert(server.id) {
                return Err(CatalogError::DuplicateId(server.id));
            }
        }
        Ok(Self { servers })
    }

    /// The built-in catalog, shared process-wide
    pub fn shared() -> Arc<Catalog> {
        Arc::clone(&DEFAULT_CATALOG)
    }

    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Fallback entry; construction guarantees it exists
    pub fn first(&self) -> &ServerDescriptor {
        &self.servers[0]
    }

    pub fn get(&self, id: &str) -> Option<&ServerDescriptor> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.servers.iter().position(|s| s.id == id)
    }

    /// Catalog key for `id`, or the first entry's key when unknown
    pub fn normalize(&self, id: &str) -> &'static str {
        self.get(id).unwrap_or_else(|| self.first()).id
    }

    /// Next server in catalog order, wrapping around
    pub fn next_after(&self, id: &str) -> &ServerDescriptor {
        let next = self.position(id).map(|i| (i + 1) % self.len()).unwrap_or(0);
        &self.servers[next]
    }

    /// Server by 1-based position (hotkeys)
    pub fn by_number(&self, number: usize) -> Option<&ServerDescriptor> {
        number.checked_sub(1).and_then(|i| self.servers.get(i))
    }

    /// Map a server choice and playback context to a URL.
    ///
    /// Unknown ids and rules that fail to build fall back to the first
    /// entry. If that fails as well its unchecked output is returned.
    pub fn resolve(&self, server_id: &str, target: &StreamTarget<'_>) -> String {
        let first = self.first();
        let server = match self.get(server_id) {
            Some(server) => server,
            None => {
                warn!(server_id, fallback = first.id, "unknown server, using fallback");
                first
            }
        };

        match server.build(target) {
            Ok(url) => return url,
            Err(e) => warn!(server = server.id, error = %e, "server produced an invalid URL"),
        }

        if server.id != first.id {
            match first.build(target) {
                Ok(url) => return url,
                Err(e) => warn!(server = first.id, error = %e, "fallback server produced an invalid URL"),
            }
        }

        first.raw(target)
    }
}

/// Resolve against the built-in catalog
pub fn resolve(server_id: &str, target: &StreamTarget<'_>) -> String {
    DEFAULT_CATALOG.resolve(server_id, target)
}

// =============================================================================
// Built-in servers
// =============================================================================

const DEFAULT_SERVERS: [ServerDescriptor; 8] = [
    ServerDescriptor::new("server1", "2Embed", "HD", "Minimal", two_embed),
    ServerDescriptor::new("server2", "VidSrc", "HD+", "Few", vidsrc),
    ServerDescriptor::new("server3", "SuperStream", "Full HD", "Minimal", superstream),
    ServerDescriptor::new("server4", "SmashyStream", "HD", "Minimal", smashystream),
    ServerDescriptor::new("server5", "VidLink", "HD", "Few", vidlink),
    ServerDescriptor::new("server6", "Dopebox", "HD", "Minimal", dopebox),
    ServerDescriptor::new("server7", "CineZone", "Full HD", "Few", cinezone),
    ServerDescriptor::new("server8", "EmbedSu", "Full HD", "None", embed_su),
];

fn two_embed(t: &StreamTarget<'_>) -> String {
    match t.media_type {
        MediaType::Tv => format!("https://www.2embed.cc/embedtv/{}/{}/{}", t.id, t.season, t.episode),
        MediaType::Movie => format!("https://www.2embed.cc/embed/movie/{}", t.id),
    }
}

fn vidsrc(t: &StreamTarget<'_>) -> String {
    match t.media_type {
        MediaType::Tv => format!(
            "https://vidsrc.me/embed/tv?tmdb={}&season={}&episode={}",
            t.id, t.season, t.episode
        ),
        MediaType::Movie => format!("https://vidsrc.me/embed/movie/{}", t.id),
    }
}

fn superstream(t: &StreamTarget<'_>) -> String {
    match t.media_type {
        MediaType::Tv => format!(
            "https://multiembed.mov/embed/series?tmdb={}&season={}&episode={}",
            t.id, t.season, t.episode
        ),
        MediaType::Movie => format!("https://multiembed.mov/directstream.php?video_id={}&tmdb=1", t.id),
    }
}

fn smashystream(t: &StreamTarget<'_>) -> String {
    match t.media_type {
        MediaType::Tv => format!("https://player.smashy.stream/tv/{}/{}-{}", t.id, t.season, t.episode),
        MediaType::Movie => format!("https://player.smashy.stream/movie/{}", t.id),
    }
}

fn vidlink(t: &StreamTarget<'_>) -> String {
    match t.media_type {
        MediaType::Tv => format!("https://vidlink.pro/tv/{}/{}-{}", t.id, t.season, t.episode),
        MediaType::Movie => format!("https://vidlink.pro/movie/{}", t.id),
    }
}

fn dopebox(t: &StreamTarget<'_>) -> String {
    match t.media_type {
        MediaType::Tv => format!("https://dopebox.to/embed/tv/{}/{}-{}", t.id, t.season, t.episode),
        MediaType::Movie => format!("https://dopebox.to/embed/movie/{}", t.id),
    }
}

fn cinezone(t: &StreamTarget<'_>) -> String {
    match t.media_type {
        MediaType::Tv => format!("https://cinezone.to/embed/tv/{}/{}/{}", t.id, t.season, t.episode),
        MediaType::Movie => format!("https://cinezone.to/embed/movie/{}", t.id),
    }
}

fn embed_su(t: &StreamTarget<'_>) -> String {
    match t.media_type {
        MediaType::Tv => format!("https://embed.su/embed/tv/{}/{}/{}", t.id, t.season, t.episode),
        MediaType::Movie => format!("https://embed.su/embed/movie/{}", t.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken(_: &StreamTarget<'_>) -> String {
        "not a url".to_string()
    }

    #[test]
    fn test_default_catalog_order() {
        let catalog = Catalog::shared();
        let ids: Vec<_> = catalog.servers().iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec!["server1", "server2", "server3", "server4", "server5", "server6", "server7", "server8"]
        );
        assert_eq!(catalog.first().id, DEFAULT_SERVER_ID);
    }

    #[test]
    fn test_movie_ignores_season_and_episode() {
        let a = StreamTarget { season: 3, episode: 9, ..StreamTarget::movie("550") };
        let b = StreamTarget::movie("550");
        assert_eq!(resolve("server2", &a), resolve("server2", &b));
        assert_eq!(resolve("server2", &b), "https://vidsrc.me/embed/movie/550");
    }

    #[test]
    fn test_series_urls() {
        let t = StreamTarget::episode("1399", 2, 5);
        assert_eq!(resolve("server1", &t), "https://www.2embed.cc/embedtv/1399/2/5");
        assert_eq!(resolve("server4", &t), "https://player.smashy.stream/tv/1399/2-5");
        assert_eq!(
            resolve("server3", &t),
            "https://multiembed.mov/embed/series?tmdb=1399&season=2&episode=5"
        );
    }

    #[test]
    fn test_unknown_server_falls_back_to_first() {
        let t = StreamTarget::movie("550");
        assert_eq!(resolve("nope", &t), resolve("server1", &t));
    }

    #[test]
    fn test_broken_rule_falls_back_to_first() {
        let catalog = Catalog::new(vec![
            ServerDescriptor::new("good", "Good", "HD", "None", two_embed),
            ServerDescriptor::new("bad", "Bad", "HD", "None", broken),
        ])
        .unwrap();
        let t = StreamTarget::movie("550");
        assert_eq!(catalog.resolve("bad", &t), "https://www.2embed.cc/embed/movie/550");
    }

    #[test]
    fn test_resolve_returns_rule_output_verbatim() {
        let catalog = Catalog::shared();
        let server = catalog.get("server1").copied().unwrap();
        let t = StreamTarget::movie("a b");
        assert_eq!(catalog.resolve("server1", &t), server.raw(&t));
        assert_eq!(catalog.resolve("server1", &t), "https://www.2embed.cc/embed/movie/a b");
    }

    #[test]
    fn test_broken_first_still_returns_something() {
        let catalog = Catalog::new(vec![ServerDescriptor::new("bad", "Bad", "HD", "None", broken)]).unwrap();
        assert_eq!(catalog.resolve("bad", &StreamTarget::movie("1")), "not a url");
    }

    #[test]
    fn test_catalog_validation() {
        assert_eq!(Catalog::new(vec![]).unwrap_err(), CatalogError::Empty);
        let dup = Catalog::new(vec![
            ServerDescriptor::new("a", "A", "HD", "None", two_embed),
            ServerDescriptor::new("a", "A2", "HD", "None", vidsrc),
        ]);
        assert_eq!(dup.unwrap_err(), CatalogError::DuplicateId("a"));
    }

    #[test]
    fn test_next_after_wraps() {
        let catalog = Catalog::shared();
        assert_eq!(catalog.next_after("server1").id, "server2");
        assert_eq!(catalog.next_after("server8").id, "server1");
        assert_eq!(catalog.next_after("unknown").id, "server1");
    }

    #[test]
    fn test_normalize_and_by_number() {
        let catalog = Catalog::shared();
        assert_eq!(catalog.normalize("server5"), "server5");
        assert_eq!(catalog.normalize("bogus"), "server1");
        assert_eq!(catalog.by_number(3).map(|s| s.id), Some("server3"));
        assert!(catalog.by_number(0).is_none());
        assert!(catalog.by_number(9).is_none());
    }
}
