//! Watchlist persistence
//!
//! The playback session only ever reads a [`WatchlistSnapshot`]. Adding and
//! removing entries is the host's job, through a [`WatchlistStore`].

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::WatchlistEntry;

#[derive(Error, Debug)]
pub enum WatchlistError {
    #[error("Watchlist I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watchlist file is corrupt: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Keyed collection of saved items, one list per user
pub trait WatchlistStore {
    /// Entries for `user`, newest first
    fn list(&self, user: &str) -> Result<Vec<WatchlistEntry>, WatchlistError>;

    /// Insert or update on `(user, media_id)`; an update keeps `added_at`
    fn add(&self, user: &str, entry: WatchlistEntry) -> Result<(), WatchlistError>;

    /// Returns whether anything was removed
    fn remove(&self, user: &str, media_id: &str) -> Result<bool, WatchlistError>;

    fn snapshot(&self, user: &str) -> Result<WatchlistSnapshot, WatchlistError> {
        Ok(WatchlistSnapshot::from_entries(&self.list(user)?))
    }
}

/// Read-only set of saved media ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchlistSnapshot {
    ids: HashSet<String>,
}

impl WatchlistSnapshot {
    pub fn from_entries(entries: &[WatchlistEntry]) -> Self {
        Self {
            ids: entries.iter().map(|e| e.media_id.clone()).collect(),
        }
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, media_id: &str) -> bool {
        self.ids.contains(media_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

type Lists = BTreeMap<String, Vec<WatchlistEntry>>;

/// Watchlist kept in a single pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonWatchlist {
    path: PathBuf,
}

impl JsonWatchlist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Lists, WatchlistError> {
        if !self.path.exists() {
            return Ok(Lists::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Lists::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, lists: &Lists) -> Result<(), WatchlistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(lists)?)?;
        debug!(path = %self.path.display(), "watchlist saved");
        Ok(())
    }
}

impl WatchlistStore for JsonWatchlist {
    fn list(&self, user: &str) -> Result<Vec<WatchlistEntry>, WatchlistError> {
        let mut entries = self.read()?.remove(user).unwrap_or_default();
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(entries)
    }

    fn add(&self, user: &str, entry: WatchlistEntry) -> Result<(), WatchlistError> {
        let mut lists = self.read()?;
        let entries = lists.entry(user.to_string()).or_default();

        match entries.iter_mut().find(|e| e.media_id == entry.media_id) {
            Some(existing) => {
                let added_at = existing.added_at;
                *existing = WatchlistEntry { added_at, ..entry };
            }
            None => {
                info!(user, media_id = %entry.media_id, title = %entry.title, "added to watchlist");
                entries.push(entry);
            }
        }
        self.write(&lists)
    }

    fn remove(&self, user: &str, media_id: &str) -> Result<bool, WatchlistError> {
        let mut lists = self.read()?;
        let Some(entries) = lists.get_mut(user) else {
            return Ok(false);
        };

        let before = entries.len();
        entries.retain(|e| e.media_id != media_id);
        let removed = entries.len() != before;
        if removed {
            info!(user, media_id, "removed from watchlist");
            self.write(&lists)?;
        }
        Ok(removed)
    }
}
