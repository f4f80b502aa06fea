//! Playback surface - hands resolved URLs to something that can show them
//!
//! Embed pages open in the system browser by default; mpv is available for
//! anything it can play directly (trailers, mostly).

use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;
use url::Url;

/// Supported playback surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerType {
    /// System web browser (default)
    #[default]
    Browser,
    /// mpv media player
    Mpv,
}

impl PlayerType {
    /// Get a display name for this player
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Browser => "browser",
            PlayerType::Mpv => "mpv",
        }
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for PlayerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "browser" | "web" => Ok(PlayerType::Browser),
            "mpv" => Ok(PlayerType::Mpv),
            other => Err(format!("unknown player '{}'", other)),
        }
    }
}

/// Errors from opening a playback URL
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Refusing to open '{0}': not an http(s) URL")]
    InvalidUrl(String),
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
}

/// Only absolute http(s) URLs are handed to a player
pub fn validate_url(url: &str) -> Result<Url, PlayerError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(parsed),
        _ => Err(PlayerError::InvalidUrl(url.to_string())),
    }
}

/// Opens stream and trailer URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPlayer {
    player_type: PlayerType,
}

impl LocalPlayer {
    pub fn new(player_type: PlayerType) -> Self {
        Self { player_type }
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    /// Open `url` without waiting for the player to exit
    pub async fn open(&self, url: &str) -> Result<(), PlayerError> {
        let url = validate_url(url)?;
        info!(player = %self.player_type, url = %url, "opening playback url");

        match self.player_type {
            PlayerType::Browser => webbrowser::open(url.as_str())?,
            PlayerType::Mpv => {
                Command::new("mpv")
                    .arg(url.as_str())
                    .arg("--force-window=immediate")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| {
                        if e.kind() == std::io::ErrorKind::NotFound {
                            PlayerError::NotFound("mpv".to_string())
                        } else {
                            PlayerError::StartFailed(e)
                        }
                    })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_type_parse_and_display() {
        assert_eq!("mpv".parse::<PlayerType>(), Ok(PlayerType::Mpv));
        assert_eq!("Browser".parse::<PlayerType>(), Ok(PlayerType::Browser));
        assert!("vlc".parse::<PlayerType>().is_err());
        assert_eq!(PlayerType::default().to_string(), "browser");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://vidsrc.me/embed/movie/550").is_ok());
        assert!(matches!(validate_url("not a url"), Err(PlayerError::InvalidUrl(_))));
        assert!(matches!(validate_url("file:///etc/passwd"), Err(PlayerError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_open_rejects_bad_url_before_launching() {
        let player = LocalPlayer::default();
        assert!(player.open("javascript:alert(1)").await.is_err());
    }
}
