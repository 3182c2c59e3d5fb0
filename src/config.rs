use std::path::{Path, PathBuf};

use color_eyre::eyre::{OptionExt, Result, WrapErr};
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_REDIRECT_URI: &str = "https://localhost:8080";
const DEFAULT_LIBRARY_CSV: &str = "shazamlibrary.csv";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_library_csv")]
    library_csv: String,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    #[serde(default)]
    pub user_id: String,
    /// Playlist URL, `spotify:playlist:` URI or bare id
    #[serde(default)]
    pub playlist: String,
}

fn default_library_csv() -> String {
    DEFAULT_LIBRARY_CSV.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: None,
            redirect_uri: default_redirect_uri(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_csv: default_library_csv(),
            spotify: SpotifyConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write config as TOML, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).wrap_err("Failed to serialize config")?;
        std::fs::write(path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("shazam-playlist-sync").join("config.toml"))
    }

    /// Load config from the default path, falling back to defaults when the file is missing.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or_eyre("No config directory available")?;
        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::from_file(&config_path)
    }

    /// Create a default config file, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::config_path().ok_or_eyre("No config directory available")?;
        if config_path.exists() {
            tracing::info!("Config already exists at {}", config_path.display());
        } else {
            Self::default().save(&config_path)?;
        }
        Ok(config_path)
    }

    /// Store a refresh token handed back by a token refresh.
    ///
    /// Spotify rotates refresh tokens issued through PKCE, so the old one stops
    /// working once a new one is returned. Returns whether the stored token changed.
    pub fn rotate_refresh_token(&mut self, rotated: Option<String>) -> bool {
        match rotated {
            Some(token) if self.spotify.refresh_token.as_deref() != Some(token.as_str()) => {
                self.spotify.refresh_token = Some(token);
                true
            }
            _ => false,
        }
    }

    /// Get expanded path of the Shazam library export
    pub fn library_csv_path(&self) -> PathBuf {
        expand_path(&self.library_csv)
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("No Spotify user id configured")]
    MissingUserId,
    #[error("No playlist configured")]
    MissingPlaylist,
    #[error("Could not find a playlist id in `{0}`")]
    InvalidPlaylist(String),
}

/// The account and playlist a reconciliation pass works against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    user_id: String,
    playlist_id: String,
}

impl SyncSettings {
    /// Validate the identifiers once. `playlist` may be an open.spotify.com
    /// URL, a `spotify:playlist:` URI or a bare id.
    pub fn new(user_id: &str, playlist: &str) -> Result<Self, SettingsError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SettingsError::MissingUserId);
        }
        Ok(Self {
            user_id: user_id.to_string(),
            playlist_id: parse_playlist_id(playlist)?,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }
}

fn parse_playlist_id(playlist: &str) -> Result<String, SettingsError> {
    let playlist = playlist.trim();
    if playlist.is_empty() {
        return Err(SettingsError::MissingPlaylist);
    }
    let invalid = || SettingsError::InvalidPlaylist(playlist.to_string());

    let id = if let Some(id) = playlist.strip_prefix("spotify:playlist:") {
        id.to_string()
    } else if playlist.starts_with("http://") || playlist.starts_with("https://") {
        let url = Url::parse(playlist).map_err(|_| invalid())?;
        let mut segments = url.path_segments().ok_or_else(invalid)?.peekable();
        // Localized share links look like `/intl-de/playlist/<id>`.
        segments.next_if(|segment| segment.starts_with("intl-"));
        if segments.next() != Some("playlist") {
            return Err(invalid());
        }
        segments.next().ok_or_else(invalid)?.to_string()
    } else {
        playlist.to_string()
    };

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid());
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_settings_from_url() {
        let settings = SyncSettings::new(
            "someone",
            "https://open.spotify.com/playlist/6YYCPN91F4xI1Z17Hzn7ir?si=abc123",
        )
        .unwrap();
        assert_eq!(settings.user_id(), "someone");
        assert_eq!(settings.playlist_id(), "6YYCPN91F4xI1Z17Hzn7ir");
    }

    #[test]
    fn test_sync_settings_from_localized_url() {
        let settings = SyncSettings::new(
            "someone",
            "https://open.spotify.com/intl-de/playlist/6YYCPN91F4xI1Z17Hzn7ir?si=abc123",
        )
        .unwrap();
        assert_eq!(settings.playlist_id(), "6YYCPN91F4xI1Z17Hzn7ir");
        assert!(matches!(
            SyncSettings::new("u", "https://open.spotify.com/intl-de/track/abc"),
            Err(SettingsError::InvalidPlaylist(_))
        ));
    }

    #[test]
    fn test_sync_settings_from_uri_and_bare_id() {
        let from_uri = SyncSettings::new("u", "spotify:playlist:6YYCPN91F4xI1Z17Hzn7ir").unwrap();
        let bare = SyncSettings::new("u", " 6YYCPN91F4xI1Z17Hzn7ir ").unwrap();
        assert_eq!(from_uri, bare);
    }

    #[test]
    fn test_sync_settings_rejects_bad_input() {
        assert_eq!(
            SyncSettings::new("", "abc"),
            Err(SettingsError::MissingUserId)
        );
        assert_eq!(
            SyncSettings::new("u", "  "),
            Err(SettingsError::MissingPlaylist)
        );
        assert!(matches!(
            SyncSettings::new("u", "https://open.spotify.com/track/abc"),
            Err(SettingsError::InvalidPlaylist(_))
        ));
        assert!(matches!(
            SyncSettings::new("u", "not a playlist"),
            Err(SettingsError::InvalidPlaylist(_))
        ));
    }

    #[test]
    fn test_config_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.spotify.client_id = "client".into();
        config.spotify.refresh_token = Some("refresh".into());
        config.sync.user_id = "someone".into();
        config.sync.playlist = "spotify:playlist:abc".into();
        config.save(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_rotate_refresh_token_persists_new_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.spotify.refresh_token = Some("first".into());
        config.save(&path).unwrap();

        let mut loaded = Config::from_file(&path).unwrap();
        assert!(loaded.rotate_refresh_token(Some("second".into())));
        loaded.save(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.spotify.refresh_token.as_deref(), Some("second"));
    }

    #[test]
    fn test_rotate_refresh_token_without_new_token() {
        let mut config = Config::default();
        config.spotify.refresh_token = Some("same".into());

        assert!(!config.rotate_refresh_token(None));
        assert!(!config.rotate_refresh_token(Some("same".into())));
        assert_eq!(config.spotify.refresh_token.as_deref(), Some("same"));

        let mut empty = Config::default();
        assert!(empty.rotate_refresh_token(Some("fresh".into())));
        assert_eq!(empty.spotify.refresh_token.as_deref(), Some("fresh"));
    }

    #[test]
    fn test_config_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\nuser_id = \"someone\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.sync.user_id, "someone");
        assert_eq!(config.spotify.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.library_csv_path(), PathBuf::from(DEFAULT_LIBRARY_CSV));
        assert!(config.spotify.refresh_token.is_none());
    }

    #[test]
    fn test_config_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "library_csv = [").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/tmp/lib.csv"), PathBuf::from("/tmp/lib.csv"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/lib.csv"), home.join("lib.csv"));
        }
    }
}
