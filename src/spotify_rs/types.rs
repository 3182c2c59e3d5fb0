use serde::{Deserialize, Serialize};

/// Spotify OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

/// Spotify user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpotifyArtist {
    pub name: String,
}

/// Spotify track as returned by the playlist and search endpoints.
///
/// `id` is null for local files added to a playlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    pub artists: Vec<SpotifyArtist>,
}

/// A raw playlist item.
///
/// The playlist endpoint wraps the track under `track` (which may be null for
/// unavailable items), while search results and some fixtures carry the track
/// object directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PlaylistEntry {
    Bare(SpotifyTrack),
    Wrapped { track: Option<SpotifyTrack> },
}

/// One page of `GET /playlists/{id}/tracks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistItemsPage {
    #[serde(default)]
    pub items: Vec<PlaylistEntry>,
    #[serde(default)]
    pub total: u32,
}

/// Envelope of `GET /search?type=track`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: SearchTracksPage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchTracksPage {
    pub total: u32,
    #[serde(default)]
    pub items: Vec<SpotifyTrack>,
}

/// PKCE OAuth session data
#[derive(Debug, Clone)]
pub struct OAuthSession {
    pub code_verifier: String,
    pub state: String,
}

/// Response for authentication initiation
#[derive(Debug, Clone)]
pub struct SpotifyAuthResponse {
    pub auth_url: String,
}
