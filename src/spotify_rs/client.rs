use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde::Serialize;

use crate::spotify_rs::types::{
    PlaylistItemsPage, SearchResponse, SearchTracksPage, SpotifyUser,
};

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Largest page the playlist items endpoint returns.
const PLAYLIST_PAGE_LIMIT: u32 = 100;

/// Number of results requested from the search endpoint.
const SEARCH_LIMIT: u32 = 10;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the `spotify:track:` URI the mutation endpoints expect.
pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

#[derive(Serialize)]
struct AddItemsBody {
    uris: Vec<String>,
}

#[derive(Serialize)]
struct TrackUri {
    uri: String,
}

#[derive(Serialize)]
struct RemoveItemsBody {
    tracks: Vec<TrackUri>,
}

/// Spotify Web API client
pub struct SpotifyApi {
    access_token: String,
    client: reqwest::Client,
}

impl SpotifyApi {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            client: reqwest::Client::new(),
        }
    }

    /// Get the current user's profile
    pub async fn get_current_user(&self) -> Result<SpotifyUser> {
        let response = self
            .client
            .get(format!("{}/me", SPOTIFY_API_URL))
            .bearer_auth(&self.access_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let user: SpotifyUser = response.json().await?;
        Ok(user)
    }

    /// Get one page of a playlist's items.
    ///
    /// `fields` is passed through as the API's field filter, so the returned
    /// items only carry what the caller asked for.
    pub async fn get_playlist_items(
        &self,
        playlist_id: &str,
        offset: u32,
        fields: &str,
        additional_types: &[String],
    ) -> Result<PlaylistItemsPage> {
        let response = self
            .client
            .get(format!("{}/playlists/{}/tracks", SPOTIFY_API_URL, playlist_id))
            .bearer_auth(&self.access_token)
            .query(&[
                ("offset", offset.to_string()),
                ("limit", PLAYLIST_PAGE_LIMIT.to_string()),
                ("fields", fields.to_string()),
                ("additional_types", additional_types.join(",")),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<PlaylistItemsPage>()
            .await
            .wrap_err("Failed to deserialize playlist items page")
    }

    /// Search the catalog for tracks.
    pub async fn search_tracks(&self, term: &str) -> Result<SearchTracksPage> {
        let response = self
            .client
            .get(format!("{}/search", SPOTIFY_API_URL))
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", term.to_string()),
                ("type", "track".to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let results: SearchResponse = response
            .json()
            .await
            .wrap_err("Failed to deserialize search results")?;
        Ok(results.tracks)
    }

    /// Append tracks to the end of a playlist.
    pub async fn add_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let body = AddItemsBody {
            uris: track_ids.iter().map(|id| track_uri(id)).collect(),
        };

        self.client
            .post(format!("{}/playlists/{}/tracks", SPOTIFY_API_URL, playlist_id))
            .bearer_auth(&self.access_token)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Remove all occurrences of the given tracks from a playlist.
    pub async fn remove_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let body = RemoveItemsBody {
            tracks: track_ids
                .iter()
                .map(|id| TrackUri { uri: track_uri(id) })
                .collect(),
        };

        self.client
            .delete(format!("{}/playlists/{}/tracks", SPOTIFY_API_URL, playlist_id))
            .bearer_auth(&self.access_token)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_uri() {
        assert_eq!(track_uri("4uLU6hMCjMI75M1A2tKUQC"), "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn test_remove_body_shape() {
        let body = RemoveItemsBody {
            tracks: vec![TrackUri {
                uri: track_uri("a"),
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "tracks": [{ "uri": "spotify:track:a" }] })
        );
    }
}
