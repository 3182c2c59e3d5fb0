use color_eyre::eyre::Result;

use crate::ports::spotify::SpotifyClient;
use crate::spotify_rs::auth::refresh_access_token;
use crate::spotify_rs::client::SpotifyApi;
use crate::spotify_rs::types::{PlaylistItemsPage, SearchTracksPage};

#[derive(Debug, Clone)]
pub struct SpotifyApiCredentials {
    client_id: String,
    client_secret: String,
}

impl SpotifyApiCredentials {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

/// Production `SpotifyClient` backed by the Web API over HTTP.
pub struct SpotifyHttpAdapter {
    api: SpotifyApi,
}

impl SpotifyHttpAdapter {
    pub fn new(access_token: String) -> Self {
        Self {
            api: SpotifyApi::new(access_token),
        }
    }

    /// Trade a stored refresh token for a fresh access token and build an adapter with it.
    ///
    /// Also returns the replacement refresh token when Spotify rotated it.
    pub async fn from_refresh_token(
        credentials: &SpotifyApiCredentials,
        refresh_token: &str,
    ) -> Result<(Self, Option<String>)> {
        let token = refresh_access_token(
            credentials.client_id(),
            credentials.client_secret(),
            refresh_token,
        )
        .await?;
        tracing::debug!(
            "Obtained access token, expires in {}s (scope: {})",
            token.expires_in,
            token.scope
        );
        Ok((Self::new(token.access_token), token.refresh_token))
    }
}

#[async_trait::async_trait]
impl SpotifyClient for SpotifyHttpAdapter {
    async fn current_user_id(&self) -> Result<String> {
        Ok(self.api.get_current_user().await?.id)
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        offset: u32,
        fields: &str,
        additional_types: &[String],
    ) -> Result<PlaylistItemsPage> {
        self.api
            .get_playlist_items(playlist_id, offset, fields, additional_types)
            .await
    }

    async fn search_tracks(&self, term: &str) -> Result<SearchTracksPage> {
        self.api.search_tracks(term).await
    }

    async fn add_items_to_playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
        ids: &[String],
    ) -> Result<()> {
        // The playlist endpoint is scoped by the token, the user id only labels the call.
        tracing::debug!(user_id, playlist_id, count = ids.len(), "Adding playlist items");
        self.api.add_items(playlist_id, ids).await
    }

    async fn remove_all_occurrences(&self, playlist_id: &str, ids: &[String]) -> Result<()> {
        tracing::debug!(playlist_id, count = ids.len(), "Removing playlist items");
        self.api.remove_items(playlist_id, ids).await
    }
}
