use color_eyre::eyre::Result;

use crate::spotify_rs::types::{PlaylistItemsPage, SearchTracksPage};

/// Port trait wrapping the Spotify API capabilities used by the reconciler.
///
/// Implementations live in `services::spotify::client` (production) or test mocks.
/// Authentication happens before a client is handed to business logic.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyClient: Send + Sync {
    /// The id of the account the access token belongs to.
    async fn current_user_id(&self) -> Result<String>;

    /// One page of playlist items starting at `offset`.
    async fn playlist_items(
        &self,
        playlist_id: &str,
        offset: u32,
        fields: &str,
        additional_types: &[String],
    ) -> Result<PlaylistItemsPage>;

    /// Free-text track search, results in the service's relevance order.
    async fn search_tracks(&self, term: &str) -> Result<SearchTracksPage>;

    /// Append tracks to a playlist. At most 100 ids per call.
    async fn add_items_to_playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
        ids: &[String],
    ) -> Result<()>;

    /// Remove every occurrence of the given tracks from a playlist.
    async fn remove_all_occurrences(&self, playlist_id: &str, ids: &[String]) -> Result<()>;
}
