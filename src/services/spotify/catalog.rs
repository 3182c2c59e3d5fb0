use color_eyre::eyre::{Result, WrapErr};

use crate::ports::spotify::SpotifyClient;
use crate::services::spotify::remote_index::RemoteTrack;

/// Resolves free-text search terms to catalog track ids.
///
/// The top hit is taken as-is; ranking is left entirely to the service.
pub struct CatalogResolver<'a, C: SpotifyClient> {
    client: &'a C,
}

impl<'a, C: SpotifyClient> CatalogResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Returns the id of the first search result, or `None` if nothing matched.
    pub async fn resolve(&self, term: &str) -> Result<Option<String>> {
        let results = self
            .client
            .search_tracks(term)
            .await
            .wrap_err_with(|| format!("Failed to search for \"{}\"", term))?;

        let Some(first) = results.items.into_iter().next() else {
            tracing::info!("Searching for: {} -> not found", term);
            return Ok(None);
        };

        let track = RemoteTrack::from_track(first);
        if track.id.is_none() {
            tracing::warn!("Searching for: {} -> top result has no track id", term);
            return Ok(None);
        }
        tracing::info!(
            "Searching for: {} -> got {} result(s), {}",
            term,
            results.total,
            track.display_label
        );
        Ok(track.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::spotify::MockSpotifyClient;
    use crate::spotify_rs::types::{SearchTracksPage, SpotifyArtist, SpotifyTrack};

    fn search_hit(id: &str, title: &str, artist: &str) -> SpotifyTrack {
        SpotifyTrack {
            id: Some(id.into()),
            name: title.into(),
            artists: vec![SpotifyArtist {
                name: artist.into(),
            }],
        }
    }

    #[tokio::test]
    async fn test_resolve_takes_first_result() {
        let mut client = MockSpotifyClient::new();
        client
            .expect_search_tracks()
            .times(1)
            .withf(|term| term == "ArtistB Title2")
            .returning(|_| {
                Ok(SearchTracksPage {
                    total: 42,
                    items: vec![
                        search_hit("Z", "Title2", "ArtistB"),
                        search_hit("Y", "Title2 (Live)", "ArtistB"),
                    ],
                })
            });

        let resolver = CatalogResolver::new(&client);
        let id = resolver.resolve("ArtistB Title2").await.unwrap();

        assert_eq!(id.as_deref(), Some("Z"));
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let mut client = MockSpotifyClient::new();
        client
            .expect_search_tracks()
            .times(1)
            .returning(|_| Ok(SearchTracksPage::default()));

        let resolver = CatalogResolver::new(&client);
        assert_eq!(resolver.resolve("nothing here").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_propagates_failure() {
        let mut client = MockSpotifyClient::new();
        client
            .expect_search_tracks()
            .returning(|_| Err(color_eyre::eyre::eyre!("401 Unauthorized")));

        let resolver = CatalogResolver::new(&client);
        let err = resolver.resolve("Song").await.unwrap_err();
        assert!(err.to_string().contains("Failed to search"));
    }
}
