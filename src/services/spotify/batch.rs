use color_eyre::eyre::{Result, WrapErr};

use crate::ports::spotify::SpotifyClient;

/// Per-call ceiling of the playlist mutation endpoints.
pub const MAX_ITEMS_PER_REQUEST: usize = 100;

/// Applies playlist mutations in request-sized batches.
///
/// Chunks are not atomic as a group: when a later chunk fails, the earlier
/// ones stay applied.
pub struct BatchMutator<'a, C: SpotifyClient> {
    client: &'a C,
    user_id: &'a str,
    playlist_id: &'a str,
}

impl<'a, C: SpotifyClient> BatchMutator<'a, C> {
    pub fn new(client: &'a C, user_id: &'a str, playlist_id: &'a str) -> Self {
        Self {
            client,
            user_id,
            playlist_id,
        }
    }

    /// Append tracks in chunks of at most [`MAX_ITEMS_PER_REQUEST`], in order.
    pub async fn add_tracks(&self, ids: &[String]) -> Result<()> {
        for (n, chunk) in ids.chunks(MAX_ITEMS_PER_REQUEST).enumerate() {
            tracing::debug!("Adding chunk {} with {} tracks", n + 1, chunk.len());
            self.client
                .add_items_to_playlist(self.user_id, self.playlist_id, chunk)
                .await
                .wrap_err_with(|| {
                    format!(
                        "Failed to add chunk {} ({} tracks) to playlist {}",
                        n + 1,
                        chunk.len(),
                        self.playlist_id
                    )
                })?;
        }
        tracing::info!("Added {} tracks", ids.len());
        Ok(())
    }

    /// Strip every occurrence of the given tracks in a single call.
    pub async fn remove_all_occurrences(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.client
            .remove_all_occurrences(self.playlist_id, ids)
            .await
            .wrap_err_with(|| {
                format!(
                    "Failed to remove {} tracks from playlist {}",
                    ids.len(),
                    self.playlist_id
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::spotify::MockSpotifyClient;
    use std::sync::{Arc, Mutex};

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("track{:03}", i)).collect()
    }

    fn recording_client(calls: Arc<Mutex<Vec<Vec<String>>>>) -> MockSpotifyClient {
        let mut client = MockSpotifyClient::new();
        client
            .expect_add_items_to_playlist()
            .withf(|user_id, playlist_id, _| user_id == "user" && playlist_id == "pl")
            .returning(move |_, _, ids| {
                calls.lock().unwrap().push(ids.to_vec());
                Ok(())
            });
        client
    }

    #[tokio::test]
    async fn test_add_tracks_chunks_by_hundred() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let client = recording_client(calls.clone());
        let input = ids(250);

        BatchMutator::new(&client, "user", "pl")
            .add_tracks(&input)
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        let sizes: Vec<usize> = calls.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(calls.concat(), input);
    }

    #[tokio::test]
    async fn test_add_tracks_empty_issues_no_call() {
        let mut client = MockSpotifyClient::new();
        client.expect_add_items_to_playlist().never();

        BatchMutator::new(&client, "user", "pl")
            .add_tracks(&[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_tracks_keeps_earlier_chunks_on_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let mut client = MockSpotifyClient::new();
        client
            .expect_add_items_to_playlist()
            .times(2)
            .returning(move |_, _, ids| {
                let mut calls = recorded.lock().unwrap();
                if !calls.is_empty() {
                    return Err(color_eyre::eyre::eyre!("500 Internal Server Error"));
                }
                calls.push(ids.to_vec());
                Ok(())
            });

        let err = BatchMutator::new(&client, "user", "pl")
            .add_tracks(&ids(150))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("chunk 2"));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_all_occurrences_single_call() {
        let mut client = MockSpotifyClient::new();
        client
            .expect_remove_all_occurrences()
            .times(1)
            .withf(|playlist_id, ids| playlist_id == "pl" && ids.len() == 2)
            .returning(|_, _| Ok(()));

        BatchMutator::new(&client, "user", "pl")
            .remove_all_occurrences(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
    }
}
