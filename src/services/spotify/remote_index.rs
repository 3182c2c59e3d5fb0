use std::collections::{HashMap, HashSet};

use color_eyre::eyre::{Result, WrapErr};
use futures::{Stream, TryStreamExt};

use crate::ports::spotify::SpotifyClient;
use crate::spotify_rs::types::{PlaylistEntry, SpotifyTrack};

/// Field filter sent with every playlist page request.
pub const PLAYLIST_ITEM_FIELDS: &str = "items.track.id,items.track.name,items.track.artists,total";

/// A track in the target playlist, normalized from either raw item shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    /// `None` for local files, which can only be matched by title and artist.
    pub id: Option<String>,
    pub title: String,
    pub artists: Vec<String>,
    /// `"artist1, artist2 title"`
    pub display_label: String,
}

impl RemoteTrack {
    /// Returns `None` for wrapped items whose track is gone (unavailable tracks).
    pub fn from_entry(entry: PlaylistEntry) -> Option<Self> {
        match entry {
            PlaylistEntry::Bare(track) => Some(Self::from_track(track)),
            PlaylistEntry::Wrapped { track } => track.map(Self::from_track),
        }
    }

    pub fn from_track(track: SpotifyTrack) -> Self {
        let artists: Vec<String> = track.artists.into_iter().map(|a| a.name).collect();
        let display_label = format!("{} {}", artists.join(", "), track.name);
        Self {
            id: track.id,
            title: track.name,
            artists,
            display_label,
        }
    }

    /// Loose "same song" test: title substring plus exact artist, both case-insensitive.
    fn matches_approximately(&self, title: &str, artist: &str) -> bool {
        self.title.to_lowercase().contains(title)
            && self.artists.iter().any(|a| a.to_lowercase() == artist)
    }
}

/// Lazily fetch a playlist's raw items one page at a time.
///
/// The offset advances by the number of items received and the stream ends at
/// the first empty page, so an empty playlist costs exactly one request.
pub fn playlist_pages<'a, C: SpotifyClient>(
    client: &'a C,
    playlist_id: &'a str,
) -> impl Stream<Item = Result<Vec<PlaylistEntry>>> + 'a {
    async_stream::try_stream! {
        let additional_types = vec!["track".to_string()];
        let mut offset: u32 = 0;
        loop {
            let page = client
                .playlist_items(playlist_id, offset, PLAYLIST_ITEM_FIELDS, &additional_types)
                .await
                .wrap_err_with(|| format!("Failed to load playlist page at offset {}", offset))?;

            if page.items.is_empty() {
                break;
            }

            tracing::debug!(
                "Fetched {} playlist items at offset {} (total {})",
                page.items.len(),
                offset,
                page.total
            );
            offset += page.items.len() as u32;
            yield page.items;
        }
    }
}

/// In-memory snapshot of a playlist's contents, in remote order.
#[derive(Debug, Clone, Default)]
pub struct RemoteTrackIndex {
    tracks: Vec<RemoteTrack>,
}

impl RemoteTrackIndex {
    #[cfg(test)]
    pub fn new(tracks: Vec<RemoteTrack>) -> Self {
        Self { tracks }
    }

    /// Fetch every page of the playlist and build a fresh snapshot.
    pub async fn load<C: SpotifyClient>(client: &C, playlist_id: &str) -> Result<Self> {
        let pages: Vec<Vec<PlaylistEntry>> = playlist_pages(client, playlist_id)
            .try_collect()
            .await?;

        let mut tracks = Vec::new();
        let mut skipped = 0usize;
        for entry in pages.into_iter().flatten() {
            match RemoteTrack::from_entry(entry) {
                Some(track) => tracks.push(track),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!("Ignored {} playlist items without a track", skipped);
        }
        tracing::info!("Loaded {} tracks from playlist {}", tracks.len(), playlist_id);

        Ok(Self { tracks })
    }

    pub fn contains_approximate(&self, title: &str, artist: &str) -> bool {
        let title = title.to_lowercase();
        let artist = artist.to_lowercase();
        self.tracks
            .iter()
            .any(|track| track.matches_approximately(&title, &artist))
    }

    fn ids(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().filter_map(|track| track.id.as_deref())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids().any(|track_id| track_id == id)
    }

    /// Ids occurring more than once, each listed once, in order of first appearance.
    /// Local files have no id and are never reported.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for id in self.ids() {
            *counts.entry(id).or_default() += 1;
        }

        let mut seen = HashSet::new();
        self.ids()
            .filter(|id| counts[id] > 1 && seen.insert(*id))
            .map(str::to_string)
            .collect()
    }
}
