use std::collections::HashSet;

use color_eyre::eyre::{Result, WrapErr};

use crate::config::SyncSettings;
use crate::library::{SourceLibrary, SourceRecord};
use crate::ports::spotify::SpotifyClient;
use crate::services::spotify::batch::BatchMutator;
use crate::services::spotify::catalog::CatalogResolver;
use crate::services::spotify::remote_index::RemoteTrackIndex;

/// What a reconciliation pass decided for one source record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// An approximate title/artist match is already in the playlist.
    SkippedExists,
    /// The search hit is already in the playlist under a different title.
    SkippedById { id: String },
    /// The catalog search returned nothing.
    NotFound,
    /// The search hit will be appended to the playlist.
    WillAdd { id: String },
}

/// Track ids queued for addition. Each id is kept once, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAdditions {
    ids: Vec<String>,
    seen: HashSet<String>,
}

impl PendingAdditions {
    pub fn insert(&mut self, id: String) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Classification of every source record against one playlist snapshot.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub outcomes: Vec<(SourceRecord, TrackOutcome)>,
    pub pending: PendingAdditions,
}

impl ReconcilePlan {
    fn search_terms_where(&self, pred: impl Fn(&TrackOutcome) -> bool) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(record, _)| record.search_term())
            .collect()
    }

    /// Search terms of records that were already in the playlist, by either check.
    pub fn skipped(&self) -> Vec<String> {
        self.search_terms_where(|outcome| {
            matches!(
                outcome,
                TrackOutcome::SkippedExists | TrackOutcome::SkippedById { .. }
            )
        })
    }

    pub fn not_found(&self) -> Vec<String> {
        self.search_terms_where(|outcome| matches!(outcome, TrackOutcome::NotFound))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub plan: ReconcilePlan,
    /// Number of ids sent to the playlist by the addition phase.
    pub added: usize,
    /// Number of duplicated ids that were collapsed to a single copy.
    pub duplicates_corrected: usize,
}

/// Brings a playlist in line with a source library: every record present once.
pub struct PlaylistReconciler<C: SpotifyClient> {
    client: C,
    settings: SyncSettings,
}

impl<C: SpotifyClient> PlaylistReconciler<C> {
    pub fn new(client: C, settings: SyncSettings) -> Self {
        Self { client, settings }
    }

    fn mutator(&self) -> BatchMutator<'_, C> {
        BatchMutator::new(
            &self.client,
            self.settings.user_id(),
            self.settings.playlist_id(),
        )
    }

    /// Warn when the token belongs to a different account than the configured one.
    pub async fn check_account(&self) -> Result<bool> {
        let current = self
            .client
            .current_user_id()
            .await
            .wrap_err("Failed to fetch current user")?;
        let matches = current == self.settings.user_id();
        if !matches {
            tracing::warn!(
                "Authenticated as {} but configured user is {}",
                current,
                self.settings.user_id()
            );
        }
        Ok(matches)
    }

    /// Classify every record against the current playlist without mutating it.
    pub async fn plan(&self, library: &SourceLibrary) -> Result<ReconcilePlan> {
        let index = RemoteTrackIndex::load(&self.client, self.settings.playlist_id()).await?;
        self.classify(library, &index).await
    }

    async fn classify(
        &self,
        library: &SourceLibrary,
        index: &RemoteTrackIndex,
    ) -> Result<ReconcilePlan> {
        let resolver = CatalogResolver::new(&self.client);
        let mut plan = ReconcilePlan::default();

        for record in library.records() {
            let outcome = if index.contains_approximate(record.title(), record.artist()) {
                TrackOutcome::SkippedExists
            } else {
                match resolver.resolve(&record.search_term()).await? {
                    None => TrackOutcome::NotFound,
                    Some(id) if index.contains_id(&id) => TrackOutcome::SkippedById { id },
                    Some(id) => {
                        plan.pending.insert(id.clone());
                        TrackOutcome::WillAdd { id }
                    }
                }
            };
            plan.outcomes.push((record.clone(), outcome));
        }

        tracing::info!(
            "Classified {} records, {} tracks to add",
            plan.outcomes.len(),
            plan.pending.len()
        );
        Ok(plan)
    }

    /// Run a full pass: classify, add what's missing, then collapse duplicates.
    pub async fn run(&self, library: &SourceLibrary) -> Result<ReconcileReport> {
        let plan = self.plan(library).await?;

        if !plan.pending.is_empty() {
            self.mutator().add_tracks(plan.pending.ids()).await?;
        }
        let added = plan.pending.len();

        let duplicates_corrected = self.normalize_duplicates().await?;

        Ok(ReconcileReport {
            plan,
            added,
            duplicates_corrected,
        })
    }

    /// Reload the playlist and leave exactly one copy of every duplicated track.
    ///
    /// Runs on every pass since duplicates can predate this run.
    pub async fn normalize_duplicates(&self) -> Result<usize> {
        tracing::info!("Removing duplicates...");
        let index = RemoteTrackIndex::load(&self.client, self.settings.playlist_id())
            .await
            .wrap_err("Failed to reload playlist for duplicate scan")?;
        let duplicates = index.duplicate_ids();
        tracing::info!("{} duplicate item(s) found", duplicates.len());

        if duplicates.is_empty() {
            return Ok(0);
        }

        let mutator = self.mutator();
        mutator.remove_all_occurrences(&duplicates).await?;
        mutator.add_tracks(&duplicates).await?;

        Ok(duplicates.len())
    }
}
