use std::sync::Arc;

use listen_core::model::default_catalog;
use storage::repository::{ChallengeRepository, Storage};
use tracing::info;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::feedback::FeedbackSink;
use crate::player::{AudioTransport, PlayerSession};
use crate::tracker::PlaybackProgressTracker;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    feedback: Arc<dyn FeedbackSink>,
    catalog: Arc<CatalogService>,
    seeded_on_launch: bool,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, seeding the default catalog
    /// into an empty database.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or catalog seeding fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, feedback).await
    }

    /// Build services over in-memory storage holding the default catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if catalog seeding fails.
    pub async fn in_memory(
        clock: Clock,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, feedback).await
    }

    /// # Errors
    ///
    /// Returns `AppServicesError` if catalog seeding fails.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Result<Self, AppServicesError> {
        let seeded_on_launch = ensure_default_catalog(storage.challenges.as_ref()).await?;
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&storage.challenges),
            Arc::clone(&storage.ledger),
        ));
        Ok(Self {
            clock,
            storage,
            feedback,
            catalog,
            seeded_on_launch,
        })
    }

    #[must_use]
    pub fn seeded_on_launch(&self) -> bool {
        self.seeded_on_launch
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn tracker(&self) -> PlaybackProgressTracker {
        PlaybackProgressTracker::new(
            self.clock,
            Arc::clone(&self.storage.challenges),
            Arc::clone(&self.storage.ledger),
            Arc::clone(&self.feedback),
        )
    }

    /// A fresh player session driving `transport`.
    #[must_use]
    pub fn player(&self, transport: Arc<dyn AudioTransport>) -> PlayerSession {
        PlayerSession::new(self.tracker(), transport, Arc::clone(&self.feedback))
    }
}

/// Insert the default challenges when the catalog is empty. Returns true if
/// anything was written.
async fn ensure_default_catalog(
    challenges: &dyn ChallengeRepository,
) -> Result<bool, AppServicesError> {
    if !challenges.list_challenges().await?.is_empty() {
        return Ok(false);
    }

    let defaults = default_catalog();
    for challenge in &defaults {
        challenges.upsert_challenge(challenge).await?;
    }
    info!(count = defaults.len(), "seeded default challenge catalog");
    Ok(true)
}
