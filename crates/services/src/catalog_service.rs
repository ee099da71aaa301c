use std::sync::Arc;

use listen_core::model::{Challenge, ChallengeId, UserProgress};
use storage::repository::{ChallengeRepository, LedgerRepository};

use crate::error::CatalogServiceError;

/// Home-screen totals for the challenge catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogSummary {
    pub total: usize,
    pub completed: usize,
    /// Sum of points over every challenge.
    pub available_points: u64,
    /// Sum of points over completed challenges.
    pub earned_points: u64,
    /// Running total held by the points ledger.
    pub ledger_points: u64,
}

/// Read-side access to challenges and the points ledger.
#[derive(Clone)]
pub struct CatalogService {
    challenges: Arc<dyn ChallengeRepository>,
    ledger: Arc<dyn LedgerRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(challenges: Arc<dyn ChallengeRepository>, ledger: Arc<dyn LedgerRepository>) -> Self {
        Self { challenges, ledger }
    }

    /// All challenges in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<Challenge>, CatalogServiceError> {
        let challenges = self.challenges.list_challenges().await?;
        Ok(challenges)
    }

    /// Fetch a challenge by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::UnknownChallenge` if no challenge has this id.
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get(&self, id: &ChallengeId) -> Result<Challenge, CatalogServiceError> {
        self.challenges
            .get_challenge(id)
            .await?
            .ok_or_else(|| CatalogServiceError::UnknownChallenge(id.clone()))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the ledger cannot be read.
    pub async fn user_progress(&self) -> Result<UserProgress, CatalogServiceError> {
        let progress = self.ledger.get_progress().await?;
        Ok(progress)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn summary(&self) -> Result<CatalogSummary, CatalogServiceError> {
        let challenges = self.challenges.list_challenges().await?;
        let progress = self.ledger.get_progress().await?;

        let summary = challenges.iter().fold(
            CatalogSummary {
                total: challenges.len(),
                ledger_points: progress.total_points(),
                ..CatalogSummary::default()
            },
            |mut acc, challenge| {
                let points = u64::from(challenge.points());
                acc.available_points += points;
                if challenge.is_completed() {
                    acc.completed += 1;
                    acc.earned_points += points;
                }
                acc
            },
        );
        Ok(summary)
    }
}
