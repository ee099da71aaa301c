use thiserror::Error;

use crate::model::ids::ChallengeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("challenge {0} is listed as completed more than once")]
    DuplicateCompletion(ChallengeId),
}

/// User-level totals: points earned and challenges completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProgress {
    total_points: u64,
    completed: Vec<ChallengeId>,
}

impl UserProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate ledger totals from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::DuplicateCompletion` if a challenge id repeats.
    pub fn from_persisted(
        total_points: u64,
        completed: Vec<ChallengeId>,
    ) -> Result<Self, LedgerError> {
        for (idx, id) in completed.iter().enumerate() {
            if completed[..idx].contains(id) {
                return Err(LedgerError::DuplicateCompletion(id.clone()));
            }
        }
        Ok(Self {
            total_points,
            completed,
        })
    }

    #[must_use]
    pub fn total_points(&self) -> u64 {
        self.total_points
    }

    /// Completed challenge ids in completion order.
    #[must_use]
    pub fn completed_challenges(&self) -> &[ChallengeId] {
        &self.completed
    }

    #[must_use]
    pub fn has_completed(&self, id: &ChallengeId) -> bool {
        self.completed.contains(id)
    }

    pub fn add_points(&mut self, amount: u32) {
        self.total_points = self.total_points.saturating_add(u64::from(amount));
    }

    /// Records a completion. Returns false if it was already recorded.
    pub fn mark_completed(&mut self, id: ChallengeId) -> bool {
        if self.has_completed(&id) {
            return false;
        }
        self.completed.push(id);
        true
    }

    pub fn reset(&mut self) {
        self.total_points = 0;
        self.completed.clear();
    }
}
