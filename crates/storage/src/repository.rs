use async_trait::async_trait;
use listen_core::model::{Challenge, ChallengeId, UserProgress};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid stored record: {0}")]
    Domain(#[from] listen_core::Error),
}

/// Challenge catalog contract.
///
/// Writes are whole-record replacements: callers read a challenge, derive the
/// new value, and hand it back.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// All challenges in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_challenges(&self) -> Result<Vec<Challenge>, StorageError>;

    /// Fetch a challenge by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures; a missing id is `Ok(None)`.
    async fn get_challenge(&self, id: &ChallengeId) -> Result<Option<Challenge>, StorageError>;

    /// Insert a challenge or overwrite the stored one with the same id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the challenge cannot be stored.
    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError>;

    /// Replace an existing challenge in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no challenge has this id.
    async fn replace_challenge(&self, challenge: &Challenge) -> Result<(), StorageError>;

    /// Clear progress, completion and timestamps on every challenge.
    /// Returns the number of challenges touched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the reset cannot be written.
    async fn reset_all(&self) -> Result<usize, StorageError>;
}

/// User-level points ledger contract.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read.
    async fn get_progress(&self) -> Result<UserProgress, StorageError>;

    /// Add points and return the new total.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be written.
    async fn add_points(&self, amount: u32) -> Result<u64, StorageError>;

    /// Record a completed challenge. Returns false if it was already recorded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be written.
    async fn mark_challenge_completed(&self, id: &ChallengeId) -> Result<bool, StorageError>;

    /// Zero the points total and forget all completions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be written.
    async fn reset_progress(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    challenges: Arc<Mutex<Vec<Challenge>>>,
    ledger: Arc<Mutex<UserProgress>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with `challenges` in the given order.
    #[must_use]
    pub fn with_challenges(challenges: Vec<Challenge>) -> Self {
        Self {
            challenges: Arc::new(Mutex::new(challenges)),
            ledger: Arc::new(Mutex::new(UserProgress::new())),
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ChallengeRepository for InMemoryRepository {
    async fn list_challenges(&self) -> Result<Vec<Challenge>, StorageError> {
        let guard = self.challenges.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn get_challenge(&self, id: &ChallengeId) -> Result<Option<Challenge>, StorageError> {
        let guard = self.challenges.lock().map_err(poisoned)?;
        Ok(guard.iter().find(|c| c.id() == id).cloned())
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        let mut guard = self.challenges.lock().map_err(poisoned)?;
        match guard.iter_mut().find(|c| c.id() == challenge.id()) {
            Some(slot) => *slot = challenge.clone(),
            None => guard.push(challenge.clone()),
        }
        Ok(())
    }

    async fn replace_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        let mut guard = self.challenges.lock().map_err(poisoned)?;
        if !guard.iter().any(|c| c.id() == challenge.id()) {
            return Err(StorageError::NotFound);
        }
        let updated: Vec<Challenge> = guard
            .iter()
            .map(|c| {
                if c.id() == challenge.id() {
                    challenge.clone()
                } else {
                    c.clone()
                }
            })
            .collect();
        *guard = updated;
        Ok(())
    }

    async fn reset_all(&self) -> Result<usize, StorageError> {
        let mut guard = self.challenges.lock().map_err(poisoned)?;
        let reset: Vec<Challenge> = guard.iter().map(Challenge::reset).collect();
        let count = reset.len();
        *guard = reset;
        Ok(count)
    }
}

#[async_trait]
impl LedgerRepository for InMemoryRepository {
    async fn get_progress(&self) -> Result<UserProgress, StorageError> {
        let guard = self.ledger.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn add_points(&self, amount: u32) -> Result<u64, StorageError> {
        let mut guard = self.ledger.lock().map_err(poisoned)?;
        guard.add_points(amount);
        Ok(guard.total_points())
    }

    async fn mark_challenge_completed(&self, id: &ChallengeId) -> Result<bool, StorageError> {
        let mut guard = self.ledger.lock().map_err(poisoned)?;
        Ok(guard.mark_completed(id.clone()))
    }

    async fn reset_progress(&self) -> Result<(), StorageError> {
        let mut guard = self.ledger.lock().map_err(poisoned)?;
        guard.reset();
        Ok(())
    }
}

/// Aggregates the catalog and ledger behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub challenges: Arc<dyn ChallengeRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: ChallengeRepository + LedgerRepository + Clone + 'static,
    {
        let challenges: Arc<dyn ChallengeRepository> = Arc::new(repo.clone());
        let ledger: Arc<dyn LedgerRepository> = Arc::new(repo);
        Self { challenges, ledger }
    }
}
