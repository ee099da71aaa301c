use thiserror::Error;

use crate::model::{ChallengeError, LedgerError, SampleError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
