mod catalog;
mod challenge;
mod ids;
mod ledger;
mod sample;

pub use ids::{ChallengeId, ParseIdError};

pub use catalog::default_catalog;
pub use challenge::{Challenge, ChallengeDraft, ChallengeError, Difficulty};
pub use ledger::{LedgerError, UserProgress};
pub use sample::{PlaybackSample, PlaybackState, SampleError};
pub(crate) use sample::checked_percent;
