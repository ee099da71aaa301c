use listen_core::model::{Challenge, ChallengeDraft, ChallengeId, Difficulty};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn challenge_id_from_str(raw: String) -> Result<ChallengeId, StorageError> {
    ChallengeId::new(raw).map_err(ser)
}

pub(crate) fn map_challenge_row(row: &SqliteRow) -> Result<Challenge, StorageError> {
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let draft = ChallengeDraft {
        id: challenge_id_from_str(row.try_get("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        artist: row.try_get("artist").map_err(ser)?,
        audio_url: row.try_get("audio_url").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        difficulty: difficulty.parse::<Difficulty>().map_err(ser)?,
        duration_secs: u32_from_i64(
            "duration_secs",
            row.try_get::<i64, _>("duration_secs").map_err(ser)?,
        )?,
        points: u32_from_i64("points", row.try_get::<i64, _>("points").map_err(ser)?)?,
    };

    let challenge = Challenge::from_persisted(
        draft,
        row.try_get("progress_percent").map_err(ser)?,
        row.try_get::<i64, _>("completed").map_err(ser)? != 0,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(listen_core::Error::from)?;
    Ok(challenge)
}
