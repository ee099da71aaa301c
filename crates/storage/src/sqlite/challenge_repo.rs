use listen_core::model::{Challenge, ChallengeId};

use super::SqliteRepository;
use super::mapping::map_challenge_row;
use crate::repository::{ChallengeRepository, StorageError};

const SELECT_COLUMNS: &str = r"
    SELECT id, title, artist, audio_url, description, difficulty,
           duration_secs, points, progress_percent, completed, completed_at
    FROM challenges
";

fn connection(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ChallengeRepository for SqliteRepository {
    async fn list_challenges(&self) -> Result<Vec<Challenge>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY rowid ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(connection)?;

        let mut challenges = Vec::with_capacity(rows.len());
        for row in rows {
            challenges.push(map_challenge_row(&row)?);
        }
        Ok(challenges)
    }

    async fn get_challenge(&self, id: &ChallengeId) -> Result<Option<Challenge>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(connection)?;

        match row {
            Some(row) => map_challenge_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO challenges (
                id, title, artist, audio_url, description, difficulty,
                duration_secs, points, progress_percent, completed, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                audio_url = excluded.audio_url,
                description = excluded.description,
                difficulty = excluded.difficulty,
                duration_secs = excluded.duration_secs,
                points = excluded.points,
                progress_percent = excluded.progress_percent,
                completed = excluded.completed,
                completed_at = excluded.completed_at
            ",
        )
        .bind(challenge.id().as_str())
        .bind(challenge.title())
        .bind(challenge.artist())
        .bind(challenge.audio_url())
        .bind(challenge.description())
        .bind(challenge.difficulty().as_str())
        .bind(i64::from(challenge.duration_secs()))
        .bind(i64::from(challenge.points()))
        .bind(challenge.progress_percent())
        .bind(i64::from(challenge.is_completed()))
        .bind(challenge.completed_at())
        .execute(&self.pool)
        .await
        .map_err(connection)?;

        Ok(())
    }

    async fn replace_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE challenges SET
                title = ?2,
                artist = ?3,
                audio_url = ?4,
                description = ?5,
                difficulty = ?6,
                duration_secs = ?7,
                points = ?8,
                progress_percent = ?9,
                completed = ?10,
                completed_at = ?11
            WHERE id = ?1
            ",
        )
        .bind(challenge.id().as_str())
        .bind(challenge.title())
        .bind(challenge.artist())
        .bind(challenge.audio_url())
        .bind(challenge.description())
        .bind(challenge.difficulty().as_str())
        .bind(i64::from(challenge.duration_secs()))
        .bind(i64::from(challenge.points()))
        .bind(challenge.progress_percent())
        .bind(i64::from(challenge.is_completed()))
        .bind(challenge.completed_at())
        .execute(&self.pool)
        .await
        .map_err(connection)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn reset_all(&self) -> Result<usize, StorageError> {
        let res = sqlx::query(
            r"
            UPDATE challenges
            SET progress_percent = 0, completed = 0, completed_at = NULL
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(connection)?;

        usize::try_from(res.rows_affected())
            .map_err(|_| StorageError::Serialization("rows affected overflow".into()))
    }
}
