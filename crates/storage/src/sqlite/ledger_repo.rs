use chrono::Utc;
use listen_core::model::{ChallengeId, UserProgress};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{challenge_id_from_str, ser, u64_from_i64};
use crate::repository::{LedgerRepository, StorageError};

fn connection(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl LedgerRepository for SqliteRepository {
    async fn get_progress(&self) -> Result<UserProgress, StorageError> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT total_points FROM user_progress WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(connection)?;
        let total_points = u64_from_i64("total_points", total.unwrap_or(0))?;

        let rows = sqlx::query("SELECT challenge_id FROM completed_challenges ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(connection)?;
        let mut completed = Vec::with_capacity(rows.len());
        for row in rows {
            completed.push(challenge_id_from_str(
                row.try_get("challenge_id").map_err(ser)?,
            )?);
        }

        let progress = UserProgress::from_persisted(total_points, completed)
            .map_err(listen_core::Error::from)?;
        Ok(progress)
    }

    async fn add_points(&self, amount: u32) -> Result<u64, StorageError> {
        let total: i64 = sqlx::query_scalar(
            r"
            INSERT INTO user_progress (id, total_points)
            VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET
                total_points = user_progress.total_points + excluded.total_points
            RETURNING total_points
            ",
        )
        .bind(i64::from(amount))
        .fetch_one(&self.pool)
        .await
        .map_err(connection)?;

        u64_from_i64("total_points", total)
    }

    async fn mark_challenge_completed(&self, id: &ChallengeId) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO completed_challenges (challenge_id, recorded_at)
            VALUES (?1, ?2)
            ON CONFLICT(challenge_id) DO NOTHING
            ",
        )
        .bind(id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(connection)?;

        Ok(res.rows_affected() == 1)
    }

    async fn reset_progress(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(connection)?;
        sqlx::query("DELETE FROM completed_challenges")
            .execute(&mut *tx)
            .await
            .map_err(connection)?;
        sqlx::query("DELETE FROM user_progress")
            .execute(&mut *tx)
            .await
            .map_err(connection)?;
        tx.commit().await.map_err(connection)?;
        Ok(())
    }
}
