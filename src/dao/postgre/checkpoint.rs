use chrono::{DateTime, Utc};
use sqlx::Error;

use super::to_signed;
use crate::model::{Checkpoint, Checkpoints, Table};

impl Table<Checkpoint> {
    pub async fn get(
        &self,
        kind: Checkpoints,
    ) -> Result<Option<Checkpoint>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "checkpoint"
        WHERE "kind" = $1
        "#;

        sqlx::query_as(SQL)
            .bind(kind.to_string())
            .fetch_optional(&self.pool)
            .await
    }

    /// Stores `value` unless a higher value is already recorded, so a
    /// checkpoint never moves backwards.
    pub async fn advance(
        &self,
        kind: Checkpoints,
        value: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        const SQL: &str = r#"
        INSERT INTO "checkpoint" ("kind", "value", "updated_at")
        VALUES ($1, $2, $3)
        ON CONFLICT ("kind") DO UPDATE
        SET "value" = EXCLUDED."value", "updated_at" = EXCLUDED."updated_at"
        WHERE "checkpoint"."value" <= EXCLUDED."value"
        "#;

        sqlx::query(SQL)
            .bind(kind.to_string())
            .bind(to_signed(value)?)
            .bind(updated_at)
            .execute(&self.pool)
            .await
            .map(drop)
    }
}
