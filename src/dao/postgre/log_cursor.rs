use chrono::{DateTime, Utc};
use sqlx::{Error, Transaction};

use super::{to_signed, DataBase, QueryResult};
use crate::model::{Log_Cursor, Table};

impl Table<Log_Cursor> {
    pub async fn get(&self, kind: &str) -> Result<Option<Log_Cursor>, Error> {
        const SQL: &str = r#"
        SELECT "timestamp", "block_number", "tx_index", "log_index"
        FROM "log_cursor"
        WHERE "kind" = $1
        "#;

        sqlx::query_as(SQL)
            .bind(kind)
            .fetch_optional(&self.pool)
            .await
    }

    /// Moves the cursor strictly forward. Affects no row when the stored
    /// cursor is already at or past `cursor`.
    pub async fn advance(
        &self,
        kind: &str,
        cursor: &Log_Cursor,
        updated_at: DateTime<Utc>,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        const SQL: &str = r#"
        INSERT INTO "log_cursor" (
            "kind",
            "timestamp",
            "block_number",
            "tx_index",
            "log_index",
            "updated_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT ("kind") DO UPDATE
        SET
            "timestamp" = EXCLUDED."timestamp",
            "block_number" = EXCLUDED."block_number",
            "tx_index" = EXCLUDED."tx_index",
            "log_index" = EXCLUDED."log_index",
            "updated_at" = EXCLUDED."updated_at"
        WHERE (
            "log_cursor"."timestamp",
            "log_cursor"."block_number",
            "log_cursor"."tx_index",
            "log_cursor"."log_index"
        ) < (
            EXCLUDED."timestamp",
            EXCLUDED."block_number",
            EXCLUDED."tx_index",
            EXCLUDED."log_index"
        )
        "#;

        sqlx::query(SQL)
            .bind(kind)
            .bind(to_signed(cursor.timestamp)?)
            .bind(to_signed(cursor.block_number)?)
            .bind(i64::from(cursor.tx_index))
            .bind(i64::from(cursor.log_index))
            .bind(updated_at)
            .execute(transaction.as_mut())
            .await
    }
}
