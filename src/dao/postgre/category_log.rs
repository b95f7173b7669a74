use sqlx::Error;

use super::{to_signed, QueryResult};
use crate::model::{Category_Log, Table};

impl Table<Category_Log> {
    pub async fn insert(
        &self,
        data: &Category_Log,
    ) -> Result<QueryResult, Error> {
        const SQL: &str = r#"
        INSERT INTO "category_log" (
            "block_number",
            "tx_index",
            "log_index",
            "tx_hash",
            "timestamp",
            "address",
            "category"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT ("block_number", "tx_index", "log_index") DO NOTHING
        "#;

        sqlx::query(SQL)
            .bind(to_signed(data.block_number)?)
            .bind(i64::from(data.tx_index))
            .bind(i64::from(data.log_index))
            .bind(&data.tx_hash)
            .bind(to_signed(data.timestamp)?)
            .bind(&data.address)
            .bind(&data.category)
            .persistent(true)
            .execute(&self.pool)
            .await
    }

    pub async fn get_first(&self) -> Result<Option<Category_Log>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "category_log"
            ORDER BY "timestamp" ASC, "block_number" ASC, "tx_index" ASC, "log_index" ASC
            LIMIT 1
            "#,
        )
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_last(&self) -> Result<Option<Category_Log>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "category_log"
            ORDER BY "timestamp" DESC, "block_number" DESC, "tx_index" DESC, "log_index" DESC
            LIMIT 1
            "#,
        )
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_by_range(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<Category_Log>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "category_log"
            WHERE "timestamp" >= $1 AND "timestamp" <= $2
            ORDER BY "timestamp" ASC, "block_number" ASC, "tx_index" ASC, "log_index" ASC
            "#,
        )
        .bind(to_signed(from)?)
        .bind(to_signed(to)?)
        .persistent(true)
        .fetch_all(&self.pool)
        .await
    }
}
