use chrono::{DateTime, Utc};
use sqlx::Error;

use super::{to_signed, QueryResult};
use crate::model::{Table, Trade_Log};

impl Table<Trade_Log> {
    /// Inserting the same chain position twice is a no-op.
    pub async fn insert(
        &self,
        data: &Trade_Log,
        observed_at: DateTime<Utc>,
    ) -> Result<QueryResult, Error> {
        const SQL: &str = r#"
        INSERT INTO "trade_log" (
            "block_number",
            "tx_index",
            "log_index",
            "tx_hash",
            "timestamp",
            "src_address",
            "dst_address",
            "src_amount",
            "dst_amount",
            "reserve_address",
            "wallet_address",
            "user_address",
            "fiat_amount",
            "burn_fee",
            "wallet_fee",
            "observed_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT ("block_number", "tx_index", "log_index") DO NOTHING
        "#;

        sqlx::query(SQL)
            .bind(to_signed(data.block_number)?)
            .bind(i64::from(data.tx_index))
            .bind(i64::from(data.log_index))
            .bind(&data.tx_hash)
            .bind(to_signed(data.timestamp)?)
            .bind(&data.src_address)
            .bind(&data.dst_address)
            .bind(&data.src_amount)
            .bind(&data.dst_amount)
            .bind(&data.reserve_address)
            .bind(&data.wallet_address)
            .bind(&data.user_address)
            .bind(&data.fiat_amount)
            .bind(&data.burn_fee)
            .bind(&data.wallet_fee)
            .bind(observed_at)
            .persistent(true)
            .execute(&self.pool)
            .await
    }

    pub async fn get_first(&self) -> Result<Option<Trade_Log>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "trade_log"
            ORDER BY "timestamp" ASC, "block_number" ASC, "tx_index" ASC, "log_index" ASC
            LIMIT 1
            "#,
        )
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_last(&self) -> Result<Option<Trade_Log>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "trade_log"
            ORDER BY "timestamp" DESC, "block_number" DESC, "tx_index" DESC, "log_index" DESC
            LIMIT 1
            "#,
        )
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    /// Logs with `from <= timestamp <= to`, in chain order.
    pub async fn get_by_range(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<Trade_Log>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "trade_log"
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
