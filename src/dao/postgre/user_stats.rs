use sqlx::{Error, Transaction};

use super::{to_signed, DataBase, QueryResult};
use crate::model::{Table, User_Stats};

impl Table<User_Stats> {
    pub async fn get_one(
        &self,
        user_address: &str,
        bucket: u64,
    ) -> Result<Option<User_Stats>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "user_stats"
            WHERE "user_address" = $1 AND "bucket" = $2
            "#,
        )
        .bind(user_address)
        .bind(to_signed(bucket)?)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn upsert(
        &self,
        data: &User_Stats,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<QueryResult, Error> {
        const SQL: &str = r#"
        INSERT INTO "user_stats" (
            "user_address",
            "bucket",
            "email",
            "kyced",
            "trade_count",
            "usd_volume",
            "eth_volume"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT ("user_address", "bucket") DO UPDATE
        SET
            "email" = EXCLUDED."email",
            "kyced" = EXCLUDED."kyced",
            "trade_count" = EXCLUDED."trade_count",
            "usd_volume" = EXCLUDED."usd_volume",
            "eth_volume" = EXCLUDED."eth_volume"
        "#;

        sqlx::query(SQL)
            .bind(&data.user_address)
            .bind(to_signed(data.bucket)?)
            .bind(&data.email)
            .bind(data.kyced)
            .bind(data.trade_count)
            .bind(&data.usd_volume)
            .bind(&data.eth_volume)
            .execute(transaction.as_mut())
            .await
    }
}
