use sqlx::{Error, QueryBuilder, Transaction};

use super::{to_signed, DataBase};
use crate::model::{Resolution, Table, Trade_Stat, Trade_Stats};

impl Table<Trade_Stat> {
    /// Adds every delta to its `(resolution, bucket, metric)` counter.
    pub async fn increment_many(
        &self,
        resolution: Resolution,
        bucket: u64,
        data: &Trade_Stats,
        transaction: &mut Transaction<'_, DataBase>,
    ) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }

        let resolution = resolution.to_string();
        let bucket = to_signed(bucket)?;

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(
            r#"
            INSERT INTO "trade_stats" (
                "resolution",
                "bucket",
                "metric",
                "value"
            )"#,
        );

        query_builder.push_values(data, |mut b, (metric, value)| {
            b.push_bind(&resolution)
                .push_bind(bucket)
                .push_bind(metric)
                .push_bind(value);
        });

        query_builder.push(
            r#"
            ON CONFLICT ("resolution", "bucket", "metric") DO UPDATE
            SET "value" = "trade_stats"."value" + EXCLUDED."value"
            "#,
        );

        let query = query_builder.build();
        query.execute(transaction.as_mut()).await?;

        Ok(())
    }
}
