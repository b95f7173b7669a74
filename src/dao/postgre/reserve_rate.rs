use sqlx::{Error, QueryBuilder};

use super::{to_signed, DataBase};
use crate::model::{Reserve_Rate, Table};

impl Table<Reserve_Rate> {
    pub async fn insert_many(&self, data: &[Reserve_Rate]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }

        let mut blocks = Vec::with_capacity(data.len());
        for rate in data {
            blocks.push(to_signed(rate.block_number)?);
        }

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(
            r#"
            INSERT INTO "reserve_rate" (
                "reserve_address",
                "block_number",
                "collected_at",
                "asset",
                "bid",
                "ask"
            )"#,
        );

        query_builder.push_values(
            data.iter().zip(blocks),
            |mut b, (rate, block)| {
                b.push_bind(&rate.reserve_address)
                    .push_bind(block)
                    .push_bind(rate.collected_at)
                    .push_bind(&rate.asset)
                    .push_bind(&rate.bid)
                    .push_bind(&rate.ask);
            },
        );

        query_builder.push(
            r#"
            ON CONFLICT ("reserve_address", "collected_at", "asset") DO NOTHING
            "#,
        );

        let query = query_builder.build();
        query.execute(&self.pool).await?;

        Ok(())
    }
}
