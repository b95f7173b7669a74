use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    error::Error,
    model::{
        Category_Log, Checkpoints, Log_Cursor, Reserve_Rate, Trade_Commit,
        Trade_Log, User_Registration, User_Stats,
    },
    types::Reserve_Rates_Type,
};

use super::DatabasePool;

/// Raw log storage plus the block checkpoint of the log fetcher.
#[async_trait]
pub trait LogStore: Send + Sync + Debug {
    async fn store_trade_log(
        &self,
        log: &Trade_Log,
        observed_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    async fn store_category_log(&self, log: &Category_Log) -> Result<(), Error>;

    async fn get_first_trade_log(&self) -> Result<Option<Trade_Log>, Error>;

    async fn get_last_trade_log(&self) -> Result<Option<Trade_Log>, Error>;

    /// Trade logs with `from <= timestamp <= to`, oldest first.
    async fn get_trade_logs(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<Trade_Log>, Error>;

    async fn get_first_category_log(&self)
        -> Result<Option<Category_Log>, Error>;

    async fn get_last_category_log(&self)
        -> Result<Option<Category_Log>, Error>;

    async fn get_category_logs(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<Category_Log>, Error>;

    async fn last_ingested_block(&self) -> Result<Option<u64>, Error>;

    async fn update_ingested_block(
        &self,
        block: u64,
        observed_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Widest timestamp span a single log query may cover.
    fn max_query_range(&self) -> u64;
}

#[async_trait]
pub trait StatStore: Send + Sync + Debug {
    async fn last_trade_cursor(&self) -> Result<Option<Log_Cursor>, Error>;

    /// Moves the cursor forward without touching any counter. A cursor at or
    /// behind the stored one is ignored.
    async fn advance_trade_cursor(&self, cursor: &Log_Cursor)
        -> Result<(), Error>;

    /// Adds the stat deltas, stores the user record and moves the cursor to
    /// `commit.cursor`, all or nothing. Fails without writing when the
    /// stored cursor is already at or past it.
    async fn commit_trade(&self, commit: &Trade_Commit) -> Result<(), Error>;

    async fn get_user_stats(
        &self,
        user_address: &str,
        bucket: u64,
    ) -> Result<Option<User_Stats>, Error>;
}

#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    async fn last_processed_category_timestamp(
        &self,
    ) -> Result<Option<u64>, Error>;

    async fn set_last_processed_category_timestamp(
        &self,
        timestamp: u64,
    ) -> Result<(), Error>;

    async fn update_address_category(
        &self,
        address: &str,
        category: &str,
    ) -> Result<(), Error>;

    async fn get_address_category(
        &self,
        address: &str,
    ) -> Result<Option<String>, Error>;

    async fn get_user_registration(
        &self,
        address: &str,
    ) -> Result<Option<User_Registration>, Error>;
}

#[async_trait]
pub trait RateStore: Send + Sync + Debug {
    async fn store_reserve_rates(
        &self,
        reserve_address: &str,
        rates: &Reserve_Rates_Type,
        block_number: u64,
        collected_at: DateTime<Utc>,
    ) -> Result<(), Error>;
}

#[async_trait]
impl LogStore for DatabasePool {
    async fn store_trade_log(
        &self,
        log: &Trade_Log,
        observed_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let result = self.trade_log.insert(log, observed_at).await?;
        if result.rows_affected() == 0 {
            debug!(
                "trade log at ({}, {}, {}) already stored",
                log.block_number, log.tx_index, log.log_index
            );
        }
        Ok(())
    }

    async fn store_category_log(&self, log: &Category_Log) -> Result<(), Error> {
        let result = self.category_log.insert(log).await?;
        if result.rows_affected() == 0 {
            debug!(
                "category log at ({}, {}, {}) already stored",
                log.block_number, log.tx_index, log.log_index
            );
        }
        Ok(())
    }

    async fn get_first_trade_log(&self) -> Result<Option<Trade_Log>, Error> {
        Ok(self.trade_log.get_first().await?)
    }

    async fn get_last_trade_log(&self) -> Result<Option<Trade_Log>, Error> {
        Ok(self.trade_log.get_last().await?)
    }

    async fn get_trade_logs(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<Trade_Log>, Error> {
        Ok(self.trade_log.get_by_range(from, to).await?)
    }

    async fn get_first_category_log(
        &self,
    ) -> Result<Option<Category_Log>, Error> {
        Ok(self.category_log.get_first().await?)
    }

    async fn get_last_category_log(
        &self,
    ) -> Result<Option<Category_Log>, Error> {
        Ok(self.category_log.get_last().await?)
    }

    async fn get_category_logs(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<Category_Log>, Error> {
        Ok(self.category_log.get_by_range(from, to).await?)
    }

    async fn last_ingested_block(&self) -> Result<Option<u64>, Error> {
        let checkpoint = self.checkpoint.get(Checkpoints::LogBlock).await?;
        Ok(checkpoint.map(|item| item.value))
    }

    async fn update_ingested_block(
        &self,
        block: u64,
        observed_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.checkpoint
            .advance(Checkpoints::LogBlock, block, observed_at)
            .await?;
        Ok(())
    }

    fn max_query_range(&self) -> u64 {
        self.max_query_range
    }
}

#[async_trait]
impl StatStore for DatabasePool {
    async fn last_trade_cursor(&self) -> Result<Option<Log_Cursor>, Error> {
        Ok(self.log_cursor.get(Log_Cursor::TRADE_LOG).await?)
    }

    async fn advance_trade_cursor(
        &self,
        cursor: &Log_Cursor,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        self.log_cursor
            .advance(Log_Cursor::TRADE_LOG, cursor, Utc::now(), &mut tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_trade(&self, commit: &Trade_Commit) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        for (resolution, bucket, stats) in &commit.stats {
            self.trade_stats
                .increment_many(*resolution, *bucket, stats, &mut tx)
                .await?;
        }
        self.user_stats.upsert(&commit.user_stats, &mut tx).await?;

        let moved = self
            .log_cursor
            .advance(Log_Cursor::TRADE_LOG, &commit.cursor, Utc::now(), &mut tx)
            .await?;
        if moved.rows_affected() == 0 {
            // dropping the transaction rolls the counters back
            return Err(Error::StorageError(format!(
                "trade cursor already at or past {:?}",
                commit.cursor
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_user_stats(
        &self,
        user_address: &str,
        bucket: u64,
    ) -> Result<Option<User_Stats>, Error> {
        Ok(self.user_stats.get_one(user_address, bucket).await?)
    }
}

#[async_trait]
impl UserStore for DatabasePool {
    async fn last_processed_category_timestamp(
        &self,
    ) -> Result<Option<u64>, Error> {
        let checkpoint = self
            .checkpoint
            .get(Checkpoints::CategoryLogTimestamp)
            .await?;
        Ok(checkpoint.map(|item| item.value))
    }

    async fn set_last_processed_category_timestamp(
        &self,
        timestamp: u64,
    ) -> Result<(), Error> {
        self.checkpoint
            .advance(Checkpoints::CategoryLogTimestamp, timestamp, Utc::now())
            .await?;
        Ok(())
    }

    async fn update_address_category(
        &self,
        address: &str,
        category: &str,
    ) -> Result<(), Error> {
        self.address_category
            .upsert(address, category, Utc::now())
            .await?;
        Ok(())
    }

    async fn get_address_category(
        &self,
        address: &str,
    ) -> Result<Option<String>, Error> {
        let item = self.address_category.get_one(address).await?;
        Ok(item.map(|item| item.category))
    }

    async fn get_user_registration(
        &self,
        address: &str,
    ) -> Result<Option<User_Registration>, Error> {
        Ok(self.user_registration.get_one(address).await?)
    }
}

#[async_trait]
impl RateStore for DatabasePool {
    async fn store_reserve_rates(
        &self,
        reserve_address: &str,
        rates: &Reserve_Rates_Type,
        block_number: u64,
        collected_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let data: Vec<Reserve_Rate> = rates
            .rates
            .iter()
            .map(|(asset, rate)| Reserve_Rate {
                reserve_address: reserve_address.to_owned(),
                block_number,
                collected_at,
                asset: asset.to_owned(),
                bid: rate.bid.clone(),
                ask: rate.ask.clone(),
            })
            .collect();

        self.reserve_rate.insert_many(&data).await?;
        Ok(())
    }
}
