use std::fs;

use crate::{
    configuration::Config,
    dao::{schema_path, PoolOption, PoolType, SCHEMA_FILES},
    error::Error,
    helpers::TIMESTAMP_SCALE,
    model::{
        Address_Category, Category_Log, Checkpoint, Log_Cursor, Reserve_Rate,
        Table, Trade_Log, Trade_Stat, User_Registration, User_Stats,
    },
};

#[derive(Debug)]
pub struct DatabasePool {
    pub trade_log: Table<Trade_Log>,
    pub category_log: Table<Category_Log>,
    pub checkpoint: Table<Checkpoint>,
    pub log_cursor: Table<Log_Cursor>,
    pub trade_stats: Table<Trade_Stat>,
    pub user_stats: Table<User_Stats>,
    pub address_category: Table<Address_Category>,
    pub user_registration: Table<User_Registration>,
    pub reserve_rate: Table<Reserve_Rate>,
    pub max_query_range: u64,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let max_query_range = max_query_range(config.max_query_range_seconds)?;
        let pool = PoolOption::new()
            .after_connect(|_conn, _meta| Box::pin(async move { Ok(()) }))
            .max_connections(20)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            pool: pool.clone(),
            trade_log: Table::new(pool.clone()),
            category_log: Table::new(pool.clone()),
            checkpoint: Table::new(pool.clone()),
            log_cursor: Table::new(pool.clone()),
            trade_stats: Table::new(pool.clone()),
            user_stats: Table::new(pool.clone()),
            address_category: Table::new(pool.clone()),
            user_registration: Table::new(pool.clone()),
            reserve_rate: Table::new(pool),
            max_query_range,
        })
    }

    pub async fn init_migrations(&self) -> Result<(), Error> {
        for file in SCHEMA_FILES {
            let data = fs::read_to_string(schema_path(file))?;
            sqlx::raw_sql(data.as_str()).execute(&self.pool).await?;
        }

        Ok(())
    }
}

/// Converts the configured range in seconds to log timestamp units.
pub fn max_query_range(seconds: u64) -> Result<u64, Error> {
    seconds
        .checked_mul(1000)
        .and_then(|millis| millis.checked_mul(TIMESTAMP_SCALE))
        .ok_or_else(|| {
            Error::ConfigurationError(format!(
                "MAX_QUERY_RANGE_SECONDS too large: {}",
                seconds
            ))
        })
}
