use sqlx::{
    postgres::{PgPoolOptions, PgQueryResult},
    Error, PgPool, Postgres,
};

pub type PoolType = PgPool;
pub type PoolOption = PgPoolOptions;
pub type QueryResult = PgQueryResult;
pub type DataBase = Postgres;

/// Postgres has no unsigned 64 bit type; heights and timestamps are stored
/// as BIGINT.
pub fn to_signed(value: u64) -> Result<i64, Error> {
    i64::try_from(value).map_err(|e| Error::Encode(Box::new(e)))
}
