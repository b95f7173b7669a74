pub use self::{
    schema::{schema_path, SCHEMA_FILES},
    types::{to_signed, DataBase, PoolOption, PoolType, QueryResult},
};
mod address_category;
mod category_log;
mod checkpoint;
mod log_cursor;
mod reserve_rate;
mod schema;
mod trade_log;
mod trade_stats;
mod types;
mod user_registration;
mod user_stats;
