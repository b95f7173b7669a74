use std::path::PathBuf;

/// Schema files, in creation order.
pub const SCHEMA_FILES: [&str; 9] = [
    "checkpoint.sql",
    "log_cursor.sql",
    "trade_log.sql",
    "category_log.sql",
    "trade_stats.sql",
    "user_stats.sql",
    "address_category.sql",
    "user_registration.sql",
    "reserve_rate.sql",
];

pub fn schema_path(file: &str) -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "migration", "postgresql", file]
        .into_iter()
        .collect()
}
