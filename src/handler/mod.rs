pub use self::block_tracker::BlockTracker;
pub use self::scheduler::Scheduler;

pub mod block_tracker;
pub mod category_log;
pub mod log_ingestion;
pub mod reserve_rates;
pub mod scheduler;
pub mod time_window;
pub mod trade_stats;

#[cfg(test)]
pub mod testing;
