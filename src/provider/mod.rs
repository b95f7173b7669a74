pub use self::{
    chain::ChainLogSource,
    database::DatabasePool,
    http::HTTP,
    runner::{IntervalRunner, Intervals, Runner, Tickers},
    storage::{LogStore, RateStore, StatStore, UserStore},
};

mod chain;
mod database;
mod http;
mod runner;
mod storage;
