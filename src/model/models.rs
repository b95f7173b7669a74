//! Persisted entities
//!
//! Log rows written by the ingestion engine, aggregate rows written by the
//! processors and the checkpoint bookkeeping shared by all of them.

use std::{collections::HashMap, fmt, io, str::FromStr};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// =============================================================================
// EVENT LOGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Trade_Log {
    #[sqlx(try_from = "i64")]
    pub block_number: u64,
    #[sqlx(try_from = "i64")]
    pub tx_index: u32,
    #[sqlx(try_from = "i64")]
    pub log_index: u32,
    #[serde(default)]
    pub tx_hash: String,
    #[sqlx(try_from = "i64")]
    pub timestamp: u64,
    pub src_address: String,
    pub dst_address: String,
    pub src_amount: BigDecimal,
    pub dst_amount: BigDecimal,
    pub reserve_address: String,
    pub wallet_address: String,
    pub user_address: String,
    pub fiat_amount: BigDecimal,
    pub burn_fee: Option<BigDecimal>,
    pub wallet_fee: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Category_Log {
    #[sqlx(try_from = "i64")]
    pub block_number: u64,
    #[sqlx(try_from = "i64")]
    pub tx_index: u32,
    #[sqlx(try_from = "i64")]
    pub log_index: u32,
    #[serde(default)]
    pub tx_hash: String,
    #[sqlx(try_from = "i64")]
    pub timestamp: u64,
    pub address: String,
    pub category: String,
}

/// A decoded reserve contract log, as handed over by the chain source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Raw_Event_Log {
    #[serde(rename = "TradeLog")]
    Trade(Trade_Log),
    #[serde(rename = "SetCatLog")]
    Category(Category_Log),
}

impl Raw_Event_Log {
    pub fn block_number(&self) -> u64 {
        match self {
            Raw_Event_Log::Trade(log) => log.block_number,
            Raw_Event_Log::Category(log) => log.block_number,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Raw_Event_Log::Trade(log) => log.timestamp,
            Raw_Event_Log::Category(log) => log.timestamp,
        }
    }

    /// Position of the log on chain: block, transaction, log.
    pub fn position(&self) -> (u64, u32, u32) {
        match self {
            Raw_Event_Log::Trade(log) => {
                (log.block_number, log.tx_index, log.log_index)
            },
            Raw_Event_Log::Category(log) => {
                (log.block_number, log.tx_index, log.log_index)
            },
        }
    }
}

// =============================================================================
// AGGREGATES
// =============================================================================

/// Metric name to additive delta.
pub type Trade_Stats = HashMap<String, BigDecimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Minute,
    Hour,
    Day,
}

impl Resolution {
    pub const ALL: [Resolution; 3] =
        [Resolution::Minute, Resolution::Hour, Resolution::Day];

    /// Bucket width in log timestamp units (nanoseconds).
    pub fn width(&self) -> u64 {
        const MINUTE: u64 = 60 * 1_000_000_000;
        match self {
            Resolution::Minute => MINUTE,
            Resolution::Hour => 60 * MINUTE,
            Resolution::Day => 24 * 60 * MINUTE,
        }
    }

    pub fn bucket_start(&self, timestamp: u64) -> u64 {
        let width = self.width();
        timestamp - timestamp % width
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resolution::Minute => write!(f, "M"),
            Resolution::Hour => write!(f, "H"),
            Resolution::Day => write!(f, "D"),
        }
    }
}

impl FromStr for Resolution {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Resolution, Self::Err> {
        match value {
            "M" => Ok(Resolution::Minute),
            "H" => Ok(Resolution::Hour),
            "D" => Ok(Resolution::Day),
            _ => Err(io::Error::other("Resolution not supported")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Trade_Stat {
    pub resolution: String,
    #[sqlx(try_from = "i64")]
    pub bucket: u64,
    pub metric: String,
    pub value: BigDecimal,
}

/// Per user activity inside one day bucket.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User_Stats {
    pub user_address: String,
    #[sqlx(try_from = "i64")]
    pub bucket: u64,
    pub email: String,
    pub kyced: bool,
    pub trade_count: i64,
    pub usd_volume: BigDecimal,
    pub eth_volume: BigDecimal,
}

impl User_Stats {
    pub fn empty(user_address: &str, bucket: u64) -> Self {
        User_Stats {
            user_address: user_address.to_owned(),
            bucket,
            email: String::new(),
            kyced: false,
            trade_count: 0,
            usd_volume: BigDecimal::from(0),
            eth_volume: BigDecimal::from(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User_Registration {
    pub address: String,
    pub email: String,
    #[sqlx(try_from = "i64")]
    pub registered_at: u64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Address_Category {
    pub address: String,
    pub category: String,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// RESERVE RATES
// =============================================================================

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Reserve_Rate {
    pub reserve_address: String,
    #[sqlx(try_from = "i64")]
    pub block_number: u64,
    pub collected_at: DateTime<Utc>,
    pub asset: String,
    pub bid: BigDecimal,
    pub ask: BigDecimal,
}

/// Every write one trade contributes, committed together with the cursor
/// that moves past it.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade_Commit {
    pub cursor: Log_Cursor,
    /// `(resolution, bucket start, deltas)`
    pub stats: Vec<(Resolution, u64, Trade_Stats)>,
    pub user_stats: User_Stats,
}

// =============================================================================
// CHECKPOINTS
// =============================================================================

/// Position of the last processed log in `(timestamp, block, tx, log)`
/// order. Field order drives the derived ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, FromRow)]
pub struct Log_Cursor {
    #[sqlx(try_from = "i64")]
    pub timestamp: u64,
    #[sqlx(try_from = "i64")]
    pub block_number: u64,
    #[sqlx(try_from = "i64")]
    pub tx_index: u32,
    #[sqlx(try_from = "i64")]
    pub log_index: u32,
}

impl Log_Cursor {
    pub const TRADE_LOG: &'static str = "trade_log";

    pub fn of(log: &Trade_Log) -> Self {
        Log_Cursor {
            timestamp: log.timestamp,
            block_number: log.block_number,
            tx_index: log.tx_index,
            log_index: log.log_index,
        }
    }

    /// Sorts after every log stamped `timestamp`. The block is capped at
    /// `i64::MAX` so the cursor still fits a BIGINT column.
    pub fn after(timestamp: u64) -> Self {
        Log_Cursor {
            timestamp,
            block_number: i64::MAX as u64,
            tx_index: u32::MAX,
            log_index: u32::MAX,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct Checkpoint {
    pub kind: String,
    #[sqlx(try_from = "i64")]
    pub value: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoints {
    LogBlock,
    CategoryLogTimestamp,
}

impl fmt::Display for Checkpoints {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Checkpoints::LogBlock => write!(f, "log_block"),
            Checkpoints::CategoryLogTimestamp => {
                write!(f, "category_log_timestamp")
            },
        }
    }
}

impl From<Checkpoints> for String {
    fn from(value: Checkpoints) -> Self {
        value.to_string()
    }
}
