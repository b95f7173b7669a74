//! In-memory collaborators for engine tests.

use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, Sender};

use crate::{
    configuration::{AppState, Config, LiveEdge, State},
    error::Error,
    helpers::add_stat,
    model::{
        Category_Log, Log_Cursor, Raw_Event_Log, Reserve_Rate, Resolution,
        Trade_Commit, Trade_Log, Trade_Stats, User_Registration, User_Stats,
    },
    provider::{
        ChainLogSource, LogStore, RateStore, Runner, StatStore, Tickers,
        UserStore,
    },
    types::{Asset, Reserve_Rates_Type},
};

pub const ETH: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
pub const KNC: &str = "0xdd974d5c2e2928dea5f71b9825b8b646686bd200";
pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const PRIMARY: &str = "0x63825c174ab367968ec60f061753d3bbd36a0d8f";
pub const THIRD_PARTY: [&str; 2] = [
    "0x21433dec9cb634a23c6a4bbcce08c83f5ac2ec18",
    "0x57f8160e1c59d16c01bbe181fd94db4e56b60495",
];

pub fn test_config() -> Config {
    let assets = vec![
        Asset(String::from("ETH"), String::from(ETH), 18),
        Asset(String::from("KNC"), String::from(KNC), 18),
        Asset(String::from("USDC"), String::from(USDC), 6),
    ];

    Config {
        database_url: String::new(),
        node_url: String::new(),
        timeout: 5,
        deploy_block: 100,
        reserve_address: String::from(PRIMARY),
        third_party_reserves: THIRD_PARTY.iter().map(|s| s.to_string()).collect(),
        hash_map_assets: Config::build_asset_map(&assets),
        supported_assets: assets,
        reorg_safe_blocks: 7,
        log_window_blocks: 50,
        log_live_edge: LiveEdge::Hold,
        max_query_range_seconds: 3600,
        max_tasks: 2,
        block_interval: 1,
        log_interval: 1,
        trade_stats_interval: 1,
        category_stats_interval: 1,
        rate_interval: 1,
    }
}

pub fn test_state(
    config: Config,
    chain: Arc<MemoryChain>,
    store: Arc<MemoryStore>,
) -> AppState<State> {
    AppState::new(State::new(
        config,
        chain,
        store.clone(),
        store.clone(),
        store.clone(),
        store,
    ))
}

pub fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

pub fn trade(block_number: u64, timestamp: u64) -> Trade_Log {
    Trade_Log {
        block_number,
        tx_index: 0,
        log_index: 0,
        tx_hash: format!("0x{:064x}", block_number),
        timestamp,
        src_address: String::from(USDC),
        dst_address: String::from(ETH),
        src_amount: BigDecimal::from(10),
        dst_amount: dec("4000000000000000"),
        reserve_address: String::from(PRIMARY),
        wallet_address: String::from("0x0000000000000000000000000000000000000001"),
        user_address: String::from("0x8fa07f46353a2b17e92645592a94a0fc1ceb783f"),
        fiat_amount: dec("25.00"),
        burn_fee: Some(dec("1000000000000000")),
        wallet_fee: None,
    }
}

pub fn category(
    block_number: u64,
    timestamp: u64,
    address: &str,
    label: &str,
) -> Category_Log {
    Category_Log {
        block_number,
        tx_index: 1,
        log_index: 0,
        tx_hash: format!("0x{:064x}", block_number),
        timestamp,
        address: address.to_owned(),
        category: label.to_owned(),
    }
}

// =============================================================================
// CHAIN
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryChain {
    pub height: Mutex<Option<u64>>,
    pub logs: Mutex<Vec<Raw_Event_Log>>,
    pub fail_logs: AtomicBool,
    pub panic_logs: AtomicBool,
    pub ignore_range: AtomicBool,
    pub log_requests: Mutex<Vec<(u64, u64)>>,
    pub rates: Mutex<HashMap<String, Reserve_Rates_Type>>,
    pub rate_delays: Mutex<HashMap<String, Duration>>,
    pub rate_requests: Mutex<Vec<(u64, u64, String)>>,
}

impl MemoryChain {
    pub fn with_height(height: u64) -> Self {
        let chain = MemoryChain::default();
        chain.set_height(Some(height));
        chain
    }

    pub fn set_height(&self, height: Option<u64>) {
        *self.height.lock().unwrap() = height;
    }

    pub fn push_log(&self, log: Raw_Event_Log) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn set_rates(&self, reserve: &str, rates: Reserve_Rates_Type) {
        self.rates.lock().unwrap().insert(reserve.to_owned(), rates);
    }
}

#[async_trait]
impl ChainLogSource for MemoryChain {
    async fn current_block(&self) -> Result<u64, Error> {
        let height = *self.height.lock().unwrap();
        height.ok_or_else(|| Error::ChainError(String::from("node unavailable")))
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Raw_Event_Log>, Error> {
        if self.panic_logs.load(Ordering::SeqCst) {
            panic!("log decoder bug");
        }
        self.log_requests.lock().unwrap().push((from_block, to_block));

        if self.fail_logs.load(Ordering::SeqCst) {
            return Err(Error::ChainError(String::from("getLogs timed out")));
        }

        let ignore_range = self.ignore_range.load(Ordering::SeqCst);
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                ignore_range
                    || (log.block_number() >= from_block
                        && log.block_number() <= to_block)
            })
            .cloned()
            .collect())
    }

    async fn get_reserve_rates(
        &self,
        from_block: u64,
        to_block: u64,
        reserve_address: &str,
        _assets: &[Asset],
    ) -> Result<Reserve_Rates_Type, Error> {
        self.rate_requests.lock().unwrap().push((
            from_block,
            to_block,
            reserve_address.to_owned(),
        ));

        let delay = self.rate_delays.lock().unwrap().get(reserve_address).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rates = self.rates.lock().unwrap().get(reserve_address).cloned();
        match rates {
            Some(mut rates) => {
                rates.block_number = to_block;
                Ok(rates)
            },
            None => Err(Error::ChainError(format!(
                "execution reverted for {}",
                reserve_address
            ))),
        }
    }
}

// =============================================================================
// STORAGE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub trade_logs: Mutex<Vec<Trade_Log>>,
    pub category_logs: Mutex<Vec<Category_Log>>,
    pub ingested_block: Mutex<Option<u64>>,
    pub ingested_history: Mutex<Vec<u64>>,
    pub trade_cursor: Mutex<Option<Log_Cursor>>,
    pub category_checkpoint: Mutex<Option<u64>>,
    pub trade_stats: Mutex<HashMap<(Resolution, u64), Trade_Stats>>,
    pub user_stats: Mutex<HashMap<(String, u64), User_Stats>>,
    pub categories: Mutex<HashMap<String, String>>,
    pub registrations: Mutex<HashMap<String, User_Registration>>,
    pub rates: Mutex<Vec<Reserve_Rate>>,
    pub max_range: u64,
    pub failing_trade_blocks: Mutex<HashSet<u64>>,
    pub failing_users: Mutex<HashSet<String>>,
    pub failing_categories: Mutex<HashSet<String>>,
    pub failing_reserves: Mutex<HashSet<String>>,
    /// Fails the next commit after its first bucket was staged.
    pub fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn with_max_range(max_range: u64) -> Self {
        MemoryStore {
            max_range,
            ..MemoryStore::default()
        }
    }

    pub fn stat(
        &self,
        resolution: Resolution,
        timestamp: u64,
        metric: &str,
    ) -> Option<BigDecimal> {
        let bucket = resolution.bucket_start(timestamp);
        self.trade_stats
            .lock()
            .unwrap()
            .get(&(resolution, bucket))
            .and_then(|stats| stats.get(metric).cloned())
    }

    pub fn cursor_timestamp(&self) -> Option<u64> {
        self.trade_cursor.lock().unwrap().map(|cursor| cursor.timestamp)
    }

    pub fn snapshot_stats(&self) -> HashMap<(Resolution, u64), Trade_Stats> {
        self.trade_stats.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn store_trade_log(
        &self,
        log: &Trade_Log,
        _observed_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        if self.failing_trade_blocks.lock().unwrap().contains(&log.block_number) {
            return Err(Error::StorageError(String::from("disk full")));
        }
        self.trade_logs.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn store_category_log(&self, log: &Category_Log) -> Result<(), Error> {
        self.category_logs.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn get_first_trade_log(&self) -> Result<Option<Trade_Log>, Error> {
        let logs = self.trade_logs.lock().unwrap();
        Ok(logs.iter().min_by_key(|log| log.timestamp).cloned())
    }

    async fn get_last_trade_log(&self) -> Result<Option<Trade_Log>, Error> {
        let logs = self.trade_logs.lock().unwrap();
        Ok(logs.iter().max_by_key(|log| log.timestamp).cloned())
    }

    async fn get_trade_logs(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<Trade_Log>, Error> {
        let mut logs: Vec<Trade_Log> = self
            .trade_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.timestamp >= from && log.timestamp <= to)
            .cloned()
            .collect();
        logs.sort_by_key(Log_Cursor::of);
        Ok(logs)
    }

    async fn get_first_category_log(
        &self,
    ) -> Result<Option<Category_Log>, Error> {
        let logs = self.category_logs.lock().unwrap();
        Ok(logs.iter().min_by_key(|log| log.timestamp).cloned())
    }

    async fn get_last_category_log(
        &self,
    ) -> Result<Option<Category_Log>, Error> {
        let logs = self.category_logs.lock().unwrap();
        Ok(logs.iter().max_by_key(|log| log.timestamp).cloned())
    }

    async fn get_category_logs(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<Category_Log>, Error> {
        let mut logs: Vec<Category_Log> = self
            .category_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.timestamp >= from && log.timestamp <= to)
            .cloned()
            .collect();
        logs.sort_by_key(|log| {
            (log.timestamp, log.block_number, log.tx_index, log.log_index)
        });
        Ok(logs)
    }

    async fn last_ingested_block(&self) -> Result<Option<u64>, Error> {
        Ok(*self.ingested_block.lock().unwrap())
    }

    async fn update_ingested_block(
        &self,
        block: u64,
        _observed_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        *self.ingested_block.lock().unwrap() = Some(block);
        self.ingested_history.lock().unwrap().push(block);
        Ok(())
    }

    fn max_query_range(&self) -> u64 {
        self.max_range
    }
}

#[async_trait]
impl StatStore for MemoryStore {
    async fn last_trade_cursor(&self) -> Result<Option<Log_Cursor>, Error> {
        Ok(*self.trade_cursor.lock().unwrap())
    }

    async fn advance_trade_cursor(
        &self,
        cursor: &Log_Cursor,
    ) -> Result<(), Error> {
        let mut stored = self.trade_cursor.lock().unwrap();
        if stored.map_or(true, |stored| stored < *cursor) {
            *stored = Some(*cursor);
        }
        Ok(())
    }

    async fn commit_trade(&self, commit: &Trade_Commit) -> Result<(), Error> {
        let mut cursor = self.trade_cursor.lock().unwrap();
        if cursor.map_or(false, |stored| stored >= commit.cursor) {
            return Err(Error::StorageError(String::from("cursor not moved")));
        }

        let mut staged = self.trade_stats.lock().unwrap().clone();
        for (index, (resolution, bucket, stats)) in
            commit.stats.iter().enumerate()
        {
            let entry = staged.entry((*resolution, *bucket)).or_default();
            for (metric, value) in stats {
                add_stat(entry, metric.to_owned(), value);
            }

            if index == 0 && self.fail_next_commit.swap(false, Ordering::SeqCst)
            {
                return Err(Error::StorageError(String::from(
                    "connection reset",
                )));
            }
        }

        *self.trade_stats.lock().unwrap() = staged;
        self.user_stats.lock().unwrap().insert(
            (commit.user_stats.user_address.to_owned(), commit.user_stats.bucket),
            commit.user_stats.clone(),
        );
        *cursor = Some(commit.cursor);

        Ok(())
    }

    async fn get_user_stats(
        &self,
        user_address: &str,
        bucket: u64,
    ) -> Result<Option<User_Stats>, Error> {
        Ok(self
            .user_stats
            .lock()
            .unwrap()
            .get(&(user_address.to_owned(), bucket))
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn last_processed_category_timestamp(
        &self,
    ) -> Result<Option<u64>, Error> {
        Ok(*self.category_checkpoint.lock().unwrap())
    }

    async fn set_last_processed_category_timestamp(
        &self,
        timestamp: u64,
    ) -> Result<(), Error> {
        *self.category_checkpoint.lock().unwrap() = Some(timestamp);
        Ok(())
    }

    async fn update_address_category(
        &self,
        address: &str,
        category: &str,
    ) -> Result<(), Error> {
        if self.failing_categories.lock().unwrap().contains(address) {
            return Err(Error::StorageError(String::from("deadlock detected")));
        }
        self.categories
            .lock()
            .unwrap()
            .insert(address.to_owned(), category.to_owned());
        Ok(())
    }

    async fn get_address_category(
        &self,
        address: &str,
    ) -> Result<Option<String>, Error> {
        Ok(self.categories.lock().unwrap().get(address).cloned())
    }

    async fn get_user_registration(
        &self,
        address: &str,
    ) -> Result<Option<User_Registration>, Error> {
        if self.failing_users.lock().unwrap().contains(address) {
            return Err(Error::StorageError(String::from("registry offline")));
        }
        Ok(self.registrations.lock().unwrap().get(address).cloned())
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn store_reserve_rates(
        &self,
        reserve_address: &str,
        rates: &Reserve_Rates_Type,
        block_number: u64,
        collected_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        if self.failing_reserves.lock().unwrap().contains(reserve_address) {
            return Err(Error::StorageError(String::from("constraint violated")));
        }

        let mut stored = self.rates.lock().unwrap();
        for (asset, rate) in &rates.rates {
            stored.push(Reserve_Rate {
                reserve_address: reserve_address.to_owned(),
                block_number,
                collected_at,
                asset: asset.to_owned(),
                bid: rate.bid.clone(),
                ask: rate.ask.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// TIMING SIGNALS
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Block,
    Log,
    TradeStats,
    CategoryStats,
    ReserveRates,
}

/// Runner whose signals are fired by the test itself.
#[derive(Debug, Default)]
pub struct ManualRunner {
    senders: Mutex<Option<[Sender<DateTime<Utc>>; 5]>>,
}

impl ManualRunner {
    pub async fn fire(&self, signal: Signal) {
        let sender = {
            let senders = self.senders.lock().unwrap();
            senders.as_ref().map(|senders| senders[signal as usize].clone())
        };

        if let Some(sender) = sender {
            sender.send(Utc::now()).await.unwrap();
        }
    }
}

#[async_trait]
impl Runner for ManualRunner {
    async fn start(&self) -> Result<Tickers, Error> {
        let (block_tx, block) = mpsc::channel(8);
        let (log_tx, log) = mpsc::channel(8);
        let (trade_tx, trade_stats) = mpsc::channel(8);
        let (category_tx, category_stats) = mpsc::channel(8);
        let (rate_tx, reserve_rates) = mpsc::channel(8);

        *self.senders.lock().unwrap() =
            Some([block_tx, log_tx, trade_tx, category_tx, rate_tx]);

        Ok(Tickers {
            block,
            log,
            trade_stats,
            category_stats,
            reserve_rates,
        })
    }

    async fn stop(&self) -> Result<(), Error> {
        self.senders.lock().unwrap().take();
        Ok(())
    }
}
