use std::{
    collections::HashMap,
    env::{self, VarError},
    fs, io,
    ops::Deref,
    str::FromStr,
    sync::Arc,
};

use crate::{
    error::Error,
    handler::BlockTracker,
    helpers::{normalize_address, parse_address_list, parse_tuple_string},
    provider::{ChainLogSource, LogStore, RateStore, StatStore, UserStore},
    types::{Asset, ETH_ID},
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

/// Everything a task cycle needs: configuration, the chain source, the
/// stores and the tracked block height.
#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub chain: Arc<dyn ChainLogSource>,
    pub log_storage: Arc<dyn LogStore>,
    pub stat_storage: Arc<dyn StatStore>,
    pub user_storage: Arc<dyn UserStore>,
    pub rate_storage: Arc<dyn RateStore>,
    pub block_tracker: BlockTracker,
}

impl State {
    pub fn new(
        config: Config,
        chain: Arc<dyn ChainLogSource>,
        log_storage: Arc<dyn LogStore>,
        stat_storage: Arc<dyn StatStore>,
        user_storage: Arc<dyn UserStore>,
        rate_storage: Arc<dyn RateStore>,
    ) -> State {
        Self {
            config,
            chain,
            log_storage,
            stat_storage,
            user_storage,
            rate_storage,
            block_tracker: BlockTracker::new(),
        }
    }
}

/// What the log fetcher does with an empty window that ends at the
/// reorg-safe head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveEdge {
    /// Keep re-scanning the head window until it yields logs or falls
    /// behind the head.
    Hold,
    /// Advance to the end of the window regardless.
    Advance,
}

impl FromStr for LiveEdge {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<LiveEdge, Self::Err> {
        match value {
            "hold" => Ok(LiveEdge::Hold),
            "advance" => Ok(LiveEdge::Advance),
            _ => Err(io::Error::other("Live edge policy not supported")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub node_url: String,
    pub timeout: u64,
    pub deploy_block: u64,
    pub reserve_address: String,
    pub third_party_reserves: Vec<String>,
    pub supported_assets: Vec<Asset>,
    pub hash_map_assets: HashMap<String, Asset>,
    pub reorg_safe_blocks: u64,
    pub log_window_blocks: u64,
    pub log_live_edge: LiveEdge,
    pub max_query_range_seconds: u64,
    pub max_tasks: usize,
    pub block_interval: u64,
    pub log_interval: u64,
    pub trade_stats_interval: u64,
    pub category_stats_interval: u64,
    pub rate_interval: u64,
}

impl Config {
    pub fn get_asset_by_address(&self, address: &str) -> Option<&Asset> {
        self.hash_map_assets.get(address)
    }

    pub fn eth(&self) -> Result<&Asset, Error> {
        self.supported_assets
            .iter()
            .find(|asset| asset.is_eth())
            .ok_or_else(|| Error::NotSupportedAsset(String::from(ETH_ID)))
    }

    /// Assets quoted by reserves, i.e. everything but the base asset.
    pub fn rate_assets(&self) -> Vec<Asset> {
        self.supported_assets
            .iter()
            .filter(|asset| !asset.is_eth())
            .cloned()
            .collect()
    }

    /// Third party reserves followed by the primary reserve.
    pub fn reserves(&self) -> Vec<String> {
        let mut reserves = self.third_party_reserves.clone();
        reserves.push(self.reserve_address.to_owned());
        reserves
    }

    pub fn build_asset_map(assets: &[Asset]) -> HashMap<String, Asset> {
        let mut hash_map_assets = HashMap::new();

        for asset in assets {
            hash_map_assets.insert(asset.address().to_owned(), asset.clone());
        }

        hash_map_assets
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    let database_url = env::var("DATABASE_URL")?;
    let node_url = env::var("NODE_URL")?;
    let timeout = env::var("TIMEOUT")?.parse()?;
    let deploy_block = env::var("DEPLOY_BLOCK")?.parse()?;
    let reserve_address = normalize_address(&env::var("RESERVE_ADDRESS")?);
    let third_party_reserves =
        parse_address_list(&optional_var("THIRD_PARTY_RESERVES")?
            .unwrap_or_default());

    let supported_assets = get_supported_assets()?;
    let hash_map_assets = Config::build_asset_map(&supported_assets);

    let reorg_safe_blocks = parse_or("REORG_SAFE_BLOCKS", 7)?;
    let log_window_blocks = parse_or("LOG_WINDOW_BLOCKS", 1440)?;
    let log_live_edge = match optional_var("LOG_LIVE_EDGE")? {
        Some(value) => LiveEdge::from_str(&value)?,
        None => LiveEdge::Hold,
    };
    let max_query_range_seconds =
        parse_or("MAX_QUERY_RANGE_SECONDS", 24 * 60 * 60)?;
    let max_tasks = parse_or("MAX_TASKS", 16)? as usize;

    let block_interval = parse_or("BLOCK_INTERVAL", 5)?;
    let log_interval = parse_or("LOG_INTERVAL", 10)?;
    let trade_stats_interval = parse_or("TRADE_STATS_INTERVAL", 10)?;
    let category_stats_interval = parse_or("CATEGORY_STATS_INTERVAL", 10)?;
    let rate_interval = parse_or("RATE_INTERVAL", 60)?;

    if log_window_blocks == 0 || max_tasks == 0 {
        return Err(Error::ConfigurationError(String::from(
            "LOG_WINDOW_BLOCKS and MAX_TASKS must be positive",
        )));
    }

    let config = Config {
        database_url,
        node_url,
        timeout,
        deploy_block,
        reserve_address,
        third_party_reserves,
        supported_assets,
        hash_map_assets,
        reorg_safe_blocks,
        log_window_blocks,
        log_live_edge,
        max_query_range_seconds,
        max_tasks,
        block_interval,
        log_interval,
        trade_stats_interval,
        category_stats_interval,
        rate_interval,
    };

    config.eth()?;

    Ok(config)
}

pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);

    let config_string = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::Io(e)),
    };

    parse_config_string(config_string);

    Ok(())
}

fn parse_config_string(config: String) {
    let params = config
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .filter_map(|s| s.split_once('='));

    for (key, value) in params {
        env::set_var(key.trim(), value.trim());
    }
}

fn optional_var(key: &str) -> Result<Option<String>, Error> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::VAR(e)),
    }
}

fn parse_or(key: &str, default: u64) -> Result<u64, Error> {
    match optional_var(key)? {
        Some(value) => Ok(value.trim().parse()?),
        None => Ok(default),
    }
}

fn get_supported_assets() -> Result<Vec<Asset>, Error> {
    let mut data: Vec<Asset> = Vec::new();
    let supported_assets = parse_tuple_string(env::var("SUPPORTED_ASSETS")?);

    for c in supported_assets {
        let items: Vec<&str> = c.split(',').map(str::trim).collect();
        if items.len() != 3 {
            return Err(Error::ConfigurationError(format!(
                "Invalid asset entry ({})",
                c
            )));
        }
        let id = items[0].to_owned();
        let address = normalize_address(items[1]);
        let decimals = items[2].parse()?;
        data.push(Asset(id, address, decimals));
    }

    Ok(data)
}
