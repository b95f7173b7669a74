use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::{
    configuration::Config,
    error::{self, Error},
    model::Raw_Event_Log,
    types::{Asset, Reserve_Rates_Type, RpcBody, RpcRequest},
};

use super::ChainLogSource;

/// JSON-RPC client of the node and its reserve log gateway.
#[derive(Debug)]
pub struct HTTP {
    pub config: Config,
    pub http: Client,
    node_url: Url,
    id: AtomicU64,
}

impl HTTP {
    pub fn new(config: Config) -> Result<HTTP, Error> {
        let node_url = Url::parse(&config.node_url)?;
        let http = match Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                return Err(error::Error::ReqwestError(e));
            },
        };

        Ok(HTTP {
            config,
            http,
            node_url,
            id: AtomicU64::new(1),
        })
    }

    async fn call<P, T>(&self, method: &str, params: P) -> Result<T, Error>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.id.fetch_add(1, Ordering::SeqCst),
            method,
            params,
        };

        debug!("rpc {} #{}", method, request.id);

        let body = self
            .http
            .post(self.node_url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<RpcBody<T>>()
            .await?;

        if let Some(error) = body.error {
            return Err(Error::ChainError(format!(
                "{} failed with code {}: {}",
                method, error.code, error.message
            )));
        }

        body.result.ok_or_else(|| {
            Error::ChainError(format!("{} returned an empty result", method))
        })
    }
}

#[async_trait]
impl ChainLogSource for HTTP {
    async fn current_block(&self) -> Result<u64, Error> {
        let height: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&height)
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Raw_Event_Log>, Error> {
        self.call(
            "reserve_getLogs",
            json!([to_quantity(from_block), to_quantity(to_block)]),
        )
        .await
    }

    async fn get_reserve_rates(
        &self,
        from_block: u64,
        to_block: u64,
        reserve_address: &str,
        assets: &[Asset],
    ) -> Result<Reserve_Rates_Type, Error> {
        let assets: Vec<&str> = assets.iter().map(Asset::address).collect();

        self.call(
            "reserve_getRates",
            json!([
                to_quantity(from_block),
                to_quantity(to_block),
                reserve_address,
                assets
            ]),
        )
        .await
    }
}

pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

pub fn parse_quantity(value: &str) -> Result<u64, Error> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| Error::ChainError(format!("bad quantity {}", value)))?;

    Ok(u64::from_str_radix(digits, 16)?)
}
