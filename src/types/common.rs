//! Consolidated types for configuration tables and chain RPC responses

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// COMMON TYPES
// =============================================================================

pub const ETH_ID: &str = "ETH";

/// Supported asset: (id, lower-case contract address, decimals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset(pub String, pub String, pub u32);

impl Asset {
    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn address(&self) -> &str {
        &self.1
    }

    pub fn decimals(&self) -> u32 {
        self.2
    }

    pub fn is_eth(&self) -> bool {
        self.0 == ETH_ID
    }
}

// =============================================================================
// BLOCKCHAIN RPC TYPES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'a str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

#[derive(Debug, Deserialize)]
pub struct RpcBody<T> {
    pub jsonrpc: String,
    pub id: u64,
    pub result: Option<T>,
    pub error: Option<BodyError>,
}

#[derive(Debug, Deserialize)]
pub struct BodyError {
    pub code: i64,
    pub message: String,
}

// =============================================================================
// RESERVE RATES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Rate_Entry {
    pub bid: BigDecimal,
    pub ask: BigDecimal,
}

/// Rates of one reserve at one block, keyed by asset id.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Reserve_Rates_Type {
    pub block_number: u64,
    pub rates: HashMap<String, Rate_Entry>,
}
