use std::fmt::Debug;

use async_trait::async_trait;

use crate::{
    error::Error,
    model::Raw_Event_Log,
    types::{Asset, Reserve_Rates_Type},
};

/// Read access to the reserve contract on chain.
#[async_trait]
pub trait ChainLogSource: Send + Sync + Debug {
    async fn current_block(&self) -> Result<u64, Error>;

    /// Decoded reserve logs of the blocks in `[from_block, to_block]`.
    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Raw_Event_Log>, Error>;

    async fn get_reserve_rates(
        &self,
        from_block: u64,
        to_block: u64,
        reserve_address: &str,
        assets: &[Asset],
    ) -> Result<Reserve_Rates_Type, Error>;
}
