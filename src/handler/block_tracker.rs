use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::{
    configuration::{AppState, State},
    error::Error,
};

/// Last observed chain height, shared by every task. A height of zero
/// means nothing has been observed yet.
#[derive(Debug, Default)]
pub struct BlockTracker {
    current_block: AtomicU64,
    updated_at: AtomicI64,
}

impl BlockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_block(&self) -> u64 {
        self.current_block.load(Ordering::Acquire)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self.updated_at.load(Ordering::Acquire) {
            0 => None,
            millis => DateTime::from_timestamp_millis(millis),
        }
    }

    pub fn update(&self, block: u64, observed_at: DateTime<Utc>) {
        self.updated_at
            .store(observed_at.timestamp_millis(), Ordering::Release);
        self.current_block.store(block, Ordering::Release);
    }
}

/// Refreshes the tracked height. A failed query keeps the previous value.
pub async fn fetch_current_block(
    app_state: AppState<State>,
    timestamp: DateTime<Utc>,
) -> Result<(), Error> {
    match fetch_insert(&app_state, timestamp).await {
        Ok(block) => {
            info!("BlockTracker - current block {}", block);
        },
        Err(e) => {
            error!(
                "BlockTracker - keeping block {}: {}",
                app_state.block_tracker.current_block(),
                e
            );
        },
    };

    Ok(())
}

pub async fn fetch_insert(
    app_state: &AppState<State>,
    timestamp: DateTime<Utc>,
) -> Result<u64, Error> {
    let block = app_state.chain.current_block().await?;
    app_state.block_tracker.update(block, timestamp);
    Ok(block)
}
