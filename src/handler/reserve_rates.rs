use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::{
    configuration::{AppState, State},
    error::Error,
    futures_set::join_all_bounded,
    types::Reserve_Rates_Type,
};

/// Queries every reserve at the same height, waits for all of them, then
/// stores the snapshots that succeeded. Returns how many were stored.
pub async fn fetch_reserve_rates(
    app_state: AppState<State>,
    timestamp: DateTime<Utc>,
) -> Result<usize, Error> {
    let tracker = &app_state.block_tracker;
    let block = tracker.current_block();

    if tracker.updated_at().is_none() || block == 0 {
        info!("ReserveRates - no block observed yet, skipping");
        return Ok(0);
    }

    let config = &app_state.config;
    let assets = Arc::new(config.rate_assets());
    let capacity = NonZeroUsize::new(config.max_tasks).unwrap_or(NonZeroUsize::MIN);

    let queries = config.reserves().into_iter().map(|reserve| {
        let chain = app_state.chain.clone();
        let assets = assets.clone();
        async move {
            let rates = chain
                .get_reserve_rates(block - 1, block, &reserve, &assets)
                .await;
            (reserve, rates)
        }
    });

    let snapshots: HashMap<String, Reserve_Rates_Type> = join_all_bounded(
        queries,
        capacity,
        HashMap::new(),
        |mut snapshots, (reserve, rates)| {
            match rates {
                Ok(rates) => {
                    snapshots.insert(reserve, rates);
                },
                Err(e) => {
                    error!("ReserveRates - {} at block {}: {}", reserve, block, e);
                },
            };
            snapshots
        },
    )
    .await?;

    let mut stored = 0;
    for (reserve, rates) in &snapshots {
        match app_state
            .rate_storage
            .store_reserve_rates(reserve, rates, block, timestamp)
            .await
        {
            Ok(()) => stored += 1,
            Err(e) => {
                error!("ReserveRates - could not store {}: {}", reserve, e);
            },
        }
    }

    info!(
        "ReserveRates - block {}: {} of {} reserves stored",
        block,
        stored,
        config.reserves().len()
    );

    Ok(stored)
}
