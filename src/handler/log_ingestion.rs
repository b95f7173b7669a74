use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    configuration::{AppState, LiveEdge, State},
    error::Error,
    model::Raw_Event_Log,
};

/// Inclusive block range requested in one ingestion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block_Window {
    pub from: u64,
    pub to: u64,
    pub safe_head: u64,
}

/// Next range to scan, or `None` when the reorg-safe head has not moved
/// past the checkpoint.
pub fn ingestion_window(
    last_ingested: Option<u64>,
    deploy_block: u64,
    current_block: u64,
    reorg_safe_blocks: u64,
    window_blocks: u64,
) -> Option<Block_Window> {
    let from = match last_ingested {
        Some(block) => block.checked_add(1)?,
        None => deploy_block,
    };
    let safe_head = current_block.checked_sub(reorg_safe_blocks)?;
    let to = from
        .saturating_add(window_blocks.saturating_sub(1))
        .min(safe_head);

    if from > to {
        return None;
    }

    Some(Block_Window {
        from,
        to,
        safe_head,
    })
}

/// Checkpoint to persist after a successful fetch of `window`.
pub fn next_checkpoint(
    window: &Block_Window,
    found_logs: bool,
    live_edge: LiveEdge,
) -> Option<u64> {
    if !found_logs
        && live_edge == LiveEdge::Hold
        && window.to == window.safe_head
    {
        return None;
    }

    Some(window.to)
}

/// One ingestion cycle. Returns the persisted checkpoint, if it moved.
pub async fn fetch_logs(
    app_state: AppState<State>,
    timestamp: DateTime<Utc>,
) -> Result<Option<u64>, Error> {
    let tracker = &app_state.block_tracker;
    if tracker.updated_at().is_none() {
        info!("LogFetcher - no block observed yet, skipping");
        return Ok(None);
    }

    let config = &app_state.config;
    let current_block = tracker.current_block();
    let last_ingested = app_state.log_storage.last_ingested_block().await?;

    let window = match ingestion_window(
        last_ingested,
        config.deploy_block,
        current_block,
        config.reorg_safe_blocks,
        config.log_window_blocks,
    ) {
        Some(window) => window,
        None => {
            info!(
                "LogFetcher - nothing to fetch, checkpoint {:?}, head {}",
                last_ingested, current_block
            );
            return Ok(None);
        },
    };

    let mut logs = app_state.chain.get_logs(window.from, window.to).await?;
    let received = logs.len();

    logs.retain(|log| log.block_number() <= window.to);
    if logs.len() < received {
        warn!(
            "LogFetcher - dropped {} logs past block {}",
            received - logs.len(),
            window.to
        );
    }

    logs.sort_by_key(Raw_Event_Log::position);

    let failed = store_logs(&app_state, &logs, timestamp).await;
    info!(
        "LogFetcher - blocks {}..={}: {} logs, {} failed",
        window.from,
        window.to,
        logs.len(),
        failed
    );

    let next =
        match next_checkpoint(&window, !logs.is_empty(), config.log_live_edge) {
            Some(next) => next,
            None => {
                info!(
                    "LogFetcher - empty window at safe head {}, holding",
                    window.safe_head
                );
                return Ok(None);
            },
        };

    app_state
        .log_storage
        .update_ingested_block(next, timestamp)
        .await?;

    info!(
        "LogFetcher - checkpoint {} is {} blocks behind head {}",
        next,
        current_block.saturating_sub(next),
        current_block
    );

    Ok(Some(next))
}

async fn store_logs(
    app_state: &AppState<State>,
    logs: &[Raw_Event_Log],
    timestamp: DateTime<Utc>,
) -> usize {
    let mut failed = 0;

    for log in logs {
        let result = match log {
            Raw_Event_Log::Trade(trade) => {
                app_state
                    .log_storage
                    .store_trade_log(trade, timestamp)
                    .await
            },
            Raw_Event_Log::Category(category) => {
                app_state.log_storage.store_category_log(category).await
            },
        };

        if let Err(e) = result {
            failed += 1;
            warn!(
                "LogFetcher - could not store log at {:?}: {}",
                log.position(),
                e
            );
        }
    }

    failed
}
