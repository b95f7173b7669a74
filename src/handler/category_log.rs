use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::{normalize_address, to_log_timestamp},
};

use super::time_window::{
    empty_window_checkpoint, processed_checkpoint, time_window,
};

/// Applies newly stored category changes, last write wins per address.
pub async fn process_category_logs(
    app_state: AppState<State>,
    timestamp: DateTime<Utc>,
) -> Result<Option<u64>, Error> {
    let log_storage = &app_state.log_storage;
    let user_storage = &app_state.user_storage;

    let last_processed =
        user_storage.last_processed_category_timestamp().await?;
    let from = match last_processed {
        Some(last) => last.checked_add(1),
        None => log_storage
            .get_first_category_log()
            .await?
            .map(|log| log.timestamp),
    };
    let now = to_log_timestamp(timestamp)?;

    let window = match from.and_then(|from| {
        time_window(from, now, log_storage.max_query_range())
    }) {
        Some(window) => window,
        None => {
            debug!("CategoryLog - nothing to process");
            return Ok(None);
        },
    };

    let logs = log_storage.get_category_logs(window.from, window.to).await?;
    info!(
        "CategoryLog - window {}..={}: {} logs",
        window.from,
        window.to,
        logs.len()
    );

    let next = if logs.is_empty() {
        let last_log = log_storage
            .get_last_category_log()
            .await?
            .map(|log| log.timestamp);
        empty_window_checkpoint(&window, last_log)
    } else {
        let mut last_success = None;
        let mut first_failure = None;

        for log in &logs {
            let address = normalize_address(&log.address);
            match user_storage
                .update_address_category(&address, &log.category)
                .await
            {
                Ok(()) => last_success = Some(log.timestamp),
                Err(e) => {
                    error!(
                        "CategoryLog - {} -> {} failed: {}",
                        address, log.category, e
                    );
                    first_failure = Some(log.timestamp);
                    break;
                },
            }
        }

        processed_checkpoint(last_success, first_failure)
    };

    match next {
        Some(next) if last_processed.map_or(true, |last| next > last) => {
            user_storage
                .set_last_processed_category_timestamp(next)
                .await?;
            Ok(Some(next))
        },
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        handler::testing::{
            category, test_config, test_state, MemoryChain, MemoryStore, ETH,
            KNC, USDC,
        },
        provider::UserStore,
    };

    fn app(store: Arc<MemoryStore>) -> AppState<State> {
        test_state(test_config(), Arc::new(MemoryChain::default()), store)
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(10_000).unwrap()
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = Arc::new(MemoryStore::with_max_range(u64::MAX));
        store.category_logs.lock().unwrap().extend([
            category(10, 1_000, &KNC.to_uppercase().replace("0X", "0x"), "0x2"),
            category(11, 2_000, KNC, "0x4"),
        ]);

        let next = process_category_logs(app(store.clone()), now())
            .await
            .unwrap();

        assert_eq!(next, Some(2_000));
        assert_eq!(
            store.categories.lock().unwrap().get(KNC),
            Some(&String::from("0x4"))
        );
        assert_eq!(store.categories.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resumes_after_checkpoint() {
        let store = Arc::new(MemoryStore::with_max_range(u64::MAX));
        *store.category_checkpoint.lock().unwrap() = Some(2_000);
        store.category_logs.lock().unwrap().extend([
            category(11, 2_000, KNC, "0x4"),
            category(12, 3_000, KNC, "0x1"),
        ]);

        let next = process_category_logs(app(store.clone()), now())
            .await
            .unwrap();

        assert_eq!(next, Some(3_000));
        assert_eq!(
            store.categories.lock().unwrap().get(KNC),
            Some(&String::from("0x1"))
        );
    }

    #[tokio::test]
    async fn test_window_clamped_to_max_range() {
        let store = Arc::new(MemoryStore::with_max_range(500));
        store.category_logs.lock().unwrap().extend([
            category(10, 1_000, KNC, "0x2"),
            category(11, 2_000, KNC, "0x4"),
        ]);

        let app_state = app(store.clone());
        let next = process_category_logs(app_state.clone(), now())
            .await
            .unwrap();
        assert_eq!(next, Some(1_000));

        // 1_001..=1_501 is empty but older than the newest log
        let next = process_category_logs(app_state.clone(), now())
            .await
            .unwrap();
        assert_eq!(next, Some(1_501));

        let next = process_category_logs(app_state, now()).await.unwrap();
        assert_eq!(next, Some(2_000));
        assert_eq!(
            store.categories.lock().unwrap().get(KNC),
            Some(&String::from("0x4"))
        );
    }

    #[tokio::test]
    async fn test_failure_stops_before_failed_log() {
        let store = Arc::new(MemoryStore::with_max_range(u64::MAX));
        store
            .failing_categories
            .lock()
            .unwrap()
            .insert(USDC.to_owned());
        store.category_logs.lock().unwrap().extend([
            category(10, 1_000, KNC, "0x2"),
            category(11, 2_000, ETH, "0x3"),
            category(11, 2_000, USDC, "0x4"),
            category(12, 3_000, KNC, "0x5"),
        ]);
        // same block, later transaction
        store.category_logs.lock().unwrap()[2].tx_index = 2;

        let app_state = app(store.clone());
        let next = process_category_logs(app_state.clone(), now())
            .await
            .unwrap();

        assert_eq!(next, Some(1_999));
        assert_eq!(*store.category_checkpoint.lock().unwrap(), Some(1_999));
        assert_eq!(
            store.get_address_category(KNC).await.unwrap(),
            Some(String::from("0x2"))
        );
        assert_eq!(store.get_address_category(USDC).await.unwrap(), None);

        store.failing_categories.lock().unwrap().clear();
        let next = process_category_logs(app_state, now()).await.unwrap();

        assert_eq!(next, Some(3_000));
        assert_eq!(
            store.get_address_category(ETH).await.unwrap(),
            Some(String::from("0x3"))
        );
        assert_eq!(
            store.get_address_category(USDC).await.unwrap(),
            Some(String::from("0x4"))
        );
        assert_eq!(
            store.get_address_category(KNC).await.unwrap(),
            Some(String::from("0x5"))
        );
    }

    #[tokio::test]
    async fn test_first_log_failure_keeps_checkpoint() {
        let store = Arc::new(MemoryStore::with_max_range(u64::MAX));
        *store.category_checkpoint.lock().unwrap() = Some(500);
        store
            .failing_categories
            .lock()
            .unwrap()
            .insert(KNC.to_owned());
        store
            .category_logs
            .lock()
            .unwrap()
            .push(category(10, 1_000, KNC, "0x2"));

        let next = process_category_logs(app(store.clone()), now())
            .await
            .unwrap();

        assert_eq!(next, None);
        assert_eq!(*store.category_checkpoint.lock().unwrap(), Some(500));
        assert_eq!(store.get_address_category(KNC).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_window_at_live_edge_holds() {
        let store = Arc::new(MemoryStore::with_max_range(u64::MAX));
        *store.category_checkpoint.lock().unwrap() = Some(2_000);
        store
            .category_logs
            .lock()
            .unwrap()
            .push(category(11, 2_000, KNC, "0x4"));

        let app_state = app(store.clone());
        for _ in 0..2 {
            let next = process_category_logs(app_state.clone(), now())
                .await
                .unwrap();
            assert_eq!(next, None);
        }

        assert_eq!(*store.category_checkpoint.lock().unwrap(), Some(2_000));
        assert!(store.categories.lock().unwrap().is_empty());
    }
}
