use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::{sync::mpsc::Receiver, task::JoinHandle};
use tracing::{error, info};

use crate::{
    configuration::{AppState, State},
    error::Error,
    provider::Runner,
};

use super::{
    block_tracker, category_log, log_ingestion, reserve_rates, trade_stats,
};

/// Owns the five periodic tasks and their lifecycle.
#[derive(Debug)]
pub struct Scheduler {
    app_state: AppState<State>,
    runner: Arc<dyn Runner>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(app_state: AppState<State>, runner: Arc<dyn Runner>) -> Self {
        Scheduler {
            app_state,
            runner,
            handles: vec![],
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    pub async fn start(&mut self) -> Result<(), Error> {
        if self.is_running() {
            return Err(Error::TaskError(String::from(
                "scheduler already started",
            )));
        }

        let tickers = self.runner.start().await?;
        let app_state = &self.app_state;

        self.handles = vec![
            spawn_task(
                "BlockTracker",
                tickers.block,
                app_state.clone(),
                block_tracker::fetch_current_block,
            ),
            spawn_task(
                "LogFetcher",
                tickers.log,
                app_state.clone(),
                |app_state, timestamp| async move {
                    log_ingestion::fetch_logs(app_state, timestamp)
                        .await
                        .map(|_| ())
                },
            ),
            spawn_task(
                "TradeStats",
                tickers.trade_stats,
                app_state.clone(),
                |app_state, timestamp| async move {
                    trade_stats::aggregate_trade_logs(app_state, timestamp)
                        .await
                        .map(|_| ())
                },
            ),
            spawn_task(
                "CategoryLog",
                tickers.category_stats,
                app_state.clone(),
                |app_state, timestamp| async move {
                    category_log::process_category_logs(app_state, timestamp)
                        .await
                        .map(|_| ())
                },
            ),
            spawn_task(
                "ReserveRates",
                tickers.reserve_rates,
                app_state.clone(),
                |app_state, timestamp| async move {
                    reserve_rates::fetch_reserve_rates(app_state, timestamp)
                        .await
                        .map(|_| ())
                },
            ),
        ];

        info!("Scheduler started");

        Ok(())
    }

    /// Stops the signal source, then waits for every in-flight cycle to
    /// finish. Every task is joined before the first abnormal exit is
    /// reported.
    pub async fn stop(&mut self) -> Result<(), Error> {
        self.runner.stop().await?;

        let mut failure = None;
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Scheduler - task ended abnormally: {}", e);
                failure.get_or_insert(e);
            }
        }

        info!("Scheduler stopped");

        match failure {
            Some(e) => Err(Error::from(e)),
            None => Ok(()),
        }
    }
}

fn spawn_task<F, Fut>(
    name: &'static str,
    mut ticker: Receiver<DateTime<Utc>>,
    app_state: AppState<State>,
    cycle: F,
) -> JoinHandle<()>
where
    F: Fn(AppState<State>, DateTime<Utc>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(timestamp) = ticker.recv().await {
            if let Err(e) = cycle(app_state.clone(), timestamp).await {
                error!("{} - cycle failed: {}", name, e);
            }
        }
    })
}
