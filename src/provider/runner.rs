use std::{fmt::Debug, sync::Mutex, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{
    sync::mpsc::{self, error::TrySendError, Receiver, Sender},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::info;

use crate::{configuration::Config, error::Error};

/// One receiver per periodic task. Each receiver yields the time the
/// signal fired.
#[derive(Debug)]
pub struct Tickers {
    pub block: Receiver<DateTime<Utc>>,
    pub log: Receiver<DateTime<Utc>>,
    pub trade_stats: Receiver<DateTime<Utc>>,
    pub category_stats: Receiver<DateTime<Utc>>,
    pub reserve_rates: Receiver<DateTime<Utc>>,
}

/// Source of the timing signals driving the scheduler.
#[async_trait]
pub trait Runner: Send + Sync + Debug {
    async fn start(&self) -> Result<Tickers, Error>;

    /// Stops producing signals; every receiver handed out by `start`
    /// terminates once drained.
    async fn stop(&self) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy)]
pub struct Intervals {
    pub block: Duration,
    pub log: Duration,
    pub trade_stats: Duration,
    pub category_stats: Duration,
    pub reserve_rates: Duration,
}

impl Intervals {
    pub fn from_config(config: &Config) -> Self {
        Intervals {
            block: Duration::from_secs(config.block_interval),
            log: Duration::from_secs(config.log_interval),
            trade_stats: Duration::from_secs(config.trade_stats_interval),
            category_stats: Duration::from_secs(
                config.category_stats_interval,
            ),
            reserve_rates: Duration::from_secs(config.rate_interval),
        }
    }
}

/// Ticker backed runner. A signal that fires while the previous one is
/// still unconsumed is dropped.
#[derive(Debug)]
pub struct IntervalRunner {
    intervals: Intervals,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl IntervalRunner {
    pub fn new(intervals: Intervals) -> Self {
        IntervalRunner {
            intervals,
            handles: Mutex::new(vec![]),
        }
    }

    fn spawn_ticker(
        period: Duration,
    ) -> (JoinHandle<()>, Receiver<DateTime<Utc>>) {
        let (sender, receiver) = mpsc::channel(1);
        let handle = tokio::spawn(tick(period, sender));
        (handle, receiver)
    }
}

async fn tick(period: Duration, sender: Sender<DateTime<Utc>>) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match sender.try_send(Utc::now()) {
            Ok(()) | Err(TrySendError::Full(_)) => {},
            Err(TrySendError::Closed(_)) => break,
        }
    }
}

#[async_trait]
impl Runner for IntervalRunner {
    async fn start(&self) -> Result<Tickers, Error> {
        let mut handles = self
            .handles
            .lock()
            .map_err(|e| Error::RunnerError(e.to_string()))?;

        if !handles.is_empty() {
            return Err(Error::RunnerError(String::from(
                "runner already started",
            )));
        }

        let (block_handle, block) = Self::spawn_ticker(self.intervals.block);
        let (log_handle, log) = Self::spawn_ticker(self.intervals.log);
        let (trade_handle, trade_stats) =
            Self::spawn_ticker(self.intervals.trade_stats);
        let (category_handle, category_stats) =
            Self::spawn_ticker(self.intervals.category_stats);
        let (rate_handle, reserve_rates) =
            Self::spawn_ticker(self.intervals.reserve_rates);

        handles.extend([
            block_handle,
            log_handle,
            trade_handle,
            category_handle,
            rate_handle,
        ]);

        info!("Interval runner started");

        Ok(Tickers {
            block,
            log,
            trade_stats,
            category_stats,
            reserve_rates,
        })
    }

    async fn stop(&self) -> Result<(), Error> {
        let handles: Vec<JoinHandle<()>> = {
            let mut handles = self
                .handles
                .lock()
                .map_err(|e| Error::RunnerError(e.to_string()))?;
            handles.drain(..).collect()
        };

        for handle in &handles {
            handle.abort();
        }

        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    return Err(Error::TokioJoinError(e));
                }
            }
        }

        info!("Interval runner stopped");

        Ok(())
    }
}
