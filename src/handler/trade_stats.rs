use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::{
    configuration::{AppState, Config, State},
    error::Error,
    helpers::{add_stat, normalize_address, to_human_amount, to_log_timestamp},
    model::{
        Log_Cursor, Resolution, Trade_Commit, Trade_Log, Trade_Stats,
        User_Stats,
    },
};

use super::time_window::{empty_window_checkpoint, time_window};

/// Metric deltas contributed by one trade.
#[derive(Debug, Default, PartialEq)]
pub struct Trade_Contribution {
    /// Recorded at minute, hour and day resolution.
    pub bucketed: Trade_Stats,
    /// Recorded at day resolution only.
    pub totals: Trade_Stats,
    pub eth_amount: BigDecimal,
}

/// A user counts as verified only with a real email, registered strictly
/// before the trade.
pub fn is_kyced(
    email: &str,
    user_address: &str,
    registered_at: u64,
    trade_timestamp: u64,
) -> bool {
    !email.is_empty()
        && normalize_address(email) != user_address
        && trade_timestamp > registered_at
}

pub fn trade_contribution(
    config: &Config,
    trade: &Trade_Log,
) -> Result<Trade_Contribution, Error> {
    let eth = config.eth()?;
    let zero = BigDecimal::from(0);

    let src = normalize_address(&trade.src_address);
    let dst = normalize_address(&trade.dst_address);
    let reserve = normalize_address(&trade.reserve_address);
    let wallet = normalize_address(&trade.wallet_address);
    let user = normalize_address(&trade.user_address);

    let mut eth_amount = zero.clone();
    let mut token: Option<&str> = None;

    let mut amount_of = |address: &str, raw: &BigDecimal| {
        match config.get_asset_by_address(address) {
            Some(asset) => {
                let amount = to_human_amount(raw, asset.decimals());
                if asset.is_eth() {
                    eth_amount = amount.clone();
                }
                amount
            },
            None => {
                debug!("TradeStats - unknown asset {}", address);
                zero.clone()
            },
        }
    };

    let src_amount = amount_of(&src, &trade.src_amount);
    let dst_amount = amount_of(&dst, &trade.dst_amount);

    for address in [&src, &dst] {
        if let Some(asset) = config.get_asset_by_address(address) {
            if !asset.is_eth() {
                token = Some(asset.address());
            }
        }
    }

    let burn_fee = trade
        .burn_fee
        .as_ref()
        .map(|fee| to_human_amount(fee, eth.decimals()))
        .unwrap_or_else(|| zero.clone());
    let wallet_fee = trade
        .wallet_fee
        .as_ref()
        .map(|fee| to_human_amount(fee, eth.decimals()))
        .unwrap_or_else(|| zero.clone());

    let mut bucketed = Trade_Stats::new();
    add_stat(&mut bucketed, format!("assets_volume_{}", src), &src_amount);
    add_stat(&mut bucketed, format!("assets_volume_{}", dst), &dst_amount);
    if let Some(token) = token {
        add_stat(
            &mut bucketed,
            format!("assets_eth_amount_{}", token),
            &eth_amount,
        );
    }
    add_stat(
        &mut bucketed,
        format!("assets_usd_amount_{}", src),
        &trade.fiat_amount,
    );
    add_stat(
        &mut bucketed,
        format!("assets_usd_amount_{}", dst),
        &trade.fiat_amount,
    );
    add_stat(&mut bucketed, format!("burn_fee_{}", reserve), &burn_fee);
    add_stat(
        &mut bucketed,
        format!("wallet_fee_{}_{}", reserve, wallet),
        &wallet_fee,
    );
    add_stat(
        &mut bucketed,
        format!("user_volume_{}", user),
        &trade.fiat_amount,
    );

    let mut totals = Trade_Stats::new();
    add_stat(&mut totals, String::from("eth_volume"), &eth_amount);
    add_stat(&mut totals, String::from("usd_volume"), &trade.fiat_amount);
    add_stat(&mut totals, String::from("burn_fee"), &burn_fee);
    add_stat(&mut totals, String::from("trade_count"), &BigDecimal::from(1));

    Ok(Trade_Contribution {
        bucketed,
        totals,
        eth_amount,
    })
}

/// One aggregation cycle. Each trade is committed together with the cursor
/// that moves past it, so a trade is never counted twice. Returns the
/// timestamp of the persisted cursor, if it moved.
pub async fn aggregate_trade_logs(
    app_state: AppState<State>,
    timestamp: DateTime<Utc>,
) -> Result<Option<u64>, Error> {
    let log_storage = &app_state.log_storage;
    let stat_storage = &app_state.stat_storage;

    let cursor = stat_storage.last_trade_cursor().await?;
    let from = match cursor {
        Some(cursor) => Some(cursor.timestamp),
        None => log_storage
            .get_first_trade_log()
            .await?
            .map(|log| log.timestamp),
    };
    let now = to_log_timestamp(timestamp)?;

    let window = match from.and_then(|from| {
        time_window(from, now, log_storage.max_query_range())
    }) {
        Some(window) => window,
        None => {
            debug!("TradeStats - nothing to aggregate");
            return Ok(None);
        },
    };

    let mut logs = log_storage.get_trade_logs(window.from, window.to).await?;
    logs.retain(|log| {
        cursor.map_or(true, |cursor| Log_Cursor::of(log) > cursor)
    });
    info!(
        "TradeStats - window {}..={}: {} logs",
        window.from,
        window.to,
        logs.len()
    );

    if logs.is_empty() {
        let last_log = log_storage
            .get_last_trade_log()
            .await?
            .map(|log| log.timestamp);

        let next = empty_window_checkpoint(&window, last_log)
            .map(Log_Cursor::after)
            .filter(|next| cursor.map_or(true, |cursor| *next > cursor));

        return match next {
            Some(next) => {
                stat_storage.advance_trade_cursor(&next).await?;
                Ok(Some(next.timestamp))
            },
            None => Ok(None),
        };
    }

    let mut committed = None;
    for trade in &logs {
        match aggregate_trade_log(&app_state, trade).await {
            Ok(()) => committed = Some(trade.timestamp),
            Err(e) => {
                error!(
                    "TradeStats - trade {} at {} failed: {}",
                    trade.tx_hash, trade.timestamp, e
                );
                break;
            },
        }
    }

    Ok(committed)
}

/// Folds one trade into the bucketed counters and the user record, and
/// moves the cursor past it.
pub async fn aggregate_trade_log(
    app_state: &AppState<State>,
    trade: &Trade_Log,
) -> Result<(), Error> {
    let contribution = trade_contribution(&app_state.config, trade)?;
    let user_stats = merge_user_stats(app_state, trade, &contribution).await?;

    let stats = Resolution::ALL
        .into_iter()
        .map(|resolution| {
            let mut stats = contribution.bucketed.clone();
            if resolution == Resolution::Day {
                for (metric, value) in &contribution.totals {
                    add_stat(&mut stats, metric.to_owned(), value);
                }
            }
            (resolution, resolution.bucket_start(trade.timestamp), stats)
        })
        .collect();

    app_state
        .stat_storage
        .commit_trade(&Trade_Commit {
            cursor: Log_Cursor::of(trade),
            stats,
            user_stats,
        })
        .await
}

async fn merge_user_stats(
    app_state: &AppState<State>,
    trade: &Trade_Log,
    contribution: &Trade_Contribution,
) -> Result<User_Stats, Error> {
    let user = normalize_address(&trade.user_address);
    let bucket = Resolution::Day.bucket_start(trade.timestamp);

    let registration =
        app_state.user_storage.get_user_registration(&user).await?;
    let mut stats = app_state
        .stat_storage
        .get_user_stats(&user, bucket)
        .await?
        .unwrap_or_else(|| User_Stats::empty(&user, bucket));

    if let Some(registration) = registration {
        stats.kyced = stats.kyced
            || is_kyced(
                &registration.email,
                &user,
                registration.registered_at,
                trade.timestamp,
            );
        stats.email = registration.email;
    }

    stats.trade_count += 1;
    stats.usd_volume += &trade.fiat_amount;
    stats.eth_volume += &contribution.eth_amount;

    Ok(stats)
}
