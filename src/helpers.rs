use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::{error::Error, model::Trade_Stats};

/// Log timestamps are millisecond timepoints scaled by 10^6.
pub const TIMESTAMP_SCALE: u64 = 1_000_000;

pub fn parse_tuple_string(data: String) -> Vec<String> {
    if data.is_empty() {
        return vec![];
    }

    let str = &data[1..];
    let splited = str.split(",(");
    let mut items: Vec<String> = Vec::new();

    for c in splited {
        if let Some(index) = c.find(')') {
            let tuple_data = &c[0..index];
            items.push(tuple_data.to_owned());
        }
    }

    items
}

pub fn parse_address_list(data: &str) -> Vec<String> {
    data.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(normalize_address)
        .collect()
}

pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

pub fn to_log_timestamp(time: DateTime<Utc>) -> Result<u64, Error> {
    let millis: u64 = time.timestamp_millis().try_into()?;
    millis.checked_mul(TIMESTAMP_SCALE).ok_or_else(|| {
        Error::ConfigurationError(format!("timestamp out of range: {}", time))
    })
}

/// Converts an integer token amount into human units.
pub fn to_human_amount(amount: &BigDecimal, decimals: u32) -> BigDecimal {
    let (digits, exponent) = amount.as_bigint_and_exponent();
    BigDecimal::new(digits, exponent + i64::from(decimals))
}

pub fn add_stat(stats: &mut Trade_Stats, key: String, value: &BigDecimal) {
    stats
        .entry(key)
        .and_modify(|current| *current += value)
        .or_insert_with(|| value.clone());
}
