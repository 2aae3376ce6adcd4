//! Grant policy: the pure decisions behind a purchase.
//!
//! None of these functions fail. Callers check [`can_afford`] before debiting.

use super::money::Credits;
use chrono::{DateTime, Duration, Utc};

pub fn can_afford(balance: Credits, price: Credits) -> bool {
    balance >= price
}

pub fn compute_new_balance(balance: Credits, price: Credits) -> Credits {
    balance.saturating_sub(price)
}

/// Returns `(start, end)` where `end` is exactly `duration_days * 24h` after `now`.
pub fn compute_subscription_window(
    now: DateTime<Utc>,
    duration_days: u32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(i64::from(duration_days)))
}
