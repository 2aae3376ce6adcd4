//! Durable records of what a user has paid for.
//!
//! Both record types are append-only: the coordinator inserts them once per
//! committed payment and nothing updates or deletes them afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A category purchase. One row per successful payment, duplicates allowed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct UserPlan {
    pub id: Ulid,
    pub user_id: u64,
    pub category_id: u64,
    pub granted_at: DateTime<Utc>,
}

impl UserPlan {
    pub fn new(user_id: u64, category_id: u64, granted_at: DateTime<Utc>) -> Self {
        Self {
            id: Ulid::new(),
            user_id,
            category_id,
            granted_at,
        }
    }
}

/// A subscription purchase covering `[start_date, end_date)`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct UserSubscription {
    pub id: Ulid,
    pub user_id: u64,
    pub subscription_id: u64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Set at creation and never cleared. Use [`UserSubscription::has_lapsed`]
    /// to decide whether the window is still open.
    pub is_active: bool,
}

impl UserSubscription {
    pub fn new(
        user_id: u64,
        subscription_id: u64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            user_id,
            subscription_id,
            start_date,
            end_date,
            is_active: true,
        }
    }

    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_date
    }
}
