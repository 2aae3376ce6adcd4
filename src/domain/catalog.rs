use super::money::Credits;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// A purchasable bundle of exercise and meal plans.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Credits,
}

impl Category {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::ValidationError(format!(
                "category {} has an empty name",
                self.id
            )));
        }
        Ok(())
    }
}

/// Longest subscription the catalog accepts, one hundred years.
pub const MAX_DURATION_DAYS: u32 = 36_500;

/// A timed access offer attached to a category.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Subscription {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Credits,
    pub duration_days: u32,
    pub category_id: u64,
}

impl Subscription {
    pub fn validate(&self) -> Result<()> {
        let problem = if self.name.trim().is_empty() {
            Some("empty name")
        } else if self.price == Credits::ZERO {
            Some("zero price")
        } else if self.duration_days == 0 {
            Some("zero duration")
        } else if self.duration_days > MAX_DURATION_DAYS {
            Some("a duration longer than 100 years")
        } else {
            None
        };

        match problem {
            Some(problem) => Err(LedgerError::ValidationError(format!(
                "subscription {} has {problem}",
                self.id
            ))),
            None => Ok(()),
        }
    }
}
