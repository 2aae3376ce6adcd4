//! JSON seed files: the users, categories and subscriptions a ledger starts from.

use crate::domain::catalog::{Category, Subscription};
use crate::domain::ports::{CatalogStore, LedgerStore};
use crate::domain::user::User;
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

impl Seed {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        serde_json::from_reader(source)
            .map_err(|e| LedgerError::ValidationError(format!("invalid seed file: {e}")))
    }

    /// Writes the catalog first, then all users in one unit of work.
    ///
    /// Every record is validated before anything is written, except that a
    /// subscription may reference a category that already exists in the store.
    pub async fn apply(self, ledger: &dyn LedgerStore, catalog: &dyn CatalogStore) -> Result<()> {
        for user in &self.users {
            user.validate()?;
        }
        for category in &self.categories {
            category.validate()?;
        }
        for subscription in &self.subscriptions {
            subscription.validate()?;
            let seeded = self
                .categories
                .iter()
                .any(|c| c.id == subscription.category_id);
            if !seeded && catalog.get_category(subscription.category_id).await?.is_none() {
                return Err(LedgerError::ValidationError(format!(
                    "subscription {} references unknown category {}",
                    subscription.id, subscription.category_id
                )));
            }
        }

        let (users, categories, subscriptions) =
            (self.users.len(), self.categories.len(), self.subscriptions.len());

        for category in self.categories {
            catalog.put_category(category).await?;
        }
        for subscription in self.subscriptions {
            catalog.put_subscription(subscription).await?;
        }

        let mut tx = ledger.begin().await?;
        for user in self.users {
            tx.save_user(user).await?;
        }
        tx.commit().await?;

        tracing::info!(users, categories, subscriptions, "seed applied");
        Ok(())
    }
}
