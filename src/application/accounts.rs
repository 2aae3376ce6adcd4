use crate::domain::catalog::Category;
use crate::domain::grant::{UserPlan, UserSubscription};
use crate::domain::ports::{CatalogStoreBox, LedgerStoreBox};
use crate::domain::user::{UpdateUser, User};
use crate::error::{EntityKind, LedgerError, Result};
use chrono::{DateTime, Utc};

/// A user's grant records, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseHistory {
    pub plans: Vec<UserPlan>,
    pub subscriptions: Vec<UserSubscription>,
}

/// User-facing account operations that sit next to payments: profile and
/// balance updates, and the read side of grants.
pub struct AccountService {
    store: LedgerStoreBox,
    catalog: CatalogStoreBox,
}

impl AccountService {
    pub fn new(store: LedgerStoreBox, catalog: CatalogStoreBox) -> Self {
        Self { store, catalog }
    }

    pub async fn get_user(&self, user_id: u64) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::User, user_id))
    }

    /// Applies a partial update in its own unit of work. This is also how a
    /// balance is topped up.
    pub async fn update_user(&self, user_id: u64, update: UpdateUser) -> Result<User> {
        if update.is_empty() {
            return Err(LedgerError::ValidationError(
                "no fields to update".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let Some(mut user) = tx.load_user(user_id).await? else {
            tx.rollback().await;
            return Err(LedgerError::not_found(EntityKind::User, user_id));
        };
        if let Err(e) = update.apply(&mut user) {
            tx.rollback().await;
            return Err(e);
        }
        if let Err(e) = tx.save_user(user.clone()).await {
            tx.rollback().await;
            return Err(e);
        }
        tx.commit().await?;

        tracing::info!(user_id, balance = %user.balance, "user updated");
        Ok(user)
    }

    /// Resolves the user's current category pointer against the catalog.
    pub async fn current_category(&self, user_id: u64) -> Result<Option<Category>> {
        let user = self.get_user(user_id).await?;
        match user.category_id {
            Some(category_id) => self.catalog.get_category(category_id).await,
            None => Ok(None),
        }
    }

    pub async fn purchase_history(&self, user_id: u64) -> Result<PurchaseHistory> {
        // unknown users are an error, not an empty history
        self.get_user(user_id).await?;
        let mut plans = self.store.user_plans(user_id).await?;
        let mut subscriptions = self.store.user_subscriptions(user_id).await?;
        plans.sort_by_key(|p| (p.granted_at, p.id));
        subscriptions.sort_by_key(|s| (s.start_date, s.id));
        Ok(PurchaseHistory {
            plans,
            subscriptions,
        })
    }

    /// Subscriptions whose window is still open at `now`. The stored `is_active`
    /// flag is not consulted; it is never cleared.
    pub async fn active_subscriptions(
        &self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserSubscription>> {
        let history = self.purchase_history(user_id).await?;
        Ok(history
            .subscriptions
            .into_iter()
            .filter(|s| !s.has_lapsed(now))
            .collect())
    }
}
