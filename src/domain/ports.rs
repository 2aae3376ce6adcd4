use super::catalog::{Category, Subscription};
use super::grant::{UserPlan, UserSubscription};
use super::user::User;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// One unit of work against the ledger.
///
/// Writes are staged and only become visible to other readers on [`LedgerTx::commit`].
/// Rolling back, or dropping the value without committing, discards them. Loads see
/// writes staged earlier in the same unit of work.
#[async_trait]
pub trait LedgerTx: Send {
    async fn load_user(&mut self, id: u64) -> Result<Option<User>>;
    async fn load_category(&mut self, id: u64) -> Result<Option<Category>>;
    async fn save_user(&mut self, user: User) -> Result<()>;
    async fn insert_user_plan(&mut self, plan: UserPlan) -> Result<()>;
    async fn insert_user_subscription(&mut self, grant: UserSubscription) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>);
}

/// Transactional storage of users and their grant records.
///
/// Implementations must serialize units of work that write the ledger, so two
/// concurrent purchases never both read the same stale balance.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>>;
    async fn get_user(&self, id: u64) -> Result<Option<User>>;
    async fn all_users(&self) -> Result<Vec<User>>;
    async fn user_plans(&self, user_id: u64) -> Result<Vec<UserPlan>>;
    async fn user_subscriptions(&self, user_id: u64) -> Result<Vec<UserSubscription>>;
}

/// Categories and subscriptions. Read-only from the point of view of payments.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn put_category(&self, category: Category) -> Result<()>;
    async fn put_subscription(&self, subscription: Subscription) -> Result<()>;
    async fn get_category(&self, id: u64) -> Result<Option<Category>>;
}

#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    async fn get_subscription_by_id(&self, id: u64) -> Result<Option<Subscription>>;
}

#[derive(Error, Debug)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Post-commit notice of a successful category payment.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: &User, category: &Category) -> std::result::Result<(), NotifyError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type CatalogStoreBox = Box<dyn CatalogStore>;
pub type SubscriptionLookupBox = Box<dyn SubscriptionLookup>;
pub type NotifierHandle = Arc<dyn Notifier>;
pub type ClockBox = Box<dyn Clock>;
