use crate::domain::catalog::{Category, Subscription};
use crate::domain::grant::{UserPlan, UserSubscription};
use crate::domain::ports::{CatalogStore, LedgerStore, LedgerTx, SubscriptionLookup};
use crate::domain::user::User;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Default)]
struct Ledger {
    users: HashMap<u64, User>,
    user_plans: Vec<UserPlan>,
    user_subscriptions: Vec<UserSubscription>,
}

#[derive(Default)]
struct Catalog {
    categories: HashMap<u64, Category>,
    subscriptions: HashMap<u64, Subscription>,
}

/// A thread-safe in-memory ledger.
///
/// The ledger sits behind a single `Mutex`; a unit of work holds the owned guard
/// from `begin` until it commits or rolls back, which serializes purchases.
/// The catalog has its own `RwLock` so lookups made during a unit of work do not
/// wait on the ledger. `Clone` shares the same underlying state.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    ledger: Arc<Mutex<Ledger>>,
    catalog: Arc<RwLock<Catalog>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct InMemoryTx {
    ledger: OwnedMutexGuard<Ledger>,
    catalog: Arc<RwLock<Catalog>>,
    users: HashMap<u64, User>,
    user_plans: Vec<UserPlan>,
    user_subscriptions: Vec<UserSubscription>,
}

#[async_trait]
impl LedgerTx for InMemoryTx {
    async fn load_user(&mut self, id: u64) -> Result<Option<User>> {
        Ok(self
            .users
            .get(&id)
            .or_else(|| self.ledger.users.get(&id))
            .cloned())
    }

    async fn load_category(&mut self, id: u64) -> Result<Option<Category>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.categories.get(&id).cloned())
    }

    async fn save_user(&mut self, user: User) -> Result<()> {
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn insert_user_plan(&mut self, plan: UserPlan) -> Result<()> {
        self.user_plans.push(plan);
        Ok(())
    }

    async fn insert_user_subscription(&mut self, grant: UserSubscription) -> Result<()> {
        self.user_subscriptions.push(grant);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTx {
            mut ledger,
            users,
            user_plans,
            user_subscriptions,
            ..
        } = *self;
        ledger.users.extend(users);
        ledger.user_plans.extend(user_plans);
        ledger.user_subscriptions.extend(user_subscriptions);
        Ok(())
    }

    async fn rollback(self: Box<Self>) {}
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let ledger = self.ledger.clone().lock_owned().await;
        Ok(Box::new(InMemoryTx {
            ledger,
            catalog: self.catalog.clone(),
            users: HashMap::new(),
            user_plans: Vec::new(),
            user_subscriptions: Vec::new(),
        }))
    }

    async fn get_user(&self, id: u64) -> Result<Option<User>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.users.get(&id).cloned())
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        let ledger = self.ledger.lock().await;
        let mut users: Vec<User> = ledger.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn user_plans(&self, user_id: u64) -> Result<Vec<UserPlan>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger
            .user_plans
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn user_subscriptions(&self, user_id: u64) -> Result<Vec<UserSubscription>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger
            .user_subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogStore for InMemoryLedgerStore {
    async fn put_category(&self, category: Category) -> Result<()> {
        let mut catalog = self.catalog.write().await;
        catalog.categories.insert(category.id, category);
        Ok(())
    }

    async fn put_subscription(&self, subscription: Subscription) -> Result<()> {
        let mut catalog = self.catalog.write().await;
        catalog.subscriptions.insert(subscription.id, subscription);
        Ok(())
    }

    async fn get_category(&self, id: u64) -> Result<Option<Category>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.categories.get(&id).cloned())
    }
}

#[async_trait]
impl SubscriptionLookup for InMemoryLedgerStore {
    async fn get_subscription_by_id(&self, id: u64) -> Result<Option<Subscription>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.subscriptions.get(&id).cloned())
    }
}
