#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use healthy_ledger::application::coordinator::PaymentCoordinator;
use healthy_ledger::domain::catalog::{Category, Subscription};
use healthy_ledger::domain::grant::{UserPlan, UserSubscription};
use healthy_ledger::domain::money::Credits;
use healthy_ledger::domain::ports::{
    CatalogStore, LedgerStore, LedgerTx, Notifier, NotifierHandle, NotifyError,
};
use healthy_ledger::domain::user::User;
use healthy_ledger::error::{LedgerError, Result};
use healthy_ledger::infrastructure::clock::FixedClock;
use healthy_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CAROL: u64 = 3;

pub const STRENGTH: u64 = 10;
pub const CARDIO: u64 = 11;

pub const MONTHLY: u64 = 20;
pub const ANNUAL: u64 = 21;

pub fn jan_first() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Alice has 100 credits, Bob has none, Carol has 500.
/// Strength costs 60, Cardio 25. Monthly is 30 credits for 30 days, Annual 300 for 365.
pub async fn seeded_store() -> InMemoryLedgerStore {
    let store = InMemoryLedgerStore::new();

    let mut tx = store.begin().await.unwrap();
    tx.save_user(User::new(ALICE, "Alice").with_balance(Credits::new(100)))
        .await
        .unwrap();
    tx.save_user(User::new(BOB, "Bob").with_email("bob@example.com"))
        .await
        .unwrap();
    tx.save_user(User::new(CAROL, "Carol").with_balance(Credits::new(500)))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    for (id, name, price) in [(STRENGTH, "Strength", 60), (CARDIO, "Cardio", 25)] {
        store
            .put_category(Category {
                id,
                name: name.to_string(),
                description: String::new(),
                price: Credits::new(price),
            })
            .await
            .unwrap();
    }
    for (id, name, price, duration_days, category_id) in [
        (MONTHLY, "Monthly", 30, 30, STRENGTH),
        (ANNUAL, "Annual", 300, 365, CARDIO),
    ] {
        store
            .put_subscription(Subscription {
                id,
                name: name.to_string(),
                description: String::new(),
                price: Credits::new(price),
                duration_days,
                category_id,
            })
            .await
            .unwrap();
    }

    store
}

pub fn coordinator_with<S>(ledger: S, store: &InMemoryLedgerStore, notifier: NotifierHandle) -> PaymentCoordinator
where
    S: LedgerStore + 'static,
{
    PaymentCoordinator::new(
        Box::new(ledger),
        Box::new(store.clone()),
        notifier,
        Box::new(FixedClock(jan_first())),
    )
}

pub fn coordinator(store: &InMemoryLedgerStore) -> PaymentCoordinator {
    coordinator_with(store.clone(), store, Arc::new(SilentNotifier))
}

pub async fn balance_of(store: &InMemoryLedgerStore, user_id: u64) -> Credits {
    store.get_user(user_id).await.unwrap().unwrap().balance
}

pub struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn notify(&self, _user: &User, _category: &Category) -> std::result::Result<(), NotifyError> {
        Ok(())
    }
}

/// Sends `(user_id, category_id)` for every notice it receives.
pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<(u64, u64)>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(u64, u64)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user: &User, category: &Category) -> std::result::Result<(), NotifyError> {
        self.sender
            .send((user.id, category.id))
            .map_err(|e| NotifyError(e.to_string()))
    }
}

/// Records like [`RecordingNotifier`], but only after a short delay.
pub struct SlowNotifier(pub RecordingNotifier);

#[async_trait]
impl Notifier for SlowNotifier {
    async fn notify(&self, user: &User, category: &Category) -> std::result::Result<(), NotifyError> {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        self.0.notify(user, category).await
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _user: &User, _category: &Category) -> std::result::Result<(), NotifyError> {
        Err(NotifyError("smtp unreachable".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    SaveUser,
    InsertPlan,
    InsertSubscription,
    Commit,
}

/// Wraps the in-memory store and fails one kind of write with a persistence error.
#[derive(Clone)]
pub struct FailingLedgerStore {
    inner: InMemoryLedgerStore,
    fail_at: FailPoint,
}

impl FailingLedgerStore {
    pub fn new(inner: InMemoryLedgerStore, fail_at: FailPoint) -> Self {
        Self { inner, fail_at }
    }
}

fn injected(point: FailPoint) -> LedgerError {
    LedgerError::persistence(format!("injected failure at {point:?}"))
}

struct FailingTx {
    inner: Box<dyn LedgerTx>,
    fail_at: FailPoint,
}

#[async_trait]
impl LedgerTx for FailingTx {
    async fn load_user(&mut self, id: u64) -> Result<Option<User>> {
        self.inner.load_user(id).await
    }

    async fn load_category(&mut self, id: u64) -> Result<Option<Category>> {
        self.inner.load_category(id).await
    }

    async fn save_user(&mut self, user: User) -> Result<()> {
        if self.fail_at == FailPoint::SaveUser {
            return Err(injected(self.fail_at));
        }
        self.inner.save_user(user).await
    }

    async fn insert_user_plan(&mut self, plan: UserPlan) -> Result<()> {
        if self.fail_at == FailPoint::InsertPlan {
            return Err(injected(self.fail_at));
        }
        self.inner.insert_user_plan(plan).await
    }

    async fn insert_user_subscription(&mut self, grant: UserSubscription) -> Result<()> {
        if self.fail_at == FailPoint::InsertSubscription {
            return Err(injected(self.fail_at));
        }
        self.inner.insert_user_subscription(grant).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let FailingTx { inner, fail_at } = *self;
        if fail_at == FailPoint::Commit {
            inner.rollback().await;
            return Err(injected(fail_at));
        }
        inner.commit().await
    }

    async fn rollback(self: Box<Self>) {
        self.inner.rollback().await
    }
}

#[async_trait]
impl LedgerStore for FailingLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingTx {
            inner,
            fail_at: self.fail_at,
        }))
    }

    async fn get_user(&self, id: u64) -> Result<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        self.inner.all_users().await
    }

    async fn user_plans(&self, user_id: u64) -> Result<Vec<UserPlan>> {
        self.inner.user_plans(user_id).await
    }

    async fn user_subscriptions(&self, user_id: u64) -> Result<Vec<UserSubscription>> {
        self.inner.user_subscriptions(user_id).await
    }
}

pub const SEED_JSON: &str = r#"{
    "users": [
        {"id": 1, "name": "Alice", "email": "alice@example.com", "balance": 100},
        {"id": 2, "name": "Bob", "balance": 0},
        {"id": 3, "name": "Carol", "balance": 500}
    ],
    "categories": [
        {"id": 10, "name": "Strength", "description": "Barbell basics", "price": 60},
        {"id": 11, "name": "Cardio", "price": 25}
    ],
    "subscriptions": [
        {"id": 20, "name": "Monthly", "price": 30, "duration_days": 30, "category_id": 10}
    ]
}"#;

pub fn write_seed(path: &Path) -> std::result::Result<(), Error> {
    std::fs::write(path, SEED_JSON)
}

/// Writes `rows` random purchases by users `1..=3` against the seed catalog.
pub fn generate_purchases_csv(path: &Path, rows: usize) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["type", "user", "item", "recipient"])?;

    let mut rng = rand::thread_rng();
    for _ in 0..rows {
        let user = rng.gen_range(1..=3u64).to_string();
        match rng.gen_range(0..3) {
            0 => wtr.write_record(["category", &user, "10", ""])?,
            1 => {
                let recipient = rng.gen_range(1..=3u64).to_string();
                wtr.write_record(["gift", &user, "11", &recipient])?
            }
            _ => wtr.write_record(["subscription", &user, "20", ""])?,
        }
    }

    wtr.flush()?;
    Ok(())
}
