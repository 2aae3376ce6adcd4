use crate::domain::catalog::{Category, Subscription};
use crate::domain::grant::{UserPlan, UserSubscription};
use crate::domain::ports::{CatalogStore, LedgerStore, LedgerTx, SubscriptionLookup};
use crate::domain::user::User;
use crate::error::{LedgerError, Result};
use ::rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const CF_USERS: &str = "users";
pub const CF_CATEGORIES: &str = "categories";
pub const CF_SUBSCRIPTIONS: &str = "subscriptions";
/// Keyed by `user_id ++ grant ulid`, so a prefix scan yields one user's history in grant order.
pub const CF_USER_PLANS: &str = "user_plans";
pub const CF_USER_SUBSCRIPTIONS: &str = "user_subscriptions";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_USERS,
    CF_CATEGORIES,
    CF_SUBSCRIPTIONS,
    CF_USER_PLANS,
    CF_USER_SUBSCRIPTIONS,
];

/// A persistent ledger backed by RocksDB.
///
/// Each entity type lives in its own column family. A unit of work holds the
/// store's writer lock and stages its writes; commit flushes them as one
/// `WriteBatch`, so a balance debit and its grant record land together or not at all.
///
/// `Clone` shares the underlying `Arc<DB>` and writer lock.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }
}

fn cf_handle<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| LedgerError::persistence(format!("{name} column family not found")))
}

fn grant_key(user_id: u64, grant_id: ulid::Ulid) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&user_id.to_be_bytes());
    key.extend_from_slice(&grant_id.to_bytes());
    key
}

fn get_json<T: DeserializeOwned>(db: &DB, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
    let cf = cf_handle(db, cf_name)?;
    match db.get_cf(&cf, key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(db: &DB, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
    let cf = cf_handle(db, cf_name)?;
    db.put_cf(&cf, key, serde_json::to_vec(value)?)?;
    Ok(())
}

fn scan_json<T: DeserializeOwned>(db: &DB, cf_name: &str, prefix: &[u8]) -> Result<Vec<T>> {
    let cf = cf_handle(db, cf_name)?;
    let mut records = Vec::new();
    for item in db.iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward)) {
        let (key, value) = item?;
        if !key.starts_with(prefix) {
            break;
        }
        records.push(serde_json::from_slice(&value)?);
    }
    Ok(records)
}

pub struct RocksDBTx {
    db: Arc<DB>,
    _writer: OwnedMutexGuard<()>,
    users: HashMap<u64, User>,
    staged: Vec<(&'static str, Vec<u8>, Vec<u8>)>,
}

#[async_trait]
impl LedgerTx for RocksDBTx {
    async fn load_user(&mut self, id: u64) -> Result<Option<User>> {
        if let Some(user) = self.users.get(&id) {
            return Ok(Some(user.clone()));
        }
        get_json(&self.db, CF_USERS, &id.to_be_bytes())
    }

    async fn load_category(&mut self, id: u64) -> Result<Option<Category>> {
        get_json(&self.db, CF_CATEGORIES, &id.to_be_bytes())
    }

    async fn save_user(&mut self, user: User) -> Result<()> {
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn insert_user_plan(&mut self, plan: UserPlan) -> Result<()> {
        let key = grant_key(plan.user_id, plan.id);
        self.staged
            .push((CF_USER_PLANS, key, serde_json::to_vec(&plan)?));
        Ok(())
    }

    async fn insert_user_subscription(&mut self, grant: UserSubscription) -> Result<()> {
        let key = grant_key(grant.user_id, grant.id);
        self.staged
            .push((CF_USER_SUBSCRIPTIONS, key, serde_json::to_vec(&grant)?));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut batch = WriteBatch::default();

        let users_cf = cf_handle(&self.db, CF_USERS)?;
        for (id, user) in &self.users {
            batch.put_cf(&users_cf, id.to_be_bytes(), serde_json::to_vec(user)?);
        }
        for (cf_name, key, value) in &self.staged {
            let cf = cf_handle(&self.db, cf_name)?;
            batch.put_cf(&cf, key, value);
        }

        self.db.write(batch)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) {}
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let writer = self.writer.clone().lock_owned().await;
        Ok(Box::new(RocksDBTx {
            db: self.db.clone(),
            _writer: writer,
            users: HashMap::new(),
            staged: Vec::new(),
        }))
    }

    async fn get_user(&self, id: u64) -> Result<Option<User>> {
        get_json(&self.db, CF_USERS, &id.to_be_bytes())
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        // big-endian keys iterate in id order
        scan_json(&self.db, CF_USERS, &[])
    }

    async fn user_plans(&self, user_id: u64) -> Result<Vec<UserPlan>> {
        scan_json(&self.db, CF_USER_PLANS, &user_id.to_be_bytes())
    }

    async fn user_subscriptions(&self, user_id: u64) -> Result<Vec<UserSubscription>> {
        scan_json(&self.db, CF_USER_SUBSCRIPTIONS, &user_id.to_be_bytes())
    }
}

#[async_trait]
impl CatalogStore for RocksDBStore {
    async fn put_category(&self, category: Category) -> Result<()> {
        put_json(&self.db, CF_CATEGORIES, &category.id.to_be_bytes(), &category)
    }

    async fn put_subscription(&self, subscription: Subscription) -> Result<()> {
        put_json(
            &self.db,
            CF_SUBSCRIPTIONS,
            &subscription.id.to_be_bytes(),
            &subscription,
        )
    }

    async fn get_category(&self, id: u64) -> Result<Option<Category>> {
        get_json(&self.db, CF_CATEGORIES, &id.to_be_bytes())
    }
}

#[async_trait]
impl SubscriptionLookup for RocksDBStore {
    async fn get_subscription_by_id(&self, id: u64) -> Result<Option<Subscription>> {
        get_json(&self.db, CF_SUBSCRIPTIONS, &id.to_be_bytes())
    }
}
