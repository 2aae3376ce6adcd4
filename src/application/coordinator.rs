use crate::domain::catalog::Category;
use crate::domain::grant::{UserPlan, UserSubscription};
use crate::domain::money::Credits;
use crate::domain::policy;
use crate::domain::ports::{ClockBox, LedgerStoreBox, LedgerTx, NotifierHandle, SubscriptionLookupBox};
use crate::domain::user::User;
use crate::error::{EntityKind, LedgerError, Result};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::Instrument;

/// One of the three purchase flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    /// The user buys a category for themselves.
    Category { user_id: u64, category_id: u64 },
    /// `payer_id` pays, `recipient_id` receives the category.
    Gift {
        payer_id: u64,
        category_id: u64,
        recipient_id: u64,
    },
    Subscription { user_id: u64, subscription_id: u64 },
}

impl Purchase {
    pub fn flow(&self) -> &'static str {
        match self {
            Purchase::Category { .. } => "category",
            Purchase::Gift { .. } => "gift",
            Purchase::Subscription { .. } => "subscription",
        }
    }
}

/// Committed state after a category purchase or gift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReceipt {
    pub payer: User,
    pub recipient: User,
    pub category: Category,
    pub plan: UserPlan,
}

/// Committed state after a subscription purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionReceipt {
    pub user: User,
    pub grant: UserSubscription,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    Category(CategoryReceipt),
    Subscription(SubscriptionReceipt),
}

/// Executes purchases as single units of work against the ledger.
///
/// Validation failures (unknown ids, insufficient funds) are detected before any
/// write is staged. Any error inside the unit of work rolls it back; the coordinator
/// never writes compensating records itself. After a category payment commits, the
/// notifier is invoked on a background task and its failure is only logged.
/// Pending notices are aborted when the coordinator is dropped; call
/// [`PaymentCoordinator::flush_notifications`] first to let them finish.
pub struct PaymentCoordinator {
    store: LedgerStoreBox,
    subscriptions: SubscriptionLookupBox,
    notifier: NotifierHandle,
    clock: ClockBox,
    notices: Mutex<JoinSet<()>>,
}

impl PaymentCoordinator {
    pub fn new(
        store: LedgerStoreBox,
        subscriptions: SubscriptionLookupBox,
        notifier: NotifierHandle,
        clock: ClockBox,
    ) -> Self {
        Self {
            store,
            subscriptions,
            notifier,
            clock,
            notices: Mutex::new(JoinSet::new()),
        }
    }

    /// Waits for every notification spawned so far.
    pub async fn flush_notifications(&self) {
        let mut pending = std::mem::take(&mut *self.notices.lock().await);
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "payment notification task failed");
            }
        }
    }

    pub async fn execute(&self, purchase: Purchase) -> Result<Receipt> {
        match purchase {
            Purchase::Category {
                user_id,
                category_id,
            } => self.pay(user_id, category_id).await.map(Receipt::Category),
            Purchase::Gift {
                payer_id,
                category_id,
                recipient_id,
            } => self
                .pay_for_another(payer_id, category_id, recipient_id)
                .await
                .map(Receipt::Category),
            Purchase::Subscription {
                user_id,
                subscription_id,
            } => self
                .pay_subscription(user_id, subscription_id)
                .await
                .map(Receipt::Subscription),
        }
    }

    /// Debits `user_id` by the category price and makes it their current category.
    pub async fn pay(&self, user_id: u64, category_id: u64) -> Result<CategoryReceipt> {
        let span = tracing::info_span!("purchase", flow = "category", user_id, category_id);
        self.grant_category(user_id, category_id, user_id)
            .instrument(span)
            .await
    }

    /// Debits `payer_id` and grants the category to `recipient_id`.
    pub async fn pay_for_another(
        &self,
        payer_id: u64,
        category_id: u64,
        recipient_id: u64,
    ) -> Result<CategoryReceipt> {
        let span = tracing::info_span!(
            "purchase",
            flow = "gift",
            payer_id,
            category_id,
            recipient_id
        );
        self.grant_category(payer_id, category_id, recipient_id)
            .instrument(span)
            .await
    }

    pub async fn pay_subscription(
        &self,
        user_id: u64,
        subscription_id: u64,
    ) -> Result<SubscriptionReceipt> {
        let span = tracing::info_span!("purchase", flow = "subscription", user_id, subscription_id);
        async {
            let mut tx = self.store.begin().await?;
            let outcome = self
                .stage_subscription(tx.as_mut(), user_id, subscription_id)
                .await;
            let receipt = settle(tx, outcome).await?;

            tracing::info!(
                balance = %receipt.user.balance,
                end_date = %receipt.grant.end_date,
                "subscription committed"
            );
            Ok(receipt)
        }
        .instrument(span)
        .await
    }

    async fn grant_category(
        &self,
        payer_id: u64,
        category_id: u64,
        recipient_id: u64,
    ) -> Result<CategoryReceipt> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .stage_category(tx.as_mut(), payer_id, category_id, recipient_id)
            .await;
        let receipt = settle(tx, outcome).await?;

        tracing::info!(
            balance = %receipt.payer.balance,
            price = %receipt.category.price,
            "payment committed"
        );
        self.notify_in_background(receipt.recipient.clone(), receipt.category.clone())
            .await;
        Ok(receipt)
    }

    async fn stage_category(
        &self,
        tx: &mut dyn LedgerTx,
        payer_id: u64,
        category_id: u64,
        recipient_id: u64,
    ) -> Result<CategoryReceipt> {
        let mut payer = load_user(tx, payer_id).await?;
        let mut recipient = if recipient_id == payer_id {
            None
        } else {
            Some(load_user(tx, recipient_id).await?)
        };
        let category = tx
            .load_category(category_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Category, category_id))?;

        debit(&mut payer, category.price)?;
        match recipient.as_mut() {
            Some(recipient) => recipient.category_id = Some(category_id),
            None => payer.category_id = Some(category_id),
        }

        let plan = UserPlan::new(recipient_id, category_id, self.clock.now());
        tx.save_user(payer.clone()).await?;
        if let Some(recipient) = &recipient {
            tx.save_user(recipient.clone()).await?;
        }
        tx.insert_user_plan(plan.clone()).await?;

        let recipient = recipient.unwrap_or_else(|| payer.clone());
        Ok(CategoryReceipt {
            payer,
            recipient,
            category,
            plan,
        })
    }

    async fn stage_subscription(
        &self,
        tx: &mut dyn LedgerTx,
        user_id: u64,
        subscription_id: u64,
    ) -> Result<SubscriptionReceipt> {
        let mut user = load_user(tx, user_id).await?;
        let subscription = self
            .subscriptions
            .get_subscription_by_id(subscription_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Subscription, subscription_id))?;
        // the lookup may be fed by something other than a validated seed
        subscription.validate()?;

        debit(&mut user, subscription.price)?;

        let (start, end) =
            policy::compute_subscription_window(self.clock.now(), subscription.duration_days);
        let grant = UserSubscription::new(user_id, subscription_id, start, end);

        tx.save_user(user.clone()).await?;
        tx.insert_user_subscription(grant.clone()).await?;

        Ok(SubscriptionReceipt { user, grant })
    }

    async fn notify_in_background(&self, user: User, category: Category) {
        let notifier = self.notifier.clone();
        let mut notices = self.notices.lock().await;
        // reap finished notices so the set only holds pending ones
        while notices.try_join_next().is_some() {}
        notices.spawn(
            async move {
                if let Err(e) = notifier.notify(&user, &category).await {
                    tracing::warn!(error = %e, "payment notification failed");
                }
            }
            .in_current_span(),
        );
    }
}

async fn load_user(tx: &mut dyn LedgerTx, id: u64) -> Result<User> {
    tx.load_user(id)
        .await?
        .ok_or_else(|| LedgerError::not_found(EntityKind::User, id))
}

fn debit(user: &mut User, price: Credits) -> Result<()> {
    if !policy::can_afford(user.balance, price) {
        return Err(LedgerError::InsufficientFunds {
            balance: user.balance,
            price,
        });
    }
    user.balance = policy::compute_new_balance(user.balance, price);
    Ok(())
}

/// Commits the unit of work when the staged flow succeeded, rolls it back otherwise.
async fn settle<T>(tx: Box<dyn LedgerTx>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => match tx.commit().await {
            Ok(()) => Ok(value),
            Err(e) => {
                tracing::error!(error = %e, "purchase aborted at commit");
                Err(e)
            }
        },
        Err(e) => {
            tx.rollback().await;
            if e.is_client_error() {
                tracing::warn!(error = %e, "purchase rejected");
            } else {
                tracing::error!(error = %e, "purchase aborted");
            }
            Err(e)
        }
    }
}
