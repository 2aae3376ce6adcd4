use clap::Parser;
use healthy_ledger::application::coordinator::PaymentCoordinator;
use healthy_ledger::domain::ports::{
    CatalogStore, CatalogStoreBox, LedgerStore, LedgerStoreBox, NotifierHandle,
    SubscriptionLookup, SubscriptionLookupBox,
};
use healthy_ledger::infrastructure::clock::SystemClock;
use healthy_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use healthy_ledger::infrastructure::notifier::LogNotifier;
use healthy_ledger::interfaces::csv::purchase_reader::PurchaseReader;
use healthy_ledger::interfaces::csv::user_writer::UserWriter;
use healthy_ledger::interfaces::seed::Seed;
use healthy_ledger::logging::init_logging;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input purchases CSV file (`type, user, item, recipient`)
    input: PathBuf,

    /// JSON file with users, categories and subscriptions to load before processing
    #[arg(long, env = "HEALTHY_LEDGER_SEED")]
    seed: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "HEALTHY_LEDGER_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "HEALTHY_LEDGER_LOG", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

struct Stores {
    ledger: LedgerStoreBox,
    report: LedgerStoreBox,
    catalog: CatalogStoreBox,
    subscriptions: SubscriptionLookupBox,
}

impl Stores {
    fn shared<S>(store: S) -> Self
    where
        S: LedgerStore + CatalogStore + SubscriptionLookup + Clone + 'static,
    {
        Self {
            ledger: Box::new(store.clone()),
            report: Box::new(store.clone()),
            catalog: Box::new(store.clone()),
            subscriptions: Box::new(store),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    use healthy_ledger::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(&path).into_diagnostic()?;
            tracing::info!(path = %path.display(), "using persistent storage");
            Ok(Stores::shared(store))
        }
        None => Ok(Stores::shared(InMemoryLedgerStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Stores::shared(InMemoryLedgerStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    let stores = open_stores(cli.db_path)?;

    if let Some(seed_path) = cli.seed {
        let file = File::open(seed_path).into_diagnostic()?;
        Seed::from_reader(file)
            .into_diagnostic()?
            .apply(stores.ledger.as_ref(), stores.catalog.as_ref())
            .await
            .into_diagnostic()?;
    }

    let notifier: NotifierHandle = Arc::new(LogNotifier);
    let Stores {
        ledger,
        report,
        subscriptions,
        ..
    } = stores;
    let coordinator =
        PaymentCoordinator::new(ledger, subscriptions, notifier, Box::new(SystemClock));

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = PurchaseReader::new(file);
    for purchase in reader.purchases() {
        match purchase {
            Ok(purchase) => {
                if let Err(e) = coordinator.execute(purchase).await {
                    tracing::warn!(flow = purchase.flow(), error = %e, "purchase failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error reading purchase");
            }
        }
    }

    coordinator.flush_notifications().await;

    let users = report.all_users().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = UserWriter::new(stdout.lock());
    writer.write_users(users).into_diagnostic()?;

    Ok(())
}
