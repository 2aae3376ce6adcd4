//! Application layer containing the purchase orchestration.
//!
//! `PaymentCoordinator` is the entry point for the three purchase flows. Each flow
//! runs as one unit of work against the ledger store; the store's writer lock is
//! the only synchronization between concurrent purchases.

pub mod accounts;
pub mod coordinator;
