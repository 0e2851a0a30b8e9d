//! Per-vault indexing and serving pipeline: Watcher -> Event Bus -> Workers
//! -> {Catalog, Explorer Cache, Search Index} -> Change Broadcaster, plus
//! the Reconciler/DLQ and the Vault Supervisor that owns all of it.
//!
//! Every cross-component call goes through a `vault-contracts` trait; the
//! concrete implementations here (SQLite catalog, `DashMap` explorer,
//! `tantivy` search, local filesystem watcher, SSE broadcaster) are the one
//! production wiring the Supervisor assembles.

pub mod broadcaster;
pub mod catalog;
pub mod event_bus;
pub mod explorer;
pub mod reconciler;
pub mod search;
pub mod supervisor;
pub mod watcher;
pub mod workers;

pub use broadcaster::SseBroadcaster;
pub use catalog::SqliteCatalog;
pub use event_bus::{EventBus, EventBusReceiver};
pub use explorer::DashMapExplorer;
pub use reconciler::{DlqMetrics, Reconciler};
pub use search::TantivySearchIndex;
pub use supervisor::VaultSupervisor;
pub use watcher::LocalWatcher;
