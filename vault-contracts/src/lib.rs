//! Trait surfaces that describe interactions between vault pipeline
//! components and the HTTP façade. Every cross-service call in
//! `vault-server` goes through one of these, never by reaching into a
//! `vault-core` service's internals (spec.md §3, "Ownership").

pub mod broadcaster;
pub mod catalog;
pub mod explorer;
pub mod paths;
pub mod search;
pub mod watcher;

pub use broadcaster::{BroadcastSink, BroadcastSource, ChangeBroadcaster, EventStream};
pub use catalog::Catalog;
pub use explorer::ExplorerCache;
pub use paths::validate_path;
pub use search::{HighlightSpan, IndexUpdate, SearchHit, SearchIndex, SearchResults};
pub use watcher::{EventSink, Watcher};

/// Re-export of the same symbols, for call sites that prefer an explicit
/// `use vault_contracts::prelude::*` over naming each trait.
pub mod prelude {
    pub use super::{
        validate_path, BroadcastSink, BroadcastSource, Catalog, ChangeBroadcaster, EventSink, EventStream, ExplorerCache,
        HighlightSpan, IndexUpdate, SearchHit, SearchIndex, SearchResults, Watcher,
    };
}
