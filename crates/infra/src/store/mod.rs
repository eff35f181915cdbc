//! Document storage boundary.
//!
//! Traits for committed reads (`DocumentStore`), atomic write batches
//! (`UnitOfWork`) and catalog lookups (`CatalogStore`), plus the in-memory and
//! Postgres backends. Every call is scoped by company and visibility.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryStore, InMemoryTx, demo_catalog};
pub use postgres::{PostgresStore, PostgresTx};
pub use r#trait::{
    CatalogStore, DocumentRepository, DocumentStore, LineItemRepository, StoreError, UnitOfWork,
};
