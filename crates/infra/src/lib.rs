//! Infrastructure layer: storage backends, the document editor and config.

pub mod config;
pub mod editor;
pub mod store;


pub use config::{ConfigError, DocketConfig};
pub use editor::{
    CreateOutcome, DeleteOutcome, DocumentDetail, DocumentEditor, EditorError, Submission,
    UpdateOutcome,
};
pub use store::{CatalogStore, DocumentStore, InMemoryStore, PostgresStore, StoreError};
