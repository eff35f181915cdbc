//! Infrastructure wiring: pick a store backend and build the editors on it.

use std::sync::Arc;

use docket_core::CompanyId;
use docket_documents::DocumentKind;
use docket_infra::{
    CatalogStore, DocketConfig, DocumentEditor, DocumentStore, InMemoryStore, PostgresStore,
    StoreError,
};

/// Everything the handlers need, for one store backend.
pub struct AppServices<S> {
    pub store: Arc<S>,
    pub invoices: DocumentEditor<S>,
    pub sale_orders: DocumentEditor<S>,
}

impl<S> AppServices<S>
where
    S: DocumentStore + CatalogStore,
{
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        Self {
            invoices: DocumentEditor::new(Arc::clone(&store), DocumentKind::Invoice),
            sale_orders: DocumentEditor::new(Arc::clone(&store), DocumentKind::SaleOrder),
            store,
        }
    }

    pub fn editor(&self, kind: DocumentKind) -> &DocumentEditor<S> {
        match kind {
            DocumentKind::Invoice => &self.invoices,
            DocumentKind::SaleOrder => &self.sale_orders,
        }
    }
}

/// The backend selected by configuration.
pub enum Backend {
    InMemory(InMemoryStore),
    Postgres(PostgresStore),
}

pub async fn build_backend(config: &DocketConfig) -> Result<Backend, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url, config.max_connections).await?;
            store.ensure_schema().await?;
            tracing::info!(max_connections = config.max_connections, "using postgres store");
            Ok(Backend::Postgres(store))
        }
        None => {
            let store = if config.seed_demo_catalog {
                InMemoryStore::with_demo_catalog(CompanyId::new(1))
            } else {
                InMemoryStore::new()
            };
            tracing::warn!(
                seed_demo_catalog = config.seed_demo_catalog,
                "DOCKET_DATABASE_URL not set; using in-memory store"
            );
            Ok(Backend::InMemory(store))
        }
    }
}
