//! Persistence behind traits.
//!
//! [`LabelStore`] backs the label API and [`SessionStore`] the app lifecycle
//! webhooks. `PgStore` is the production implementation; `MemoryStore`
//! serves `--memory` runs and tests.

mod memory;
mod postgres;

pub use memory::{MemorySession, MemoryStore};
pub use postgres::PgStore;

use crate::entities::labels::UpsertLabel;
use crate::entities::{LabelRecord, PurgeSummary};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LabelStore: Send + Sync {
    /// The label of a product. `shop = None` matches any shop.
    async fn get_label(
        &self,
        shop: Option<&str>,
        product_id: &str,
    ) -> Result<Option<LabelRecord>, StoreError>;

    async fn list_labels(&self, shop: &str) -> Result<Vec<LabelRecord>, StoreError>;

    async fn upsert_label(&self, label: UpsertLabel) -> Result<LabelRecord, StoreError>;

    /// Returns whether a label was deleted.
    async fn delete_label(&self, shop: &str, product_id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Remove everything kept for a shop (uninstall).
    async fn purge_shop(&self, shop: &str) -> Result<PurgeSummary, StoreError>;

    /// Set the granted scope on every session of a shop; returns the count.
    async fn update_scope(&self, shop: &str, scope: &str) -> Result<u64, StoreError>;
}
