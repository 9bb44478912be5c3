use super::{LabelStore, SessionStore, StoreError};
use crate::entities::labels::{
    DeleteLabel, GetLabelForProduct, ListLabelsForShop, UpsertLabel, normalize_product_id,
};
use crate::entities::sessions::{PurgeShop, UpdateSessionScope};
use crate::entities::{LabelRecord, PurgeSummary};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;

/// Postgres-backed label and session store.
#[derive(Debug, Clone)]
pub struct PgStore {
    processor: DatabaseProcessor,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.processor.pool
    }
}

#[async_trait]
impl LabelStore for PgStore {
    async fn get_label(
        &self,
        shop: Option<&str>,
        product_id: &str,
    ) -> Result<Option<LabelRecord>, StoreError> {
        Ok(self
            .processor
            .process(GetLabelForProduct {
                shop: shop.map(str::to_owned),
                product_id: normalize_product_id(product_id).to_owned(),
            })
            .await?)
    }

    async fn list_labels(&self, shop: &str) -> Result<Vec<LabelRecord>, StoreError> {
        Ok(self
            .processor
            .process(ListLabelsForShop {
                shop: shop.to_owned(),
            })
            .await?)
    }

    async fn upsert_label(&self, label: UpsertLabel) -> Result<LabelRecord, StoreError> {
        Ok(self.processor.process(label).await?)
    }

    async fn delete_label(&self, shop: &str, product_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .processor
            .process(DeleteLabel {
                shop: shop.to_owned(),
                product_id: normalize_product_id(product_id).to_owned(),
            })
            .await?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn purge_shop(&self, shop: &str) -> Result<PurgeSummary, StoreError> {
        Ok(self
            .processor
            .process(PurgeShop {
                shop: shop.to_owned(),
            })
            .await?)
    }

    async fn update_scope(&self, shop: &str, scope: &str) -> Result<u64, StoreError> {
        Ok(self
            .processor
            .process(UpdateSessionScope {
                shop: shop.to_owned(),
                scope: scope.to_owned(),
            })
            .await?)
    }
}
