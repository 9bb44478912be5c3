use super::{LabelStore, SessionStore, StoreError};
use crate::entities::labels::{UpsertLabel, normalize_product_id};
use crate::entities::{LabelRecord, PurgeSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio::sync::RwLock;

/// A stored app session, reduced to what the lifecycle webhooks touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySession {
    pub id: String,
    pub shop: String,
    pub scope: Option<String>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    labels: RwLock<HashMap<(String, String), LabelRecord>>,
    sessions: RwLock<Vec<MemorySession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_session(&self, session: MemorySession) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|s| s.id != session.id);
        sessions.push(session);
    }

    pub async fn sessions_for(&self, shop: &str) -> Vec<MemorySession> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.shop == shop)
            .cloned()
            .collect()
    }
}

fn now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

#[async_trait]
impl LabelStore for MemoryStore {
    async fn get_label(
        &self,
        shop: Option<&str>,
        product_id: &str,
    ) -> Result<Option<LabelRecord>, StoreError> {
        let product_id = normalize_product_id(product_id);
        let labels = self.labels.read().await;
        Ok(labels
            .values()
            .filter(|l| l.product_id == product_id && shop.is_none_or(|s| l.shop == s))
            .max_by_key(|l| l.updated_at)
            .cloned())
    }

    async fn list_labels(&self, shop: &str) -> Result<Vec<LabelRecord>, StoreError> {
        let labels = self.labels.read().await;
        let mut found: Vec<_> = labels.values().filter(|l| l.shop == shop).cloned().collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found)
    }

    async fn upsert_label(&self, label: UpsertLabel) -> Result<LabelRecord, StoreError> {
        let record = LabelRecord {
            shop: label.shop,
            product_id: label.product_id,
            enabled: label.enabled,
            text: label.text,
            background_color: label.background_color,
            text_color: label.text_color,
            updated_at: now_utc(),
        };
        self.labels.write().await.insert(
            (record.shop.clone(), record.product_id.clone()),
            record.clone(),
        );
        Ok(record)
    }

    async fn delete_label(&self, shop: &str, product_id: &str) -> Result<bool, StoreError> {
        let key = (shop.to_owned(), normalize_product_id(product_id).to_owned());
        Ok(self.labels.write().await.remove(&key).is_some())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn purge_shop(&self, shop: &str) -> Result<PurgeSummary, StoreError> {
        let sessions = {
            let mut sessions = self.sessions.write().await;
            let before = sessions.len();
            sessions.retain(|s| s.shop != shop);
            (before - sessions.len()) as u64
        };
        let labels = {
            let mut labels = self.labels.write().await;
            let before = labels.len();
            labels.retain(|(label_shop, _), _| label_shop != shop);
            (before - labels.len()) as u64
        };
        Ok(PurgeSummary { sessions, labels })
    }

    async fn update_scope(&self, shop: &str, scope: &str) -> Result<u64, StoreError> {
        let mut updated = 0;
        for session in self.sessions.write().await.iter_mut().filter(|s| s.shop == shop) {
            session.scope = Some(scope.to_owned());
            updated += 1;
        }
        Ok(updated)
    }
}
