use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// What an uninstall removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub sessions: u64,
    pub labels: u64,
}

/// Delete every session and label of a shop in one transaction.
#[derive(Debug, Clone)]
pub struct PurgeShop {
    pub shop: String,
}

impl Processor<PurgeShop> for DatabaseProcessor {
    type Output = PurgeSummary;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:PurgeShop")]
    async fn process(&self, purge: PurgeShop) -> Result<PurgeSummary, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let sessions = sqlx::query("DELETE FROM shop_sessions WHERE shop = $1")
            .bind(&purge.shop)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let labels = sqlx::query("DELETE FROM labels WHERE shop = $1")
            .bind(&purge.shop)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(PurgeSummary { sessions, labels })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateSessionScope {
    pub shop: String,
    pub scope: String,
}

impl Processor<UpdateSessionScope> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateSessionScope")]
    async fn process(&self, update: UpdateSessionScope) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE shop_sessions SET scope = $1 WHERE shop = $2")
            .bind(update.scope)
            .bind(update.shop)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
