use crate::framework::DatabaseProcessor;
use bblabel_sdk::objects::label::{DEFAULT_BACKGROUND_COLOR, DEFAULT_TEXT_COLOR};
use bblabel_sdk::objects::{LabelResponse, LabelUpsert};
use kanau::processor::Processor;
use time::PrimitiveDateTime;

const PRODUCT_GID_PREFIX: &str = "gid://shopify/Product/";

/// Strip the admin GraphQL prefix so storefront ids and admin ids agree.
pub fn normalize_product_id(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix(PRODUCT_GID_PREFIX).unwrap_or(trimmed)
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LabelRecord {
    pub shop: String,
    pub product_id: String,
    pub enabled: bool,
    pub text: String,
    pub background_color: String,
    pub text_color: String,
    pub updated_at: PrimitiveDateTime,
}

impl From<&LabelRecord> for LabelResponse {
    fn from(value: &LabelRecord) -> Self {
        Self {
            product_id: value.product_id.clone(),
            enabled: value.enabled,
            label: value.text.clone(),
            background_color: value.background_color.clone(),
            text_color: value.text_color.clone(),
            updated_at: value.updated_at.assume_utc().unix_timestamp(),
        }
    }
}

/// Look up the label of a product, optionally restricted to one shop.
///
/// Without a shop the most recently updated label wins.
#[derive(Debug, Clone)]
pub struct GetLabelForProduct {
    pub shop: Option<String>,
    pub product_id: String,
}

impl Processor<GetLabelForProduct> for DatabaseProcessor {
    type Output = Option<LabelRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetLabelForProduct")]
    async fn process(&self, query: GetLabelForProduct) -> Result<Option<LabelRecord>, sqlx::Error> {
        sqlx::query_as::<_, LabelRecord>(
            r#"
            SELECT shop, product_id, enabled, text, background_color, text_color, updated_at
            FROM labels
            WHERE product_id = $1 AND ($2::text IS NULL OR shop = $2)
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(query.product_id)
        .bind(query.shop)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ListLabelsForShop {
    pub shop: String,
}

impl Processor<ListLabelsForShop> for DatabaseProcessor {
    type Output = Vec<LabelRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListLabelsForShop")]
    async fn process(&self, query: ListLabelsForShop) -> Result<Vec<LabelRecord>, sqlx::Error> {
        sqlx::query_as::<_, LabelRecord>(
            r#"
            SELECT shop, product_id, enabled, text, background_color, text_color, updated_at
            FROM labels
            WHERE shop = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(query.shop)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertLabel {
    pub shop: String,
    pub product_id: String,
    pub enabled: bool,
    pub text: String,
    pub background_color: String,
    pub text_color: String,
}

impl UpsertLabel {
    /// Build an upsert from an admin request, filling in default colors.
    pub fn from_request(shop: &str, product_id: &str, request: &LabelUpsert) -> Self {
        Self {
            shop: shop.to_owned(),
            product_id: normalize_product_id(product_id).to_owned(),
            enabled: request.enabled,
            text: request.label.trim().to_owned(),
            background_color: request
                .background_color
                .clone()
                .unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_owned()),
            text_color: request
                .text_color
                .clone()
                .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_owned()),
        }
    }
}

impl Processor<UpsertLabel> for DatabaseProcessor {
    type Output = LabelRecord;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertLabel")]
    async fn process(&self, insert: UpsertLabel) -> Result<LabelRecord, sqlx::Error> {
        sqlx::query_as::<_, LabelRecord>(
            r#"
            INSERT INTO labels (shop, product_id, enabled, text, background_color, text_color, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now() AT TIME ZONE 'utc')
            ON CONFLICT (shop, product_id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                text = EXCLUDED.text,
                background_color = EXCLUDED.background_color,
                text_color = EXCLUDED.text_color,
                updated_at = EXCLUDED.updated_at
            RETURNING shop, product_id, enabled, text, background_color, text_color, updated_at
            "#,
        )
        .bind(insert.shop)
        .bind(insert.product_id)
        .bind(insert.enabled)
        .bind(insert.text)
        .bind(insert.background_color)
        .bind(insert.text_color)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct DeleteLabel {
    pub shop: String,
    pub product_id: String,
}

impl Processor<DeleteLabel> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteLabel")]
    async fn process(&self, delete: DeleteLabel) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM labels WHERE shop = $1 AND product_id = $2")
            .bind(delete.shop)
            .bind(delete.product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn gid_prefix_is_stripped() {
        assert_eq!(normalize_product_id("gid://shopify/Product/123"), "123");
        assert_eq!(normalize_product_id(" 123 "), "123");
        assert_eq!(normalize_product_id("gid://shopify/Variant/9"), "gid://shopify/Variant/9");
    }

    #[test]
    fn record_converts_to_response() {
        let record = LabelRecord {
            shop: "a.myshopify.com".into(),
            product_id: "1".into(),
            enabled: true,
            text: "Sale".into(),
            background_color: "#000000".into(),
            text_color: "#FFFFFF".into(),
            updated_at: datetime!(2024-01-01 0:00),
        };
        let response = LabelResponse::from(&record);
        assert_eq!(response.label, "Sale");
        assert_eq!(response.updated_at, 1_704_067_200);
    }

    #[test]
    fn upsert_fills_default_colors() {
        let request = LabelUpsert {
            enabled: true,
            label: " New ".into(),
            background_color: None,
            text_color: Some("#FFFFFF".into()),
        };
        let upsert = UpsertLabel::from_request("a.myshopify.com", "gid://shopify/Product/5", &request);
        assert_eq!(upsert.product_id, "5");
        assert_eq!(upsert.text, "New");
        assert_eq!(upsert.background_color, DEFAULT_BACKGROUND_COLOR);
        assert_eq!(upsert.text_color, "#FFFFFF");
    }
}
