use crate::{
    entities::{product, stock_level, Product, StockLevel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Catalog service for products.
///
/// Products are soft-deleted only and their skus are never reused, so the
/// uniqueness check runs across live and deleted rows alike.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new product
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let sku = input.sku.trim();
        if sku.is_empty() {
            return Err(ServiceError::InvalidInput("SKU must not be empty".into()));
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Product name must not be empty".into(),
            ));
        }

        self.ensure_unique_sku(sku).await?;

        let product_id = Uuid::new_v4();
        let product = product::ActiveModel {
            id: Set(product_id),
            sku: Set(sku.to_string()),
            name: Set(name.to_string()),
            description: Set(input.description.clone()),
            is_active: Set(input.is_active.unwrap_or(true)),
            deleted_at: Set(None),
            ..Default::default()
        };

        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!("Created product: {}", product_id);
        Ok(product)
    }

    /// Update an existing product. The sku is immutable after create.
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let product = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::InvalidInput(
                    "Product name must not be empty".into(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let product = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!("Updated product: {}", product_id);
        Ok(product)
    }

    /// Get a live product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Get a product by ID regardless of its soft-delete state
    #[instrument(skip(self))]
    pub async fn get_product_any(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// List products with optional search over name and sku
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductListQuery,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut db_query = Product::find();

        if !query.include_deleted {
            db_query = db_query.filter(product::Column::DeletedAt.is_null());
        }

        if let Some(search) = &query.search {
            let search = search.trim();
            if !search.is_empty() {
                db_query = db_query.filter(
                    product::Column::Name
                        .contains(search)
                        .or(product::Column::Sku.contains(search)),
                );
            }
        }

        let total = db_query.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let products = db_query
            .order_by_desc(product::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok((products, total))
    }

    /// Soft-delete a product.
    ///
    /// Blocked while any warehouse still holds stock of it; the row itself is
    /// kept so the movement ledger stays referentially intact.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(product_id).await?;

        let remaining = StockLevel::find()
            .filter(stock_level::Column::ProductId.eq(product_id))
            .filter(stock_level::Column::Quantity.gt(0))
            .count(&*self.db)
            .await?;
        if remaining > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product {} still has stock in {} warehouse(s)",
                product_id, remaining
            )));
        }

        let mut active: product::ActiveModel = product.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.is_active = Set(false);
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        info!("Soft-deleted product: {}", product_id);
        Ok(())
    }

    // Skus are never reused, so deleted rows count against uniqueness too.
    async fn ensure_unique_sku(&self, sku: &str) -> Result<(), ServiceError> {
        let existing = Product::find()
            .filter(product::Column::Sku.eq(sku))
            .count(&*self.db)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU {} already exists",
                sku
            )));
        }
        Ok(())
    }
}

/// Input for creating a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Input for updating a product; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Product list filters
#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}
