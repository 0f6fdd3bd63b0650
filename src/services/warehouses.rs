use crate::{
    entities::{stock_level, warehouse, StockLevel, Warehouse},
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

/// Catalog service for warehouses.
///
/// Names are unique among live rows only; a deleted warehouse frees its name.
#[derive(Clone)]
pub struct WarehouseService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl WarehouseService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new warehouse
    #[instrument(skip(self))]
    pub async fn create_warehouse(
        &self,
        input: CreateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Warehouse name must not be empty".into(),
            ));
        }

        self.ensure_unique_name(name, None).await?;

        let warehouse_id = Uuid::new_v4();
        let warehouse = warehouse::ActiveModel {
            id: Set(warehouse_id),
            name: Set(name.to_string()),
            location: Set(input.location.clone()),
            is_active: Set(input.is_active.unwrap_or(true)),
            deleted_at: Set(None),
            ..Default::default()
        };

        let warehouse = warehouse.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::WarehouseCreated(warehouse_id))
            .await;

        info!("Created warehouse: {}", warehouse_id);
        Ok(warehouse)
    }

    /// Update an existing warehouse
    #[instrument(skip(self))]
    pub async fn update_warehouse(
        &self,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let warehouse = self.get_warehouse(warehouse_id).await?;
        let mut active: warehouse::ActiveModel = warehouse.into();

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::InvalidInput(
                    "Warehouse name must not be empty".into(),
                ));
            }
            self.ensure_unique_name(&name, Some(warehouse_id)).await?;
            active.name = Set(name);
        }
        if let Some(location) = input.location {
            active.location = Set(Some(location));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let warehouse = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::WarehouseUpdated(warehouse_id))
            .await;

        info!("Updated warehouse: {}", warehouse_id);
        Ok(warehouse)
    }

    /// Get a live warehouse by ID
    #[instrument(skip(self))]
    pub async fn get_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<warehouse::Model, ServiceError> {
        Warehouse::find_by_id(warehouse_id)
            .filter(warehouse::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id)))
    }

    /// List warehouses with optional name search
    #[instrument(skip(self))]
    pub async fn list_warehouses(
        &self,
        query: WarehouseListQuery,
    ) -> Result<(Vec<warehouse::Model>, u64), ServiceError> {
        let mut db_query = Warehouse::find();

        if !query.include_deleted {
            db_query = db_query.filter(warehouse::Column::DeletedAt.is_null());
        }

        if let Some(search) = &query.search {
            let search = search.trim();
            if !search.is_empty() {
                db_query = db_query.filter(warehouse::Column::Name.contains(search));
            }
        }

        let total = db_query.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let warehouses = db_query
            .order_by_asc(warehouse::Column::Name)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok((warehouses, total))
    }

    /// Soft-delete a warehouse. Blocked while it holds any stock.
    #[instrument(skip(self))]
    pub async fn delete_warehouse(&self, warehouse_id: Uuid) -> Result<(), ServiceError> {
        let warehouse = self.get_warehouse(warehouse_id).await?;

        let remaining = StockLevel::find()
            .filter(stock_level::Column::WarehouseId.eq(warehouse_id))
            .filter(stock_level::Column::Quantity.gt(0))
            .count(&*self.db)
            .await?;
        if remaining > 0 {
            return Err(ServiceError::Conflict(format!(
                "Warehouse {} still holds stock of {} product(s)",
                warehouse_id, remaining
            )));
        }

        let mut active: warehouse::ActiveModel = warehouse.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.is_active = Set(false);
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::WarehouseDeleted(warehouse_id))
            .await;

        info!("Soft-deleted warehouse: {}", warehouse_id);
        Ok(())
    }

    async fn ensure_unique_name(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Warehouse::find()
            .filter(warehouse::Column::Name.eq(name))
            .filter(warehouse::Column::DeletedAt.is_null());
        if let Some(id) = exclude {
            query = query.filter(warehouse::Column::Id.ne(id));
        }

        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "Warehouse named {} already exists",
                name
            )));
        }
        Ok(())
    }
}

/// Input for creating a warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWarehouseInput {
    pub name: String,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

/// Input for updating a warehouse; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

/// Warehouse list filters
#[derive(Debug, Clone, Default)]
pub struct WarehouseListQuery {
    pub search: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}
