use crate::{
    entities::{
        stock_level,
        stock_movement::{self, MovementType},
        StockLevel, StockMovement,
    },
    errors::ServiceError,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Read path over the balance projection.
///
/// Balances are only ever written by the movement engine; this service
/// answers queries and, for operators, replays the ledger to verify that the
/// projection still matches it.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Current balance for one (warehouse, product) pair; 0 when no row exists
    #[instrument(skip(self))]
    pub async fn get_balance(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> Result<i64, ServiceError> {
        let level = StockLevel::find()
            .filter(stock_level::Column::WarehouseId.eq(warehouse_id))
            .filter(stock_level::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;
        Ok(level.map(|l| l.quantity).unwrap_or(0))
    }

    /// Total quantity of a product across all warehouses
    #[instrument(skip(self))]
    pub async fn get_product_total(&self, product_id: Uuid) -> Result<i64, ServiceError> {
        let levels = StockLevel::find()
            .filter(stock_level::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;
        Ok(levels.iter().map(|l| l.quantity).sum())
    }

    /// List stock levels, optionally narrowed to one warehouse or product
    #[instrument(skip(self))]
    pub async fn list_stock_levels(
        &self,
        query: StockListQuery,
    ) -> Result<(Vec<stock_level::Model>, u64), ServiceError> {
        let mut db_query = StockLevel::find();

        if let Some(warehouse_id) = query.warehouse_id {
            db_query = db_query.filter(stock_level::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(product_id) = query.product_id {
            db_query = db_query.filter(stock_level::Column::ProductId.eq(product_id));
        }

        let total = db_query.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let levels = db_query
            .order_by_desc(stock_level::Column::UpdatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok((levels, total))
    }

    /// Recompute every balance from the movement ledger and report mismatches.
    ///
    /// The stored balances are a projection of the ledger; any divergence
    /// means something wrote around the engine.
    #[instrument(skip(self))]
    pub async fn audit_balances(&self) -> Result<StockAuditReport, ServiceError> {
        let movements = StockMovement::find().all(&*self.db).await?;

        let mut computed: HashMap<(Uuid, Uuid), i64> = HashMap::new();
        for movement in &movements {
            let quantity = i64::from(movement.quantity);
            match movement.movement_type() {
                Some(MovementType::In) => {
                    if let Some(destination) = movement.destination_warehouse_id {
                        *computed.entry((destination, movement.product_id)).or_insert(0) +=
                            quantity;
                    }
                }
                Some(MovementType::Out) => {
                    if let Some(source) = movement.source_warehouse_id {
                        *computed.entry((source, movement.product_id)).or_insert(0) -= quantity;
                    }
                }
                Some(MovementType::Transfer) => {
                    if let Some(source) = movement.source_warehouse_id {
                        *computed.entry((source, movement.product_id)).or_insert(0) -= quantity;
                    }
                    if let Some(destination) = movement.destination_warehouse_id {
                        *computed.entry((destination, movement.product_id)).or_insert(0) +=
                            quantity;
                    }
                }
                None => {
                    warn!(
                        "Movement {} carries unknown type {:?}; skipped in audit",
                        movement.id, movement.movement_type
                    );
                }
            }
        }

        let levels = StockLevel::find().all(&*self.db).await?;
        let mut stored: HashMap<(Uuid, Uuid), i64> = HashMap::new();
        for level in &levels {
            stored.insert((level.warehouse_id, level.product_id), level.quantity);
        }

        let mut keys: Vec<(Uuid, Uuid)> = computed.keys().chain(stored.keys()).copied().collect();
        keys.sort();
        keys.dedup();

        let checked = keys.len() as u64;
        let mut mismatches = Vec::new();
        for key in keys {
            let stored_quantity = stored.get(&key).copied().unwrap_or(0);
            let computed_quantity = computed.get(&key).copied().unwrap_or(0);
            if stored_quantity != computed_quantity {
                mismatches.push(StockAuditMismatch {
                    warehouse_id: key.0,
                    product_id: key.1,
                    stored: stored_quantity,
                    computed: computed_quantity,
                });
            }
        }

        if !mismatches.is_empty() {
            warn!(
                "Stock audit found {} mismatched balance(s) out of {}",
                mismatches.len(),
                checked
            );
        }

        Ok(StockAuditReport {
            balances_checked: checked,
            movements_replayed: movements.len() as u64,
            mismatches,
        })
    }
}

/// Stock list filters
#[derive(Debug, Clone, Default)]
pub struct StockListQuery {
    pub warehouse_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One balance that disagrees with the ledger
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StockAuditMismatch {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    /// Quantity held in the balance projection
    pub stored: i64,
    /// Quantity obtained by replaying the ledger
    pub computed: i64,
}

/// Result of replaying the ledger against the stored balances
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StockAuditReport {
    pub balances_checked: u64,
    pub movements_replayed: u64,
    pub mismatches: Vec<StockAuditMismatch>,
}
