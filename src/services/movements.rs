use crate::{
    auth::{rbac::can_mutate_stock, AuthUser},
    entities::{
        product, stock_level,
        stock_movement::{self, MovementType},
        warehouse, Product, StockLevel, StockMovement, Warehouse,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// The stock-movement engine.
///
/// `record_movement` validates a request, mutates the affected balances and
/// appends one ledger entry, all inside a single database transaction. A
/// rejected movement leaves both the balances and the ledger untouched.
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl MovementService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Record a stock movement on behalf of `actor`.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn record_movement(
        &self,
        actor: &AuthUser,
        input: RecordMovementInput,
    ) -> Result<stock_movement::Model, ServiceError> {
        let result = self.record_movement_inner(actor, input).await;

        match &result {
            Ok(movement) => {
                counter!("stock_movements_recorded", 1);
                self.event_sender
                    .send_or_log(Event::StockMoved {
                        movement_id: movement.id,
                        movement_type: movement.movement_type.clone(),
                        product_id: movement.product_id,
                        source_warehouse_id: movement.source_warehouse_id,
                        destination_warehouse_id: movement.destination_warehouse_id,
                        quantity: movement.quantity,
                    })
                    .await;
                info!(
                    "Recorded {} movement {} of product {} (quantity {})",
                    movement.movement_type, movement.id, movement.product_id, movement.quantity
                );
            }
            Err(_) => {
                counter!("stock_movements_rejected", 1);
            }
        }

        result
    }

    async fn record_movement_inner(
        &self,
        actor: &AuthUser,
        input: RecordMovementInput,
    ) -> Result<stock_movement::Model, ServiceError> {
        // Policy gate runs before any storage access.
        if !actor.roles.iter().any(|role| can_mutate_stock(role)) {
            return Err(ServiceError::Forbidden(
                "Your role does not permit recording stock movements".into(),
            ));
        }

        if input.quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity must be a positive integer".into(),
            ));
        }

        let movement_type: MovementType = input.movement_type.trim().parse().map_err(|_| {
            ServiceError::InvalidInput(format!(
                "Unknown movement type: {} (expected IN, OUT or TRANSFER)",
                input.movement_type
            ))
        })?;

        // Empty-string warehouse ids count as absent.
        let source_id = normalize_warehouse_id(input.source_warehouse_id.as_deref(), "Source")?;
        let destination_id =
            normalize_warehouse_id(input.destination_warehouse_id.as_deref(), "Destination")?;

        let product_id = input.product_id;
        self.ensure_live_product(product_id).await?;
        if let Some(id) = source_id {
            self.ensure_live_warehouse(id, "Source").await?;
        }
        if let Some(id) = destination_id {
            self.ensure_live_warehouse(id, "Destination").await?;
        }

        // Each type dictates which warehouse fields it carries; the rest are
        // dropped from the record.
        let (source, destination) = match movement_type {
            MovementType::In => {
                let destination = destination_id.ok_or_else(|| {
                    ServiceError::InvalidInput(
                        "Destination warehouse is required for IN movement".into(),
                    )
                })?;
                (None, Some(destination))
            }
            MovementType::Out => {
                let source = source_id.ok_or_else(|| {
                    ServiceError::InvalidInput(
                        "Source warehouse is required for OUT movement".into(),
                    )
                })?;
                (Some(source), None)
            }
            MovementType::Transfer => {
                let source = source_id.ok_or_else(|| {
                    ServiceError::InvalidInput(
                        "Source warehouse is required for TRANSFER movement".into(),
                    )
                })?;
                let destination = destination_id.ok_or_else(|| {
                    ServiceError::InvalidInput(
                        "Destination warehouse is required for TRANSFER movement".into(),
                    )
                })?;
                if source == destination {
                    return Err(ServiceError::InvalidInput(
                        "Source and destination warehouses must differ".into(),
                    ));
                }
                (Some(source), Some(destination))
            }
        };

        let created_by = actor
            .user_uuid()
            .map_err(|_| ServiceError::Unauthorized("Actor id is not a valid UUID".into()))?;
        let quantity = input.quantity;
        let reference = normalize_optional(input.reference);
        let description = normalize_optional(input.description);

        let movement = self
            .db
            .transaction::<_, stock_movement::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    // The product could have been soft-deleted between the
                    // snapshot check above and this point.
                    let live = Product::find_by_id(product_id)
                        .filter(product::Column::DeletedAt.is_null())
                        .count(txn)
                        .await?;
                    if live == 0 {
                        return Err(ServiceError::NotFound(format!(
                            "Product {} not found",
                            product_id
                        )));
                    }

                    if let Some(source_id) = source {
                        decrease_balance(txn, source_id, product_id, quantity).await?;
                    }
                    if let Some(destination_id) = destination {
                        increase_balance(txn, destination_id, product_id, quantity).await?;
                    }

                    let movement = stock_movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        movement_type: Set(movement_type.as_str().to_string()),
                        quantity: Set(quantity),
                        product_id: Set(product_id),
                        source_warehouse_id: Set(source),
                        destination_warehouse_id: Set(destination),
                        reference: Set(reference),
                        description: Set(description),
                        created_by: Set(created_by),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await?;

                    Ok(movement)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        Ok(movement)
    }

    /// Get one ledger entry by ID
    #[instrument(skip(self))]
    pub async fn get_movement(
        &self,
        movement_id: Uuid,
    ) -> Result<stock_movement::Model, ServiceError> {
        StockMovement::find_by_id(movement_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Movement {} not found", movement_id)))
    }

    /// List ledger entries, newest first
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        query: MovementListQuery,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let mut db_query = StockMovement::find();

        if let Some(product_id) = query.product_id {
            db_query = db_query.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        if let Some(warehouse_id) = query.warehouse_id {
            db_query = db_query.filter(
                stock_movement::Column::SourceWarehouseId
                    .eq(warehouse_id)
                    .or(stock_movement::Column::DestinationWarehouseId.eq(warehouse_id)),
            );
        }
        if let Some(ref movement_type) = query.movement_type {
            let movement_type: MovementType = movement_type.trim().parse().map_err(|_| {
                ServiceError::InvalidInput(format!("Unknown movement type: {}", movement_type))
            })?;
            db_query = db_query
                .filter(stock_movement::Column::MovementType.eq(movement_type.as_str()));
        }
        if let Some(after) = query.created_after {
            db_query = db_query.filter(stock_movement::Column::CreatedAt.gte(after));
        }
        if let Some(before) = query.created_before {
            db_query = db_query.filter(stock_movement::Column::CreatedAt.lte(before));
        }

        let total = db_query.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let movements = db_query
            .order_by_desc(stock_movement::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok((movements, total))
    }

    async fn ensure_live_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let live = Product::find_by_id(product_id)
            .filter(product::Column::DeletedAt.is_null())
            .count(&*self.db)
            .await?;
        if live == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }
        Ok(())
    }

    async fn ensure_live_warehouse(
        &self,
        warehouse_id: Uuid,
        label: &str,
    ) -> Result<(), ServiceError> {
        let live = Warehouse::find_by_id(warehouse_id)
            .filter(warehouse::Column::DeletedAt.is_null())
            .count(&*self.db)
            .await?;
        if live == 0 {
            return Err(ServiceError::NotFound(format!(
                "{} warehouse {} not found",
                label, warehouse_id
            )));
        }
        Ok(())
    }
}

/// Subtract `quantity` from one balance.
///
/// The decrement and the non-negativity guard are a single UPDATE so that
/// concurrent movements on the same pair cannot both pass a stale check.
async fn decrease_balance<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    let delta = i64::from(quantity);
    let updated = StockLevel::update_many()
        .col_expr(
            stock_level::Column::Quantity,
            Expr::col(stock_level::Column::Quantity).sub(delta),
        )
        .col_expr(stock_level::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(stock_level::Column::WarehouseId.eq(warehouse_id))
        .filter(stock_level::Column::ProductId.eq(product_id))
        .filter(stock_level::Column::Quantity.gte(delta))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        // Either no row exists for the pair or the balance is short.
        let available = current_balance(conn, warehouse_id, product_id).await?;
        return Err(ServiceError::InsufficientStock(format!(
            "available {}, requested {}",
            available, quantity
        )));
    }

    Ok(())
}

/// Add `quantity` to one balance, creating the row on first inbound movement.
///
/// The create-or-increment is a single upsert keyed on the (warehouse,
/// product) unique index, so two first-inbound movements for the same pair
/// both succeed: one inserts the row, the other lands on the conflict arm.
async fn increase_balance<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    let delta = i64::from(quantity);
    let now = Utc::now();
    StockLevel::insert(stock_level::ActiveModel {
        id: Set(Uuid::new_v4()),
        warehouse_id: Set(warehouse_id),
        product_id: Set(product_id),
        quantity: Set(delta),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::columns([
            stock_level::Column::WarehouseId,
            stock_level::Column::ProductId,
        ])
        .value(
            stock_level::Column::Quantity,
            Expr::col((stock_level::Entity, stock_level::Column::Quantity)).add(delta),
        )
        .value(stock_level::Column::UpdatedAt, Expr::value(now))
        .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Ok(())
}

async fn current_balance<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    product_id: Uuid,
) -> Result<i64, ServiceError> {
    let level = StockLevel::find()
        .filter(stock_level::Column::WarehouseId.eq(warehouse_id))
        .filter(stock_level::Column::ProductId.eq(product_id))
        .one(conn)
        .await?;
    Ok(level.map(|l| l.quantity).unwrap_or(0))
}

fn normalize_warehouse_id(raw: Option<&str>, label: &str) -> Result<Option<Uuid>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Uuid::parse_str(value).map(Some).map_err(|_| {
            ServiceError::InvalidInput(format!("{} warehouse id is not a valid UUID", label))
        }),
    }
}

fn normalize_optional(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Input to `record_movement`.
///
/// Warehouse ids arrive as strings so that empty values can be treated as
/// absent before anything else looks at them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMovementInput {
    pub product_id: Uuid,
    pub movement_type: String,
    pub quantity: i32,
    pub source_warehouse_id: Option<String>,
    pub destination_warehouse_id: Option<String>,
    pub reference: Option<String>,
    pub description: Option<String>,
}

/// Ledger list filters
#[derive(Debug, Clone, Default)]
pub struct MovementListQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub movement_type: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}
