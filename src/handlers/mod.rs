pub mod common;
pub mod movements;
pub mod products;
pub mod stock_levels;
pub mod users;
pub mod warehouses;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<crate::services::ProductService>,
    pub warehouses: Arc<crate::services::WarehouseService>,
    pub stock: Arc<crate::services::StockService>,
    pub movements: Arc<crate::services::MovementService>,
    pub users: Arc<crate::services::UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            products: Arc::new(crate::services::ProductService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            warehouses: Arc::new(crate::services::WarehouseService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            stock: Arc::new(crate::services::StockService::new(db_pool.clone())),
            movements: Arc::new(crate::services::MovementService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            users: Arc::new(crate::services::UserService::new(db_pool, event_sender)),
        }
    }
}
