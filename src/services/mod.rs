pub mod movements;
pub mod products;
pub mod stock;
pub mod users;
pub mod warehouses;

pub use movements::MovementService;
pub use products::ProductService;
pub use stock::StockService;
pub use users::UserService;
pub use warehouses::WarehouseService;
