pub mod product;
pub mod stock_level;
pub mod stock_movement;
pub mod user;
pub mod warehouse;

pub use product::Entity as Product;
pub use stock_level::Entity as StockLevel;
pub use stock_movement::Entity as StockMovement;
pub use user::Entity as User;
pub use warehouse::Entity as Warehouse;
