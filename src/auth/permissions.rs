/*!
 * # Permissions Module
 *
 * Permission strings are `resource:action` pairs. The set here is small on
 * purpose: catalog maintenance, stock reads, stock mutation, ledger reads and
 * user administration cover the whole surface.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const MOVE: &'static str = "move";
    pub const MANAGE: &'static str = "manage";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const CATALOG: &'static str = "catalog";
    pub const STOCK: &'static str = "stock";
    pub const MOVEMENTS: &'static str = "movements";
    pub const USERS: &'static str = "users";
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Catalog (products and warehouses)
    pub const CATALOG_READ: &str = "catalog:read";
    pub const CATALOG_MANAGE: &str = "catalog:manage";

    // Stock balances
    pub const STOCK_READ: &str = "stock:read";
    pub const STOCK_MOVE: &str = "stock:move";

    // Movement ledger
    pub const MOVEMENTS_READ: &str = "movements:read";

    // User administration
    pub const USERS_MANAGE: &str = "users:manage";
}

/// Format a permission string
pub fn format_permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consts_line_up_with_resources_and_actions() {
        assert_eq!(
            consts::STOCK_MOVE,
            format_permission(Resources::STOCK, Actions::MOVE)
        );
        assert_eq!(
            consts::CATALOG_MANAGE,
            format_permission(Resources::CATALOG, Actions::MANAGE)
        );
    }
}
