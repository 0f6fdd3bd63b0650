/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Three built-in roles cover the whole API surface: viewer (read only),
 * manager (reads plus stock movements) and admin (everything). Permissions
 * are `resource:action` strings; a trailing `:*` grants every action on the
 * resource.
 */

use crate::auth::permissions::consts as perm;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Role definition with associated permissions
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

// Define standard roles and their permissions
lazy_static! {
    pub static ref ROLES: HashMap<String, Role> = {
        let mut roles = HashMap::new();

        // Admin role - has all permissions
        roles.insert(
            "admin".to_string(),
            Role {
                name: "admin".to_string(),
                description: "Administrator with full access".to_string(),
                permissions: vec![
                    "catalog:*".to_string(),
                    "stock:*".to_string(),
                    "movements:*".to_string(),
                    "users:*".to_string(),
                ],
            },
        );

        // Manager role - reads everything and records stock movements
        roles.insert(
            "manager".to_string(),
            Role {
                name: "manager".to_string(),
                description: "Warehouse manager who records stock movements".to_string(),
                permissions: vec![
                    perm::CATALOG_READ.to_string(),
                    perm::STOCK_READ.to_string(),
                    perm::STOCK_MOVE.to_string(),
                    perm::MOVEMENTS_READ.to_string(),
                ],
            },
        );

        // Viewer role - read-only access
        roles.insert(
            "viewer".to_string(),
            Role {
                name: "viewer".to_string(),
                description: "Read-only access to catalog, stock and the ledger".to_string(),
                permissions: vec![
                    perm::CATALOG_READ.to_string(),
                    perm::STOCK_READ.to_string(),
                    perm::MOVEMENTS_READ.to_string(),
                ],
            },
        );

        roles
    };
}

/// Returns true when `role` is one of the built-in role names
pub fn is_known_role(role: &str) -> bool {
    ROLES.contains_key(role)
}

/// Whether a role may record stock movements
pub fn can_mutate_stock(role: &str) -> bool {
    role_grants(role, perm::STOCK_MOVE)
}

/// Whether a role may create, update or delete catalog entries
pub fn can_manage_catalog(role: &str) -> bool {
    role_grants(role, perm::CATALOG_MANAGE)
}

fn role_grants(role: &str, required: &str) -> bool {
    let rbac = RbacService::new();
    rbac.get_role_permissions(role)
        .iter()
        .any(|p| rbac.check_permission(p, required))
}

/// RBAC service for managing roles and permissions
#[derive(Clone)]
pub struct RbacService {}

impl RbacService {
    /// Create a new RBAC service
    pub fn new() -> Self {
        Self {}
    }

    /// Get a role by name
    pub fn get_role(&self, role_name: &str) -> Option<&Role> {
        ROLES.get(role_name)
    }

    /// Get all roles
    pub fn get_all_roles(&self) -> Vec<&Role> {
        ROLES.values().collect()
    }

    /// Get all permissions for a role
    pub fn get_role_permissions(&self, role_name: &str) -> Vec<String> {
        match ROLES.get(role_name) {
            Some(role) => role.permissions.clone(),
            None => {
                warn!("Role not found: {}", role_name);
                vec![]
            }
        }
    }

    /// Get all permissions for multiple roles
    pub fn get_permissions_for_roles(&self, role_names: &[String]) -> HashSet<String> {
        let mut permissions = HashSet::new();

        for role_name in role_names {
            if let Some(role) = ROLES.get(role_name) {
                for perm in &role.permissions {
                    permissions.insert(perm.clone());
                }
            }
        }

        permissions
    }

    /// Check if a specific permission matches a required permission
    pub fn check_permission(&self, user_permission: &str, required_permission: &str) -> bool {
        // Direct match
        if user_permission == required_permission {
            return true;
        }

        // Wildcard match
        if user_permission.ends_with(":*") {
            let prefix = user_permission.trim_end_matches(":*");
            if required_permission.starts_with(prefix) {
                return true;
            }
        }

        // Super wildcard (admin)
        if user_permission == "*" {
            return true;
        }

        false
    }
}

/// Default RBAC implementation
impl Default for RbacService {
    fn default() -> Self {
        Self::new()
    }
}
