use crate::{
    auth::{hash_password, rbac::is_known_role},
    entities::{user, User},
    errors::ServiceError,
    events::{Event, EventSender},
};
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

/// User administration.
///
/// Routing gates every operation behind `users:manage`, so only admins reach
/// this service.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new user account
    #[instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ServiceError::InvalidInput("Email must not be empty".into()));
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput("Name must not be empty".into()));
        }
        if !is_known_role(&input.role) {
            return Err(ServiceError::InvalidInput(format!(
                "Unknown role: {} (expected viewer, manager or admin)",
                input.role
            )));
        }
        if input.password.len() < 12 {
            return Err(ServiceError::InvalidInput(
                "Password must be at least 12 characters".into(),
            ));
        }

        let existing = User::find()
            .filter(user::Column::Email.eq(email.clone()))
            .count(&*self.db)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict(format!(
                "User with email {} already exists",
                email
            )));
        }

        let password_hash = hash_password(&input.password)
            .map_err(|e| ServiceError::InternalError(format!("Password hashing failed: {}", e)))?;

        let user_id = Uuid::new_v4();
        let user = user::ActiveModel {
            id: Set(user_id),
            email: Set(email),
            name: Set(name.to_string()),
            password_hash: Set(password_hash),
            role: Set(input.role.clone()),
            is_active: Set(true),
            ..Default::default()
        };

        let user = user.insert(&*self.db).await?;

        self.event_sender.send_or_log(Event::UserCreated(user_id)).await;

        info!("Created user {} with role {}", user_id, user.role);
        Ok(user)
    }

    /// Get a user by ID
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    /// List users, newest first
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let total = User::find().count(&*self.db).await?;

        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = offset.unwrap_or(0);

        let users = User::find()
            .order_by_desc(user::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok((users, total))
    }

    /// First-run admin seed. Does nothing when the email is already taken.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), ServiceError> {
        let email = email.trim().to_lowercase();
        let existing = User::find()
            .filter(user::Column::Email.eq(email.clone()))
            .count(&*self.db)
            .await?;
        if existing > 0 {
            return Ok(());
        }

        let created = self
            .create_user(CreateUserInput {
                email,
                name: "Administrator".to_string(),
                password: password.to_string(),
                role: "admin".to_string(),
            })
            .await?;

        info!("Bootstrapped admin account {}", created.id);
        Ok(())
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
}
