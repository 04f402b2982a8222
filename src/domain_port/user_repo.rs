use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Single-statement insert. A duplicate username or email surfaces as
    /// `AuthError::UserExists` through the store's unique keys, never
    /// through a racy pre-check.
    async fn create(
        &self,
        user_id: UserId,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), AuthError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError>;
}
