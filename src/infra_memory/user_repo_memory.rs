use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;

/// Keyed by username. Email uniqueness is a scan; the map stays small in the
/// dev and test setups this backend serves.
pub struct MemoryUserRepo {
    users: DashMap<String, UserRecord>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Test and demo hook; there is no deactivation endpoint.
    pub fn set_active(&self, username: &str, is_active: bool) {
        if let Some(mut user) = self.users.get_mut(username) {
            user.is_active = is_active;
        }
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(
        &self,
        user_id: UserId,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        // The email scan must finish before the entry lock is taken.
        if self.users.iter().any(|u| u.email == email) {
            return Err(AuthError::UserExists);
        }
        match self.users.entry(username.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AuthError::UserExists),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(UserRecord {
                    user_id,
                    username: username.to_owned(),
                    email: email.to_owned(),
                    password_hash: password_hash.to_owned(),
                    is_active: true,
                    created_at: Utc::now(),
                });
                Ok(())
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(username).map(|u| u.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn create_then_fetch() {
        let repo = MemoryUserRepo::new();
        let id = UserId(Uuid::new_v4());
        repo.create(id, "alice", "alice@example.com", "$argon2id$fake")
            .await
            .unwrap();
        let user = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.user_id, id);
        assert!(user.is_active);
        assert!(repo.get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn username_and_email_are_unique() {
        let repo = MemoryUserRepo::new();
        repo.create(UserId(Uuid::new_v4()), "alice", "alice@example.com", "h")
            .await
            .unwrap();
        let err = repo
            .create(UserId(Uuid::new_v4()), "alice", "other@example.com", "h")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserExists));
        let err = repo
            .create(UserId(Uuid::new_v4()), "alice2", "alice@example.com", "h")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserExists));
    }
}
