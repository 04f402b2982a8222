use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub fingerprint: TokenFingerprint,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}

#[async_trait::async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    /// Stores the fingerprint of a freshly issued token. The raw token never
    /// reaches the store.
    async fn record(
        &self,
        user_id: UserId,
        fingerprint: &TokenFingerprint,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AuthError>;

    /// Fingerprint match with `revoked = false`. Expiry is the caller's
    /// policy, not the store's.
    async fn find_active(
        &self,
        fingerprint: &TokenFingerprint,
    ) -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Idempotent. Revoking an already revoked record is a no-op.
    async fn revoke(&self, id: RefreshTokenId) -> Result<(), AuthError>;

    /// Ownership-checked revoke in one statement. Returns `false` when no
    /// active record matches both the fingerprint and the owner.
    async fn revoke_by_fingerprint(
        &self,
        fingerprint: &TokenFingerprint,
        owner: UserId,
    ) -> Result<bool, AuthError>;
}
