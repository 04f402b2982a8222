use crate::domain_model::{TokenFingerprint, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("incorrect username or password")]
    InvalidCredentials,
    #[error("username or email already registered")]
    UserExists,
    #[error("not found")]
    NotFound,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("weak password: {0}")]
    WeakPassword(String),
    #[error("invalid email format")]
    InvalidEmail,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user_id: UserId,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Fresh access token minted from a still-active refresh token.
#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub access_token: AccessToken,
    pub access_token_expires_at: DateTime<Utc>,
}

/// Claims extracted from a token that passed signature and expiry checks.
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

/// Profile of the user an access token belongs to.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access(&self, subject: &str)
    -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    async fn issue_refresh(
        &self,
        subject: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;
    /// Signature, expiry and shape failures all collapse to `TokenInvalid`.
    async fn validate_access(&self, token: &str) -> Result<VerifiedClaims, AuthError>;
    /// As `validate_access`, and the token must carry the refresh type claim.
    async fn validate_refresh(&self, token: &str) -> Result<VerifiedClaims, AuthError>;
    /// One-way digest of the raw token, the only form handed to storage.
    fn fingerprint(&self, raw_token: &str) -> TokenFingerprint;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<UserId, AuthError>;
    async fn login(&self, input: LoginInput) -> Result<LoginResult, AuthError>;
    /// The store record is authoritative: a refresh token with a valid
    /// signature but no active record is rejected.
    async fn refresh(&self, raw_refresh_token: &str) -> Result<RefreshedAccess, AuthError>;
    /// Best effort. Revokes the matching record when one exists; never fails.
    async fn logout(&self, raw_refresh_token: Option<&str>);
    async fn verify_access(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
    /// Revokes one of the caller's own refresh tokens. A token that exists
    /// but belongs to someone else is indistinguishable from a missing one.
    async fn revoke(&self, raw_refresh_token: &str, requesting_user: UserId)
    -> Result<(), AuthError>;
}
