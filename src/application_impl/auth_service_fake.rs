use crate::application_port::*;
use crate::domain_model::UserId;
use chrono::{Duration, Utc};

#[derive(Debug)]
pub struct FakeAuthService;

impl FakeAuthService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FakeAuthService {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal fake for wiring and filter-level tests. Tokens are transparent
// strings tagged with the username; ids are deterministic per username.
#[async_trait::async_trait]
impl AuthService for FakeAuthService {
    async fn register(&self, input: RegisterInput) -> Result<UserId, AuthError> {
        Ok(get_fake_id(&input.username))
    }

    async fn login(&self, input: LoginInput) -> Result<LoginResult, AuthError> {
        Ok(LoginResult {
            user_id: get_fake_id(&input.username),
            tokens: get_fake_tokens(&input.username),
        })
    }

    async fn refresh(&self, raw_refresh_token: &str) -> Result<RefreshedAccess, AuthError> {
        if let Some(username) = raw_refresh_token.strip_prefix("fake-refresh-token:") {
            Ok(RefreshedAccess {
                access_token: AccessToken(format!("fake-access-token:{}", username)),
                access_token_expires_at: Utc::now() + Duration::days(1),
            })
        } else {
            Err(AuthError::TokenInvalid)
        }
    }

    async fn logout(&self, _raw_refresh_token: Option<&str>) {}

    async fn verify_access(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(username) = token.strip_prefix("fake-access-token:") {
            Ok(AuthenticatedUser {
                user_id: get_fake_id(username),
                username: username.to_owned(),
                email: format!("{}@example.com", username),
                created_at: Utc::now(),
            })
        } else {
            Err(AuthError::TokenInvalid)
        }
    }

    async fn revoke(
        &self,
        raw_refresh_token: &str,
        _requesting_user: UserId,
    ) -> Result<(), AuthError> {
        if raw_refresh_token.starts_with("fake-refresh-token:") {
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }
}

fn get_fake_id(username: &str) -> UserId {
    UserId(uuid::Uuid::new_v5(
        &uuid::Uuid::NAMESPACE_OID,
        username.as_bytes(),
    ))
}

fn get_fake_tokens(username: &str) -> AuthTokens {
    let now = Utc::now();
    AuthTokens {
        access_token: AccessToken(format!("fake-access-token:{}", username)),
        access_token_expires_at: now + Duration::days(1),
        refresh_token: RefreshToken(format!("fake-refresh-token:{}", username)),
        refresh_token_expires_at: now + Duration::days(7),
    }
}
