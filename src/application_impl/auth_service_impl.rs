use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::{RefreshTokenRepo, UserRepo};
use chrono::Utc;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

const COMMON_PASSWORDS: [&str; 5] =
    ["password", "12345678", "qwerty", "abc123", "password123"];

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    refresh_token_repo: Arc<dyn RefreshTokenRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    min_password_len: usize,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        refresh_token_repo: Arc<dyn RefreshTokenRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            user_repo,
            refresh_token_repo,
            credential_hasher,
            token_codec,
            min_password_len: 8,
        }
    }

    fn validate_email(email: &str) -> Result<(), AuthError> {
        let well_formed = Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .is_ok_and(|re| re.is_match(email));
        if well_formed {
            Ok(())
        } else {
            Err(AuthError::InvalidEmail)
        }
    }

    fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        if password.len() < self.min_password_len {
            return Err(AuthError::WeakPassword(format!(
                "must be at least {} characters",
                self.min_password_len
            )));
        }
        if !password.chars().any(char::is_alphabetic) {
            return Err(AuthError::WeakPassword(
                "must contain at least one letter".to_string(),
            ));
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AuthError::WeakPassword(
                "must contain at least one digit".to_string(),
            ));
        }
        if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
            return Err(AuthError::WeakPassword("too common".to_string()));
        }
        Ok(())
    }

    #[inline]
    fn new_user_id() -> UserId {
        UserId(Uuid::new_v4())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, input: RegisterInput) -> Result<UserId, AuthError> {
        let RegisterInput {
            username,
            email,
            password,
        } = input;

        Self::validate_email(&email)?;
        self.validate_password(&password)?;

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let user_id = Self::new_user_id();
        self.user_repo
            .create(user_id, &username, &email, &password_hash)
            .await?;

        Ok(user_id)
    }

    async fn login(&self, input: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { username, password } = input;

        // Unknown user and wrong password take the same exit.
        let user = self
            .user_repo
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let ok = self
            .credential_hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, access_exp) = self.token_codec.issue_access(&user.username).await?;
        let (refresh_token, refresh_exp) = self.token_codec.issue_refresh(&user.username).await?;

        let fingerprint = self.token_codec.fingerprint(&refresh_token.0);
        self.refresh_token_repo
            .record(user.user_id, &fingerprint, refresh_exp)
            .await?;

        Ok(LoginResult {
            user_id: user.user_id,
            tokens: AuthTokens {
                access_token,
                refresh_token,
                access_token_expires_at: access_exp,
                refresh_token_expires_at: refresh_exp,
            },
        })
    }

    async fn refresh(&self, raw_refresh_token: &str) -> Result<RefreshedAccess, AuthError> {
        let claims = self.token_codec.validate_refresh(raw_refresh_token).await?;

        let fingerprint = self.token_codec.fingerprint(raw_refresh_token);
        let record = self
            .refresh_token_repo
            .find_active(&fingerprint)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        // A stale stored expiry (for instance after a TTL change) is healed
        // in place: revoke the record so the token is terminally dead.
        if record.expires_at < Utc::now() {
            self.refresh_token_repo.revoke(record.id).await?;
            return Err(AuthError::TokenExpired);
        }

        let (access_token, access_exp) = self.token_codec.issue_access(&claims.subject).await?;
        Ok(RefreshedAccess {
            access_token,
            access_token_expires_at: access_exp,
        })
    }

    async fn logout(&self, raw_refresh_token: Option<&str>) {
        let Some(raw) = raw_refresh_token else {
            return;
        };
        let fingerprint = self.token_codec.fingerprint(raw);
        match self.refresh_token_repo.find_active(&fingerprint).await {
            Ok(Some(record)) => {
                if let Err(e) = self.refresh_token_repo.revoke(record.id).await {
                    warn!("logout: failed to revoke refresh token: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => warn!("logout: refresh token lookup failed: {e}"),
        }
    }

    async fn verify_access(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.token_codec.validate_access(token).await?;

        let user = self
            .user_repo
            .get_by_username(&claims.subject)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !user.is_active {
            return Err(AuthError::TokenInvalid);
        }

        Ok(AuthenticatedUser {
            user_id: user.user_id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        })
    }

    async fn revoke(
        &self,
        raw_refresh_token: &str,
        requesting_user: UserId,
    ) -> Result<(), AuthError> {
        let fingerprint = self.token_codec.fingerprint(raw_refresh_token);
        let revoked = self
            .refresh_token_repo
            .revoke_by_fingerprint(&fingerprint, requesting_user)
            .await?;
        // Someone else's token and a nonexistent one are indistinguishable.
        if !revoked {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, JwtConfig, JwtHs256Codec};
    use crate::infra_memory::{MemoryRefreshTokenRepo, MemoryUserRepo};
    use std::time::Duration;

    struct Harness {
        service: RealAuthService,
        users: Arc<MemoryUserRepo>,
        tokens: Arc<MemoryRefreshTokenRepo>,
        codec: Arc<JwtHs256Codec>,
    }

    fn harness() -> Harness {
        let users = Arc::new(MemoryUserRepo::new());
        let tokens = Arc::new(MemoryRefreshTokenRepo::new());
        let codec = Arc::new(JwtHs256Codec::new(JwtConfig {
            access_ttl: Duration::from_secs(1800),
            refresh_ttl: Duration::from_secs(604_800),
            signing_key: b"test-signing-key".to_vec(),
        }));
        let service = RealAuthService::new(
            users.clone(),
            tokens.clone(),
            Arc::new(Argon2PasswordHasher),
            codec.clone(),
        );
        Harness {
            service,
            users,
            tokens,
            codec,
        }
    }

    async fn register(h: &Harness, username: &str, email: &str, password: &str) -> UserId {
        h.service
            .register(RegisterInput {
                username: username.to_owned(),
                email: email.to_owned(),
                password: password.to_owned(),
            })
            .await
            .unwrap()
    }

    async fn login(h: &Harness, username: &str, password: &str) -> LoginResult {
        h.service
            .login(LoginInput {
                username: username.to_owned(),
                password: password.to_owned(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn login_refresh_revoke_scenario() {
        let h = harness();
        register(&h, "alice", "alice@example.com", "correctpw1").await;
        let session = login(&h, "alice", "correctpw1").await;
        let refresh_raw = session.tokens.refresh_token.0.clone();

        let refreshed = h.service.refresh(&refresh_raw).await.unwrap();
        let who = h
            .service
            .verify_access(&refreshed.access_token.0)
            .await
            .unwrap();
        assert_eq!(who.username, "alice");

        // No rotation: the same refresh token stays active across uses.
        h.service.refresh(&refresh_raw).await.unwrap();

        h.service
            .revoke(&refresh_raw, session.user_id)
            .await
            .unwrap();
        assert!(matches!(
            h.service.refresh(&refresh_raw).await.unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let h = harness();
        register(&h, "alice", "alice@example.com", "correctpw1").await;
        let unknown = h
            .service
            .login(LoginInput {
                username: "mallory".to_owned(),
                password: "correctpw1".to_owned(),
            })
            .await
            .unwrap_err();
        let wrong = h
            .service
            .login(LoginInput {
                username: "alice".to_owned(),
                password: "wrong-pw11".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn deactivated_user_is_shut_out() {
        let h = harness();
        register(&h, "alice", "alice@example.com", "correctpw1").await;
        let session = login(&h, "alice", "correctpw1").await;

        h.users.set_active("alice", false);
        assert!(matches!(
            h.service
                .login(LoginInput {
                    username: "alice".to_owned(),
                    password: "correctpw1".to_owned(),
                })
                .await
                .unwrap_err(),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            h.service
                .verify_access(&session.tokens.access_token.0)
                .await
                .unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[tokio::test]
    async fn refresh_requires_the_store_record() {
        let h = harness();
        // Validly signed, never recorded: the store is authoritative.
        let (token, _) = h.codec.issue_refresh("alice").await.unwrap();
        assert!(matches!(
            h.service.refresh(&token.0).await.unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let h = harness();
        register(&h, "alice", "alice@example.com", "correctpw1").await;
        let session = login(&h, "alice", "correctpw1").await;
        assert!(matches!(
            h.service
                .refresh(&session.tokens.access_token.0)
                .await
                .unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[tokio::test]
    async fn stale_store_expiry_self_heals() {
        let h = harness();
        let user_id = register(&h, "alice", "alice@example.com", "correctpw1").await;
        let (token, _) = h.codec.issue_refresh("alice").await.unwrap();
        let fingerprint = h.codec.fingerprint(&token.0);
        // Stored expiry already in the past, as after a TTL change.
        h.tokens
            .record(
                user_id,
                &fingerprint,
                Utc::now() - chrono::Duration::seconds(60),
            )
            .await
            .unwrap();

        assert!(matches!(
            h.service.refresh(&token.0).await.unwrap_err(),
            AuthError::TokenExpired
        ));
        // The record was revoked on the way out; the state is terminal.
        assert!(matches!(
            h.service.refresh(&token.0).await.unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[tokio::test]
    async fn logout_is_best_effort() {
        let h = harness();
        h.service.logout(None).await;
        h.service.logout(Some("garbage")).await;

        register(&h, "alice", "alice@example.com", "correctpw1").await;
        let session = login(&h, "alice", "correctpw1").await;
        let refresh_raw = session.tokens.refresh_token.0;
        h.service.logout(Some(&refresh_raw)).await;
        assert!(matches!(
            h.service.refresh(&refresh_raw).await.unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[tokio::test]
    async fn revoke_is_owner_scoped() {
        let h = harness();
        register(&h, "alice", "alice@example.com", "correctpw1").await;
        register(&h, "bob", "bob@example.com", "correctpw1").await;
        let alice = login(&h, "alice", "correctpw1").await;
        let bob = login(&h, "bob", "correctpw1").await;

        let alice_refresh = alice.tokens.refresh_token.0;
        assert!(matches!(
            h.service
                .revoke(&alice_refresh, bob.user_id)
                .await
                .unwrap_err(),
            AuthError::NotFound
        ));
        // The failed attempt left alice's token active.
        h.service.refresh(&alice_refresh).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let h = harness();
        register(&h, "alice", "alice@example.com", "correctpw1").await;
        assert!(matches!(
            h.service
                .register(RegisterInput {
                    username: "alice".to_owned(),
                    email: "other@example.com".to_owned(),
                    password: "correctpw1".to_owned(),
                })
                .await
                .unwrap_err(),
            AuthError::UserExists
        ));
        assert!(matches!(
            h.service
                .register(RegisterInput {
                    username: "alice2".to_owned(),
                    email: "alice@example.com".to_owned(),
                    password: "correctpw1".to_owned(),
                })
                .await
                .unwrap_err(),
            AuthError::UserExists
        ));
    }

    #[tokio::test]
    async fn register_validates_email_and_password() {
        let h = harness();
        for email in ["not-an-email", "a@b", "user@domain."] {
            let err = h
                .service
                .register(RegisterInput {
                    username: "alice".to_owned(),
                    email: email.to_owned(),
                    password: "correctpw1".to_owned(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidEmail), "email {email:?}");
        }
        for password in ["short1", "nodigitshere", "12345678", "PASSWORD123"] {
            let err = h
                .service
                .register(RegisterInput {
                    username: "alice".to_owned(),
                    email: "alice@example.com".to_owned(),
                    password: password.to_owned(),
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err, AuthError::WeakPassword(_)),
                "password {password:?}"
            );
        }
    }

    #[tokio::test]
    async fn verify_access_returns_the_profile() {
        let h = harness();
        let user_id = register(&h, "alice", "alice@example.com", "correctpw1").await;
        let session = login(&h, "alice", "correctpw1").await;
        let who = h
            .service
            .verify_access(&session.tokens.access_token.0)
            .await
            .unwrap();
        assert_eq!(who.user_id, user_id);
        assert_eq!(who.email, "alice@example.com");
    }
}
