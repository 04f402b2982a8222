/// Example demonstrating the auth service wired against the in-memory repos.
/// Runs without any external infrastructure:
///
/// $ cargo run --bin auth_demo
use gatehouse::application_impl::*;
use gatehouse::application_port::*;
use gatehouse::domain_port::*;
use gatehouse::infra_memory::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::new("auth_demo=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    // region initialization

    let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});
    let key = std::env::var("JWT_SIGNING_KEY")
        .unwrap_or_else(|_| "gatehouse-dev-secret-key".to_string())
        .into_bytes();
    let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
        access_ttl: Duration::from_secs(15 * 60),           // 15 minutes
        refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
        signing_key: key,
    }));

    let user_repo: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new());
    let refresh_token_repo: Arc<dyn RefreshTokenRepo> = Arc::new(MemoryRefreshTokenRepo::new());

    let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
        user_repo,
        refresh_token_repo,
        credential_hasher,
        token_codec,
    ));

    // endregion

    // use cases

    let user_id = auth_service
        .register(RegisterInput {
            username: "demo_user".to_string(),
            email: "demo@example.com".to_string(),
            password: "demo-pass-1".to_string(),
        })
        .await?;
    tracing::debug!("user_id: {}", user_id);

    let result = auth_service
        .login(LoginInput {
            username: "demo_user".to_string(),
            password: "demo-pass-1".to_string(),
        })
        .await?;
    tracing::debug!("login_result: {:?}", result);

    let profile = auth_service
        .verify_access(result.tokens.access_token.0.as_str())
        .await?;
    tracing::debug!("verified: {} <{}>", profile.username, profile.email);

    let refreshed = auth_service
        .refresh(result.tokens.refresh_token.0.as_str())
        .await?;
    tracing::debug!("refresh_result: {:?}", refreshed);

    auth_service
        .revoke(result.tokens.refresh_token.0.as_str(), user_id)
        .await?;
    let after_revoke = auth_service
        .refresh(result.tokens.refresh_token.0.as_str())
        .await;
    tracing::debug!("refresh after revoke: {:?}", after_revoke);

    Ok(())
}
