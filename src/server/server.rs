use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::ratelimit::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

/// Idle buckets are swept once per this many rate checks.
const BUCKET_SWEEP_EVERY: u64 = 256;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let rate_limiter = Arc::new(build_rate_limiter(settings));

        let key = std::env::var("JWT_SIGNING_KEY")
            .unwrap_or_else(|_| "gatehouse-dev-secret-key".to_string())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
            signing_key: key,
        }));
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});

        let (auth_service, pool): (Arc<dyn AuthService>, Option<Pool<MySql>>) =
            match settings.auth.backend.as_str() {
                "fake" => (Arc::new(FakeAuthService::new()), None),
                "memory" => {
                    let user_repo: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new());
                    let refresh_token_repo: Arc<dyn RefreshTokenRepo> =
                        Arc::new(MemoryRefreshTokenRepo::new());
                    let service = RealAuthService::new(
                        user_repo,
                        refresh_token_repo,
                        credential_hasher,
                        token_codec,
                    );
                    (Arc::new(service), None)
                }
                "real" => {
                    let pool = Pool::<MySql>::connect(&settings.mysql.dsn).await?;
                    let user_repo: Arc<dyn UserRepo> = Arc::new(MySqlUserRepo::new(pool.clone()));
                    let refresh_token_repo: Arc<dyn RefreshTokenRepo> =
                        Arc::new(MySqlRefreshTokenRepo::new(pool.clone()));
                    let service = RealAuthService::new(
                        user_repo,
                        refresh_token_repo,
                        credential_hasher,
                        token_codec,
                    );
                    (Arc::new(service), Some(pool))
                }
                other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
            };

        info!(backend = %settings.auth.backend, "server started");

        Ok(Self {
            auth_service,
            rate_limiter,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

fn build_rate_limiter(settings: &Settings) -> RateLimiter {
    let rl = &settings.rate_limit;
    let buckets = BucketStore::new(Duration::from_secs(rl.sweep_idle_secs), BUCKET_SWEEP_EVERY);
    let config = RateLimiterConfig {
        enabled: rl.enabled,
        general: RatePolicy {
            rate_per_minute: rl.general.rate_per_minute,
            burst: rl.general.burst,
        },
        auth: RatePolicy {
            rate_per_minute: rl.auth.rate_per_minute,
            burst: rl.auth.burst,
        },
        sensitive: RatePolicy {
            rate_per_minute: rl.sensitive.rate_per_minute,
            burst: rl.sensitive.burst,
        },
    };
    RateLimiter::new(buckets, config)
}
