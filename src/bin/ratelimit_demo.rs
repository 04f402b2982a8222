/// Example demonstrating the token-bucket limiter under a burst of checks.
///
/// $ cargo run --bin ratelimit_demo
use gatehouse::domain_model::{ClientKey, EndpointClass};
use gatehouse::ratelimit::*;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let filter = EnvFilter::new("ratelimit_demo=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let buckets = BucketStore::new(Duration::from_secs(3600), 64);
    let limiter = RateLimiter::new(
        buckets,
        RateLimiterConfig {
            enabled: true,
            general: RatePolicy {
                rate_per_minute: 60,
                burst: 5,
            },
            auth: RatePolicy {
                rate_per_minute: 10,
                burst: 15,
            },
            sensitive: RatePolicy {
                rate_per_minute: 3,
                burst: 5,
            },
        },
    );

    let key = ClientKey("203.0.113.9".to_string());
    for i in 0..8 {
        let verdict = limiter.check_and_consume(&key, EndpointClass::General);
        tracing::debug!("check {}: {:?}", i, verdict);
    }

    tracing::debug!("sleeping past one refill interval...");
    std::thread::sleep(Duration::from_millis(1100));

    let verdict = limiter.check_and_consume(&key, EndpointClass::General);
    tracing::debug!("after refill: {:?}", verdict);
    tracing::debug!("tracked buckets: {}", limiter.tracked_buckets());
}
