use crate::domain_model::{ClientKey, EndpointClass};
use crate::ratelimit::ExpiringMap;
use std::time::Instant;

/// Requests admitted per minute, and how many may arrive in a burst.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub rate_per_minute: u32,
    pub burst: u32,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RateVerdict {
    Allowed { remaining: u32 },
    Denied { retry_after_secs: u64 },
}

/// One token bucket. Tokens are fractional so refill accrues smoothly
/// between whole admits.
#[derive(Debug, Clone, Copy)]
pub struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub type BucketStore = ExpiringMap<(ClientKey, EndpointClass), Bucket>;

#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub enabled: bool,
    pub general: RatePolicy,
    pub auth: RatePolicy,
    pub sensitive: RatePolicy,
}

/// Token-bucket limiter over an injected bucket store. A new bucket starts
/// full at the class burst; each allowed request consumes one token.
pub struct RateLimiter {
    buckets: BucketStore,
    config: RateLimiterConfig,
}

impl RateLimiter {
    pub fn new(buckets: BucketStore, config: RateLimiterConfig) -> Self {
        Self { buckets, config }
    }

    pub fn policy(&self, class: EndpointClass) -> RatePolicy {
        match class {
            EndpointClass::General => self.config.general,
            EndpointClass::Auth => self.config.auth,
            EndpointClass::Sensitive => self.config.sensitive,
        }
    }

    pub fn tracked_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Refills the caller's bucket from elapsed time, then either consumes
    /// one token or reports how long until one accrues. Refill applies on
    /// denied calls too; a denial never drains the balance.
    pub fn check_and_consume(&self, key: &ClientKey, class: EndpointClass) -> RateVerdict {
        self.check_at(key, class, Instant::now())
    }

    fn check_at(&self, key: &ClientKey, class: EndpointClass, now: Instant) -> RateVerdict {
        let policy = self.policy(class);
        if !self.config.enabled {
            return RateVerdict::Allowed {
                remaining: policy.burst,
            };
        }
        let per_sec = f64::from(policy.rate_per_minute) / 60.0;
        let burst = f64::from(policy.burst);
        self.buckets.update_at(
            (key.clone(), class),
            now,
            || Bucket {
                tokens: burst,
                last_refill: now,
            },
            |bucket| {
                let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * per_sec).min(burst);
                bucket.last_refill = now;
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    RateVerdict::Allowed {
                        remaining: bucket.tokens as u32,
                    }
                } else {
                    let wait = (1.0 - bucket.tokens) / per_sec;
                    RateVerdict::Denied {
                        retry_after_secs: (wait.ceil() as u64).max(1),
                    }
                }
            },
        )
    }
}
