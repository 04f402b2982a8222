use crate::domain_model::ClientKey;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

const BEARER_PREFIX: &str = "Bearer ";
const KEY_DIGEST_LEN: usize = 16;

/// Resolves the request's bearer token: the `access_token` cookie wins, the
/// `Authorization: Bearer` header is the fallback.
pub fn bearer_token(cookie: Option<String>, authorization: Option<String>) -> Option<String> {
    if let Some(token) = cookie {
        if !token.is_empty() {
            return Some(token);
        }
    }
    authorization.and_then(|h| h.strip_prefix(BEARER_PREFIX).map(str::to_owned))
}

/// Limiter key for the caller: `"{ip}:{digest-prefix}"` when a bearer token
/// is present, the bare IP otherwise. Distinct sessions behind one NAT get
/// distinct buckets; the raw token never becomes a key.
pub fn client_key(addr: Option<SocketAddr>, bearer: Option<&str>) -> ClientKey {
    let ip = match addr {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_owned(),
    };
    match bearer {
        Some(token) => {
            let digest = hex::encode(Sha256::digest(token.as_bytes()));
            ClientKey(format!("{}:{}", ip, &digest[..KEY_DIGEST_LEN]))
        }
        None => ClientKey(ip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_wins_over_header() {
        assert_eq!(
            bearer_token(Some("tok-c".into()), Some("Bearer tok-h".into())),
            Some("tok-c".into())
        );
        assert_eq!(
            bearer_token(Some(String::new()), Some("Bearer tok-h".into())),
            Some("tok-h".into())
        );
        assert_eq!(bearer_token(None, Some("Bearer tok-h".into())), Some("tok-h".into()));
    }

    #[test]
    fn header_must_carry_the_bearer_scheme() {
        assert_eq!(bearer_token(None, Some("Basic dXNlcg==".into())), None);
        assert_eq!(bearer_token(None, None), None);
    }

    #[test]
    fn unauthenticated_key_is_the_bare_ip() {
        let addr: SocketAddr = "203.0.113.9:443".parse().unwrap();
        assert_eq!(client_key(Some(addr), None), ClientKey("203.0.113.9".into()));
        assert_eq!(client_key(None, None), ClientKey("unknown".into()));
    }

    #[test]
    fn authenticated_key_appends_a_short_token_digest() {
        let addr: SocketAddr = "203.0.113.9:443".parse().unwrap();
        let key = client_key(Some(addr), Some("token-a"));
        let (ip, digest) = key.0.split_once(':').unwrap();
        assert_eq!(ip, "203.0.113.9");
        assert_eq!(digest.len(), KEY_DIGEST_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));

        // Same session maps to the same bucket; different sessions split.
        assert_eq!(key, client_key(Some(addr), Some("token-a")));
        assert_ne!(key, client_key(Some(addr), Some("token-b")));
    }
}
