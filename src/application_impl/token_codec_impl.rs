use crate::application_port::*;
use crate::domain_model::TokenFingerprint;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

const REFRESH_TOKEN_TYPE: &str = "refresh";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String, // username
    exp: i64,
    iat: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String, // username
    exp: i64,
    #[serde(rename = "type", default)]
    token_type: Option<String>,
}

fn validation() -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    // The crate default leeway is 60 s; expiry here is exact.
    v.leeway = 0;
    v
}

fn encode_access(subject: &str, cfg: &JwtConfig) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.access_ttl;
    let claims = AccessClaims {
        sub: subject.to_owned(),
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok((token, exp_dt))
}

fn encode_refresh(subject: &str, cfg: &JwtConfig) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.refresh_ttl;
    let claims = RefreshClaims {
        sub: subject.to_owned(),
        exp: exp_dt.timestamp(),
        token_type: Some(REFRESH_TOKEN_TYPE.to_owned()),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok((token, exp_dt))
}

fn decode_access(token: &str, cfg: &JwtConfig) -> Result<AccessClaims, AuthError> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(&cfg.signing_key),
        &validation(),
    )
    .map_err(|_| AuthError::TokenInvalid)?;
    Ok(data.claims)
}

fn decode_refresh(token: &str, cfg: &JwtConfig) -> Result<RefreshClaims, AuthError> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(&cfg.signing_key),
        &validation(),
    )
    .map_err(|_| AuthError::TokenInvalid)?;
    if data.claims.token_type.as_deref() != Some(REFRESH_TOKEN_TYPE) {
        return Err(AuthError::TokenInvalid);
    }
    Ok(data.claims)
}

/// HS256 codec signing both token kinds with one key. Refresh tokens carry
/// `type: "refresh"`; access tokens carry `iat` and no type, so neither kind
/// passes the other's validation.
pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access(
        &self,
        subject: &str,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(subject, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh(
        &self,
        subject: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_refresh(subject, &self.cfg)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn validate_access(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let claims = decode_access(token, &self.cfg)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::TokenInvalid)?;
        Ok(VerifiedClaims {
            subject: claims.sub,
            expires_at,
        })
    }

    async fn validate_refresh(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let claims = decode_refresh(token, &self.cfg)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::TokenInvalid)?;
        Ok(VerifiedClaims {
            subject: claims.sub,
            expires_at,
        })
    }

    fn fingerprint(&self, raw_token: &str) -> TokenFingerprint {
        TokenFingerprint(hex::encode(Sha256::digest(raw_token.as_bytes())))
    }
}
