use std::fmt;

/// SHA-256 hex digest of a raw refresh token. The only form the store sees.
#[derive(Debug, Clone, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct TokenFingerprint(pub String);

impl fmt::Display for TokenFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct RefreshTokenId(pub i64);

impl fmt::Display for RefreshTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
