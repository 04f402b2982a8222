use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

pub struct MySqlRefreshTokenRepo {
    pool: MySqlPool,
}

impl MySqlRefreshTokenRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshTokenRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<RefreshTokenRecord, AuthError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id = UserId(
            Uuid::from_slice(&user_id_bytes).map_err(|e| AuthError::Store(e.to_string()))?,
        );

        let fingerprint: String = row
            .try_get("fingerprint")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let revoked: bool = row
            .try_get("revoked")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(RefreshTokenRecord {
            id: RefreshTokenId(id),
            user_id,
            fingerprint: TokenFingerprint(fingerprint),
            expires_at,
            created_at,
            revoked,
        })
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MySqlRefreshTokenRepo {
    async fn record(
        &self,
        user_id: UserId,
        fingerprint: &TokenFingerprint,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AuthError> {
        let created_at = Utc::now();
        let res = sqlx::query(
            r#"
INSERT INTO refresh_token (user_id, fingerprint, expires_at, created_at)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(fingerprint.0.as_str())
        .bind(expires_at)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(done) => Ok(RefreshTokenRecord {
                id: RefreshTokenId(done.last_insert_id() as i64),
                user_id,
                fingerprint: fingerprint.clone(),
                expires_at,
                created_at,
                revoked: false,
            }),
            Err(e) if is_dup_key(&e) => {
                Err(AuthError::Store("duplicate fingerprint".to_string()))
            }
            Err(e) => Err(AuthError::Store(format!("refresh token insert: {e}"))),
        }
    }

    async fn find_active(
        &self,
        fingerprint: &TokenFingerprint,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, user_id, fingerprint, expires_at, created_at, revoked
FROM refresh_token
WHERE fingerprint = ? AND revoked = FALSE
"#,
        )
        .bind(fingerprint.0.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(format!("refresh token by fingerprint: {e}")))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn revoke(&self, id: RefreshTokenId) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_token SET revoked = TRUE WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("refresh token revoke: {e}")))?;
        Ok(())
    }

    async fn revoke_by_fingerprint(
        &self,
        fingerprint: &TokenFingerprint,
        owner: UserId,
    ) -> Result<bool, AuthError> {
        // Ownership check and flip in one statement; row atomicity is the
        // only synchronization needed.
        let done = sqlx::query(
            r#"
UPDATE refresh_token
SET revoked = TRUE
WHERE fingerprint = ? AND user_id = ? AND revoked = FALSE
"#,
        )
        .bind(fingerprint.0.as_str())
        .bind(owner.0.as_bytes() as &[u8])
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(format!("refresh token revoke: {e}")))?;

        Ok(done.rows_affected() > 0)
    }
}
