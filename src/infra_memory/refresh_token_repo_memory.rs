use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Keyed by fingerprint, which is unique the same way the SQL schema makes
/// it unique. Ids are handed out from a counter.
pub struct MemoryRefreshTokenRepo {
    records: DashMap<TokenFingerprint, RefreshTokenRecord>,
    next_id: AtomicI64,
}

impl MemoryRefreshTokenRepo {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryRefreshTokenRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MemoryRefreshTokenRepo {
    async fn record(
        &self,
        user_id: UserId,
        fingerprint: &TokenFingerprint,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AuthError> {
        let record = RefreshTokenRecord {
            id: RefreshTokenId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            user_id,
            fingerprint: fingerprint.clone(),
            expires_at,
            created_at: Utc::now(),
            revoked: false,
        };
        match self.records.entry(fingerprint.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(AuthError::Store("duplicate fingerprint".to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn find_active(
        &self,
        fingerprint: &TokenFingerprint,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        Ok(self
            .records
            .get(fingerprint)
            .filter(|r| !r.revoked)
            .map(|r| r.clone()))
    }

    async fn revoke(&self, id: RefreshTokenId) -> Result<(), AuthError> {
        for mut record in self.records.iter_mut() {
            if record.id == id {
                record.revoked = true;
                break;
            }
        }
        Ok(())
    }

    async fn revoke_by_fingerprint(
        &self,
        fingerprint: &TokenFingerprint,
        owner: UserId,
    ) -> Result<bool, AuthError> {
        if let Some(mut record) = self.records.get_mut(fingerprint) {
            if record.user_id == owner && !record.revoked {
                record.revoked = true;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
