// ============================================================================
// Profile Store Client
// ============================================================================
//
// Read-side client for the external profile store. The gateway never writes
// profiles; the profile edit service owns the key. One HGETALL per lookup
// against "user:profile:{user_id}".
//
// ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use gatehouse_error::AppResult;

use super::Profile;

/// Boundary seam for profile lookups.
///
/// A single lookup may be slow or fail outright; retry policy lives with
/// the caller, not here.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> AppResult<Option<Profile>>;
}

pub struct RedisProfileStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisProfileStore {
    pub async fn connect(redis_url: &str, key_prefix: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(url = %redis_url, "Connected to profile store");
        Ok(Self {
            conn,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn profile_key(&self, user_id: &str) -> String {
        format!("{}{}", self.key_prefix, user_id)
    }
}

#[async_trait]
impl ProfileStore for RedisProfileStore {
    async fn fetch_profile(&self, user_id: &str) -> AppResult<Option<Profile>> {
        let key = self.profile_key(user_id);
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(&key).await?;
        Ok(Profile::from_wire(user_id, raw))
    }
}
