//! services/api/src/adapters/cache.rs
//!
//! Redis-backed implementation of the `TranslationCacheService` port.
//!
//! The adapter is built around graceful degradation: when no Redis URL is
//! configured, when the connection cannot be established, or when an
//! individual command fails, every lookup is a miss and every write is a
//! no-op. A cache problem must never fail a translation request.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use lingualive_core::domain::TranslationRecord;
use lingualive_core::fingerprint::cache_key;
use lingualive_core::ports::TranslationCacheService;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A translation cache backed by Redis, or disabled entirely when no
/// connection is available.
#[derive(Clone)]
pub struct RedisCacheAdapter {
    connection: Option<ConnectionManager>,
}

impl RedisCacheAdapter {
    pub fn new(connection: Option<ConnectionManager>) -> Self {
        Self { connection }
    }

    /// A cache that always misses, for deployments without Redis.
    pub fn disabled() -> Self {
        Self { connection: None }
    }

    /// Attempts to connect to Redis. Connection failures are logged and
    /// reported as `None` so the service starts in degraded mode.
    pub async fn connect(redis_url: &str) -> Option<ConnectionManager> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(2)
            .set_connection_timeout(Duration::from_millis(500));

        let client = match Client::open(redis_url) {
            Ok(client) => client,
            Err(e) => {
                warn!("Invalid Redis URL, translation cache disabled: {}", e);
                return None;
            }
        };

        match client.get_connection_manager_with_config(config).await {
            Ok(manager) => Some(manager),
            Err(e) => {
                warn!("Redis unreachable, translation cache disabled: {}", e);
                None
            }
        }
    }
}

//=========================================================================================
// `TranslationCacheService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TranslationCacheService for RedisCacheAdapter {
    async fn get(&self, user_id: Uuid, fingerprint: &str) -> Option<TranslationRecord> {
        let mut connection = self.connection.clone()?;
        let key = cache_key(user_id, fingerprint);

        let raw: Option<String> = match connection.get(&key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Translation cache read failed, treating as miss: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw?) {
            Ok(record) => Some(record),
            Err(e) => {
                // A corrupt entry is indistinguishable from a miss to callers.
                warn!("Discarding malformed cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn put(
        &self,
        user_id: Uuid,
        fingerprint: &str,
        record: &TranslationRecord,
        ttl: Duration,
    ) {
        let Some(mut connection) = self.connection.clone() else {
            return;
        };
        let key = cache_key(user_id, fingerprint);

        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize translation record for cache: {}", e);
                return;
            }
        };

        if let Err(e) = connection
            .set_ex::<_, _, ()>(&key, json, ttl.as_secs())
            .await
        {
            warn!("Translation cache write failed: {}", e);
        }
    }
}
