//! Short-lived launch state storage with single-use semantics.
//!
//! Every login initiation stores a state record under its state token; the
//! matching launch consumes it atomically so a replayed launch finds
//! nothing. Redis backs the production path, an in-memory mock backs tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

const STATE_KEY_PREFIX: &str = "lti_state:";

/// What we remember between login initiation and the launch callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchState {
    pub nonce: String,
    pub registration_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait LaunchStateCache: Send + Sync {
    /// Stores a state record under the state token for `ttl_seconds`.
    async fn put(
        &self,
        state: &str,
        value: &LaunchState,
        ttl_seconds: i64,
    ) -> Result<(), redis::RedisError>;

    /// Atomically removes and returns the record for the state token. Only
    /// one caller can ever observe `Some` for a given token.
    async fn take(&self, state: &str) -> Result<Option<LaunchState>, redis::RedisError>;

    async fn health_check(&self) -> Result<(), redis::RedisError>;
}

#[derive(Clone)]
pub struct RedisLaunchCache {
    connection: ConnectionManager,
}

impl RedisLaunchCache {
    pub async fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    fn state_key(state: &str) -> String {
        format!("{}{}", STATE_KEY_PREFIX, state)
    }
}

#[async_trait]
impl LaunchStateCache for RedisLaunchCache {
    async fn put(
        &self,
        state: &str,
        value: &LaunchState,
        ttl_seconds: i64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(value).map_err(|e| {
            redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "failed to serialize launch state",
                e.to_string(),
            ))
        })?;
        conn.set_ex::<_, _, ()>(Self::state_key(state), payload, ttl_seconds as u64)
            .await?;
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<LaunchState>, redis::RedisError> {
        let mut conn = self.connection.clone();
        // GETDEL makes the read-and-invalidate a single round trip, so two
        // racing launches can never both consume the same state.
        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(Self::state_key(state))
            .query_async(&mut conn)
            .await?;
        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }

    async fn health_check(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

/// In-memory cache for tests.
#[derive(Default)]
pub struct MockLaunchCache {
    entries: Mutex<HashMap<String, (LaunchState, Instant)>>,
}

impl MockLaunchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LaunchStateCache for MockLaunchCache {
    async fn put(
        &self,
        state: &str,
        value: &LaunchState,
        ttl_seconds: i64,
    ) -> Result<(), redis::RedisError> {
        let deadline = Instant::now() + Duration::from_secs(ttl_seconds.max(0) as u64);
        self.entries
            .lock()
            .unwrap()
            .insert(state.to_string(), (value.clone(), deadline));
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<LaunchState>, redis::RedisError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(state) {
            Some((value, deadline)) if Instant::now() < deadline => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), redis::RedisError> {
        Ok(())
    }
}
