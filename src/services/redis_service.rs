// src/services/redis_service.rs
use crate::errors::BrandKitError;
use crate::services::rate_guard::CounterStore;
use crate::services::share_store::ShareBackend;
use async_trait::async_trait;
use log::info;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Shared Redis connection used by the rate guard counters and the share store.
#[derive(Clone)]
pub struct RedisService {
    conn: ConnectionManager,
}

impl RedisService {
    pub async fn new(redis_url: &str) -> Result<Self, BrandKitError> {
        let client = Client::open(redis_url).map_err(|e| BrandKitError::Redis(e.to_string()))?;

        let mut conn = ConnectionManager::new(client)
            .await
            .map_err(|e| BrandKitError::Redis(e.to_string()))?;

        // Test connection
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| BrandKitError::Redis(e.to_string()))?;

        info!("Connected to Redis");
        Ok(Self { conn })
    }

    pub async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, BrandKitError> {
        let mut conn = self.conn.clone();

        let count: i64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| BrandKitError::Redis(e.to_string()))?;

        // Only the first increment opens the window
        if count == 1 {
            conn.expire::<_, ()>(key, ttl.as_secs() as usize)
                .await
                .map_err(|e| BrandKitError::Redis(e.to_string()))?;
        }

        Ok(count)
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BrandKitError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs() as usize)
            .await
            .map_err(|e| BrandKitError::Redis(e.to_string()))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, BrandKitError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| BrandKitError::Redis(e.to_string()))
    }

    pub async fn sadd(&self, key: &str, member: &str) -> Result<(), BrandKitError> {
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(key, member)
            .await
            .map_err(|e| BrandKitError::Redis(e.to_string()))
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, BrandKitError> {
        let mut conn = self.conn.clone();
        conn.smembers(key)
            .await
            .map_err(|e| BrandKitError::Redis(e.to_string()))
    }
}

#[async_trait]
impl CounterStore for RedisService {
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, BrandKitError> {
        RedisService::incr_with_expiry(self, key, ttl).await
    }
}

#[async_trait]
impl ShareBackend for RedisService {
    async fn put_snapshot(&self, key: &str, json: &str, ttl: Duration) -> Result<(), BrandKitError> {
        self.set_ex(key, json, ttl).await
    }

    async fn get_snapshot(&self, key: &str) -> Result<Option<String>, BrandKitError> {
        self.get(key).await
    }

    async fn add_to_index(&self, key: &str, id: &str) -> Result<(), BrandKitError> {
        self.sadd(key, id).await
    }

    async fn index_members(&self, key: &str) -> Result<Vec<String>, BrandKitError> {
        self.smembers(key).await
    }
}
