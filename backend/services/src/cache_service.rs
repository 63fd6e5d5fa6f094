use anyhow::{Context, Result};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SCAN_BATCH: usize = 100;

/// JSON values in Redis under a common key namespace. Without a Redis URL
/// every read misses and every write is dropped.
pub struct CacheService {
    client: Option<redis::Client>,
    namespace: String,
}

impl CacheService {
    pub fn new(redis_url: Option<String>, namespace: &str) -> Result<Self> {
        let client = match redis_url.filter(|url| !url.is_empty()) {
            Some(url) => Some(
                redis::Client::open(url.as_str())
                    .with_context(|| format!("invalid Redis URL: {}", url))?,
            ),
            None => None,
        };

        Ok(Self {
            client,
            namespace: namespace.to_string(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            client: None,
            namespace: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn namespaced(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.namespace, key)
        }
    }

    async fn connection(&self) -> Result<Option<redis::aio::MultiplexedConnection>> {
        match &self.client {
            Some(client) => Ok(Some(client.get_multiplexed_async_connection().await?)),
            None => Ok(None),
        }
    }

    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let Some(mut conn) = self.connection().await? else {
            return Ok(None);
        };

        let raw: Option<String> = conn.get(self.namespaced(key)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize,
    {
        let Some(mut conn) = self.connection().await? else {
            return Ok(());
        };

        let json = serde_json::to_string(value)?;
        let _: () = conn
            .set_ex(self.namespaced(key), json, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let Some(mut conn) = self.connection().await? else {
            return Ok(());
        };

        let _: () = conn.del(self.namespaced(key)).await?;
        Ok(())
    }

    fn prefix_pattern(&self, prefix: &str) -> String {
        format!("{}*", self.namespaced(prefix))
    }

    /// Remove every key starting with `prefix`. Walks the keyspace with
    /// `SCAN` so Redis is never blocked by a single `KEYS`.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let Some(mut conn) = self.connection().await? else {
            return Ok(());
        };

        let pattern = self.prefix_pattern(prefix);
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let _: () = conn.del(keys).await?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}
