use crate::error::StoreError;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time;

const KEY_PREFIX: &str = "coingate:ratelimit";

/// Fixed-window counter kept in Redis.
///
/// The connection is opened lazily by the first increment and then reused;
/// every round-trip is bounded by `timeout`.
pub struct RedisCounter {
    client: Client,
    connection: OnceCell<MultiplexedConnection>,
    timeout: Duration,
}

impl RedisCounter {
    pub fn new(redis_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client =
            Client::open(redis_url).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                self.bounded(self.client.get_multiplexed_async_connection())
                    .await?
                    .map_err(|e| StoreError::Connect(e.to_string()))
            })
            .await?;
        Ok(conn.clone())
    }

    /// `INCR` plus `PEXPIRE ... LT` in one `MULTI`/`EXEC`, so a counter never
    /// exists without an expiry and the expiry is only set once per window.
    pub async fn increment(&self, identity: &str, window: Duration) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        let key = format!("{}:{}", KEY_PREFIX, identity);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .incr(&key, 1u64)
            .cmd("PEXPIRE")
            .arg(&key)
            .arg(window.as_millis() as u64)
            .arg("LT")
            .ignore();

        let (count,): (u64,) = self.bounded(pipe.query_async(&mut conn)).await??;
        Ok(count)
    }

    async fn bounded<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = T>,
    {
        time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))
    }
}
