//! # Redis Broker
//!
//! Queue and store implementations shared across processes through Redis.
//!
//! ## Layout in Redis
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LIST   receipt_task_queue                                             │
//! │         LPUSH ──► [ newest ... oldest ] ──► BRPOP                      │
//! │         each element: {"id": "...", "receipt": {...}}                  │
//! │                                                                         │
//! │  STRING receipts:<uuid>                                                │
//! │         SET / GET, value is the receipt JSON                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Connections
//! Producers and the store share one [`ConnectionManager`], which reconnects
//! on its own. Each queue owns a separate consumer connection for `BRPOP`, so
//! a blocked pop never stalls an `LPUSH` or `GET` queued behind it.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use receipt_core::{QueueEntry, Receipt, ReceiptId};
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{AsyncCommands, AsyncConnectionConfig, Client};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::queue::WorkQueue;
use crate::store::{store_key, ReceiptStore};

/// Extra time allowed for a `BRPOP` reply beyond its server-side timeout.
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

/// Shortest `BRPOP` timeout sent; a zero timeout would block forever.
const MIN_BLOCK: Duration = Duration::from_millis(10);

// =============================================================================
// Configuration
// =============================================================================

/// Redis connection configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = RedisConfig::new("redis://127.0.0.1:6379")
///     .block_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://localhost:6379/0`.
    pub url: String,

    /// How long a single `BRPOP` blocks server-side before looping.
    /// Default: 1 second
    pub block_timeout: Duration,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        RedisConfig {
            url: url.into(),
            block_timeout: Duration::from_secs(1),
        }
    }

    /// Sets the `BRPOP` timeout.
    pub fn block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = timeout;
        self
    }
}

// =============================================================================
// Broker
// =============================================================================

/// An open connection to Redis that hands out queues and stores.
#[derive(Clone)]
pub struct RedisBroker {
    client: Client,
    conn: ConnectionManager,
    block_timeout: Duration,
}

impl fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBroker")
            .field("connection", &"ConnectionManager")
            .field("block_timeout", &self.block_timeout)
            .finish()
    }
}

impl RedisBroker {
    /// Opens the client and the shared connection manager.
    ///
    /// ## Errors
    /// `ConnectionFailed` if the URL is invalid or Redis is unreachable.
    pub async fn connect(config: RedisConfig) -> StoreResult<Self> {
        info!(url = %config.url, "Connecting to Redis");

        let client = Client::open(config.url.as_str())
            .map_err(|e| StoreError::ConnectionFailed(format!("invalid Redis URL: {e}")))?;

        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!("Connected to Redis");

        Ok(RedisBroker {
            client,
            conn,
            block_timeout: config.block_timeout,
        })
    }

    /// Returns a queue over the Redis list `name`.
    pub fn queue(&self, name: impl Into<String>) -> RedisQueue {
        RedisQueue {
            name: name.into(),
            client: self.client.clone(),
            producer: self.conn.clone(),
            consumer: Mutex::new(None),
            block_timeout: self.block_timeout,
        }
    }

    /// Returns a store writing keys under `namespace`.
    pub fn store(&self, namespace: impl Into<String>) -> RedisStore {
        RedisStore {
            namespace: namespace.into(),
            conn: self.conn.clone(),
        }
    }

    /// Round-trips a `PING`.
    pub async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Work queue stored as a Redis list.
pub struct RedisQueue {
    name: String,
    client: Client,
    producer: ConnectionManager,
    consumer: Mutex<Option<MultiplexedConnection>>,
    block_timeout: Duration,
}

impl fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueue")
            .field("name", &self.name)
            .field("block_timeout", &self.block_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisQueue {
    async fn open_consumer(&self) -> StoreResult<MultiplexedConnection> {
        let config = AsyncConnectionConfig::new()
            .set_response_timeout(self.block_timeout + RESPONSE_GRACE);

        self.client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(StoreError::queue)
    }

    /// One `BRPOP` of at most `wait`, clamped to `[MIN_BLOCK, block_timeout]`.
    async fn pop(&self, wait: Duration) -> StoreResult<Option<QueueEntry>> {
        let wait = wait.clamp(MIN_BLOCK, self.block_timeout.max(MIN_BLOCK));
        let mut slot = self.consumer.lock().await;

        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.open_consumer().await?,
        };

        // A failed pop drops the connection; the next call reconnects.
        let popped: Option<(String, String)> = conn
            .brpop(&self.name, wait.as_secs_f64())
            .await
            .map_err(StoreError::queue)?;
        *slot = Some(conn);

        let Some((_, payload)) = popped else {
            return Ok(None);
        };

        serde_json::from_str(&payload).map(Some).map_err(|e| {
            warn!(queue = %self.name, error = %e, "Discarding malformed queue entry");
            StoreError::from(e)
        })
    }
}

#[async_trait]
impl WorkQueue for RedisQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enqueue(&self, entry: QueueEntry) -> StoreResult<()> {
        let payload = serde_json::to_string(&entry)?;
        let mut conn = self.producer.clone();

        conn.lpush::<_, _, ()>(&self.name, payload)
            .await
            .map_err(StoreError::queue)?;

        debug!(queue = %self.name, id = %entry.id, "Entry enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> StoreResult<QueueEntry> {
        loop {
            if let Some(entry) = self.pop(self.block_timeout).await? {
                return Ok(entry);
            }
        }
    }

    async fn try_dequeue(&self, wait: Duration) -> StoreResult<Option<QueueEntry>> {
        self.pop(wait).await
    }
}

// =============================================================================
// Store
// =============================================================================

/// Receipt store using one Redis string key per receipt.
#[derive(Clone)]
pub struct RedisStore {
    namespace: String,
    conn: ConnectionManager,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReceiptStore for RedisStore {
    async fn put(&self, id: ReceiptId, receipt: &Receipt) -> StoreResult<()> {
        let key = store_key(&self.namespace, &id);
        let value = serde_json::to_string(receipt)?;
        let mut conn = self.conn.clone();

        conn.set::<_, _, ()>(&key, value)
            .await
            .map_err(StoreError::store)?;

        debug!(key = %key, "Receipt stored");
        Ok(())
    }

    async fn get(&self, id: &ReceiptId) -> StoreResult<Receipt> {
        let key = store_key(&self.namespace, id);
        let mut conn = self.conn.clone();

        let value: Option<String> = conn.get(&key).await.map_err(StoreError::store)?;

        match value {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(StoreError::not_found(id)),
        }
    }
}

// =============================================================================
// Integration Tests (need a running Redis; set REDIS_URL)
// =============================================================================
