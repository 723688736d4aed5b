//! Redis implementation of [`QueueStore`].
//!
//! Holds a `redis::Client` for the configured endpoint and at most one live
//! multiplexed connection. [`QueueStore::connect`] swaps in a fresh
//! connection; every command is bounded by the same timeout used for the
//! connect itself.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisResult;

use crate::store::{QueueStore, StoreError};

/// Connect and per-command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

pub struct RedisStore {
    client: redis::Client,
    endpoint: String,
    home: u32,
    timeout: Duration,
    conn: Option<MultiplexedConnection>,
}

impl RedisStore {
    /// Prepare a store for `host:port`, writing into namespace `database`.
    /// No connection is opened until [`QueueStore::connect`].
    pub fn new(host: &str, port: u16, database: u32) -> Result<Self, StoreError> {
        let client = redis::Client::open(format!("redis://{host}:{port}/{database}"))?;
        Ok(Self {
            client,
            endpoint: format!("{host}:{port}/{database}"),
            home: database,
            timeout: DEFAULT_TIMEOUT,
            conn: None,
        })
    }

    fn conn(&mut self) -> Result<&mut MultiplexedConnection, StoreError> {
        let endpoint = &self.endpoint;
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::NotConnected(endpoint.clone()))
    }
}

async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    fut: impl Future<Output = RedisResult<T>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout {
            operation,
            after: limit,
        }),
    }
}

async fn ping(limit: Duration, conn: &mut MultiplexedConnection) -> Result<(), StoreError> {
    let reply: String = bounded(limit, "PING", redis::cmd("PING").query_async(conn)).await?;
    if reply.eq_ignore_ascii_case("pong") {
        Ok(())
    } else {
        Err(StoreError::UnexpectedReply {
            operation: "PING",
            reply,
        })
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn connect(&mut self) -> Result<(), StoreError> {
        self.conn = None;
        let limit = self.timeout;
        let mut conn = bounded(
            limit,
            "connect",
            self.client.get_multiplexed_async_connection(),
        )
        .await?;
        ping(limit, &mut conn).await?;
        tracing::info!(endpoint = %self.endpoint, "redis connection established");
        self.conn = Some(conn);
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        let limit = self.timeout;
        ping(limit, self.conn()?).await
    }

    async fn push(&mut self, key: &str, payload: &str) -> Result<(), StoreError> {
        let limit = self.timeout;
        let conn = self.conn()?;
        let len: i64 = bounded(
            limit,
            "RPUSH",
            redis::cmd("RPUSH").arg(key).arg(payload).query_async(conn),
        )
        .await?;
        tracing::trace!(key, len, "rpush");
        Ok(())
    }

    async fn rank(&mut self, key: &str, score: u64, member: &str) -> Result<(), StoreError> {
        let limit = self.timeout;
        let conn = self.conn()?;
        let added: i64 = bounded(
            limit,
            "ZADD",
            redis::cmd("ZADD").arg(key).arg(score).arg(member).query_async(conn),
        )
        .await?;
        tracing::trace!(key, member, added, "zadd");
        Ok(())
    }

    async fn members_of(&mut self, namespace: u32, key: &str) -> Result<Vec<String>, StoreError> {
        let limit = self.timeout;
        let home = self.home;
        let conn = self.conn()?;
        let (members,): (Vec<String>,) = bounded(
            limit,
            "SMEMBERS",
            redis::pipe()
                .cmd("SELECT")
                .arg(namespace)
                .ignore()
                .cmd("SMEMBERS")
                .arg(key)
                .cmd("SELECT")
                .arg(home)
                .ignore()
                .query_async(conn),
        )
        .await?;
        Ok(members)
    }
}
