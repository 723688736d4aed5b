//! Store capability interfaces.
//!
//! The pipeline never sees a wire protocol. It talks to the queue/lookup
//! store through [`QueueStore`] and to the relational rule table through
//! [`RuleStore`]; `redis_store` and `mysql_store` provide the production
//! implementations, and tests substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no open connection to {0}")]
    NotConnected(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("unexpected reply to {operation}: {reply}")]
    UnexpectedReply {
        operation: &'static str,
        reply: String,
    },

    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

impl From<StoreError> for toptalk_core::Error {
    fn from(err: StoreError) -> Self {
        toptalk_core::Error::StoreUnavailable(err.to_string())
    }
}

/// The queue / lookup store (Redis in production).
///
/// Implementations own their connection and replace it in place on
/// [`connect`](QueueStore::connect); callers only ever borrow the store for
/// the duration of one call.
#[async_trait]
pub trait QueueStore: Send {
    /// Human-readable endpoint for logs.
    fn endpoint(&self) -> String;

    /// Open (or re-open) the connection and verify it answers.
    async fn connect(&mut self) -> Result<(), StoreError>;

    /// Cheap liveness probe on the current connection.
    async fn ping(&mut self) -> Result<(), StoreError>;

    /// Append `payload` to the list at `key`.
    async fn push(&mut self, key: &str, payload: &str) -> Result<(), StoreError>;

    /// Record `member` with `score` in the sorted set at `key`.
    async fn rank(&mut self, key: &str, score: u64, member: &str) -> Result<(), StoreError>;

    /// Members of the set `key` in `namespace`. The store is back in its home
    /// namespace when this returns.
    async fn members_of(&mut self, namespace: u32, key: &str) -> Result<Vec<String>, StoreError>;
}

/// The relational rule table (MySQL in production).
#[async_trait]
pub trait RuleStore: Send {
    /// First rule whose pattern column contains `key`, if any.
    async fn match_pattern(&mut self, key: &str) -> Result<Option<String>, StoreError>;
}
