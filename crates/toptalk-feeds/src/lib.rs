//! toptalk-feeds: everything in toptalk that touches a process or a store.
//!
//! - [`extraction`]: spawns the two extraction commands and streams their output.
//! - [`store`]: capability traits for the queue store and the rule store.
//! - [`redis_store`] / [`mysql_store`]: production implementations of those traits.
//! - [`enrich`]: decorates detail records from one of the stores.
//! - [`publish`]: probe-then-write with an unbounded reconnect loop.

pub mod enrich;
pub mod extraction;
pub mod mysql_store;
pub mod publish;
pub mod redis_store;
pub mod store;

pub use enrich::EnrichmentLookup;
pub use extraction::{CommandSpec, ExtractionAdapter, RecordStream};
pub use mysql_store::MysqlRuleStore;
pub use publish::{Delivery, ResilientPublisher};
pub use redis_store::RedisStore;
pub use store::{QueueStore, RuleStore, StoreError};
