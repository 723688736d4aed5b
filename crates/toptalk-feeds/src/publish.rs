//! ResilientPublisher: writes to the queue store, reconnecting as needed.
//!
//! Every write is preceded by a liveness probe. A failed probe enters the
//! reconnect loop, which retries at a fixed interval until the store answers
//! and is never bounded by attempt count; the write is then issued exactly
//! once. A write that still fails after that is returned to the caller, which
//! drops the item and moves on.

use std::time::Duration;

use toptalk_core::TopTalkerRecord;

use crate::store::{QueueStore, StoreError};

/// Pause between reconnect attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// How a write reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The probe passed and the write went out on the existing connection.
    Direct,
    /// The probe failed; the write went out after `attempts` connect attempts.
    AfterReconnect { attempts: u32 },
}

enum Write<'a> {
    Push { key: &'a str, payload: &'a str },
    Rank { key: &'a str, score: u64, member: &'a str },
}

#[derive(Debug)]
pub struct ResilientPublisher<S> {
    store: S,
    retry_interval: Duration,
}

impl<S: QueueStore> ResilientPublisher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// The shared store handle, for lookups that ride the same connection.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Connect, retrying forever. Returns the number of attempts it took.
    pub async fn connect(&mut self) -> u32 {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.store.connect().await {
                Ok(()) => {
                    if attempts > 1 {
                        tracing::info!(
                            endpoint = %self.store.endpoint(),
                            attempts,
                            "store reconnected"
                        );
                    }
                    return attempts;
                }
                Err(err) => {
                    tracing::warn!(
                        endpoint = %self.store.endpoint(),
                        attempts,
                        error = %err,
                        retry_in = ?self.retry_interval,
                        "store connect failed"
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }

    /// Append `payload` to the list at `key`.
    pub async fn publish(&mut self, key: &str, payload: &str) -> Result<Delivery, StoreError> {
        self.write(Write::Push { key, payload }).await
    }

    /// Record a top talker's count in the sorted set at `key`.
    pub async fn record_rank(
        &mut self,
        key: &str,
        talker: &TopTalkerRecord,
    ) -> Result<Delivery, StoreError> {
        self.write(Write::Rank {
            key,
            score: talker.count,
            member: &talker.address,
        })
        .await
    }

    async fn write(&mut self, write: Write<'_>) -> Result<Delivery, StoreError> {
        let delivery = match self.store.ping().await {
            Ok(()) => Delivery::Direct,
            Err(err) => {
                tracing::warn!(
                    endpoint = %self.store.endpoint(),
                    error = %err,
                    "store probe failed; reconnecting"
                );
                let attempts = self.connect().await;
                Delivery::AfterReconnect { attempts }
            }
        };

        match write {
            Write::Push { key, payload } => self.store.push(key, payload).await?,
            Write::Rank { key, score, member } => self.store.rank(key, score, member).await?,
        }
        Ok(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Probe fails `ping_failures` times, then connect fails `connect_failures` times.
    #[derive(Default)]
    struct Flaky {
        ping_failures: u32,
        connect_failures: u32,
        connects: u32,
        pushes: Vec<(String, String)>,
        ranks: Vec<(String, u64, String)>,
    }

    #[async_trait]
    impl QueueStore for Flaky {
        fn endpoint(&self) -> String {
            "flaky".into()
        }
        async fn connect(&mut self) -> Result<(), StoreError> {
            self.connects += 1;
            if self.connect_failures > 0 {
                self.connect_failures -= 1;
                return Err(StoreError::NotConnected("flaky".into()));
            }
            Ok(())
        }
        async fn ping(&mut self) -> Result<(), StoreError> {
            if self.ping_failures > 0 {
                self.ping_failures -= 1;
                return Err(StoreError::NotConnected("flaky".into()));
            }
            Ok(())
        }
        async fn push(&mut self, key: &str, payload: &str) -> Result<(), StoreError> {
            self.pushes.push((key.into(), payload.into()));
            Ok(())
        }
        async fn rank(&mut self, key: &str, score: u64, member: &str) -> Result<(), StoreError> {
            self.ranks.push((key.into(), score, member.into()));
            Ok(())
        }
        async fn members_of(&mut self, _: u32, _: &str) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_store_is_written_directly() {
        let mut publisher = ResilientPublisher::new(Flaky::default());
        let delivery = publisher.publish("iplist201401060920", "1 a").await.unwrap();
        assert_eq!(delivery, Delivery::Direct);
        assert_eq!(publisher.store().connects, 0);
        assert_eq!(publisher.store().pushes.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn outage_reconnects_then_writes_once() {
        let store = Flaky {
            ping_failures: 1,
            connect_failures: 3,
            ..Default::default()
        };
        let mut publisher = ResilientPublisher::new(store);
        let started = tokio::time::Instant::now();

        let delivery = publisher.publish("iplist201401060920", "1 a").await.unwrap();

        assert_eq!(delivery, Delivery::AfterReconnect { attempts: 4 });
        assert_eq!(started.elapsed(), DEFAULT_RETRY_INTERVAL * 3);
        let store = publisher.into_inner();
        assert_eq!(store.connects, 4);
        assert_eq!(
            store.pushes,
            vec![("iplist201401060920".to_string(), "1 a".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rank_goes_through_the_same_probe() {
        let store = Flaky {
            ping_failures: 1,
            ..Default::default()
        };
        let mut publisher = ResilientPublisher::new(store);
        let talker = TopTalkerRecord {
            count: 992,
            address: "222.73.133.32".into(),
        };
        let delivery = publisher
            .record_rank("ipset201401060920", &talker)
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::AfterReconnect { attempts: 1 });
        assert_eq!(
            publisher.store().ranks,
            vec![("ipset201401060920".to_string(), 992, "222.73.133.32".to_string())]
        );
    }
}
