//! In-memory stand-ins for the queue store and the rule store.
//!
//! `FakeQueueStore` records every list push and sorted-set write so harnesses
//! can assert on exactly what reached the store, and can be scripted to fail
//! its liveness probe and connect attempts a fixed number of times.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use toptalk_feeds::{QueueStore, RuleStore, StoreError};

// ---------------------------------------------------------------------------
// FakeQueueStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FakeQueueStore {
    /// Remaining probe failures before `ping` succeeds again.
    pub ping_failures: u32,
    /// Remaining connect failures before `connect` succeeds.
    pub connect_failures: u32,
    /// Every push and rank fails while set.
    pub reject_writes: bool,

    pub pings: u32,
    pub connects: u32,
    pub write_attempts: u32,

    pub lists: BTreeMap<String, Vec<String>>,
    pub rankings: BTreeMap<String, Vec<(u64, String)>>,
    pub sets: HashMap<(u32, String), Vec<String>>,
    pub members_asked: Vec<(u32, String)>,
}

impl FakeQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(mut self, namespace: u32, key: &str, members: &[&str]) -> Self {
        self.sets.insert(
            (namespace, key.to_string()),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn failing_pings(mut self, n: u32) -> Self {
        self.ping_failures = n;
        self
    }

    pub fn failing_connects(mut self, n: u32) -> Self {
        self.connect_failures = n;
        self
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        self.lists.get(key).cloned().unwrap_or_default()
    }

    pub fn ranking(&self, key: &str) -> Vec<(u64, String)> {
        self.rankings.get(key).cloned().unwrap_or_default()
    }

    fn down() -> StoreError {
        StoreError::NotConnected("fake".into())
    }
}

#[async_trait]
impl QueueStore for FakeQueueStore {
    fn endpoint(&self) -> String {
        "fake:0/0".into()
    }

    async fn connect(&mut self) -> Result<(), StoreError> {
        self.connects += 1;
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(Self::down());
        }
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.pings += 1;
        if self.ping_failures > 0 {
            self.ping_failures -= 1;
            return Err(Self::down());
        }
        Ok(())
    }

    async fn push(&mut self, key: &str, payload: &str) -> Result<(), StoreError> {
        self.write_attempts += 1;
        if self.reject_writes {
            return Err(Self::down());
        }
        self.lists
            .entry(key.to_string())
            .or_default()
            .push(payload.to_string());
        Ok(())
    }

    async fn rank(&mut self, key: &str, score: u64, member: &str) -> Result<(), StoreError> {
        self.write_attempts += 1;
        if self.reject_writes {
            return Err(Self::down());
        }
        self.rankings
            .entry(key.to_string())
            .or_default()
            .push((score, member.to_string()));
        Ok(())
    }

    async fn members_of(&mut self, namespace: u32, key: &str) -> Result<Vec<String>, StoreError> {
        self.members_asked.push((namespace, key.to_string()));
        Ok(self
            .sets
            .get(&(namespace, key.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// FakeRuleStore
// ---------------------------------------------------------------------------

/// Substring-matching rule table. The keys it was asked for are shared so a
/// harness can inspect them after the store has been boxed into the pipeline.
#[derive(Debug, Clone, Default)]
pub struct FakeRuleStore {
    rules: Vec<(String, String)>,
    pub asked: Arc<Mutex<Vec<String>>>,
}

impl FakeRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A row whose `url` column is `pattern` and whose `sql` column is `rule`.
    pub fn rule(mut self, pattern: &str, rule: &str) -> Self {
        self.rules.push((pattern.to_string(), rule.to_string()));
        self
    }
}

#[async_trait]
impl RuleStore for FakeRuleStore {
    async fn match_pattern(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.asked.lock().unwrap().push(key.to_string());
        Ok(self
            .rules
            .iter()
            .find(|(pattern, _)| pattern.contains(key))
            .map(|(_, rule)| rule.clone()))
    }
}
