//! EnrichmentLookup: decorate a detail record before it is published.
//!
//! The lookup key is the record's URL up to its first `?`. A lookup never
//! fails the record: store errors are logged and the record goes out
//! undecorated.

use toptalk_core::config::{Config, EnrichmentStrategy};
use toptalk_core::parser::truncate_at_question_mark;
use toptalk_core::{Decoration, DetailRecord};

use crate::mysql_store::MysqlRuleStore;
use crate::store::{QueueStore, RuleStore};

pub enum EnrichmentLookup {
    /// Records are published as-is.
    Disabled,
    /// Members of the URL's set in `namespace` of the queue store.
    Members { namespace: u32 },
    /// First matching rule from the relational store.
    Rules(Box<dyn RuleStore>),
}

impl EnrichmentLookup {
    /// Choose the lookup named by `enrichment.strategy`.
    ///
    /// The rules store connects lazily, so this must run inside the runtime
    /// but performs no I/O.
    pub fn from_config(cfg: &Config) -> Self {
        match (cfg.enrichment.strategy, &cfg.mysql) {
            (EnrichmentStrategy::Members, _) => EnrichmentLookup::Members {
                namespace: cfg.redis.urldatabase,
            },
            (EnrichmentStrategy::Rules, Some(mysql)) => {
                EnrichmentLookup::Rules(Box::new(MysqlRuleStore::connect_lazy(mysql)))
            }
            (EnrichmentStrategy::Rules, None) => {
                tracing::warn!("rules enrichment configured without [mysql]; disabling");
                EnrichmentLookup::Disabled
            }
            (EnrichmentStrategy::None, _) => EnrichmentLookup::Disabled,
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            EnrichmentLookup::Disabled => "none",
            EnrichmentLookup::Members { .. } => "members",
            EnrichmentLookup::Rules(_) => "rules",
        }
    }

    /// Decorations for `detail`; empty when nothing matched or the lookup
    /// failed.
    pub async fn lookup<S: QueueStore + ?Sized>(
        &mut self,
        store: &mut S,
        detail: &DetailRecord,
    ) -> Vec<Decoration> {
        let key = truncate_at_question_mark(&detail.url);
        if key.is_empty() {
            return Vec::new();
        }

        match self {
            EnrichmentLookup::Disabled => Vec::new(),
            EnrichmentLookup::Members { namespace } => {
                match store.members_of(*namespace, key).await {
                    Ok(members) if members.is_empty() => Vec::new(),
                    Ok(members) => vec![Decoration::Members(members)],
                    Err(err) => {
                        tracing::warn!(key, error = %err, "member lookup failed");
                        Vec::new()
                    }
                }
            }
            EnrichmentLookup::Rules(rules) => match rules.match_pattern(key).await {
                Ok(Some(rule)) => vec![Decoration::Rule(rule)],
                Ok(None) => Vec::new(),
                Err(err) => {
                    tracing::warn!(key, error = %err, "rule lookup failed");
                    Vec::new()
                }
            },
        }
    }
}

impl std::fmt::Debug for EnrichmentLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichmentLookup::Members { namespace } => f
                .debug_struct("Members")
                .field("namespace", namespace)
                .finish(),
            other => f.write_str(other.strategy()),
        }
    }
}
