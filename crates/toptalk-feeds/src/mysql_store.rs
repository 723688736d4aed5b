//! MySQL implementation of [`RuleStore`].
//!
//! The rule table has a `url` pattern column and a `sql` rule column; a detail
//! record's URL key selects the first row whose pattern contains it.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use toptalk_core::config::MysqlConfig;

use crate::store::{RuleStore, StoreError};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct MysqlRuleStore {
    pool: MySqlPool,
    query: String,
}

impl MysqlRuleStore {
    /// Build a lazily connecting single-connection pool. Nothing touches the
    /// network until the first lookup.
    pub fn connect_lazy(cfg: &MysqlConfig) -> Self {
        let (host, port) = split_host_port(&cfg.server);
        let mut options = MySqlConnectOptions::new()
            .host(host)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.database);
        if let Some(port) = port {
            options = options.port(port);
        }
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);
        Self {
            pool,
            query: rule_query(&cfg.table),
        }
    }
}

#[async_trait]
impl RuleStore for MysqlRuleStore {
    async fn match_pattern(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let rule: Option<Option<String>> = sqlx::query_scalar(&self.query)
            .bind(format!("%{key}%"))
            .fetch_optional(&self.pool)
            .await?;
        Ok(rule.flatten())
    }
}

fn rule_query(table: &str) -> String {
    format!(
        "SELECT `sql` FROM {} WHERE url LIKE ? LIMIT 1",
        quote_identifier(table)
    )
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn split_host_port(server: &str) -> (&str, Option<u16>) {
    match server.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (server, None),
        },
        None => (server, None),
    }
}
