//! Configuration types for toptalk.
//!
//! [`Config::load`] reads an INI file (`cls.conf` by default) layered on top
//! of the embedded defaults below, then applies command-line [`Overrides`].
//! Keys with no default (`loglocation.*`, `ip.top`, `url.url`) must be present
//! in the file; anything missing or unparsable becomes
//! [`Error::ConfigMissing`], the only error that stops the daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[system]
debug  = off
daemon = off

[redis]
server      = 127.0.0.1
port        = 6379
database    = 0
urldatabase = 1

[enrichment]
strategy = members

[commands]
top_talkers             = bash ip.sh
detail_search           = nohup bash SearchIpInF5.sh
first_line_timeout_secs = 30

[timing]
poll_secs        = 5
settle_secs      = 4
cycle_secs       = 250
reconnect_secs   = 5
detail_skew_secs = 20

[keys]
ranking_prefix  = ipset
detail_prefix   = iplist
record_rankings = on

[log]
dir = ./log
"#;

const DEFAULT_REDIS_SERVER: &str = "127.0.0.1";
const DEFAULT_REDIS_PORT: u16 = 6379;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub loglocation: LogLocationConfig,
    pub ip: IpConfig,
    pub url: UrlConfig,
    pub redis: RedisConfig,
    pub mysql: Option<MysqlConfig>,
    pub enrichment: EnrichmentConfig,
    pub commands: CommandsConfig,
    pub timing: TimingConfig,
    pub keys: KeysConfig,
    pub log: LogConfig,
}

/// `[system]`
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub debug: bool,
    pub daemon: bool,
}

/// `[loglocation]`: roots of the two rotating logs.
#[derive(Debug, Clone, Deserialize)]
pub struct LogLocationConfig {
    pub request_log: PathBuf,
    #[serde(rename = "F5_log", alias = "f5_log")]
    pub f5_log: PathBuf,
}

/// `[ip]`
#[derive(Debug, Clone, Deserialize)]
pub struct IpConfig {
    /// Number of top talkers to follow per window.
    pub top: usize,
}

/// `[url]`
#[derive(Debug, Clone, Deserialize)]
pub struct UrlConfig {
    /// Number of detail lines to publish per talker.
    pub url: usize,
}

/// `[redis]`: the queue / lookup store.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(deserialize_with = "server_or_default")]
    pub server: String,
    #[serde(deserialize_with = "port_or_default")]
    pub port: u16,
    /// Namespace the pipeline writes into.
    pub database: u32,
    /// Namespace holding URL → member sets.
    pub urldatabase: u32,
}

/// `[mysql]`: the relational rule store, used by the `rules` strategy.
#[derive(Debug, Clone, Deserialize)]
pub struct MysqlConfig {
    pub server: String,
    pub database: String,
    pub table: String,
    pub user: String,
    pub password: String,
}

/// How detail records are decorated before publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStrategy {
    /// Set membership read from `redis.urldatabase`.
    Members,
    /// `LIKE` match against the `mysql` rule table.
    Rules,
    None,
}

/// `[enrichment]`
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub strategy: EnrichmentStrategy,
}

/// `[commands]`: the two extraction commands.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandsConfig {
    pub top_talkers: String,
    pub detail_search: String,
    pub first_line_timeout_secs: u64,
}

impl CommandsConfig {
    pub fn top_talkers_argv(&self) -> Result<Vec<String>> {
        argv("commands.top_talkers", &self.top_talkers)
    }

    pub fn detail_search_argv(&self) -> Result<Vec<String>> {
        argv("commands.detail_search", &self.detail_search)
    }

    pub fn first_line_timeout(&self) -> Duration {
        Duration::from_secs(self.first_line_timeout_secs)
    }
}

/// `[timing]`: every sleep in the polling loop.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    pub poll_secs: u64,
    pub settle_secs: u64,
    pub cycle_secs: u64,
    pub reconnect_secs: u64,
    pub detail_skew_secs: u64,
}

impl TimingConfig {
    pub fn poll(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn cycle(&self) -> Duration {
        Duration::from_secs(self.cycle_secs)
    }

    pub fn reconnect(&self) -> Duration {
        Duration::from_secs(self.reconnect_secs)
    }

    pub fn detail_skew(&self) -> Duration {
        Duration::from_secs(self.detail_skew_secs)
    }
}

/// `[keys]`: store key prefixes; the window id is appended.
#[derive(Debug, Clone, Deserialize)]
pub struct KeysConfig {
    pub ranking_prefix: String,
    pub detail_prefix: String,
    pub record_rankings: bool,
}

/// `[log]`
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub dir: PathBuf,
}

/// Values supplied on the command line; `None` leaves the file's value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub redis_server: Option<String>,
    pub redis_port: Option<u16>,
    pub debug: Option<bool>,
    pub daemon: Option<bool>,
}

impl Config {
    /// Load `path` over the built-in defaults, then apply `overrides`.
    pub fn load(path: &Path, overrides: &Overrides) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigMissing(format!(
                "config file {} not found",
                path.display()
            )));
        }
        let file = config::File::from(path).format(config::FileFormat::Ini);
        Self::build(file, overrides)
    }

    /// Parse INI text over the built-in defaults. Used by tests and tools.
    pub fn from_ini_str(ini: &str) -> Result<Self> {
        let file = config::File::from_str(ini, config::FileFormat::Ini);
        Self::build(file, &Overrides::default())
    }

    fn build<S>(source: S, overrides: &Overrides) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Ini))
            .add_source(source)
            .set_override_option("redis.server", overrides.redis_server.clone())?
            .set_override_option("redis.port", overrides.redis_port.map(i64::from))?
            .set_override_option("system.debug", overrides.debug)?
            .set_override_option("system.daemon", overrides.daemon)?
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.ip.top == 0 {
            return Err(Error::ConfigMissing("ip.top must be at least 1".into()));
        }
        if self.url.url == 0 {
            return Err(Error::ConfigMissing("url.url must be at least 1".into()));
        }
        if self.enrichment.strategy == EnrichmentStrategy::Rules && self.mysql.is_none() {
            return Err(Error::ConfigMissing(
                "[mysql] section is required when enrichment.strategy = rules".into(),
            ));
        }
        self.commands.top_talkers_argv()?;
        self.commands.detail_search_argv()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn argv(key: &str, line: &str) -> Result<Vec<String>> {
    let argv: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if argv.is_empty() {
        return Err(Error::ConfigMissing(format!("{key} is empty")));
    }
    Ok(argv)
}

fn server_or_default<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let raw = String::deserialize(d)?;
    let trimmed = raw.trim();
    Ok(if trimmed.is_empty() {
        DEFAULT_REDIS_SERVER.to_string()
    } else {
        trimmed.to_string()
    })
}

fn port_or_default<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u16, D::Error> {
    let raw = String::deserialize(d)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_REDIS_PORT);
    }
    trimmed
        .parse()
        .map_err(|_| serde::de::Error::custom(format!("invalid redis.port {trimmed:?}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
